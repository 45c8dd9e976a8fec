use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub notification_queue_size: usize,
    pub event_buffer_size: usize,
    pub max_orders_per_courier: usize,
    pub default_vehicle_class: String,
    /// Routes carrying fewer orders than this are flagged as underutilized.
    pub min_orders_per_route: usize,
    pub store_tx_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            notification_queue_size: 1024,
            event_buffer_size: 1024,
            max_orders_per_courier: 5,
            default_vehicle_class: "motorcycle".to_string(),
            min_orders_per_route: 2,
            store_tx_timeout: Duration::from_millis(5_000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            notification_queue_size: parse_or_default(
                "NOTIFICATION_QUEUE_SIZE",
                defaults.notification_queue_size,
            )?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            max_orders_per_courier: parse_or_default(
                "MAX_ORDERS_PER_COURIER",
                defaults.max_orders_per_courier,
            )?,
            default_vehicle_class: env::var("DEFAULT_VEHICLE_CLASS")
                .unwrap_or(defaults.default_vehicle_class),
            min_orders_per_route: parse_or_default(
                "MIN_ORDERS_PER_ROUTE",
                defaults.min_orders_per_route,
            )?,
            store_tx_timeout: Duration::from_millis(parse_or_default(
                "STORE_TX_TIMEOUT_MS",
                5_000u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects sizes the runtime cannot work with; channels panic on zero capacity.
    pub fn validate(&self) -> Result<(), AppError> {
        let positive = [
            ("MAX_ORDERS_PER_COURIER", self.max_orders_per_courier),
            ("NOTIFICATION_QUEUE_SIZE", self.notification_queue_size),
            ("EVENT_BUFFER_SIZE", self.event_buffer_size),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(AppError::Internal(format!("invalid {key}: must be > 0")));
            }
        }
        Ok(())
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
