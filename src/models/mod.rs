pub mod analytics;
pub mod courier;
pub mod notification;
pub mod order;
pub mod route;
