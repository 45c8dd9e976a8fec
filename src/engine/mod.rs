pub mod analytics;
pub mod builder;
pub mod lifecycle;
pub mod notify;
pub mod persist;
pub mod planning;
pub mod reassignment;
pub mod sequencer;
