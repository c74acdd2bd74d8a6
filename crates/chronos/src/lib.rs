pub mod ade;
pub mod batch;
pub mod calendar;
pub mod logging;
pub mod server;
pub mod types;
