//! Service configuration
//!
//! Configuration is kept as JSON in a small SQLite database inside the data
//! directory and cached in memory for lock-free reads.

mod schema;
mod store;

pub use schema::{AppConfig, UsbModeConfig, WebConfig, MODE_FILE_NAME, TEMP_MODE_FILE_NAME};
pub use store::{ConfigStore, DB_FILE_NAME};
