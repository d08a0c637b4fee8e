use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::usb_mode::UsbModeRegistry;

/// Application-wide state shared across handlers
pub struct AppState {
    /// Configuration store
    pub config: ConfigStore,
    /// USB mode registry, the only path to the mode records
    pub usb_mode: Arc<UsbModeRegistry>,
    /// Data directory path
    data_dir: PathBuf,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ConfigStore, usb_mode: Arc<UsbModeRegistry>, data_dir: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            config,
            usb_mode,
            data_dir,
        })
    }

    /// Get data directory path
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }
}
