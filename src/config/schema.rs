use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use typeshare::typeshare;

/// File name of the permanent mode record inside the data directory
pub const MODE_FILE_NAME: &str = "mode.cfg";

/// File name of the temporary mode record inside the data directory
pub const TEMP_MODE_FILE_NAME: &str = "mode_tmp.cfg";

/// Main application configuration
#[typeshare]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server settings
    pub web: WebConfig,
    /// USB mode record locations
    pub usb: UsbModeConfig,
}

/// Web server configuration
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// HTTP port
    pub http_port: u16,
    /// Bind address (used when `bind_addresses` is empty)
    pub bind_address: String,
    /// Bind addresses, one listener each
    pub bind_addresses: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            bind_address: "0.0.0.0".to_string(),
            bind_addresses: Vec::new(),
        }
    }
}

/// USB mode record configuration
///
/// Empty or relative paths are resolved against the data directory.
#[typeshare]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsbModeConfig {
    /// Permanent mode file
    pub mode_file: String,
    /// Temporary mode file
    pub temp_mode_file: String,
}

impl UsbModeConfig {
    /// Rebase empty or relative paths under `data_dir`.
    ///
    /// Returns true if anything changed.
    pub fn normalize(&mut self, data_dir: &Path) -> bool {
        let permanent = rebase(&mut self.mode_file, data_dir, MODE_FILE_NAME);
        let temporary = rebase(&mut self.temp_mode_file, data_dir, TEMP_MODE_FILE_NAME);
        permanent || temporary
    }

    pub fn mode_file_path(&self) -> PathBuf {
        PathBuf::from(&self.mode_file)
    }

    pub fn temp_mode_file_path(&self) -> PathBuf {
        PathBuf::from(&self.temp_mode_file)
    }
}

fn rebase(path: &mut String, data_dir: &Path, default_name: &str) -> bool {
    let rebased = if path.trim().is_empty() {
        data_dir.join(default_name)
    } else if !Path::new(path.as_str()).is_absolute() {
        tracing::warn!("USB mode file path {} is relative, rebasing under data dir", path);
        data_dir.join(path.as_str())
    } else {
        return false;
    };
    *path = rebased.to_string_lossy().to_string();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fills_defaults() {
        let mut usb = UsbModeConfig::default();
        assert!(usb.normalize(Path::new("/mnt/data")));
        assert_eq!(usb.mode_file, "/mnt/data/mode.cfg");
        assert_eq!(usb.temp_mode_file, "/mnt/data/mode_tmp.cfg");

        // Already absolute, nothing to do
        assert!(!usb.normalize(Path::new("/other")));
        assert_eq!(usb.mode_file_path(), PathBuf::from("/mnt/data/mode.cfg"));
    }

    #[test]
    fn test_normalize_rebases_relative() {
        let mut usb = UsbModeConfig {
            mode_file: "gadget/mode.cfg".to_string(),
            temp_mode_file: "/run/mode_tmp.cfg".to_string(),
        };
        assert!(usb.normalize(Path::new("/data")));
        assert_eq!(usb.mode_file, "/data/gadget/mode.cfg");
        assert_eq!(usb.temp_mode_file, "/run/mode_tmp.cfg");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"web":{"http_port":9000}}"#).unwrap();
        assert_eq!(config.web.http_port, 9000);
        assert_eq!(config.web.bind_address, "0.0.0.0");
        assert!(config.usb.mode_file.is_empty());
    }
}
