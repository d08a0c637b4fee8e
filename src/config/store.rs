use arc_swap::ArcSwap;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::AppConfig;
use crate::error::{AppError, Result};

/// Key under which the configuration JSON is stored
const CONFIG_KEY: &str = "app_config";

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "usb-netmode.db";

/// Configuration store backed by SQLite
///
/// Uses `ArcSwap` for lock-free reads; writes go to the database first and
/// then replace the cached copy.
#[derive(Clone)]
pub struct ConfigStore {
    pool: Pool<Sqlite>,
    cache: Arc<ArcSwap<AppConfig>>,
}

impl ConfigStore {
    /// Open the configuration database in `data_dir` and settle the mode
    /// record locations under it.
    ///
    /// Empty or relative record paths are rebased onto `data_dir`; the
    /// rebased paths are written back so the gadget scripts and later runs
    /// agree on where the records live.
    pub async fn open_in(data_dir: &Path) -> Result<Self> {
        let store = Self::new(&data_dir.join(DB_FILE_NAME)).await?;

        let mut config = (*store.get()).clone();
        if config.usb.normalize(data_dir) {
            tracing::info!(
                "USB mode records moved under {}: permanent={}, temporary={}",
                data_dir.display(),
                config.usb.mode_file,
                config.usb.temp_mode_file
            );
            store.set(config).await?;
        }

        Ok(store)
    }

    /// Open (or create) the configuration database
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            // Config is read once at startup and rarely written
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .connect(&db_url)
            .await?;

        Self::init_schema(&pool).await?;

        let config = Self::load_config(&pool).await?;
        let cache = Arc::new(ArcSwap::from_pointee(config));

        Ok(Self { pool, cache })
    }

    async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn load_config(pool: &Pool<Sqlite>) -> Result<AppConfig> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM config WHERE key = ?1")
            .bind(CONFIG_KEY)
            .fetch_optional(pool)
            .await?;

        match row {
            Some((json,)) => {
                serde_json::from_str(&json).map_err(|e| AppError::Config(e.to_string()))
            }
            None => {
                let config = AppConfig::default();
                Self::save_config_to_db(pool, &config).await?;
                Ok(config)
            }
        }
    }

    async fn save_config_to_db(pool: &Pool<Sqlite>, config: &AppConfig) -> Result<()> {
        let json = serde_json::to_string(config)?;

        sqlx::query(
            r#"
            INSERT INTO config (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
        )
        .bind(CONFIG_KEY)
        .bind(&json)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Get current configuration (lock-free)
    pub fn get(&self) -> Arc<AppConfig> {
        self.cache.load_full()
    }

    /// Replace the entire configuration
    pub async fn set(&self, config: AppConfig) -> Result<()> {
        Self::save_config_to_db(&self.pool, &config).await?;
        self.cache.store(Arc::new(config));
        Ok(())
    }
}
