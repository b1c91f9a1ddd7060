//! Pooled SQLite connection

use crate::config::AppConfig;
use di::{Ref, inject, injectable};
use log::{error, info};
use sqlx::SqlitePool;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::SqlitePoolOptions;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Pool handed out instead of the configured one while integration tests run.
static TEST_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);

pub struct DatabaseConnection {
    connection: SqlitePool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> DatabaseConnection {
        if let Some(pool) = Self::test_pool() {
            return DatabaseConnection { connection: pool };
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy(&config.database_url)
            .unwrap_or_else(|e| {
                error!("invalid DATABASE_URL {:?}: {e}", config.database_url);
                panic!("Cannot connect to database");
            });

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    /// Applies the bundled migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!().run(&self.connection).await?;
        info!("database migrations applied");
        Ok(())
    }

    /// Makes every `DatabaseConnection` created from now on share `pool`.
    pub fn set_test_pool(pool: SqlitePool) {
        if let Ok(mut slot) = TEST_POOL.lock() {
            *slot = Some(pool);
        }
    }

    pub fn clear_test_pool() {
        if let Ok(mut slot) = TEST_POOL.lock() {
            *slot = None;
        }
    }

    fn test_pool() -> Option<SqlitePool> {
        TEST_POOL.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
