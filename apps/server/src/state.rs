//! Shared application state

use crate::{
    config::{Config, StoreBackend},
    db::{MemoryStore, PostgresStore, Store},
    services::{CourseService, EnrollmentManager, PersonService},
    Result,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub person_service: Arc<PersonService>,
    pub course_service: Arc<CourseService>,
}

impl AppState {
    /// Initialize the application state, connecting to the configured backend
    pub async fn new(config: Config) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let store: Arc<dyn Store> = match config.database.backend {
            StoreBackend::Postgres => {
                let pool = create_db_pool(&config).await?;

                if config.database.run_migrations {
                    tracing::info!("Running database migrations...");
                    sqlx::migrate!("./migrations")
                        .run(&pool)
                        .await
                        .map_err(|e| crate::Error::Internal(format!("Migration failed: {}", e)))?;
                }

                Arc::new(PostgresStore::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on shutdown");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    /// Build the state around an already constructed store
    pub fn with_store(config: Config, store: Arc<dyn Store>) -> Self {
        crate::metrics::register_metrics();

        let enrollments = EnrollmentManager::new(config.enrollment.referential_integrity);
        tracing::info!(
            referential_integrity = ?enrollments.mode(),
            "Enrollment manager configured"
        );

        Self {
            person_service: Arc::new(PersonService::new(store.clone(), enrollments)),
            course_service: Arc::new(CourseService::new(store.clone(), enrollments)),
            config: Arc::new(config),
            store,
        }
    }
}

async fn create_db_pool(config: &Config) -> Result<PgPool> {
    tracing::info!("Creating database connection pool...");

    let statement_timeout = config.database.statement_timeout_seconds;
    let lock_timeout = config.database.lock_timeout_seconds;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(config.database.pool_min_size)
        .max_connections(config.database.pool_max_size)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database.pool_timeout_seconds,
        ))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET statement_timeout = '{}s'", statement_timeout))
                    .execute(&mut *conn)
                    .await?;

                // Fail fast instead of queueing behind a long-held row lock
                sqlx::query(&format!("SET lock_timeout = '{}s'", lock_timeout))
                    .execute(&mut *conn)
                    .await?;

                Ok(())
            })
        })
        .connect(&config.database.url)
        .await
        .map_err(crate::Error::Database)?;

    tracing::info!(
        min = config.database.pool_min_size,
        max = config.database.pool_max_size,
        "Database pool created"
    );

    Ok(pool)
}
