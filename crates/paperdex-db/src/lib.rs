//! # paperdex-db
//!
//! PostgreSQL persistence layer for paperdex.
//!
//! This crate provides:
//! - Connection pool management
//! - The paper repository (lifecycle transitions, listings, search snapshot)
//! - The object storage backend (filesystem implementation)
//! - Per-id mutation serialization

pub mod locks;
pub mod papers;
pub mod pool;
pub mod storage;

pub use locks::MutationLocks;
pub use papers::{PgPaperRepository, TRASH_PAGE_SIZE};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use storage::{FilesystemBackend, StorageBackend};

// Re-export core types
pub use paperdex_core::*;

/// Combined database context.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Paper repository for lifecycle operations and search.
    pub papers: PgPaperRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool, storage
    /// backend, and path resolver.
    pub fn new(
        pool: sqlx::Pool<sqlx::Postgres>,
        storage: impl StorageBackend + 'static,
        resolver: PathResolver,
    ) -> Self {
        Self {
            papers: PgPaperRepository::new(pool.clone(), storage, resolver),
            pool,
        }
    }

    /// Connect to the given URL and build the repository with the given
    /// storage backend and resolver.
    pub async fn connect(
        url: &str,
        storage: impl StorageBackend + 'static,
        resolver: PathResolver,
    ) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool, storage, resolver))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
