use std::sync::Arc;

use tracing::info;
use warta_core::config::StorageConfig;
use warta_core::{ArticleStorage, Error, Result};

pub mod backends;

pub use backends::*;

/// Opens the backend named in `config`.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ArticleStorage>> {
    match config.backend.to_lowercase().as_str() {
        "memory" => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SQLiteStorage::new_with_path(&config.path).await?)),
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Config(
            "SQLite storage requires building with the `sqlite` feature".into(),
        )),
        other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_storage;
}
