pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use storage::{ArticleStorage, InsertSummary};
pub use types::{parse_day, start_of_day, Article, SearchQuery};

pub mod prelude {
    pub use super::{Article, ArticleStorage, Config, Error, Result, SearchQuery};
}
