pub mod cache;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod converter;
pub mod executor;
pub mod history;
pub mod job;
pub mod metrics;
pub mod session;
pub mod strategy;
pub mod testing;

pub use cache::{CacheEntry, CacheSweeper, DurableStore, ResultCache, SessionId, SqliteResultStore};
pub use classifier::{classify, Category, Classification};
pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DEFAULT_RESULT_TTL,
};
pub use executor::{ConversionError, ConverterSet, Executor};
pub use history::{HistoryEntry, HistoryLedger};
pub use job::{Artifact, ConversionOptions, ConversionResult, Job, SourceFile};
pub use session::{
    Converted, DownloadError, Session, SessionBuilder, SessionError, SessionSnapshot,
};
