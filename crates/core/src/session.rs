//! A user session: classify, convert, cache, record, download.
//!
//! [`Session`] ties the pipeline together. A successful conversion is cached
//! in both tiers and recorded in the history; a failed one leaves the cache
//! and the history untouched. [`SessionSnapshot`] is what survives a reload:
//! the session id and its history. Resuming from it gives access to the
//! session's own durable artifacts again, and never to anybody else's.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{open_durable_store, CacheEntry, DurableStore, ResultCache, SessionId};
use crate::classifier::{classify, Classification};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, DEFAULT_RESULT_TTL};
use crate::executor::{ConversionError, Executor};
use crate::history::{HistoryEntry, HistoryLedger};
use crate::job::{ConversionOptions, ConversionResult, Job, SourceFile};

/// Reasons a conversion request is refused or fails.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Neither the declared type nor the extension is known.
    #[error("Unrecognized file type: {name}")]
    Unrecognized { name: String },

    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// The target is not among the classifier's legal targets.
    #[error("{source_format} files cannot be converted to {target_format}")]
    TargetNotOffered {
        source_format: String,
        target_format: String,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// A download request could not be served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// The result expired, was cleared or belongs to another session.
    #[error("Result {id} is no longer available")]
    ExpiredOrMissing { id: String },
}

/// What survives a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    /// Newest first.
    pub history: Vec<HistoryEntry>,
}

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct Converted {
    pub result: ConversionResult,
    /// Whether the durable tier accepted the artifact.
    pub persisted: bool,
}

/// Builds a [`Session`].
pub struct SessionBuilder {
    executor: Arc<Executor>,
    session_id: Option<SessionId>,
    history: Vec<HistoryEntry>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    history_capacity: usize,
    max_upload_bytes: u64,
}

impl SessionBuilder {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            session_id: None,
            history: Vec::new(),
            durable: None,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_RESULT_TTL,
            history_capacity: 20,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }

    /// Limits and TTL from `config`; the durable tier is opened from it too.
    pub fn from_config(config: &Config, executor: Arc<Executor>) -> Self {
        Self::new(executor)
            .durable(open_durable_store(&config.cache))
            .ttl(config.cache.ttl())
            .history_capacity(config.history.capacity)
            .max_upload_bytes(config.limits.max_upload_bytes())
    }

    pub fn durable(mut self, store: Option<Arc<dyn DurableStore>>) -> Self {
        self.durable = store;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Continue the session captured in `snapshot`.
    pub fn resume(mut self, snapshot: SessionSnapshot) -> Self {
        self.session_id = Some(snapshot.session_id);
        self.history = snapshot.history;
        self
    }

    pub fn build(self) -> Session {
        let id = self.session_id.unwrap_or_else(SessionId::generate);
        let cache = Arc::new(ResultCache::new(
            id.clone(),
            self.durable,
            Arc::clone(&self.clock),
            self.ttl,
        ));
        let history = HistoryLedger::new(
            Arc::clone(&cache),
            Arc::clone(&self.clock),
            self.history_capacity,
        )
        .with_entries(self.history);

        debug!(session_id = %id, durable = cache.has_durable_tier(), "Session ready");
        Session {
            id,
            executor: self.executor,
            cache,
            history,
            clock: self.clock,
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// One user's conversion session.
pub struct Session {
    id: SessionId,
    executor: Arc<Executor>,
    cache: Arc<ResultCache>,
    history: HistoryLedger,
    clock: Arc<dyn Clock>,
    max_upload_bytes: u64,
}

impl Session {
    pub fn builder(executor: Arc<Executor>) -> SessionBuilder {
        SessionBuilder::new(executor)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Category, source format and legal targets of `file`.
    pub fn classify(&self, file: &SourceFile) -> Option<Classification> {
        classify(file)
    }

    /// Convert `file`, cache the result and record it in the history.
    pub async fn convert(
        &self,
        file: SourceFile,
        options: ConversionOptions,
    ) -> Result<Converted, SessionError> {
        let classification = classify(&file).ok_or_else(|| SessionError::Unrecognized {
            name: file.name.clone(),
        })?;
        if file.byte_size() > self.max_upload_bytes {
            return Err(SessionError::FileTooLarge {
                size: file.byte_size(),
                limit: self.max_upload_bytes,
            });
        }
        if !classification.offers(&options.target_format) {
            return Err(SessionError::TargetNotOffered {
                source_format: classification.source_format,
                target_format: options.target_format,
            });
        }

        let job = Job::new(file, &classification, options);
        let result = self.executor.execute(&job).await?;

        let now = self.clock.now();
        let persisted = self
            .cache
            .put(CacheEntry::from_result(&result, self.id.clone(), now))
            .await;
        self.history
            .append(HistoryEntry {
                at: now,
                input_name: job.source.name.clone(),
                target_format: job.target_format.clone(),
                output_name: result.output_name.clone(),
                details: result.details.clone(),
                cache_id: result.job_id.clone(),
                persisted,
            })
            .await;

        info!(
            session_id = %self.id,
            job_id = %job.id,
            output = %result.output_name,
            persisted,
            "Conversion recorded"
        );
        Ok(Converted { result, persisted })
    }

    /// Fetch a previous result by its cache id.
    pub async fn download(&self, cache_id: &str) -> Result<CacheEntry, DownloadError> {
        self.cache
            .get(cache_id)
            .await
            .ok_or_else(|| DownloadError::ExpiredOrMissing {
                id: cache_id.to_string(),
            })
    }

    /// Recent conversions, newest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.list().await
    }

    /// Clear the history and this session's cached artifacts.
    pub async fn clear_history(&self) -> usize {
        let removed = self.history.clear().await;
        info!(session_id = %self.id, removed, "History cleared");
        removed
    }

    /// Sweep expired durable entries.
    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired(self.cache.ttl()).await
    }

    /// State to hand to [`SessionBuilder::resume`] after a reload.
    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            history: self.history.list().await,
        }
    }
}
