//! Process-wide endpoint selection
//!
//! The selector owns the id of the endpoint used as the base for content
//! downloads. It is read once from the settings store at startup, written
//! through on every change and pushed to the downstream content client.
//! Nothing in here fails: unknown ids fall back to the default endpoint and
//! a failing store degrades to in-memory selection for the rest of the
//! process.

use crate::{
    catalog::EndpointCatalog,
    config::{ConfigStore, API_CDN_INDEX_KEY},
    error::AppError,
    logging::{ErrorEventLogger, Logger},
    models::{Endpoint, ProbeConfig},
    types::{EndpointId, DEFAULT_ENDPOINT_ID},
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};

/// Receiver of base endpoint changes, typically the content HTTP client
pub trait BaseEndpointSink: Send + Sync {
    fn set_base_endpoint(&self, id: EndpointId);
}

/// Observable selection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// Nothing selected or loaded yet; reads resolve to the default endpoint
    Unset,
    Selected(EndpointId),
}

// Outside the EndpointId range, so it can never collide with a real id
const UNSET: u64 = u64::MAX;

/// Owner of the selected endpoint id
pub struct EndpointSelector {
    catalog: Arc<EndpointCatalog>,
    current: AtomicU64,
    store: Option<Arc<dyn ConfigStore>>,
    persistence_available: AtomicBool,
    sink: Option<Arc<dyn BaseEndpointSink>>,
    // Serializes select so memory, store and sink agree on the last winner
    select_lock: Mutex<()>,
    logger: Logger,
    errors: ErrorEventLogger,
}

impl EndpointSelector {
    /// Create an in-memory selector with nothing selected
    pub fn new(catalog: Arc<EndpointCatalog>) -> Self {
        let logger = Logger::with_config("SELECT", &ProbeConfig::default());
        Self {
            catalog,
            current: AtomicU64::new(UNSET),
            store: None,
            persistence_available: AtomicBool::new(false),
            sink: None,
            select_lock: Mutex::new(()),
            errors: ErrorEventLogger::from_logger(logger.named("ERR")),
            logger,
        }
    }

    /// Route log output through `logger`
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.errors = ErrorEventLogger::from_logger(logger.named("ERR"));
        self.logger = logger;
        self
    }

    /// Load the persisted selection from `store` and write every later change back
    ///
    /// The store is read exactly once, here.
    pub fn with_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        let (id, readable) = match store.get_int(API_CDN_INDEX_KEY) {
            Ok(raw) => (self.resolve_persisted(raw), true),
            Err(error) => {
                self.errors.log_fallback(&error, "in-memory selection");
                (DEFAULT_ENDPOINT_ID, false)
            }
        };

        self.persistence_available.store(readable, Ordering::Release);
        self.store = Some(store);
        self.current.store(u64::from(id), Ordering::Release);
        self.notify(id);
        self
    }

    /// Push the active id to `sink` now and on every later selection
    pub fn with_sink(mut self, sink: Arc<dyn BaseEndpointSink>) -> Self {
        sink.set_base_endpoint(self.effective_id());
        self.sink = Some(sink);
        self
    }

    fn resolve_persisted(&self, raw: i64) -> EndpointId {
        match u32::try_from(raw) {
            Ok(id) if self.catalog.contains(id) => id,
            _ => {
                self.logger.warn(&format!("Persisted endpoint index {} is unknown; using the default endpoint", raw))
                    .field("persisted", raw)
                    .log();
                DEFAULT_ENDPOINT_ID
            }
        }
    }

    /// Select the endpoint with `id`
    ///
    /// Unknown ids select the default endpoint instead. Returns the endpoint
    /// that is now active. Concurrent calls are applied one at a time.
    pub fn select(&self, id: EndpointId) -> Endpoint {
        let endpoint = match self.catalog.get(id) {
            Ok(endpoint) => endpoint.clone(),
            Err(error) => {
                let fallback = self.catalog.default_endpoint();
                self.errors.log_fallback(&error, &fallback.name);
                fallback.clone()
            }
        };

        let guard = self.select_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = self.current.swap(u64::from(endpoint.id), Ordering::AcqRel);
        self.persist(endpoint.id);
        self.notify(endpoint.id);
        drop(guard);

        self.logger.info(&format!("Selected endpoint {} ({})", endpoint.name, endpoint.id))
            .field("endpoint_id", endpoint.id)
            .field("previous", if previous == UNSET { None } else { Some(previous) })
            .field("base_url", &endpoint.base_url)
            .log();

        endpoint
    }

    /// Select by short tag (`cf`, `gh`, `jd`); unknown tags select the default
    pub fn select_tag(&self, tag: &str) -> Endpoint {
        self.select(self.catalog.id_for_tag(tag))
    }

    /// The active endpoint
    ///
    /// The first read of an unset selector settles it on the default endpoint.
    pub fn current(&self) -> Endpoint {
        let id = match self.current.compare_exchange(
            UNSET,
            u64::from(DEFAULT_ENDPOINT_ID),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => DEFAULT_ENDPOINT_ID,
            Err(stored) => stored as EndpointId,
        };

        self.catalog
            .get(id)
            .unwrap_or_else(|_| self.catalog.default_endpoint())
            .clone()
    }

    /// Id of the active endpoint without settling an unset selector
    pub fn current_id(&self) -> EndpointId {
        self.effective_id()
    }

    pub fn state(&self) -> SelectorState {
        match self.current.load(Ordering::Acquire) {
            UNSET => SelectorState::Unset,
            id => SelectorState::Selected(id as EndpointId),
        }
    }

    /// Whether selections are still being written to the store
    pub fn is_persistent(&self) -> bool {
        self.store.is_some() && self.persistence_available.load(Ordering::Acquire)
    }

    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    fn effective_id(&self) -> EndpointId {
        match self.current.load(Ordering::Acquire) {
            UNSET => DEFAULT_ENDPOINT_ID,
            id => id as EndpointId,
        }
    }

    fn persist(&self, id: EndpointId) {
        let Some(store) = &self.store else {
            return;
        };
        if !self.persistence_available.load(Ordering::Acquire) {
            return;
        }

        if let Err(error) = store.set_int(API_CDN_INDEX_KEY, i64::from(id)) {
            // Only the first failure is reported
            if self.persistence_available.swap(false, Ordering::AcqRel) {
                let error = match error {
                    AppError::Persistence(_) => error,
                    other => AppError::persistence(other.to_string()),
                };
                self.errors.log_fallback(&error, "in-memory selection");
            }
        }
    }

    fn notify(&self, id: EndpointId) {
        if let Some(sink) = &self.sink {
            sink.set_base_endpoint(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use crate::error::Result;
    use crate::logging::LogLevel;
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        ids: Mutex<Vec<EndpointId>>,
    }

    impl BaseEndpointSink for RecordingSink {
        fn set_base_endpoint(&self, id: EndpointId) {
            self.ids.lock().unwrap().push(id);
        }
    }

    /// Store that can be switched to fail reads or writes
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryConfigStore,
        fail_reads: bool,
        fail_writes: AtomicBool,
        writes: Mutex<Vec<i64>>,
    }

    impl ConfigStore for FlakyStore {
        fn get_int(&self, key: &str) -> Result<i64> {
            if self.fail_reads {
                return Err(AppError::persistence("settings unreadable"));
            }
            self.inner.get_int(key)
        }

        fn set_int(&self, key: &str, value: i64) -> Result<()> {
            self.writes.lock().unwrap().push(value);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::persistence("disk full"));
            }
            self.inner.set_int(key, value)
        }
    }

    fn selector() -> EndpointSelector {
        EndpointSelector::new(Arc::new(EndpointCatalog::builtin()))
    }

    #[test]
    fn test_unset_settles_on_default() {
        let selector = selector();
        assert_eq!(selector.state(), SelectorState::Unset);
        assert_eq!(selector.current_id(), 0);
        assert_eq!(selector.state(), SelectorState::Unset);

        assert_eq!(selector.current().id, 0);
        assert_eq!(selector.state(), SelectorState::Selected(0));
    }

    #[test]
    fn test_select_then_current() {
        let selector = selector();
        for id in [1, 2, 0] {
            assert_eq!(selector.select(id).id, id);
            assert_eq!(selector.current().id, id);
            assert_eq!(selector.state(), SelectorState::Selected(id));
        }
    }

    #[test]
    fn test_select_unknown_falls_back_and_warns() {
        let (logger, buffer) = Logger::buffered("SELECT", LogLevel::Info);
        let selector = selector().with_logger(logger);
        selector.select(2);

        let endpoint = selector.select(3);
        assert_eq!(endpoint.id, 0);
        assert_eq!(selector.current().id, 0);

        let lines = buffer.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("W ERR") && l.contains("falling back to CloudFlare")));
    }

    #[test]
    fn test_select_tag() {
        let selector = selector();
        assert_eq!(selector.select_tag("jd").id, 2);
        assert_eq!(selector.select_tag("nope").id, 0);
    }

    #[test]
    fn test_persisted_selection_is_loaded_and_written_through() {
        let store = Arc::new(MemoryConfigStore::with_values([(API_CDN_INDEX_KEY, 2)]));
        let selector = selector().with_store(store.clone());

        assert_eq!(selector.state(), SelectorState::Selected(2));
        assert_eq!(selector.current().tag, "jd");
        assert!(selector.is_persistent());

        selector.select(1);
        assert_eq!(store.get_int(API_CDN_INDEX_KEY).unwrap(), 1);

        selector.select(9);
        assert_eq!(store.get_int(API_CDN_INDEX_KEY).unwrap(), 0);
    }

    #[test]
    fn test_unknown_persisted_value_uses_default() {
        for raw in [3, -1, i64::MAX] {
            let store = Arc::new(MemoryConfigStore::with_values([(API_CDN_INDEX_KEY, raw)]));
            let selector = selector().with_store(store);
            assert_eq!(selector.current().id, 0);
        }
    }

    #[test]
    fn test_unreadable_store_degrades_to_memory() {
        let store = Arc::new(FlakyStore { fail_reads: true, ..Default::default() });
        let selector = selector().with_store(store.clone());

        assert_eq!(selector.current().id, 0);
        assert_eq!(selector.select(1).id, 1);
        assert_eq!(selector.current().id, 1);
    }

    #[test]
    fn test_write_failure_disables_persistence() {
        let (logger, buffer) = Logger::buffered("SELECT", LogLevel::Warn);
        let store = Arc::new(FlakyStore::default());
        store.fail_writes.store(true, Ordering::SeqCst);
        let selector = selector().with_logger(logger).with_store(store.clone());

        assert_eq!(selector.select(1).id, 1);
        assert!(!selector.is_persistent());

        // No further write attempts once the store has failed
        store.fail_writes.store(false, Ordering::SeqCst);
        assert_eq!(selector.select(2).id, 2);
        assert_eq!(*store.writes.lock().unwrap(), vec![1]);
        assert_eq!(selector.current().id, 2);

        let warnings = buffer.lock().unwrap().iter().filter(|l| l.contains("disk full")).count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_sink_notified_on_attach_and_select() {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(MemoryConfigStore::with_values([(API_CDN_INDEX_KEY, 1)]));
        let selector = selector().with_store(store).with_sink(sink.clone());

        selector.select(2);
        selector.select(42);
        assert_eq!(*sink.ids.lock().unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn test_concurrent_selects_agree_everywhere() {
        let (logger, _buffer) = Logger::buffered("SELECT", LogLevel::Error);
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(MemoryConfigStore::new());
        let selector = selector()
            .with_logger(logger)
            .with_store(store.clone())
            .with_sink(sink.clone());

        for _ in 0..20 {
            std::thread::scope(|scope| {
                for id in 0..3u32 {
                    let selector = &selector;
                    scope.spawn(move || {
                        for _ in 0..50 {
                            selector.select(id);
                        }
                    });
                }
            });

            let current = selector.current().id;
            assert_eq!(store.get_int(API_CDN_INDEX_KEY).unwrap(), i64::from(current));
            assert_eq!(sink.ids.lock().unwrap().last().copied(), Some(current));
        }
    }

    proptest! {
        /// Any id selects a catalog endpoint and never panics
        #[test]
        fn select_any_id_yields_catalog_endpoint(id in any::<u32>()) {
            let selector = selector();
            let endpoint = selector.select(id);

            prop_assert!(selector.catalog().contains(endpoint.id));
            prop_assert_eq!(selector.current().id, endpoint.id);
            if selector.catalog().contains(id) {
                prop_assert_eq!(endpoint.id, id);
            } else {
                prop_assert_eq!(endpoint.id, 0);
            }
        }

        /// Any persisted value loads to a catalog endpoint
        #[test]
        fn load_any_persisted_value(raw in any::<i64>()) {
            let store = Arc::new(MemoryConfigStore::with_values([(API_CDN_INDEX_KEY, raw)]));
            let selector = selector().with_store(store);
            prop_assert!(selector.catalog().contains(selector.current().id));
        }
    }
}
