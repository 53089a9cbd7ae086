use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::ledger::LedgerStore;
use crate::observability::Metrics;
use crate::recorder::Recorder;
use crate::registry::SourceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SourceRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<LedgerStore>,
    pub recorder: Arc<Recorder>,
    pub metrics: Arc<Metrics>,
    /// Active cache backend name, fixed at startup
    pub cache_backend: &'static str,
}
