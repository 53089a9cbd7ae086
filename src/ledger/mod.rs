/// Fjall-based persistence layer for request logs, health checks, and stats
///
/// This module provides durable storage behind the dispatcher's observers.
/// It uses Fjall (an embedded LSM key-value store) to persist:
///
/// - Request records (one per completed dispatch)
/// - Health checks (one per upstream attempt)
/// - Per-source aggregate statistics
///
/// The dispatcher writes through the recorder as a fire-and-forget observer;
/// a ledger failure is logged and never fails the dispatch itself.
pub mod error;
pub mod partitions;
pub mod records;
pub mod store;

pub use error::{LedgerError, Result};
pub use records::{HealthCheckRecord, RequestRecord, SourceStats};
pub use store::{LedgerStore, StoreCounts};
