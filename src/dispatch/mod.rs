//! Request dispatch: fallback engine, admission control, transport contract

mod engine;
mod limits;
mod transport;
mod types;

pub use engine::Dispatcher;
pub use limits::AdmissionControl;
pub use transport::{Fetched, HttpConfig, HttpTransport, Transport};
pub use types::{
    ApiAttempt, ApiRequest, AttemptError, CacheStatus, DispatchError, EnhancedResponse,
    RequestContext, ResponseMetadata,
};
