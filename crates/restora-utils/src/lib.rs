//! Process plumbing shared by `restora-server` and `restora-gateway`.

pub mod logging;
pub mod shutdown;
pub mod trace;

pub use logging::init_tracing;
pub use shutdown::shutdown_signal;
pub use trace::{trace_middleware, X_TRACE_ID};
