//! proxywarden/src/state.rs
//! Global singletons that are genuinely process-wide rather than owned by one
//! `ControlSurface` instance. Per-run state (the registry, the pool, the
//! rotation handle) lives on `ControlSurface` instead of here — this module
//! only keeps what has no natural owner: the logging reload handle, following
//! the teacher's own `state.rs` `lazy_static!` pattern for the same field.

use lazy_static::lazy_static;
use tracing_subscriber::{filter::EnvFilter, reload::Handle as ReloadHandle};

lazy_static! {
    pub static ref RELOAD_HANDLE: std::sync::Mutex<Option<ReloadHandle<EnvFilter, tracing_subscriber::Registry>>> =
        std::sync::Mutex::new(None);
}
