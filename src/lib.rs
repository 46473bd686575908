#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod persistence;
pub mod runtime;

pub use cache::{CachedRequests, DurableStorage, FileStorage, MemoryStorage, SnapshotCache};
pub use config::Config;
pub use error::{AutosaveError, MemoriaError, Result, SaveError};
pub use history::HistoryStack;
pub use persistence::{
    AutosaveOptions, AutosaveScheduler, HttpSaver, RetryPolicy, SaveFn, SaveOperation,
    SaveOutcome, SaveSnapshot, SaveStatus, ServerAck,
};
pub use runtime::{ConnectivityEvent, NetworkMonitor, NetworkStatus, Notifier};
