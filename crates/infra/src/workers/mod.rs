//! Background workers driven by the event bus.

mod event_log;

pub use event_log::{EventLogWorker, WorkerHandle};
