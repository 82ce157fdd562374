//! The four relay phases: ingest, dispatch, await, relay.
pub mod ingest;
pub mod orchestrator;
pub mod poll;

pub use orchestrator::{ImageRelay, ProcessReport};
pub use poll::{AwaitState, PollPolicy};
