//! Single-flight execution core: pacing, admission control, and the bulk
//! operations built on them.

pub mod controller;
pub mod executor;
pub mod pacer;
pub mod spam;
pub mod tagging;

pub use controller::{Admission, Controller, RunId, RunTicket};
pub use executor::{BulkAction, RunContext, RunOutcome, RunReport, run_bulk};
pub use pacer::Pacer;
