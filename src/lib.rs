//! callsift - first-call function tracing core
//!
//! The pieces an instrumentation tool needs to log each user-level function
//! of each loaded image the first time it runs:
//!
//! - [`relevance`]: which symbols deserve an entry probe
//! - [`ledger`]: concurrent "seen this (image, function) before?" store
//! - [`host`]: the callback seam an instrumentation framework adapter drives
//! - [`tool`]: the hooks implementation writing the [`call_log`]
//! - [`report`]: coverage reports built from call logs

pub mod call_log;
pub mod cli;
pub mod config;
pub mod host;
pub mod ledger;
pub mod relevance;
pub mod report;
pub mod tool;

pub use ledger::{CallKey, CallLedger};
pub use relevance::is_relevant;
