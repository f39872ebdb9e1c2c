//! Function tracer tool
//!
//! Glues the relevance filter, the call ledger and the call log behind
//! [`InstrumentationHooks`]:
//!
//! - image load: relevant routines get a probe (and a `Function` line)
//! - function entry: the first entry per (image, function) gets a `Called` line
//! - fork: always followed; pending lines are flushed before the fork and the
//!   child writes to its own `<prefix>_<pid>.log`
//! - exit: the log is flushed
//!
//! Entry events are not re-filtered. Probes only exist for routines that
//! passed the filter at image load.

use anyhow::{Context, Result};
use std::sync::{Arc, PoisonError, RwLock};

use crate::call_log::{CallLog, LogRecord};
use crate::config::TracerConfig;
use crate::host::{ForkDecision, InstrumentationHooks};
use crate::ledger::CallLedger;
use crate::relevance;

#[derive(Debug)]
pub struct FuncTracer {
    config: TracerConfig,
    ledger: Arc<CallLedger>,
    log: RwLock<CallLog>,
}

impl FuncTracer {
    /// Build a tracer around an existing ledger and log sink
    pub fn new(config: TracerConfig, ledger: Arc<CallLedger>, log: CallLog) -> Self {
        Self {
            config,
            ledger,
            log: RwLock::new(log),
        }
    }

    /// Build a tracer for process `pid`, logging to `<log_dir>/<prefix>_<pid>.log`
    pub fn for_process(config: TracerConfig, pid: u32) -> Result<Self> {
        config.validate()?;
        let log = CallLog::open(&config.log_dir, &config.log_prefix, pid)
            .with_context(|| format!("Failed to open call log for PID {}", pid))?;
        tracing::info!(
            "[callsift: tracing PID {} into {}]",
            pid,
            config.log_dir.display()
        );
        Ok(Self::new(config, Arc::new(CallLedger::new()), log))
    }

    pub fn ledger(&self) -> &Arc<CallLedger> {
        &self.ledger
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    fn write(&self, record: &LogRecord) {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        // A failing sink must never take the traced program down with it
        if let Err(e) = log.write(record) {
            tracing::warn!("failed to write call log record {}: {}", record, e);
        }
    }
}

impl InstrumentationHooks for FuncTracer {
    fn on_symbol_discovered(&self, image: &str, symbol: &str) -> bool {
        if let Some(reason) = relevance::classify(symbol) {
            tracing::trace!("skipping {} in {} ({})", symbol, image, reason);
            return false;
        }

        if self.config.log_definitions {
            self.write(&LogRecord::definition(image, symbol));
        }
        true
    }

    fn on_function_entered(&self, image: &str, symbol: &str) {
        if self.ledger.record_and_check(image, symbol) {
            self.write(&LogRecord::call(image, symbol));
        }
    }

    fn on_fork_requested(&self, child_pid: u32) -> ForkDecision {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = log.flush() {
            tracing::warn!("failed to flush call log before fork: {}", e);
        }
        tracing::debug!("following fork into child {}", child_pid);
        ForkDecision::Follow
    }

    fn on_fork_child(&self, child_pid: u32) -> Result<()> {
        let mut log = self.log.write().unwrap_or_else(PoisonError::into_inner);
        if log.path().is_none() {
            // Writer-backed sinks are shared with the parent
            return Ok(());
        }

        let child_log = CallLog::open(&self.config.log_dir, &self.config.log_prefix, child_pid)
            .with_context(|| format!("Failed to open call log for child PID {}", child_pid))?;
        // Lines buffered at fork time are the parent's to write
        std::mem::replace(&mut *log, child_log).abandon();
        Ok(())
    }

    fn on_exit(&self, exit_code: i32) -> Result<()> {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        log.flush().context("Failed to flush call log")?;
        tracing::info!(
            "[callsift: process exited with {}, {} distinct functions called]",
            exit_code,
            self.ledger.len()
        );
        Ok(())
    }
}
