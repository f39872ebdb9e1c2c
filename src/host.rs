//! Callback seam between an instrumentation framework and the tracer
//!
//! A thin adapter for whatever binary instrumentation runtime is available
//! (image-load hooks, entry probes, fork hooks) translates that runtime's
//! callbacks into calls on [`InstrumentationHooks`]. Nothing here assumes a
//! particular host API.

use anyhow::Result;

/// What to do with a child process created by `fork`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkDecision {
    /// Keep instrumenting the child exactly like the parent
    Follow,
    /// Let the child run uninstrumented
    Detach,
}

/// Hooks an instrumentation host drives
///
/// Implementations are shared by every thread of the traced process, so all
/// hooks take `&self`.
pub trait InstrumentationHooks: Send + Sync {
    /// A routine was found while loading `image`. Return `true` to have the
    /// host insert an entry probe for it.
    fn on_symbol_discovered(&self, image: &str, symbol: &str) -> bool;

    /// An entry probe fired on the calling thread.
    fn on_function_entered(&self, image: &str, symbol: &str);

    /// The traced process is about to fork.
    fn on_fork_requested(&self, child_pid: u32) -> ForkDecision;

    /// Runs in a followed child right after the fork.
    fn on_fork_child(&self, child_pid: u32) -> Result<()>;

    /// The traced process is exiting; release the output sink.
    fn on_exit(&self, exit_code: i32) -> Result<()>;
}

/// Image-load step as a host would run it: offer each routine to the hooks
/// and return the ones that should be probed.
pub fn instrument_image<'a, H, I>(hooks: &H, image: &str, routines: I) -> Vec<&'a str>
where
    H: InstrumentationHooks + ?Sized,
    I: IntoIterator<Item = &'a str>,
{
    routines
        .into_iter()
        .filter(|symbol| hooks.on_symbol_discovered(image, symbol))
        .collect()
}
