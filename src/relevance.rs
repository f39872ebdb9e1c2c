//! Symbol relevance filtering
//!
//! Decides which routines are worth an entry probe. Linker plumbing (PLT
//! trampolines), runtime-private symbols and the process entry points are
//! noise for a call-occurrence log, everything else is traced.
//!
//! Rules, first match wins:
//! - Exact denylist: `main`, `_init`, `_start`, `.plt.got`
//! - PLT trampolines: names ending in `@plt`
//! - Internal symbols: names starting with `__`

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Entry points and pseudo-symbols that are never traced
pub const DENYLIST: [&str; 4] = ["main", "_init", "_start", ".plt.got"];

/// Suffix the linker gives Procedure Linkage Table stubs
pub const PLT_SUFFIX: &str = "@plt";

/// Conventional marker for runtime-private symbols
pub const INTERNAL_PREFIX: &str = "__";

static DENIED: LazyLock<HashSet<&'static str>> = LazyLock::new(|| DENYLIST.into_iter().collect());

/// Why a symbol was excluded from tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Exact match against [`DENYLIST`]
    Denylisted,
    /// Ends with [`PLT_SUFFIX`]
    PltStub,
    /// Starts with [`INTERNAL_PREFIX`]
    Internal,
}

impl Exclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exclusion::Denylisted => "denylisted",
            Exclusion::PltStub => "plt-stub",
            Exclusion::Internal => "internal",
        }
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return the first exclusion rule matching `name`, or `None` if it should be traced
pub fn classify(name: &str) -> Option<Exclusion> {
    if DENIED.contains(name) {
        return Some(Exclusion::Denylisted);
    }

    if name.ends_with(PLT_SUFFIX) {
        return Some(Exclusion::PltStub);
    }

    if name.starts_with(INTERNAL_PREFIX) {
        return Some(Exclusion::Internal);
    }

    None
}

/// Check if a symbol should get an entry probe
///
/// Total over all inputs: empty or garbage names are simply relevant.
pub fn is_relevant(name: &str) -> bool {
    classify(name).is_none()
}
