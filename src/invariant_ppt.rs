//! Runtime invariant checks with contract-test support.
//!
//! Scheduling code asserts its invariants through [`assert_invariant!`];
//! every check is counted so tests can prove, via [`contract_test`], that a
//! code path actually exercised the invariants it claims to uphold.
//!
//! Each call site owns a static [`CheckSite`] counter. Checking is an atomic
//! increment with no allocation and no lock, so it is safe on the frame
//! callback thread. A site publishes itself into a fixed slot table the first
//! time it runs; the table is only scanned by [`times_checked`].
//!
//! ```rust,ignore
//! assert_invariant!(
//!     acquired,
//!     "Eligible gate is acquired on the same frame",
//!     "analysis::dispatcher"
//! );
//!
//! contract_test("dispatch", &["Eligible gate is acquired on the same frame"]);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

const MAX_SITES: usize = 64;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: OnceLock<&'static CheckSite> = OnceLock::new();

static SITES: [OnceLock<&'static CheckSite>; MAX_SITES] = [EMPTY_SLOT; MAX_SITES];
static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);

/// Check counter for one `assert_invariant!` call site.
#[derive(Debug)]
pub struct CheckSite {
    message: &'static str,
    checks: AtomicU64,
    published: AtomicBool,
}

impl CheckSite {
    pub const fn new(message: &'static str) -> Self {
        Self {
            message,
            checks: AtomicU64::new(0),
            published: AtomicBool::new(false),
        }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Acquire)
    }

    /// Count one check of this site, panicking when `condition` is false.
    pub fn check(&'static self, condition: bool, context: Option<&str>) {
        if !self.published.load(Ordering::Acquire) && !self.published.swap(true, Ordering::AcqRel) {
            self.publish();
        }
        self.checks.fetch_add(1, Ordering::AcqRel);

        if !condition {
            let ctx = context.unwrap_or("unknown");
            log::error!("invariant violated [{}]: {}", ctx, self.message);
            panic!("INVARIANT VIOLATION [{}]: {}", ctx, self.message);
        }
    }

    fn publish(&'static self) {
        let slot = NEXT_SLOT.fetch_add(1, Ordering::AcqRel);
        match SITES.get(slot) {
            // each slot index is handed out once, so `set` never contends
            Some(cell) => {
                let _ = cell.set(self);
            }
            None => log::warn!("invariant site table full; `{}` is not counted", self.message),
        }
    }
}

/// Assert an invariant and record that it was checked.
///
/// `$message` must be a constant string. Panics with the message and
/// context when the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {{
        static SITE: $crate::invariant_ppt::CheckSite = $crate::invariant_ppt::CheckSite::new($message);
        SITE.check($condition, None)
    }};
    ($condition:expr, $message:expr, $context:expr) => {{
        static SITE: $crate::invariant_ppt::CheckSite = $crate::invariant_ppt::CheckSite::new($message);
        SITE.check($condition, Some($context))
    }};
}

/// Number of times an invariant has been checked in this process, summed
/// over every site that asserts it.
pub fn times_checked(message: &str) -> u64 {
    SITES
        .iter()
        .filter_map(|slot| slot.get())
        .filter(|site| site.message == message)
        .map(|site| site.checks())
        .sum()
}

/// Panics unless every listed invariant has been checked at least once.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|inv| times_checked(inv) == 0)
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

/// Invariant messages shared between production checks and contract tests.
pub mod invariants {
    pub const GATE_ACQUIRED_AFTER_ELIGIBLE: &str = "Eligible gate is acquired on the same frame";
    pub const CAPTURE_POPPED_IN_ORDER: &str = "Capture requests are popped in submission order";
    pub const CAPTURE_RESOLVED_ONCE: &str = "Capture request is resolved exactly once";
    pub const RECORDING_RESOLVED_ONCE: &str = "Recording is resolved exactly once";
}
