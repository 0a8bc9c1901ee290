//! Single-slot admission gates, one per analysis kind.

use crate::types::{AnalysisKind, KindSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Busy/free flag for one analysis kind.
///
/// Acquire is a non-blocking compare-and-swap; release is a plain store.
/// There is no waiter queue: a caller that loses the race simply skips.
#[derive(Debug, Default)]
pub struct TaskGate {
    busy: AtomicBool,
}

impl TaskGate {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Flip Free -> Busy. Returns false, with no side effect, when already busy.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Flip to Free. Releasing a free gate is a no-op; returns whether it was busy.
    pub fn release(&self) -> bool {
        self.busy.swap(false, Ordering::AcqRel)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// All gates, indexed by [`AnalysisKind::index`].
#[derive(Debug, Default)]
pub struct GateTable {
    gates: [TaskGate; AnalysisKind::COUNT],
}

impl GateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self, kind: AnalysisKind) -> &TaskGate {
        &self.gates[kind.index()]
    }

    pub fn is_free(&self, kind: AnalysisKind) -> bool {
        !self.gate(kind).is_busy()
    }

    pub fn try_acquire(&self, kind: AnalysisKind) -> bool {
        self.gate(kind).try_acquire()
    }

    pub fn release(&self, kind: AnalysisKind) -> bool {
        self.gate(kind).release()
    }

    /// Acquire and wrap the busy period in a guard that releases on drop.
    pub fn acquire_permit(self: &Arc<Self>, kind: AnalysisKind) -> Option<GatePermit> {
        self.try_acquire(kind).then(|| GatePermit {
            gates: Arc::clone(self),
            kind,
        })
    }

    pub fn busy_kinds(&self) -> KindSet {
        AnalysisKind::all().filter(|k| !self.is_free(*k)).collect()
    }
}

/// Proof that a kind's gate is held. Dropping it releases the gate, so every
/// exit path of a task (return, error, unwind) frees the kind exactly once.
#[derive(Debug)]
pub struct GatePermit {
    gates: Arc<GateTable>,
    kind: AnalysisKind,
}

impl GatePermit {
    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        if !self.gates.release(self.kind) {
            log::warn!("{} gate was already free when its task finished", self.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_is_exclusive() {
        let gate = TaskGate::new();
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        assert!(gate.is_busy());
        assert!(gate.release());
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_release_is_idempotent() {
        let gate = TaskGate::new();
        assert!(!gate.release());
        assert!(!gate.release());
        assert!(!gate.is_busy());
    }

    #[test]
    fn test_kinds_are_independent() {
        let table = GateTable::new();
        assert!(table.try_acquire(AnalysisKind::Face));
        assert!(table.is_free(AnalysisKind::Text));
        assert!(table.try_acquire(AnalysisKind::Text));
        let busy = table.busy_kinds();
        assert!(busy.contains(AnalysisKind::Face));
        assert!(busy.contains(AnalysisKind::Text));
        assert_eq!(busy.len(), 2);
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let table = Arc::new(GateTable::new());
        let permit = table.acquire_permit(AnalysisKind::Pose).expect("free gate");
        assert!(table.acquire_permit(AnalysisKind::Pose).is_none());
        drop(permit);
        assert!(table.is_free(AnalysisKind::Pose));
    }

    #[test]
    fn test_permit_releases_on_unwind() {
        let table = Arc::new(GateTable::new());
        let t = Arc::clone(&table);
        let result = std::panic::catch_unwind(move || {
            let _permit = t.acquire_permit(AnalysisKind::Label).expect("free gate");
            panic!("detector blew up");
        });
        assert!(result.is_err());
        assert!(table.is_free(AnalysisKind::Label));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let table = Arc::new(GateTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&table);
                std::thread::spawn(move || t.try_acquire(AnalysisKind::Object))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
