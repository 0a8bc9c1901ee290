use crate::types::{AnalysisKind, KindSet};
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-kind "should this analysis run at all" switches.
///
/// Shared between the dispatcher (read on every frame) and the result sink
/// (read when deciding whether to surface a late result).
#[derive(Debug, Default)]
pub struct FeatureFlags {
    enabled: [AtomicBool; AnalysisKind::COUNT],
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(kinds: impl IntoIterator<Item = AnalysisKind>) -> Self {
        let flags = Self::new();
        for kind in kinds {
            flags.set(kind, true);
        }
        flags
    }

    /// Returns the previous value.
    pub fn set(&self, kind: AnalysisKind, enabled: bool) -> bool {
        self.enabled[kind.index()].swap(enabled, Ordering::AcqRel)
    }

    pub fn is_enabled(&self, kind: AnalysisKind) -> bool {
        self.enabled[kind.index()].load(Ordering::Acquire)
    }

    pub fn enabled(&self) -> KindSet {
        AnalysisKind::all().filter(|k| self.is_enabled(*k)).collect()
    }

    /// True while any analysis is requested; the camera keeps preview
    /// callbacks flowing only in that state.
    pub fn any_enabled(&self) -> bool {
        AnalysisKind::all().any(|k| self.is_enabled(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_all_disabled() {
        let flags = FeatureFlags::new();
        assert!(!flags.any_enabled());
        assert!(flags.enabled().is_empty());
    }

    #[test]
    fn test_set_returns_previous() {
        let flags = FeatureFlags::new();
        assert!(!flags.set(AnalysisKind::Text, true));
        assert!(flags.set(AnalysisKind::Text, false));
        assert!(!flags.is_enabled(AnalysisKind::Text));
    }

    #[test]
    fn test_with_enabled() {
        let flags = FeatureFlags::with_enabled([AnalysisKind::Face, AnalysisKind::Pose]);
        assert!(flags.any_enabled());
        assert_eq!(flags.enabled().len(), 2);
        assert!(!flags.is_enabled(AnalysisKind::Label));
    }
}
