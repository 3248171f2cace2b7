use crate::types::{CaptionIndex, RepeatState};

/// Outcome of resolving one time sample against the caption index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No segment at this time, or it is already the active one
    Unchanged,
    /// A new active index should be adopted and announced
    Changed(usize),
    /// The sample maps to `candidate`, but an active loop pins the display
    Pinned { candidate: usize, pinned: usize },
}

/// Decide the active caption for `time`.
///
/// Pure: the same inputs always give the same answer. While a loop is
/// active, samples that land outside the pinned segment are suppressed
/// rather than re-derived.
pub fn resolve_active(
    time: f64,
    index: &CaptionIndex,
    previous: Option<usize>,
    repeat: &RepeatState,
) -> Resolution {
    let candidate = match index.lookup(time) {
        Some(candidate) if Some(candidate) != previous => candidate,
        _ => return Resolution::Unchanged,
    };

    match repeat.segment_index {
        Some(pinned) if repeat.active && candidate != pinned => {
            Resolution::Pinned { candidate, pinned }
        }
        _ => Resolution::Changed(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaptionSegment;

    fn index() -> CaptionIndex {
        CaptionIndex::new(vec![
            CaptionSegment::new(0.0, 3.0).with_text("en", "Hi"),
            CaptionSegment::new(3.0, 2.0).with_text("en", "Bye"),
        ])
    }

    #[test]
    fn adopts_new_candidate_when_idle() {
        let idle = RepeatState::idle();
        assert_eq!(
            resolve_active(1.0, &index(), None, &idle),
            Resolution::Changed(0)
        );
        assert_eq!(
            resolve_active(3.5, &index(), Some(0), &idle),
            Resolution::Changed(1)
        );
    }

    #[test]
    fn same_or_missing_candidate_is_unchanged() {
        let idle = RepeatState::idle();
        assert_eq!(
            resolve_active(4.9, &index(), Some(1), &idle),
            Resolution::Unchanged
        );
        assert_eq!(
            resolve_active(7.0, &index(), Some(1), &idle),
            Resolution::Unchanged
        );
    }

    #[test]
    fn loop_pins_display_to_repeating_segment() {
        let looping = RepeatState::looping(0, index().get(0).cloned().unwrap());
        assert_eq!(
            resolve_active(1.0, &index(), Some(0), &looping),
            Resolution::Unchanged
        );
        assert_eq!(
            resolve_active(3.05, &index(), Some(0), &looping),
            Resolution::Pinned {
                candidate: 1,
                pinned: 0
            }
        );
        assert_eq!(
            resolve_active(1.0, &index(), Some(1), &looping),
            Resolution::Changed(0)
        );
    }

    #[test]
    fn repeated_calls_agree() {
        let looping = RepeatState::looping(1, index().get(1).cloned().unwrap());
        let first = resolve_active(2.0, &index(), Some(1), &looping);
        for _ in 0..5 {
            assert_eq!(resolve_active(2.0, &index(), Some(1), &looping), first);
        }
    }
}
