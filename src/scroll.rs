//! Scroll arithmetic: step, half-page, and edge motions over a viewport,
//! clamped to the document extent.

/// A scroll command's motion, independent of any concrete page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    StepDown,
    StepUp,
    HalfDown,
    HalfUp,
    Top,
    Bottom,
}

/// New scroll offset after applying `motion`.
///
/// `step` is the configured line step; half-page motions derive from the
/// viewport height. The result never exceeds the last scrollable position.
pub fn apply(
    motion: Motion,
    offset: usize,
    viewport_height: usize,
    content_height: usize,
    step: usize,
) -> usize {
    let max = content_height.saturating_sub(viewport_height);
    let half = (viewport_height / 2).max(1);
    let next = match motion {
        Motion::StepDown => offset.saturating_add(step),
        Motion::StepUp => offset.saturating_sub(step),
        Motion::HalfDown => offset.saturating_add(half),
        Motion::HalfUp => offset.saturating_sub(half),
        Motion::Top => 0,
        Motion::Bottom => max,
    };
    next.min(max)
}
