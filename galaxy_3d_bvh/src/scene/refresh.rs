/// Refresh policies and bounds providers.
///
/// The tree never notices on its own that an object moved: the host decides
/// when a payload must be re-added. A `RefreshPolicy` makes that decision
/// from the box the payload was indexed with and its current box, and a
/// `BoundsProvider` tells the manager where each payload is this cycle.

use glam::Vec3;
use crate::math::AABB;

/// Decides whether a payload's change in bounds warrants re-insertion.
pub trait RefreshPolicy {
    /// `indexed` is the raw box the payload was last inserted with.
    fn needs_reinsert(&self, indexed: &AABB, current: &AABB) -> bool;
}

/// Hysteresis band around the indexed box.
///
/// Two boxes share the indexed center: a broad one (size × `scale_factor`)
/// and a narrow one (size ÷ `scale_factor`). Small jitter stays between the
/// two and costs nothing. A payload is re-inserted once either corner of
/// its current box leaves the broad box (grew or moved) or enters the
/// narrow box (shrank).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisPolicy {
    /// Band width, must be > 1.0 to have any effect
    pub scale_factor: f32,
}

impl Default for HysteresisPolicy {
    fn default() -> Self {
        Self { scale_factor: 1.01 }
    }
}

impl HysteresisPolicy {
    pub fn new(scale_factor: f32) -> Self {
        Self { scale_factor }
    }

    /// Broad box around `indexed`
    pub fn broad(&self, indexed: &AABB) -> AABB {
        indexed.scaled(self.scale_factor)
    }

    /// Narrow box inside `indexed`
    pub fn narrow(&self, indexed: &AABB) -> AABB {
        indexed.scaled(self.scale_factor.recip())
    }
}

impl RefreshPolicy for HysteresisPolicy {
    fn needs_reinsert(&self, indexed: &AABB, current: &AABB) -> bool {
        let indexed = indexed.normalized();
        let current = current.normalized();
        let broad = self.broad(&indexed);
        let narrow = self.narrow(&indexed);

        !broad.contains_point(current.min)
            || !broad.contains_point(current.max)
            || strictly_inside(&narrow, current.min)
            || strictly_inside(&narrow, current.max)
    }
}

// Strict, so a degenerate (zero-size) box does not trigger on every check
fn strictly_inside(aabb: &AABB, point: Vec3) -> bool {
    point.cmpgt(aabb.min).all() && point.cmplt(aabb.max).all()
}

/// Re-insert whenever the box changed at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysReinsert;

impl RefreshPolicy for AlwaysReinsert {
    fn needs_reinsert(&self, indexed: &AABB, current: &AABB) -> bool {
        indexed != current
    }
}

/// Supplies the current world-space box of a payload.
///
/// Returns None for a payload that no longer exists or should not be
/// indexed this cycle (hidden, disabled).
pub trait BoundsProvider<P> {
    fn bounds(&self, payload: P) -> Option<AABB>;
}

impl<P, F> BoundsProvider<P> for F
where
    F: Fn(P) -> Option<AABB>,
{
    fn bounds(&self, payload: P) -> Option<AABB> {
        self(payload)
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
