//! Wheel geometry: per-entry angular segments, the forward mapping from a chosen winner to a
//! final rotation, and its inverse from any rotation back to the entry under the pointer.
//!
//! Angles are degrees. Segment angles are measured clockwise on the wheel itself; the wheel is
//! rotated clockwise by `rotation` degrees and the pointer sits at a fixed screen angle.

use rand::Rng;

/// Degrees in a full turn.
pub const FULL_TURN: f64 = 360.0;
/// Largest jitter allowed around a segment center, as a fraction of the segment width.
pub const MAX_JITTER_RATIO: f64 = 0.2;

/// Bring any angle into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Static wheel parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelGeometry {
    /// Screen angle of the pointer.
    pub pointer_angle: f64,
    /// Full turns added to every spin before settling.
    pub min_rotations: u32,
    /// Jitter around the winner's center, as a fraction of its width. Capped at
    /// [`MAX_JITTER_RATIO`].
    pub jitter_ratio: f64,
}

impl Default for WheelGeometry {
    fn default() -> Self {
        Self {
            pointer_angle: 0.0,
            min_rotations: 5,
            jitter_ratio: MAX_JITTER_RATIO,
        }
    }
}

impl WheelGeometry {
    /// Same geometry with the jitter ratio brought into `[0, MAX_JITTER_RATIO]`.
    pub fn clamped(self) -> Self {
        Self {
            jitter_ratio: self.jitter_ratio.clamp(0.0, MAX_JITTER_RATIO),
            ..self
        }
    }
}

/// Angular layout of the wheel entries.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelLayout {
    ends: Vec<f64>,
}

impl WheelLayout {
    /// Lay out segments proportional to `weights`. `None` when nothing has weight.
    pub fn new(weights: &[u32]) -> Option<Self> {
        let total: f64 = weights.iter().map(|&w| f64::from(w)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut running = 0.0;
        let ends = weights
            .iter()
            .map(|&w| {
                running += f64::from(w) / total * FULL_TURN;
                running
            })
            .collect();
        Some(Self { ends })
    }

    /// Number of entries, zero-weight ones included.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// `(start, end)` of the segment at `index`.
    pub fn segment(&self, index: usize) -> Option<(f64, f64)> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0.0 } else { self.ends[index - 1] };
        Some((start, end))
    }

    /// Middle of the segment at `index`.
    pub fn center(&self, index: usize) -> Option<f64> {
        self.segment(index).map(|(start, end)| (start + end) / 2.0)
    }

    /// Entry whose segment contains `wheel_angle`. Segments are half-open, so the first
    /// matching segment wins on a boundary and zero-width entries are never returned.
    pub fn index_at(&self, wheel_angle: f64) -> usize {
        let angle = normalize_angle(wheel_angle);
        let index = self.ends.partition_point(|&end| end <= angle);
        index.min(self.ends.len().saturating_sub(1))
    }

    /// Entry under the pointer once the wheel is rotated by `rotation`.
    pub fn index_under_pointer(&self, geometry: &WheelGeometry, rotation: f64) -> usize {
        self.index_at(geometry.pointer_angle - rotation)
    }

    /// Final rotation that brings `winner` under the pointer.
    ///
    /// The wheel always turns forward from `current_rotation` by at least
    /// `min_rotations` full turns, and stops on the segment center plus a random offset of
    /// at most `jitter_ratio` of the segment width.
    pub fn target_rotation<R: Rng + ?Sized>(
        &self,
        geometry: &WheelGeometry,
        winner: usize,
        current_rotation: f64,
        rng: &mut R,
    ) -> Option<f64> {
        let (start, end) = self.segment(winner)?;
        let width = end - start;
        let ratio = geometry.jitter_ratio.clamp(0.0, MAX_JITTER_RATIO);
        let spread = width * ratio;
        let jitter = if spread > 0.0 {
            rng.random_range(-spread..=spread)
        } else {
            0.0
        };

        let landing = (start + end) / 2.0 + jitter;
        let settle = normalize_angle(geometry.pointer_angle - landing);
        let delta = normalize_angle(settle - current_rotation);
        Some(current_rotation + f64::from(geometry.min_rotations) * FULL_TURN + delta)
    }
}

/// Ease-out cubic used to interpolate a spin between its start and target rotations.
pub fn ease_out(progress: f64) -> f64 {
    let t = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Follows the entry under the pointer while the wheel turns. Each observation that lands on a
/// different entry than the previous one yields a single tick, however many segments were
/// skipped in between.
#[derive(Debug, Clone)]
pub struct TickTracker {
    layout: WheelLayout,
    geometry: WheelGeometry,
    current: Option<usize>,
}

impl TickTracker {
    pub fn new(layout: WheelLayout, geometry: WheelGeometry) -> Self {
        Self {
            layout,
            geometry,
            current: None,
        }
    }

    /// Record the latest rotation; returns the new index when it differs from the last one.
    pub fn observe(&mut self, rotation: f64) -> Option<usize> {
        let index = self.layout.index_under_pointer(&self.geometry, rotation);
        if self.current == Some(index) {
            return None;
        }
        self.current = Some(index);
        Some(index)
    }

    /// Last index seen.
    pub fn current(&self) -> Option<usize> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn normalize_wraps_both_directions() {
        assert_eq!(normalize_angle(370.0), 10.0);
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert!(normalize_angle(-1e-20) < FULL_TURN);
    }

    #[test]
    fn segments_follow_weights() {
        let layout = WheelLayout::new(&[50, 25, 25]).unwrap();
        assert_eq!(layout.segment(0), Some((0.0, 180.0)));
        assert_eq!(layout.segment(1), Some((180.0, 270.0)));
        assert_eq!(layout.center(2), Some(315.0));
        assert_eq!(layout.segment(3), None);
        assert!(WheelLayout::new(&[0, 0]).is_none());
    }

    #[test]
    fn boundaries_belong_to_the_next_segment_and_zero_width_is_skipped() {
        let layout = WheelLayout::new(&[50, 0, 50]).unwrap();
        assert_eq!(layout.index_at(0.0), 0);
        assert_eq!(layout.index_at(179.999), 0);
        assert_eq!(layout.index_at(180.0), 2);
        assert_eq!(layout.index_at(359.999), 2);
        assert_eq!(layout.index_at(360.0), 0);
    }

    #[test]
    fn target_rotation_round_trips_for_every_index() {
        let weights = [1, 7, 12, 30, 0, 50];
        let layout = WheelLayout::new(&weights).unwrap();
        let mut rng = StdRng::seed_from_u64(99);

        for pointer_angle in [0.0, 90.0, 270.0, 33.3] {
            let geometry = WheelGeometry {
                pointer_angle,
                ..WheelGeometry::default()
            };
            for current in [0.0, 123.4, -45.0, 3_600.5] {
                for (winner, &weight) in weights.iter().enumerate() {
                    if weight == 0 {
                        continue;
                    }
                    for _ in 0..50 {
                        let target = layout
                            .target_rotation(&geometry, winner, current, &mut rng)
                            .unwrap();
                        assert!(target >= current + 5.0 * FULL_TURN);
                        assert!(target < current + 6.0 * FULL_TURN);
                        assert_eq!(layout.index_under_pointer(&geometry, target), winner);
                    }
                }
            }
        }
    }

    #[test]
    fn jitter_stays_within_a_fifth_of_the_segment() {
        let layout = WheelLayout::new(&[40, 60]).unwrap();
        let geometry = WheelGeometry {
            min_rotations: 0,
            jitter_ratio: 0.9,
            ..WheelGeometry::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let (start, end) = layout.segment(1).unwrap();
        let width = end - start;
        for _ in 0..500 {
            let target = layout.target_rotation(&geometry, 1, 0.0, &mut rng).unwrap();
            let landing = normalize_angle(geometry.pointer_angle - target);
            let offset = (landing - layout.center(1).unwrap()).abs();
            assert!(offset <= width * MAX_JITTER_RATIO + 1e-9);
        }
    }

    #[test]
    fn tick_tracker_reports_each_new_segment_once() {
        let layout = WheelLayout::new(&[25, 25, 25, 25]).unwrap();
        let mut ticks = TickTracker::new(layout, WheelGeometry::default());
        // Pointer at 0: rotating clockwise brings lower wheel angles under it.
        assert_eq!(ticks.observe(0.0), Some(0));
        assert_eq!(ticks.observe(10.0), Some(3));
        assert_eq!(ticks.observe(20.0), None);
        assert_eq!(ticks.observe(100.0), Some(2));
        assert_eq!(ticks.current(), Some(2));
        // Sweeping past two segments between samples is still one tick.
        assert_eq!(ticks.observe(280.0), Some(0));
        assert_eq!(ticks.observe(280.0), None);
    }

    #[test]
    fn ease_out_is_monotonic_and_bounded() {
        let samples: Vec<f64> = (0..=10).map(|i| ease_out(f64::from(i) / 10.0)).collect();
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[10], 1.0);
        assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(ease_out(2.0), 1.0);
    }
}
