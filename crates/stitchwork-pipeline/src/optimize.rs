//! Stitch sequence optimization for machine constraints.
//!
//! A single forward pass that:
//!
//! - drops a `Normal` stitch closer than [`MIN_DISTANCE`] to the previous
//!   kept stitch (the needle would hit the same hole),
//! - turns a `Normal` stitch farther than [`MAX_STITCH`] from the previous
//!   kept stitch into a `Jump`,
//! - inserts one `Stop` before the first stitch of every new thread color
//!   except the first.
//!
//! Both distances are machine limits in millimetres and are not tunable.

use tracing::debug;

use crate::pattern::{StitchKind, StitchPoint};

/// Normal stitches closer than this to their predecessor are dropped, mm.
pub const MIN_DISTANCE: f64 = 0.5;

/// Normal stitches longer than this become jumps, mm.
pub const MAX_STITCH: f64 = 12.1;

/// What the optimizer changed, kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Stitches dropped as too short.
    pub dropped: usize,
    /// Normal stitches converted to jumps.
    pub converted_to_jump: usize,
    /// Stop stitches inserted for color changes.
    pub stops_inserted: usize,
}

/// Optimize a stitch sequence.
///
/// The inserted `Stop` sits at the position of the stitch it precedes
/// and carries the new color.
#[must_use = "returns the optimized sequence"]
pub fn optimize(stitches: &[StitchPoint]) -> (Vec<StitchPoint>, OptimizeStats) {
    let mut out = Vec::with_capacity(stitches.len());
    let mut stats = OptimizeStats::default();
    let mut last: Option<StitchPoint> = None;
    let mut current_color = None;

    for &stitch in stitches {
        let mut stitch = stitch;
        if let Some(prev) = last {
            let distance = prev.point().distance(stitch.point());
            if stitch.kind == StitchKind::Normal {
                if distance < MIN_DISTANCE {
                    stats.dropped += 1;
                    continue;
                }
                if distance > MAX_STITCH {
                    stitch = stitch.with_kind(StitchKind::Jump);
                    stats.converted_to_jump += 1;
                }
            }
        }

        if current_color.is_some_and(|c| c != stitch.color) {
            out.push(stitch.with_kind(StitchKind::Stop));
            stats.stops_inserted += 1;
        }
        current_color = Some(stitch.color);

        out.push(stitch);
        last = Some(stitch);
    }

    debug!(
        input = stitches.len(),
        output = out.len(),
        dropped = stats.dropped,
        jumps = stats.converted_to_jump,
        stops = stats.stops_inserted,
        "optimized stitches"
    );
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreadColor;

    const RED: ThreadColor = ThreadColor::new(255, 0, 0);
    const BLUE: ThreadColor = ThreadColor::new(0, 0, 255);

    fn normal(x: f64, y: f64) -> StitchPoint {
        StitchPoint::new(x, y, StitchKind::Normal, RED)
    }

    fn kinds(stitches: &[StitchPoint]) -> Vec<StitchKind> {
        stitches.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn contract_constants() {
        assert!((MIN_DISTANCE - 0.5).abs() < f64::EPSILON);
        assert!((MAX_STITCH - 12.1).abs() < f64::EPSILON);
    }

    #[test]
    fn close_normal_is_dropped() {
        let (out, stats) = optimize(&[normal(0.0, 0.0), normal(0.3, 0.0), normal(1.0, 0.0)]);
        assert_eq!(out.len(), 2);
        assert!((out[1].x - 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn distance_measured_from_last_kept_stitch() {
        // 0.3 and 0.6 from origin: the second is 0.6 from the last kept.
        let (out, _) = optimize(&[normal(0.0, 0.0), normal(0.3, 0.0), normal(0.6, 0.0)]);
        assert_eq!(out.len(), 2);
        assert!((out[1].x - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn boundary_distances_are_kept_as_normal() {
        let (out, stats) = optimize(&[normal(0.0, 0.0), normal(0.5, 0.0), normal(12.6, 0.0)]);
        assert_eq!(kinds(&out), vec![StitchKind::Normal; 3]);
        assert_eq!(stats, OptimizeStats::default());
    }

    #[test]
    fn long_normal_becomes_jump() {
        let (out, stats) = optimize(&[normal(0.0, 0.0), normal(20.0, 0.0)]);
        assert_eq!(kinds(&out), vec![StitchKind::Normal, StitchKind::Jump]);
        assert_eq!(stats.converted_to_jump, 1);
    }

    #[test]
    fn jumps_are_never_dropped() {
        let jump = StitchPoint::new(0.1, 0.0, StitchKind::Jump, RED);
        let (out, _) = optimize(&[normal(0.0, 0.0), jump]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn color_change_inserts_single_stop() {
        let blue = StitchPoint::new(5.0, 5.0, StitchKind::Normal, BLUE);
        let (out, stats) = optimize(&[normal(0.0, 0.0), normal(1.0, 0.0), blue]);
        assert_eq!(
            kinds(&out),
            vec![
                StitchKind::Normal,
                StitchKind::Normal,
                StitchKind::Stop,
                StitchKind::Normal
            ]
        );
        assert_eq!(out[2].color, BLUE);
        assert_eq!(out[2].point(), blue.point());
        assert_eq!(stats.stops_inserted, 1);
    }

    #[test]
    fn first_color_needs_no_stop() {
        let (out, _) = optimize(&[StitchPoint::new(0.0, 0.0, StitchKind::Jump, BLUE)]);
        assert_eq!(kinds(&out), vec![StitchKind::Jump]);
    }

    #[test]
    fn dropped_stitch_does_not_trigger_color_change() {
        let blue_close = StitchPoint::new(0.1, 0.0, StitchKind::Normal, BLUE);
        let (out, stats) = optimize(&[normal(0.0, 0.0), blue_close, normal(2.0, 0.0)]);
        assert_eq!(stats.stops_inserted, 0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn consecutive_normals_respect_both_limits() {
        // Zig-zag with a mix of tiny, normal and huge steps.
        let input: Vec<_> = (0..200)
            .map(|i| {
                let x = f64::from(i) * [0.2, 1.0, 3.0, 15.0][i as usize % 4];
                normal(x, f64::from(i % 7))
            })
            .collect();
        let (out, _) = optimize(&input);
        for pair in out.windows(2) {
            if pair[0].kind == StitchKind::Normal && pair[1].kind == StitchKind::Normal {
                let d = pair[0].point().distance(pair[1].point());
                assert!((MIN_DISTANCE..=MAX_STITCH).contains(&d), "distance {d}");
            }
        }
    }

    #[test]
    fn every_color_transition_is_preceded_by_one_stop() {
        let input: Vec<_> = (0..30)
            .map(|i| {
                let color = if (i / 5) % 2 == 0 { RED } else { BLUE };
                StitchPoint::new(f64::from(i), 0.0, StitchKind::Normal, color)
            })
            .collect();
        let (out, stats) = optimize(&input);
        assert_eq!(stats.stops_inserted, 5);

        let mut previous_color = None;
        for (i, s) in out.iter().enumerate() {
            if s.kind == StitchKind::Stop {
                continue;
            }
            if previous_color.is_some_and(|c| c != s.color) {
                assert_eq!(out[i - 1].kind, StitchKind::Stop);
                assert_ne!(out[i - 2].kind, StitchKind::Stop);
            }
            previous_color = Some(s.color);
        }
    }
}
