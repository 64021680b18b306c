//! Relative stitch records with per-format range splitting.
//!
//! Every format stores moves as deltas from the previous needle position,
//! starting at the origin. A delta wider than the record range is split
//! into `n = max(ceil(|dx| / limit), ceil(|dy| / limit))` steps. Step `i`
//! moves `round(d * (i + 1) / n) - round(d * i / n)`, so the steps are as
//! even as integer units allow and always sum to the original delta. All
//! but the last step are jumps; the last keeps the stitch's own kind.

use stitchwork_pipeline::StitchKind;

use crate::normalize::MachineStitch;

/// One encoded record before byte packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Horizontal move from the previous needle position, within the limit.
    pub dx: i32,
    /// Vertical move from the previous needle position, within the limit.
    pub dy: i32,
    /// `Jump` for intermediate steps of a split move, else the stitch's kind.
    pub kind: StitchKind,
    /// Color index of the stitch this step belongs to.
    pub color: usize,
}

/// How a format's command records relate to movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMotion {
    /// Stop and end records carry a delta like any other record.
    Carried,
    /// Stop and end records have no delta field. Their movement is
    /// emitted as jumps first and the command itself moves by zero.
    Separate,
}

/// Split `(dx, dy)` into steps that each fit within `±limit`.
///
/// A zero delta yields a single zero step.
#[allow(clippy::cast_possible_truncation)]
pub fn split(dx: i32, dy: i32, limit: i32) -> Vec<(i32, i32)> {
    let limit = limit.unsigned_abs().max(1);
    let n = dx
        .unsigned_abs()
        .div_ceil(limit)
        .max(dy.unsigned_abs().div_ceil(limit))
        .max(1);
    let at = |d: i32, i: u32| (f64::from(d) * f64::from(i) / f64::from(n)).round() as i32;
    (0..n)
        .map(|i| (at(dx, i + 1) - at(dx, i), at(dy, i + 1) - at(dy, i)))
        .collect()
}

/// Turn absolute machine stitches into range-limited relative steps.
#[must_use]
pub fn steps(stitches: &[MachineStitch], limit: i32, motion: CommandMotion) -> Vec<Step> {
    let mut out = Vec::with_capacity(stitches.len());
    let (mut x, mut y) = (0, 0);

    for s in stitches {
        let (dx, dy) = (s.x - x, s.y - y);
        let command = matches!(s.kind, StitchKind::Stop | StitchKind::End);

        if command && motion == CommandMotion::Separate {
            if (dx, dy) != (0, 0) {
                out.extend(split(dx, dy, limit).into_iter().map(|(dx, dy)| Step {
                    dx,
                    dy,
                    kind: StitchKind::Jump,
                    color: s.color,
                }));
            }
            out.push(Step {
                dx: 0,
                dy: 0,
                kind: s.kind,
                color: s.color,
            });
        } else {
            let parts = split(dx, dy, limit);
            let last = parts.len() - 1;
            out.extend(parts.into_iter().enumerate().map(|(i, (dx, dy))| Step {
                dx,
                dy,
                kind: if i == last { s.kind } else { StitchKind::Jump },
                color: s.color,
            }));
        }

        (x, y) = (s.x, s.y);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stitch(x: i32, y: i32, kind: StitchKind) -> MachineStitch {
        MachineStitch {
            x,
            y,
            kind,
            color: 0,
        }
    }

    fn sum(steps: &[Step]) -> (i32, i32) {
        steps
            .iter()
            .fold((0, 0), |(x, y), s| (x + s.dx, y + s.dy))
    }

    #[test]
    fn small_delta_is_one_step() {
        assert_eq!(split(121, -121, 121), vec![(121, -121)]);
        assert_eq!(split(0, 0, 121), vec![(0, 0)]);
    }

    #[test]
    fn wide_delta_splits_evenly() {
        assert_eq!(split(200, 0, 121), vec![(100, 0), (100, 0)]);
        assert_eq!(split(-250, 10, 121), vec![(-83, 3), (-84, 4), (-83, 3)]);
    }

    #[test]
    fn split_sums_exactly() {
        for d in [122, 243, 250, 363, 1000, -999, 4097] {
            let parts = split(d, d / 3, 121);
            let (x, y): (i32, i32) = parts
                .iter()
                .fold((0, 0), |(x, y), &(dx, dy)| (x + dx, y + dy));
            assert_eq!((x, y), (d, d / 3));
            assert!(parts.iter().all(|&(dx, dy)| dx.abs() <= 121 && dy.abs() <= 121));
        }
    }

    #[test]
    fn steps_start_from_origin() {
        let s = steps(
            &[stitch(10, 5, StitchKind::Jump), stitch(12, 4, StitchKind::Normal)],
            127,
            CommandMotion::Carried,
        );
        assert_eq!((s[0].dx, s[0].dy), (10, 5));
        assert_eq!((s[1].dx, s[1].dy), (2, -1));
    }

    #[test]
    fn intermediate_steps_are_jumps() {
        let s = steps(
            &[stitch(0, 0, StitchKind::Normal), stitch(200, 0, StitchKind::Normal)],
            121,
            CommandMotion::Carried,
        );
        let kinds: Vec<_> = s.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StitchKind::Normal, StitchKind::Jump, StitchKind::Normal]
        );
        assert_eq!(sum(&s), (200, 0));
    }

    #[test]
    fn separate_commands_move_by_jump() {
        let s = steps(
            &[stitch(0, 0, StitchKind::Normal), stitch(30, 40, StitchKind::Stop)],
            127,
            CommandMotion::Separate,
        );
        assert_eq!(s.len(), 3);
        assert_eq!((s[1].kind, s[1].dx, s[1].dy), (StitchKind::Jump, 30, 40));
        assert_eq!((s[2].kind, s[2].dx, s[2].dy), (StitchKind::Stop, 0, 0));
    }

    #[test]
    fn motionless_separate_command_emits_no_jump() {
        let s = steps(
            &[stitch(5, 5, StitchKind::Normal), stitch(5, 5, StitchKind::Stop)],
            127,
            CommandMotion::Separate,
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s[1].kind, StitchKind::Stop);
    }

    #[test]
    fn carried_commands_keep_their_delta() {
        let s = steps(
            &[stitch(30, 40, StitchKind::Stop)],
            127,
            CommandMotion::Carried,
        );
        assert_eq!(s, vec![Step {
            dx: 30,
            dy: 40,
            kind: StitchKind::Stop,
            color: 0
        }]);
    }
}
