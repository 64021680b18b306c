//! Standard thread palette and nearest-color lookup.
//!
//! Formats that store thread indices rather than RGB values (PES, JEF,
//! PAT) map each pattern color to the closest entry here by Euclidean
//! distance in RGB. Ties go to the lower index.

use stitchwork_pipeline::ThreadColor;

/// The fixed thread palette, indexed by machine thread number.
pub const STANDARD_THREADS: [ThreadColor; 16] = [
    ThreadColor::new(0, 0, 0),
    ThreadColor::new(255, 255, 255),
    ThreadColor::new(255, 0, 0),
    ThreadColor::new(0, 255, 0),
    ThreadColor::new(0, 0, 255),
    ThreadColor::new(255, 255, 0),
    ThreadColor::new(255, 128, 0),
    ThreadColor::new(128, 0, 128),
    ThreadColor::new(255, 105, 180),
    ThreadColor::new(139, 69, 19),
    ThreadColor::new(128, 128, 128),
    ThreadColor::new(135, 206, 235),
    ThreadColor::new(0, 100, 0),
    ThreadColor::new(0, 0, 128),
    ThreadColor::new(255, 215, 0),
    ThreadColor::new(128, 0, 0),
];

fn distance_squared(a: ThreadColor, b: ThreadColor) -> u32 {
    let d = |p: u8, q: u8| u32::from(p.abs_diff(q)).pow(2);
    d(a.r, b.r) + d(a.g, b.g) + d(a.b, b.b)
}

/// Index of the palette thread closest to `color`.
#[must_use]
pub fn nearest_thread(color: ThreadColor) -> u8 {
    let mut best = (0u8, u32::MAX);
    for (i, &thread) in (0u8..).zip(STANDARD_THREADS.iter()) {
        let d = distance_squared(color, thread);
        if d < best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// Thread index for each color, in order.
#[must_use]
pub fn thread_table(colors: &[ThreadColor]) -> Vec<u8> {
    colors.iter().map(|&c| nearest_thread(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_colors_map_to_themselves() {
        for (i, &thread) in (0u8..).zip(STANDARD_THREADS.iter()) {
            assert_eq!(nearest_thread(thread), i);
        }
    }

    #[test]
    fn near_colors_snap() {
        assert_eq!(nearest_thread(ThreadColor::new(20, 10, 5)), 0);
        assert_eq!(nearest_thread(ThreadColor::new(230, 20, 10)), 2);
        assert_eq!(nearest_thread(ThreadColor::new(250, 250, 240)), 1);
    }

    #[test]
    fn table_follows_color_order() {
        let table = thread_table(&[ThreadColor::new(0, 0, 250), ThreadColor::BLACK]);
        assert_eq!(table, vec![4, 0]);
    }
}
