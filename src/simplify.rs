//! Douglas–Peucker polyline simplification.
//!
//! Coordinates are treated as planar `(x, y)` pairs. For route geometries that
//! means raw `(lon, lat)` degrees with no geodesic correction, which is only
//! meaningful at the small tolerances used for rendering (0.001° ≈ 111 m).

/// Default tolerance in degrees.
pub const DEFAULT_EPSILON: f64 = 0.001;

/// Reduce `points` to the subset that stays within `epsilon` of the original.
///
/// Inputs with fewer than three points are returned unchanged. The first and
/// last points are always kept and the output is never longer than the input.
/// A point is kept only if it is strictly farther than `epsilon` from the
/// chord of the segment being examined.
pub fn simplify(points: &[(f64, f64)], epsilon: f64) -> Vec<(f64, f64)> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    // Segments still to examine, as inclusive index ranges.
    let mut stack = vec![(0, last)];
    while let Some((start, end)) = stack.pop() {
        if end - start < 2 {
            continue;
        }

        let mut d_max = 0.0;
        let mut i_max = start;
        for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
            let d = distance_to_chord(*point, points[start], points[end]);
            if d > d_max {
                d_max = d;
                i_max = i;
            }
        }

        if d_max > epsilon {
            keep[i_max] = true;
            stack.push((i_max, end));
            stack.push((start, i_max));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Distance from `point` to the segment `start..end`.
///
/// The projection is clamped to the segment, so points beyond either end are
/// measured to that endpoint. A zero-length chord degrades to the plain
/// Euclidean distance to `start`.
fn distance_to_chord(point: (f64, f64), start: (f64, f64), end: (f64, f64)) -> f64 {
    let (x0, y0) = point;
    let (x1, y1) = start;
    let (x2, y2) = end;

    let dx = x2 - x1;
    let dy = y2 - y1;
    if dx == 0.0 && dy == 0.0 {
        return (x0 - x1).hypot(y0 - y1);
    }

    let t = (((x0 - x1) * dx + (y0 - y1) * dy) / (dx * dx + dy * dy)).clamp(0.0, 1.0);
    let proj_x = x1 + t * dx;
    let proj_y = y1 + t * dy;
    (x0 - proj_x).hypot(y0 - proj_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward recursive formulation, used as an oracle.
    fn simplify_recursive(points: &[(f64, f64)], epsilon: f64) -> Vec<(f64, f64)> {
        if points.len() < 3 {
            return points.to_vec();
        }
        let last = points.len() - 1;
        let mut d_max = 0.0;
        let mut i_max = 0;
        for i in 1..last {
            let d = distance_to_chord(points[i], points[0], points[last]);
            if d > d_max {
                d_max = d;
                i_max = i;
            }
        }
        if d_max > epsilon {
            let mut left = simplify_recursive(&points[..=i_max], epsilon);
            let right = simplify_recursive(&points[i_max..], epsilon);
            left.pop();
            left.extend(right);
            left
        } else {
            vec![points[0], points[last]]
        }
    }

    /// Deterministic wiggly track, roughly the shape of a road geometry.
    fn wiggly_track(len: usize) -> Vec<(f64, f64)> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut x = -1.52;
        let mut y = 12.37;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let jitter = ((state >> 32) as f64 / u32::MAX as f64) - 0.5;
                x += 0.0007;
                y += jitter * 0.004;
                (x, y)
            })
            .collect()
    }

    #[test]
    fn test_short_inputs_unchanged() {
        assert!(simplify(&[], 0.001).is_empty());
        assert_eq!(simplify(&[(1.0, 2.0)], 0.001), vec![(1.0, 2.0)]);
        let pair = vec![(1.0, 2.0), (3.0, 4.0)];
        assert_eq!(simplify(&pair, 0.001), pair);
    }

    #[test]
    fn test_straight_line_collapses_to_endpoints() {
        let line: Vec<(f64, f64)> = (0..100).map(|i| (i as f64 * 0.01, i as f64 * 0.02)).collect();
        let simplified = simplify(&line, 1e-9);
        assert_eq!(simplified, vec![line[0], line[99]]);
    }

    #[test]
    fn test_keeps_significant_corner() {
        let points = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)];
        assert_eq!(simplify(&points, 0.1), points);
    }

    #[test]
    fn test_drops_point_within_tolerance() {
        let points = vec![(0.0, 0.0), (0.5, 0.0005), (1.0, 0.0)];
        assert_eq!(simplify(&points, 0.001), vec![(0.0, 0.0), (1.0, 0.0)]);
    }

    #[test]
    fn test_tiny_epsilon_keeps_everything() {
        let track = wiggly_track(200);
        let simplified = simplify(&track, 1e-12);
        assert_eq!(simplified, track);
    }

    #[test]
    fn test_output_bounded_and_endpoints_preserved() {
        let track = wiggly_track(500);
        for epsilon in [0.0001, 0.001, 0.01, 1.0] {
            let simplified = simplify(&track, epsilon);
            assert!(simplified.len() <= track.len());
            assert!(simplified.len() >= 2);
            assert_eq!(simplified.first(), track.first());
            assert_eq!(simplified.last(), track.last());
        }
    }

    #[test]
    fn test_larger_epsilon_never_keeps_more() {
        let track = wiggly_track(300);
        let fine = simplify(&track, 0.0005);
        let coarse = simplify(&track, 0.005);
        assert!(coarse.len() <= fine.len());
    }

    #[test]
    fn test_matches_recursive_formulation() {
        let track = wiggly_track(400);
        for epsilon in [0.0002, 0.001, 0.003] {
            assert_eq!(simplify(&track, epsilon), simplify_recursive(&track, epsilon));
        }
    }

    #[test]
    fn test_degenerate_chord_uses_endpoint_distance() {
        // Closed loop: first and last point coincide.
        let loop_points = vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.0, 0.0)];
        let simplified = simplify(&loop_points, 0.5);
        assert_eq!(simplified.first(), Some(&(0.0, 0.0)));
        assert_eq!(simplified.last(), Some(&(0.0, 0.0)));
        // (1,1) is sqrt(2) away from the degenerate chord and must survive.
        assert!(simplified.contains(&(1.0, 1.0)));
        assert!((distance_to_chord((3.0, 4.0), (0.0, 0.0), (0.0, 0.0)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_clamps_to_segment() {
        // Beyond the end of the chord the distance is measured to the endpoint.
        let d = distance_to_chord((2.0, 0.0), (0.0, 0.0), (1.0, 0.0));
        assert!((d - 1.0).abs() < 1e-12);
        let d = distance_to_chord((0.5, 0.3), (0.0, 0.0), (1.0, 0.0));
        assert!((d - 0.3).abs() < 1e-12);
    }
}
