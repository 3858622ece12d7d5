//! Segment primitives shared by the track index, collisions and ray casting

use glam::DVec2;

/// Squared length below which a segment is treated as a point
const DEGENERATE_LEN_SQ: f64 = 1e-12;

/// Nearest point on a segment to a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Distance from the query point to `nearest`
    pub distance: f64,
    /// Closest point on the segment
    pub nearest: DVec2,
    /// Parametric position of `nearest` along a→b, in [0, 1]
    pub t: f64,
}

/// Clamped projection of `point` onto segment a→b.
///
/// Degenerate segments (a ≈ b) report the distance to `a` with `t = 0`.
#[inline]
pub fn point_to_segment_distance(point: DVec2, a: DVec2, b: DVec2) -> SegmentProjection {
    let ab = b - a;
    let len_sq = ab.length_squared();

    if len_sq < DEGENERATE_LEN_SQ {
        return SegmentProjection {
            distance: point.distance(a),
            nearest: a,
            t: 0.0,
        };
    }

    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let nearest = a + ab * t;
    SegmentProjection {
        distance: point.distance(nearest),
        nearest,
        t,
    }
}

/// Intersection of segments p1→p2 and p3→p4.
///
/// Returns the parameter `t` along p1→p2 and the intersection point, or
/// `None` for parallel or non-overlapping segments.
pub fn segment_intersection(p1: DVec2, p2: DVec2, p3: DVec2, p4: DVec2) -> Option<(f64, DVec2)> {
    let d1 = p2 - p1;
    let d2 = p4 - p3;

    let denom = d1.perp_dot(d2);
    if denom.abs() < 1e-10 {
        return None;
    }

    let d3 = p3 - p1;
    let t = d3.perp_dot(d2) / denom;
    let s = d3.perp_dot(d1) / denom;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&s) {
        Some((t, p1 + d1 * t))
    } else {
        None
    }
}

/// Iterate the segments of a closed polyline, including the closing edge
pub fn closed_segments(points: &[DVec2]) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
    let n = points.len();
    let count = if n < 2 { 0 } else { n };
    (0..count).map(move |i| (points[i], points[(i + 1) % n]))
}

/// Signed area of a closed polygon (positive for counter-clockwise winding)
pub fn signed_area(points: &[DVec2]) -> f64 {
    closed_segments(points)
        .map(|(a, b)| a.perp_dot(b))
        .sum::<f64>()
        * 0.5
}
