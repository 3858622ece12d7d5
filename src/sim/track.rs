//! Track geometry and the arc-length index
//!
//! A track is a closed centerline sampled from a Catmull-Rom spline through
//! its control points. Boundary walls and road edges are offsets of that
//! centerline, and every sample carries its cumulative arc length so any
//! world position can be mapped to "how far around the lap" it is.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{closed_segments, point_to_segment_distance, signed_area};
use crate::consts::*;
use crate::error::{EnvError, EnvResult};

/// Table entries searched on either side of the hint before pruning
const HINT_WINDOW: usize = 16;
/// Slack added to segment lower bounds to absorb rounding
const BOUND_SLACK: f64 = 1e-6;

/// Cross-section and sampling parameters for building tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    /// Centerline samples per control-point span
    pub samples_per_segment: usize,
    /// Paved road extends this far either side of the centerline
    pub road_half_width: f64,
    /// Shoulder band just outside the road edge
    pub shoulder_width: f64,
    /// Boundary walls sit this far either side of the centerline
    pub wall_half_width: f64,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            samples_per_segment: SAMPLES_PER_SEGMENT,
            road_half_width: ROAD_HALF_WIDTH,
            shoulder_width: SHOULDER_WIDTH,
            wall_half_width: WALL_HALF_WIDTH,
        }
    }
}

/// Terrain under the car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Surface {
    #[default]
    Road,
    Shoulder,
    Runoff,
}

impl Surface {
    pub const ALL: [Surface; 3] = [Surface::Road, Surface::Shoulder, Surface::Runoff];

    /// Nominal racing surface
    pub fn is_road(self) -> bool {
        self == Surface::Road
    }

    /// Grip multiplier applied by the car stepping function
    pub fn grip(self) -> f64 {
        match self {
            Surface::Road => 1.0,
            Surface::Shoulder => 0.75,
            Surface::Runoff => 0.45,
        }
    }

    /// Extra speed-proportional drag
    pub fn drag(self) -> f64 {
        match self {
            Surface::Road => 0.0,
            Surface::Shoulder => 0.4,
            Surface::Runoff => 1.2,
        }
    }
}

/// One centerline sample annotated with its cumulative arc length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcLengthEntry {
    pub point: DVec2,
    pub arc_length: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArcLengthTable {
    pub entries: Vec<ArcLengthEntry>,
    /// Length of the closed loop, including the closing segment
    pub total_length: f64,
}

impl ArcLengthTable {
    fn from_centerline(centerline: &[DVec2]) -> Self {
        let mut entries = Vec::with_capacity(centerline.len());
        let mut arc = 0.0;
        for (i, &point) in centerline.iter().enumerate() {
            if i > 0 {
                arc += point.distance(centerline[i - 1]);
            }
            entries.push(ArcLengthEntry {
                point,
                arc_length: arc,
            });
        }
        let total_length = match (centerline.first(), centerline.last()) {
            (Some(first), Some(last)) if centerline.len() > 1 => arc + last.distance(*first),
            _ => 0.0,
        };
        Self {
            entries,
            total_length,
        }
    }

    /// Arc length at the end of segment `i` (the closing segment ends at the total)
    fn segment_end_arc(&self, i: usize) -> f64 {
        self.entries
            .get(i + 1)
            .map_or(self.total_length, |e| e.arc_length)
    }

    /// Index of the segment containing `arc_length`
    fn segment_at(&self, arc_length: f64) -> usize {
        self.entries
            .partition_point(|e| e.arc_length <= arc_length)
            .saturating_sub(1)
    }
}

/// Position along the centerline of a query point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackProgress {
    /// Unsigned lateral distance to the centerline
    pub distance: f64,
    /// Arc length of the nearest centerline point, in [0, total_length)
    pub arc_length: f64,
}

/// A lap-timing gate spanning the track wall to wall
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub index: usize,
    pub arc_length: f64,
    pub center: DVec2,
    pub left: DVec2,
    pub right: DVec2,
}

/// Bounding circle of a centerline segment, used to prune hinted searches
#[derive(Debug, Clone, Copy)]
struct SegmentBound {
    midpoint: DVec2,
    half_length: f64,
}

impl SegmentBound {
    #[inline]
    fn lower_bound(&self, point: DVec2) -> f64 {
        point.distance(self.midpoint) - self.half_length
    }
}

/// Immutable track geometry, built once and shared by reference
#[derive(Debug, Clone)]
pub struct TrackState {
    pub control_points: Vec<DVec2>,
    pub inner_boundary: Vec<DVec2>,
    pub outer_boundary: Vec<DVec2>,
    pub inner_road_edge: Vec<DVec2>,
    pub outer_road_edge: Vec<DVec2>,
    pub checkpoints: Vec<Checkpoint>,
    arc_length_table: ArcLengthTable,
    pub total_length: f64,
    pub start_position: DVec2,
    pub start_heading: f64,
    pub road_half_width: f64,
    pub shoulder_width: f64,
    /// One bound per arc-length entry; private with the table so the two
    /// cannot drift apart
    segment_bounds: Vec<SegmentBound>,
}

/// Build a closed track through `control_points`
pub fn build_track(
    control_points: &[DVec2],
    checkpoint_count: usize,
    params: &TrackParams,
) -> EnvResult<TrackState> {
    if control_points.len() < 3 {
        return Err(EnvError::invalid_config(format!(
            "a closed track needs at least 3 control points, got {}",
            control_points.len()
        )));
    }
    if control_points.iter().any(|p| !p.is_finite()) {
        return Err(EnvError::invalid_config("control points must be finite"));
    }
    if params.samples_per_segment == 0 {
        return Err(EnvError::invalid_config(
            "track.samples_per_segment must be positive",
        ));
    }

    let centerline = sample_closed_spline(control_points, params.samples_per_segment);
    let mut track = TrackState::from_centerline(centerline, checkpoint_count, params);
    if track.total_length <= 0.0 {
        return Err(EnvError::invalid_config("track centerline has zero length"));
    }
    track.control_points = control_points.to_vec();

    log::debug!(
        "Built track: {} samples, length {:.1}, {} checkpoints",
        track.arc_length_table.entries.len(),
        track.total_length,
        track.checkpoints.len()
    );
    Ok(track)
}

/// Uniform Catmull-Rom spline through a closed loop of control points
fn sample_closed_spline(points: &[DVec2], samples_per_segment: usize) -> Vec<DVec2> {
    let n = points.len();
    let mut samples = Vec::with_capacity(n * samples_per_segment);

    for i in 0..n {
        let p0 = points[(i + n - 1) % n];
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let p3 = points[(i + 2) % n];

        for s in 0..samples_per_segment {
            let t = s as f64 / samples_per_segment as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let point = 0.5
                * (2.0 * p1
                    + (p2 - p0) * t
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
                    + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3);
            samples.push(point);
        }
    }

    samples
}

impl TrackState {
    /// Build a track directly from centerline samples (closed loop implied).
    ///
    /// Accepts degenerate input; queries on it return fallback values.
    pub fn from_centerline(
        centerline: Vec<DVec2>,
        checkpoint_count: usize,
        params: &TrackParams,
    ) -> Self {
        let table = ArcLengthTable::from_centerline(&centerline);
        let total_length = table.total_length;

        // Left of travel is the loop interior for counter-clockwise centerlines
        let inward_sign = if signed_area(&centerline) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        let inward: Vec<DVec2> = (0..centerline.len())
            .map(|i| sample_direction(&centerline, i).perp() * inward_sign)
            .collect();

        let offset = |width: f64| -> Vec<DVec2> {
            centerline
                .iter()
                .zip(&inward)
                .map(|(&c, &n)| c + n * width)
                .collect()
        };
        let inner_boundary = offset(params.wall_half_width);
        let outer_boundary = offset(-params.wall_half_width);
        let inner_road_edge = offset(params.road_half_width);
        let outer_road_edge = offset(-params.road_half_width);

        let segment_bounds = closed_segments(&centerline)
            .map(|(a, b)| SegmentBound {
                midpoint: (a + b) * 0.5,
                half_length: a.distance(b) * 0.5,
            })
            .collect();

        let start_position = centerline.first().copied().unwrap_or(DVec2::ZERO);
        let start_dir = if centerline.len() > 1 {
            (centerline[1] - centerline[0]).normalize_or_zero()
        } else {
            DVec2::ZERO
        };
        let start_heading = if start_dir == DVec2::ZERO {
            0.0
        } else {
            start_dir.y.atan2(start_dir.x)
        };

        let mut track = Self {
            control_points: Vec::new(),
            inner_boundary,
            outer_boundary,
            inner_road_edge,
            outer_road_edge,
            checkpoints: Vec::new(),
            arc_length_table: table,
            total_length,
            start_position,
            start_heading,
            road_half_width: params.road_half_width,
            shoulder_width: params.shoulder_width,
            segment_bounds,
        };
        track.checkpoints = track.place_checkpoints(checkpoint_count, params.wall_half_width);
        track
    }

    /// Evenly spaced gates by arc length; gate 0 sits on the start line
    fn place_checkpoints(&self, count: usize, half_span: f64) -> Vec<Checkpoint> {
        if self.total_length <= 0.0 {
            return Vec::new();
        }
        (0..count)
            .map(|index| {
                let arc_length = self.total_length * index as f64 / count as f64;
                let (center, direction) = self.point_at_arc(arc_length);
                let normal = direction.perp();
                Checkpoint {
                    index,
                    arc_length,
                    center,
                    left: center + normal * half_span,
                    right: center - normal * half_span,
                }
            })
            .collect()
    }

    /// Sampled centerline with cumulative arc lengths
    pub fn arc_length_table(&self) -> &ArcLengthTable {
        &self.arc_length_table
    }

    /// Centerline point and unit travel direction at an arc length
    pub fn point_at_arc(&self, arc_length: f64) -> (DVec2, DVec2) {
        let entries = &self.arc_length_table.entries;
        let n = entries.len();
        if n < 2 || self.total_length <= 0.0 {
            let p = entries.first().map_or(DVec2::ZERO, |e| e.point);
            return (p, DVec2::X);
        }

        let arc = arc_length.rem_euclid(self.total_length);
        let i = self.arc_length_table.segment_at(arc);
        let a = entries[i];
        let b = entries[(i + 1) % n];
        let seg_len = self.arc_length_table.segment_end_arc(i) - a.arc_length;
        let t = if seg_len > 0.0 {
            ((arc - a.arc_length) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let direction = (b.point - a.point).normalize_or_zero();
        (a.point.lerp(b.point, t), direction)
    }

    /// Nearest centerline point by full scan of every segment
    pub fn progress(&self, point: DVec2) -> TrackProgress {
        let n = self.arc_length_table.entries.len();
        if n < 2 || self.total_length <= 0.0 {
            return TrackProgress::default();
        }
        self.nearest_among(point, |_| true)
    }

    /// Nearest centerline point, searching near `hint_arc_length` first.
    ///
    /// Returns exactly what [`TrackState::progress`] returns: segments outside
    /// the window are still checked whenever their bounding circle could hold
    /// a point at least as close as the windowed best.
    pub fn progress_near(&self, point: DVec2, hint_arc_length: f64) -> TrackProgress {
        let n = self.arc_length_table.entries.len();
        if n < 2 || self.total_length <= 0.0 {
            return TrackProgress::default();
        }
        if !hint_arc_length.is_finite() || n <= 2 * HINT_WINDOW + 1 {
            return self.progress(point);
        }

        let hint = hint_arc_length.rem_euclid(self.total_length);
        let center = self.arc_length_table.segment_at(hint);
        let in_window = |i: usize| {
            let d = (i + n - center) % n;
            d <= HINT_WINDOW || n - d <= HINT_WINDOW
        };

        let entries = &self.arc_length_table.entries;
        let bound = (0..=2 * HINT_WINDOW)
            .map(|k| (center + n - HINT_WINDOW + k) % n)
            .map(|i| {
                point_to_segment_distance(point, entries[i].point, entries[(i + 1) % n].point)
                    .distance
            })
            .fold(f64::INFINITY, f64::min);

        if !bound.is_finite() {
            return self.progress(point);
        }

        self.nearest_among(point, |i| {
            in_window(i)
                || self
                    .segment_bounds
                    .get(i)
                    .is_none_or(|b| b.lower_bound(point) <= bound + BOUND_SLACK)
        })
    }

    /// First strictly-nearest segment in index order among the candidates
    fn nearest_among(&self, point: DVec2, candidate: impl Fn(usize) -> bool) -> TrackProgress {
        let table = &self.arc_length_table;
        let entries = &table.entries;
        let n = entries.len();

        let mut best_distance = f64::INFINITY;
        let mut best_index = 0;
        let mut best_t = 0.0;

        for i in (0..n).filter(|&i| candidate(i)) {
            let next = entries[(i + 1) % n].point;
            let proj = point_to_segment_distance(point, entries[i].point, next);
            if proj.distance < best_distance {
                best_distance = proj.distance;
                best_index = i;
                best_t = proj.t;
            }
        }

        if !best_distance.is_finite() {
            return TrackProgress::default();
        }

        let start = entries[best_index].arc_length;
        let seg_len = table.segment_end_arc(best_index) - start;
        let mut arc_length = start + best_t * seg_len;
        if arc_length >= self.total_length {
            arc_length -= self.total_length;
        }

        TrackProgress {
            distance: best_distance,
            arc_length: arc_length.max(0.0),
        }
    }

    /// Classify terrain from the lateral distance to the centerline
    pub fn surface_at(&self, lateral_distance: f64) -> Surface {
        if lateral_distance <= self.road_half_width {
            Surface::Road
        } else if lateral_distance <= self.road_half_width + self.shoulder_width {
            Surface::Shoulder
        } else {
            Surface::Runoff
        }
    }

    /// Segments of both boundary walls
    pub fn wall_segments(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        closed_segments(&self.inner_boundary).chain(closed_segments(&self.outer_boundary))
    }
}

/// Unit travel direction at a centerline sample (central difference)
fn sample_direction(centerline: &[DVec2], i: usize) -> DVec2 {
    let n = centerline.len();
    if n < 2 {
        return DVec2::ZERO;
    }
    let prev = centerline[(i + n - 1) % n];
    let next = centerline[(i + 1) % n];
    let dir = (next - prev).normalize_or_zero();
    if dir == DVec2::ZERO {
        (next - centerline[i]).normalize_or_zero()
    } else {
        dir
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_square_arc_length_table() {
        let track = square_track();
        assert_eq!(track.total_length, 1000.0);
        let arcs: Vec<f64> = track
            .arc_length_table()
            .entries
            .iter()
            .map(|e| e.arc_length)
            .collect();
        assert_eq!(arcs, vec![0.0, 250.0, 500.0, 750.0]);
    }

    #[test]
    fn test_progress_interpolates_within_segment() {
        let track = square_track();
        let p = track.progress(DVec2::new(100.0, -7.0));
        assert!((p.distance - 7.0).abs() < 1e-9);
        assert!((p.arc_length - 100.0).abs() < 1e-9);

        // On the closing segment (0,250) -> (0,0)
        let p = track.progress(DVec2::new(3.0, 50.0));
        assert!((p.distance - 3.0).abs() < 1e-9);
        assert!((p.arc_length - 950.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_stays_below_total_length() {
        let track = square_track();
        // Start point is the end of the closing segment as well
        let p = track.progress(DVec2::new(-5.0, -5.0));
        assert!(p.arc_length >= 0.0 && p.arc_length < track.total_length);
        assert!(p.arc_length.abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_centerline_falls_back() {
        let params = TrackParams::default();
        for centerline in [
            vec![],
            vec![DVec2::new(3.0, 4.0)],
            vec![DVec2::new(3.0, 4.0); 5],
        ] {
            let track = TrackState::from_centerline(centerline, 4, &params);
            let p = track.progress(DVec2::new(10.0, 10.0));
            assert_eq!(p, TrackProgress::default());
            let p = track.progress_near(DVec2::new(10.0, 10.0), 5.0);
            assert_eq!(p, TrackProgress::default());
            assert!(track.checkpoints.is_empty());
        }
    }

    #[test]
    fn test_nan_point_does_not_propagate() {
        let track = square_track();
        let p = track.progress(DVec2::new(f64::NAN, 1.0));
        assert_eq!(p, TrackProgress::default());
    }

    #[test]
    fn test_boundaries_enclose_centerline() {
        let track = ring_track(500.0, 200);
        let params = TrackParams::default();
        // Counter-clockwise ring: inner wall is closer to the origin
        for (inner, outer) in track.inner_boundary.iter().zip(&track.outer_boundary) {
            assert!((inner.length() - (500.0 - params.wall_half_width)).abs() < 1.0);
            assert!((outer.length() - (500.0 + params.wall_half_width)).abs() < 1.0);
        }
        for edge in &track.inner_road_edge {
            assert!((edge.length() - (500.0 - params.road_half_width)).abs() < 1.0);
        }
    }

    #[test]
    fn test_clockwise_centerline_still_puts_inner_inside() {
        let params = TrackParams::default();
        let mut centerline: Vec<DVec2> = ring_track(500.0, 120)
            .arc_length_table()
            .entries
            .iter()
            .map(|e| e.point)
            .collect();
        centerline.reverse();
        let track = TrackState::from_centerline(centerline, 4, &params);
        assert!(track.inner_boundary[0].length() < track.outer_boundary[0].length());
    }

    #[test]
    fn test_checkpoints_evenly_spaced() {
        let track = square_track();
        assert_eq!(track.checkpoints.len(), 4);
        for (i, cp) in track.checkpoints.iter().enumerate() {
            assert_eq!(cp.index, i);
            assert!((cp.arc_length - 250.0 * i as f64).abs() < 1e-9);
            let span = cp.left.distance(cp.right);
            assert!((span - 2.0 * TrackParams::default().wall_half_width).abs() < 1e-9);
        }
        assert_eq!(track.checkpoints[0].center, DVec2::ZERO);
    }

    #[test]
    fn test_surface_classification() {
        let track = square_track();
        let params = TrackParams::default();
        assert_eq!(track.surface_at(0.0), Surface::Road);
        assert_eq!(track.surface_at(params.road_half_width), Surface::Road);
        assert_eq!(
            track.surface_at(params.road_half_width + params.shoulder_width * 0.5),
            Surface::Shoulder
        );
        assert_eq!(
            track.surface_at(params.road_half_width + params.shoulder_width + 1.0),
            Surface::Runoff
        );
    }

    #[test]
    fn test_build_track_rejects_too_few_points() {
        let params = TrackParams::default();
        let err = build_track(&[DVec2::ZERO, DVec2::X], 4, &params).unwrap_err();
        assert!(matches!(err, EnvError::InvalidConfig(_)));
    }

    #[test]
    fn test_build_track_passes_through_control_points() {
        let params = TrackParams::default();
        let points = [
            DVec2::new(-400.0, -300.0),
            DVec2::new(400.0, -300.0),
            DVec2::new(400.0, 300.0),
            DVec2::new(-400.0, 300.0),
        ];
        let track = build_track(&points, 6, &params).unwrap();
        assert_eq!(track.arc_length_table().entries.len(), 4 * params.samples_per_segment);
        assert_eq!(track.start_position, points[0]);
        for p in points {
            assert!(track.progress(p).distance < 1e-9);
        }
        assert_eq!(track.checkpoints.len(), 6);
        // Heading points from the first control point toward the second
        assert!(track.start_heading.cos() > 0.0);
    }

    #[test]
    fn test_arc_length_table_view_matches_bounds() {
        let track = ring_track(500.0, 240);
        let table = track.arc_length_table();
        assert_eq!(table.entries.len(), track.segment_bounds.len());
        assert_eq!(table.total_length, track.total_length);
        for (i, entry) in table.entries.iter().enumerate() {
            let next = table.entries[(i + 1) % table.entries.len()].point;
            let bound = &track.segment_bounds[i];
            assert!(bound.lower_bound(entry.point) <= 1e-9);
            assert!(bound.lower_bound(next) <= 1e-9);
        }
        let point = DVec2::new(505.0, -40.0);
        assert_eq!(track.progress(point), track.progress_near(point, table.total_length / 2.0));
    }

    #[test]
    fn test_point_at_arc_wraps() {
        let track = square_track();
        let (p, dir) = track.point_at_arc(1100.0);
        assert!((p - DVec2::new(100.0, 0.0)).length() < 1e-9);
        assert!((dir - DVec2::X).length() < 1e-9);
    }

    #[test]
    fn test_hinted_search_matches_full_scan_far_from_hint() {
        let track = ring_track(500.0, 400);
        // Query on the opposite side of the ring from the hint
        let point = DVec2::new(-510.0, 3.0);
        let full = track.progress(point);
        let hinted = track.progress_near(point, 0.0);
        assert_eq!(full, hinted);
    }

    proptest! {
        #[test]
        fn hinted_search_matches_full_scan(
            x in -800.0f64..800.0,
            y in -800.0f64..800.0,
            hint_frac in 0.0f64..1.0,
        ) {
            let track = ring_track(500.0, 240);
            let point = DVec2::new(x, y);
            let hint = hint_frac * track.total_length;
            prop_assert_eq!(track.progress(point), track.progress_near(point, hint));
        }

        #[test]
        fn progress_is_in_range(x in -800.0f64..800.0, y in -800.0f64..800.0) {
            let track = ring_track(300.0, 90);
            let p = track.progress(DVec2::new(x, y));
            prop_assert!(p.distance >= 0.0);
            prop_assert!(p.arc_length >= 0.0 && p.arc_length < track.total_length);
        }
    }
}
