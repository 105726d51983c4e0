//! Nearest-point projection onto line strings and polygon boundaries.
//!
//! Projection onto each segment uses a planar approximation with longitude
//! scaled by the cosine of the segment's mean latitude, which holds for the
//! short segments stakeout targets consist of. Candidates from different
//! segments are compared by great-circle distance.

use super::{haversine_distance, Geometry, LngLat};

/// Squared planar segment length below which a segment is treated as a point.
const DEGENERATE_SEGMENT_SQ: f64 = 1e-20;

/// Closest point on a line string to `point`.
///
/// Returns `None` for an empty line. A single-vertex line yields that vertex.
pub fn nearest_point_on_line_string(line: &[LngLat], point: LngLat) -> Option<LngLat> {
    match line {
        [] => None,
        [only] => Some(*only),
        _ => line
            .windows(2)
            .map(|seg| project_on_segment(point, seg[0], seg[1]))
            .min_by(|a, b| {
                haversine_distance(point, *a).total_cmp(&haversine_distance(point, *b))
            }),
    }
}

/// Closest point on a polygon's outer boundary to `point`.
///
/// `rings[0]` is the outer ring; holes are ignored. The ring is treated as
/// closed even if its last vertex does not repeat the first. Returns `None`
/// if there is no outer ring or it has fewer than two vertices.
pub fn nearest_point_on_polygon_boundary(rings: &[Vec<LngLat>], point: LngLat) -> Option<LngLat> {
    let outer = rings.first()?;
    if outer.len() < 2 {
        return None;
    }

    if outer.first() == outer.last() {
        return nearest_point_on_line_string(outer, point);
    }

    let mut closed = Vec::with_capacity(outer.len() + 1);
    closed.extend_from_slice(outer);
    closed.push(outer[0]);
    nearest_point_on_line_string(&closed, point)
}

/// Closest point on any supported geometry to `point`.
///
/// Multi-geometries yield the best candidate across their parts. Degenerate
/// geometries, and geometries none of whose parts produce a candidate,
/// return `None`.
pub fn nearest_point_on_geometry(geometry: &Geometry, point: LngLat) -> Option<LngLat> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::MultiPoint(points) => closest(point, points.iter().copied()),
        Geometry::LineString(line) => nearest_point_on_line_string(line, point),
        Geometry::MultiLineString(lines) => closest(
            point,
            lines
                .iter()
                .filter_map(|line| nearest_point_on_line_string(line, point)),
        ),
        Geometry::Polygon(rings) => nearest_point_on_polygon_boundary(rings, point),
        Geometry::MultiPolygon(polygons) => closest(
            point,
            polygons
                .iter()
                .filter_map(|rings| nearest_point_on_polygon_boundary(rings, point)),
        ),
        Geometry::Degenerate(_) => None,
    }
}

fn closest(point: LngLat, candidates: impl Iterator<Item = LngLat>) -> Option<LngLat> {
    candidates.min_by(|a, b| haversine_distance(point, *a).total_cmp(&haversine_distance(point, *b)))
}

fn project_on_segment(p: LngLat, a: LngLat, b: LngLat) -> LngLat {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lng - a.lng) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lng - a.lng) * cos_lat;
    let py = p.lat - a.lat;

    let seg_len_sq = dx * dx + dy * dy;
    if seg_len_sq < DEGENERATE_SEGMENT_SQ {
        return a;
    }

    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    LngLat::new(a.lng + t * (b.lng - a.lng), a.lat + t * (b.lat - a.lat))
}
