//! # Route-Position Interpolator
//!
//! The backend's timeline says *when* rest breaks happen but not *where*. This module
//! reconstructs an approximate position for each break by assuming a constant
//! driving speed and walking that distance along the route polyline.
//!
//! ## Model Characteristics
//!
//! ### Flat-Earth Segments
//! Consecutive geometry vertices are joined by straight segments whose length is the
//! planar distance between the `(lat, lon)` pairs scaled by [`MILES_PER_DEGREE`].
//! This is only reasonable at the scale of a domestic road trip:
//! - ✅ **Cheap**: one square root per segment
//! - ✅ **Monotone**: more driving never moves a marker backwards
//! - ❌ **No geodesic correction**: longitude degrees are treated like latitude degrees
//!
//! Switching to great-circle distances moves every marker and must come with new
//! expected positions in the tests below.
//!
//! ### Constant Speed
//! Each `driving` event advances the distance counter by `duration * avg_speed_mph`.
//! Other events advance only the elapsed-time counter.

use crate::{DutyStatus, TimelineEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Flat-earth scale between degrees and miles
pub const MILES_PER_DEGREE: f64 = 69.0;

pub const DEFAULT_AVG_SPEED_MPH: f64 = 60.0;

/// Substring of an off-duty description that marks a rest break
pub const REST_KEYWORD: &str = "rest";

/// A rest break placed on the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestBreakMarker {
    /// `(latitude, longitude)`
    pub position: (f64, f64),
    pub description: String,
    /// Modelled driving distance before the break
    pub miles_from_origin: f64,
    /// Hours from trip start until the break begins
    pub hours_elapsed: f64,
}

/// True for off-duty events flagged as a rest stop.
pub fn is_rest_break(event: &TimelineEvent) -> bool {
    event.status == DutyStatus::OffDuty && event.description.contains(REST_KEYWORD)
}

/// Route polyline with precomputed segment lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteProfile {
    /// Vertices as `(lat, lon)`
    points: Vec<(f64, f64)>,
    /// Miles per segment; `segments[i]` joins `points[i]` and `points[i + 1]`
    segments: Vec<f64>,
    total_miles: f64,
}

impl RouteProfile {
    /// Build from backend geometry, whose vertices are `(lon, lat)`.
    pub fn from_geometry(geometry: &[(f64, f64)]) -> Self {
        let points: Vec<(f64, f64)> = geometry.iter().map(|&(lon, lat)| (lat, lon)).collect();
        let segments: Vec<f64> = points
            .windows(2)
            .map(|pair| {
                let d_lat = pair[1].0 - pair[0].0;
                let d_lon = pair[1].1 - pair[0].1;
                (d_lat * d_lat + d_lon * d_lon).sqrt() * MILES_PER_DEGREE
            })
            .collect();
        let total_miles = segments.iter().sum();

        Self {
            points,
            segments,
            total_miles,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment_lengths(&self) -> &[f64] {
        &self.segments
    }

    pub fn total_miles(&self) -> f64 {
        self.total_miles
    }

    /// Nothing can be placed on an empty or zero-length route.
    pub fn is_degenerate(&self) -> bool {
        self.segments.is_empty() || self.total_miles.is_nan() || self.total_miles <= 0.0
    }

    /// `(lat, lon)` reached after `miles` along the route.
    ///
    /// Distances past the end land on the last vertex; `None` for a degenerate route.
    pub fn position_at(&self, miles: f64) -> Option<(f64, f64)> {
        if self.is_degenerate() {
            return None;
        }
        let miles = miles.max(0.0);

        let mut accumulated = 0.0;
        let mut found = None;
        for (index, length) in self.segments.iter().enumerate() {
            if miles <= accumulated + length {
                found = Some((index, miles - accumulated));
                break;
            }
            accumulated += length;
        }

        let last = self.segments.len() - 1;
        let (index, into_segment) =
            found.unwrap_or((last, miles - (accumulated - self.segments[last])));
        let index = index.min(last);

        // Duplicate vertices give zero-length segments; dividing by 1 instead only
        // matters when the target sits exactly on them
        let length = if self.segments[index] > 0.0 {
            self.segments[index]
        } else {
            1.0
        };
        let ratio = (into_segment / length).clamp(0.0, 1.0);

        let (start, end) = (self.points[index], self.points[index + 1]);
        Some((
            start.0 + (end.0 - start.0) * ratio,
            start.1 + (end.1 - start.1) * ratio,
        ))
    }
}

/// Place one marker per rest break, in timeline order.
///
/// Returns nothing for an empty or zero-length route.
pub fn locate_rest_breaks(
    timeline: &[TimelineEvent],
    geometry: &[(f64, f64)],
    avg_speed_mph: f64,
) -> Vec<RestBreakMarker> {
    let profile = RouteProfile::from_geometry(geometry);
    if profile.is_degenerate() {
        debug!(vertices = geometry.len(), "route has no length, no rest breaks placed");
        return Vec::new();
    }

    let mut miles = 0.0;
    let mut hours = 0.0;
    let mut markers = Vec::new();

    for event in timeline {
        let duration = event.duration.max(0.0);

        if is_rest_break(event) {
            if let Some(position) = profile.position_at(miles) {
                markers.push(RestBreakMarker {
                    position,
                    description: event.description.clone(),
                    miles_from_origin: miles,
                    hours_elapsed: hours,
                });
            }
        }

        if event.status == DutyStatus::Driving {
            miles += duration * avg_speed_mph;
        }
        hours += duration;
    }

    debug!(
        markers = markers.len(),
        route_miles = profile.total_miles(),
        "placed rest breaks"
    );
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(status: DutyStatus, description: &str, duration: f64) -> TimelineEvent {
        TimelineEvent {
            time: String::new(),
            status,
            description: description.to_string(),
            duration,
            location: None,
        }
    }

    fn driving(hours: f64) -> TimelineEvent {
        event(DutyStatus::Driving, "Driving", hours)
    }

    fn rest(description: &str) -> TimelineEvent {
        event(DutyStatus::OffDuty, description, 0.5)
    }

    /// One degree of latitude due north: 69 miles.
    const NORTH: [(f64, f64); 2] = [(0.0, 0.0), (0.0, 1.0)];

    fn assert_close(actual: (f64, f64), expected: (f64, f64)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-9 && (actual.1 - expected.1).abs() < 1e-9,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_segment_lengths_use_flat_earth_scale() {
        let profile = RouteProfile::from_geometry(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
        assert_eq!(profile.segment_count(), 2);
        assert!((profile.segment_lengths()[0] - 69.0).abs() < 1e-9);
        assert!((profile.total_miles() - 138.0).abs() < 1e-9);
    }

    #[test]
    fn test_marker_interpolates_proportionally() {
        for hours in [0.0, 0.25, 0.5, 1.0, 1.15, 2.0, 5.0] {
            let timeline = vec![driving(hours), rest("30-minute rest break")];
            let markers = locate_rest_breaks(&timeline, &NORTH, 60.0);

            assert_eq!(markers.len(), 1);
            let ratio = (hours * 60.0 / 69.0).min(1.0);
            assert_close(markers[0].position, (ratio, 0.0));
            assert!((markers[0].miles_from_origin - hours * 60.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_one_marker_per_rest_break_in_order() {
        let geometry = [(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 3.0)];
        let timeline = vec![
            event(DutyStatus::OnDutyNotDriving, "Pickup", 1.0),
            driving(1.0),
            rest("Mandatory rest break"),
            driving(1.0),
            event(DutyStatus::OffDuty, "End of shift", 10.0),
            event(DutyStatus::SleeperBerth, "Sleeper rest", 8.0),
            driving(1.0),
            rest("Second rest stop"),
        ];

        let markers = locate_rest_breaks(&timeline, &geometry, 60.0);
        let descriptions: Vec<&str> = markers.iter().map(|m| m.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Mandatory rest break", "Second rest stop"]);
        assert!(markers[0].position.0 < markers[1].position.0);
        assert!((markers[0].hours_elapsed - 2.0).abs() < 1e-9);
        assert!((markers[1].miles_from_origin - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_rest_keyword_is_case_sensitive() {
        let timeline = vec![driving(1.0), rest("Rest Area")];
        assert!(locate_rest_breaks(&timeline, &NORTH, 60.0).is_empty());
    }

    #[test]
    fn test_distance_past_route_end_lands_on_last_vertex() {
        let geometry = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        let timeline = vec![driving(10.0), rest("rest break")];
        let markers = locate_rest_breaks(&timeline, &geometry, 60.0);
        assert_close(markers[0].position, (1.0, 1.0));
    }

    #[test]
    fn test_marker_in_second_segment() {
        let geometry = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        // 69 miles up the first segment plus 34.5 miles east
        let timeline = vec![driving(103.5 / 60.0), rest("rest break")];
        let markers = locate_rest_breaks(&timeline, &geometry, 60.0);
        assert_close(markers[0].position, (1.0, 0.5));
    }

    #[test]
    fn test_degenerate_routes_produce_no_markers() {
        let timeline = vec![driving(1.0), rest("rest break")];
        assert!(locate_rest_breaks(&timeline, &[], 60.0).is_empty());
        assert!(locate_rest_breaks(&timeline, &[(-87.6, 41.8)], 60.0).is_empty());
        assert!(locate_rest_breaks(&timeline, &[(-87.6, 41.8), (-87.6, 41.8)], 60.0).is_empty());
    }

    #[test]
    fn test_duplicate_vertices_do_not_divide_by_zero() {
        let geometry = [(0.0, 0.0), (0.0, 0.0), (0.0, 1.0)];
        let profile = RouteProfile::from_geometry(&geometry);

        let start = profile.position_at(0.0).unwrap();
        assert!(start.0.is_finite() && start.1.is_finite());
        assert_close(start, (0.0, 0.0));
        assert_close(profile.position_at(34.5).unwrap(), (0.5, 0.0));
    }

    #[test]
    fn test_location_is_idempotent() {
        let timeline = vec![driving(0.7), rest("rest"), driving(0.2), rest("rest")];
        let first = locate_rest_breaks(&timeline, &NORTH, 60.0);
        let second = locate_rest_breaks(&timeline, &NORTH, 60.0);
        assert_eq!(first, second);
    }
}
