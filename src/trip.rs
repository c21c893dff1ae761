//! # Trip Request and Response Model
//!
//! Wire types exchanged with the trip-computation service. The request carries the
//! free-text stops and the cycle hours already used; the response carries the route
//! geometry, the duty-status timeline and the per-day log sheets derived from it.

use crate::{LogSheet, TimelineEvent};
use serde::{Deserialize, Serialize};

/// Hours in the 70-hour/8-day cycle.
pub const CYCLE_LIMIT_HOURS: f64 = 70.0;

/// Trip parameters submitted to the computation service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub current_location: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    /// Hours already used in the current 70-hour cycle
    pub current_cycle_used: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_office_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_terminal_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co_driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truck_tractor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dvl_manifest_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipper_commodity: Option<String>,
    /// IANA timezone name, the service assumes UTC when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl TripRequest {
    /// Check the request locally before it is sent.
    ///
    /// Returns one `field: message` entry per problem, in field order. An empty
    /// vector means the request is acceptable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (field, value) in [
            ("current_location", &self.current_location),
            ("pickup_location", &self.pickup_location),
            ("dropoff_location", &self.dropoff_location),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{field}: This field may not be blank."));
            }
        }

        if !self.current_cycle_used.is_finite()
            || !(0.0..=CYCLE_LIMIT_HOURS).contains(&self.current_cycle_used)
        {
            problems.push(format!(
                "current_cycle_used: Ensure this value is between 0 and {CYCLE_LIMIT_HOURS}."
            ));
        }

        problems
    }
}

/// A fuel stop along the route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelStop {
    /// `(longitude, latitude)`
    pub location: (f64, f64),
    /// Miles from the trip origin
    pub distance: f64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Route geometry and the notable points along it.
///
/// `geometry` vertices are `(longitude, latitude)`; the three stop coordinates are
/// `(latitude, longitude)` as the service reports them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteData {
    pub distance_miles: f64,
    pub geometry: Vec<(f64, f64)>,
    pub fuel_stops: Vec<FuelStop>,
    pub start_coords: (f64, f64),
    pub pickup_coords: (f64, f64),
    pub dropoff_coords: (f64, f64),
}

/// 70-hour cycle compliance verdict for the whole trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compliance {
    pub compliant: bool,
    pub total_on_duty: f64,
    pub required_70_hour_hours: f64,
    pub available_hours: f64,
    pub exceeds_by: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripSummary {
    pub total_driving_hours: f64,
    pub total_on_duty_hours: f64,
    pub estimated_arrival: Option<String>,
}

/// Successful response of the trip-computation service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TripResponse {
    pub route: RouteData,
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub compliance: Compliance,
    #[serde(default)]
    pub log_sheets: Vec<LogSheet>,
    #[serde(default)]
    pub summary: TripSummary,
}
