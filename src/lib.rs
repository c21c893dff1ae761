//! # HOS Logbook Core Library
//!
//! This library turns the output of a trip-planning backend into the two things a
//! driver actually looks at: the U.S. DOT daily log grid (one per calendar day) and
//! the rest-break markers along the route map.
//!
//! ## Design Philosophy
//!
//! ### Pure Compilation
//! - **No hidden state**: the grid compiler and the route interpolator are plain
//!   functions over their inputs, so compiling the same trip twice yields the same
//!   output and trips can be compiled in parallel without coordination
//! - **Lenient rendering**: malformed intervals or degenerate geometry are clamped
//!   to an empty contribution instead of failing the whole render
//!
//! ### Temporal Resolution
//! A daily log covers 1440 minutes:
//! - **96 slots**: 15-minute cells, the resolution of the paper DOT grid
//! - **Exact totals**: hours per status are summed from interval minutes, the grid
//!   is only a visual approximation
//!
//! ### Data Flow
//! 1. **Fetch**: [`trip_client`] posts a [`trip::TripRequest`] with bounded retries
//! 2. **Compile**: [`grid`] discretizes each [`LogSheet`] into four rows of slots
//! 3. **Locate**: [`route`] places rest breaks along the route polyline
//! 4. **Render**: [`renderer`] prints the compiled sheets for the terminal
//!
//! ## Core Types
//!
//! The library root exports the duty-status model shared by every module:
//! - [`DutyStatus`]: one of the four regulatory categories
//! - [`StatusMap`]: one value per status, in log-sheet row order
//! - [`TimelineEvent`], [`Interval`], [`LogSheet`], [`Recap`]

use serde::{Deserialize, Serialize};
use std::fmt;

// Module declarations
pub mod config;
pub mod daily_log;
pub mod grid;
pub mod renderer;
pub mod route;
pub mod trip;
pub mod trip_client;

/// Minutes in one calendar day of a log sheet.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Regulatory duty status a driver occupies at any moment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    OffDuty,
    SleeperBerth,
    Driving,
    OnDutyNotDriving,
}

impl DutyStatus {
    /// All statuses in the row order of the paper log grid.
    pub const ALL: [DutyStatus; 4] = [
        DutyStatus::OffDuty,
        DutyStatus::SleeperBerth,
        DutyStatus::Driving,
        DutyStatus::OnDutyNotDriving,
    ];

    /// Row label printed on the daily log.
    pub fn label(self) -> &'static str {
        match self {
            DutyStatus::OffDuty => "Off Duty",
            DutyStatus::SleeperBerth => "Sleeper Berth",
            DutyStatus::Driving => "Driving",
            DutyStatus::OnDutyNotDriving => "On Duty (Not Driving)",
        }
    }

    /// True for the statuses that count toward the 70-hour cycle.
    pub fn is_on_duty(self) -> bool {
        matches!(self, DutyStatus::Driving | DutyStatus::OnDutyNotDriving)
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per duty status.
///
/// Serializes with the status names as keys, which is the shape the backend uses
/// for both the `grid` and `totals` blocks of a log sheet:
///
/// ```
/// use hos_log_lib::{DutyStatus, StatusMap};
///
/// let mut totals: StatusMap<f64> = StatusMap::default();
/// *totals.get_mut(DutyStatus::Driving) += 4.0;
///
/// let json = serde_json::to_value(&totals).unwrap();
/// assert_eq!(json["driving"], 4.0);
/// assert_eq!(totals.iter().count(), 4);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusMap<T> {
    #[serde(default)]
    pub off_duty: T,
    #[serde(default)]
    pub sleeper_berth: T,
    #[serde(default)]
    pub driving: T,
    #[serde(default)]
    pub on_duty_not_driving: T,
}

impl<T> StatusMap<T> {
    pub fn get(&self, status: DutyStatus) -> &T {
        match status {
            DutyStatus::OffDuty => &self.off_duty,
            DutyStatus::SleeperBerth => &self.sleeper_berth,
            DutyStatus::Driving => &self.driving,
            DutyStatus::OnDutyNotDriving => &self.on_duty_not_driving,
        }
    }

    pub fn get_mut(&mut self, status: DutyStatus) -> &mut T {
        match status {
            DutyStatus::OffDuty => &mut self.off_duty,
            DutyStatus::SleeperBerth => &mut self.sleeper_berth,
            DutyStatus::Driving => &mut self.driving,
            DutyStatus::OnDutyNotDriving => &mut self.on_duty_not_driving,
        }
    }

    /// Iterate in log-sheet row order.
    pub fn iter(&self) -> impl Iterator<Item = (DutyStatus, &T)> {
        DutyStatus::ALL.into_iter().map(move |status| (status, self.get(status)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(DutyStatus, &T) -> U) -> StatusMap<U> {
        StatusMap {
            off_duty: f(DutyStatus::OffDuty, &self.off_duty),
            sleeper_berth: f(DutyStatus::SleeperBerth, &self.sleeper_berth),
            driving: f(DutyStatus::Driving, &self.driving),
            on_duty_not_driving: f(DutyStatus::OnDutyNotDriving, &self.on_duty_not_driving),
        }
    }
}

/// A single entry of the trip timeline produced by the backend.
///
/// The sequence is chronological and order is significant; `time` is kept as the
/// backend sent it (an RFC 3339 timestamp in practice, sometimes just a label).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: String,
    pub status: DutyStatus,
    #[serde(default)]
    pub description: String,
    /// Duration in hours
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub location: Option<String>,
}

/// One contiguous span of a single status within a day, in minutes of the day.
///
/// Bounds are signed so that malformed upstream data still deserializes; the
/// compiler clamps instead of rejecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i32,
    pub end: i32,
}

impl Interval {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Minutes of the day covered, after clamping both bounds into the day.
    ///
    /// Zero for reversed intervals.
    pub fn minutes(&self) -> i32 {
        let start = self.start.clamp(0, MINUTES_PER_DAY);
        let end = self.end.clamp(0, MINUTES_PER_DAY);
        (end - start).max(0)
    }

    pub fn is_well_formed(&self) -> bool {
        0 <= self.start && self.start <= self.end && self.end <= MINUTES_PER_DAY
    }
}

/// Rolling on-duty aggregates printed in the recap box of a daily log.
///
/// These are produced upstream; the compiler only renders them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recap {
    pub on_duty_today: f64,
    pub total_last_7_days: f64,
    pub available_tomorrow_70: f64,
    pub total_last_5_days: f64,
}

/// One calendar day of the driver's record of duty status.
///
/// Header fields are opaque pass-through strings. The four interval collections in
/// `grid` partition the day when the upstream timeline is well formed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSheet {
    /// `MM/DD/YYYY`
    pub date: String,
    pub from: String,
    pub to: String,
    pub total_miles_driving: f64,
    pub total_mileage: String,
    pub carrier_name: String,
    pub main_office_address: String,
    pub home_terminal_address: String,
    pub truck_tractor_number: String,
    pub trailer_number: String,
    pub driver_name: String,
    pub co_driver_name: String,
    pub dvl_manifest_no: String,
    pub shipper_commodity: String,
    pub grid: StatusMap<Vec<Interval>>,
    pub totals: StatusMap<f64>,
    pub remarks: Vec<String>,
    pub recap: Recap,
}
