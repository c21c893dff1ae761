//! # Duty-Status Grid Compiler
//!
//! Converts a day's duty-status intervals into the fixed-resolution rows of the DOT
//! daily log. The default layout is 96 cells of 15 minutes.
//!
//! ## Discretization
//!
//! An interval `[start, end)` marks cell `i` when
//! `floor(start / res) <= i < last`, where `last` depends on the
//! [`RoundingPolicy`]:
//! - [`RoundingPolicy::InclusiveCeil`]: `ceil(end / res)`, a partial trailing cell is drawn
//! - [`RoundingPolicy::Truncate`]: `floor(end / res)`, a partial trailing cell is dropped
//!
//! Cells past the end of the day are discarded, never wrapped into the next day.
//!
//! Truncation is the default: contiguous intervals map onto contiguous, disjoint
//! runs of cells, so a day that partitions its minutes also partitions its cells.
//! Rounding up can draw two statuses in the same cell.
//!
//! ## Totals
//!
//! Hours per status are summed from the interval minutes and are exact. They are
//! not derived from the drawn cells, so `active cells * res / 60` may differ from
//! the total by up to one cell per interval.
//!
//! ## Leniency
//!
//! Intervals with `end < start` or bounds outside the day are clamped to whatever
//! part lies inside the day (possibly nothing). [`check_coverage`] reports gaps
//! and overlaps for diagnostics but compilation never fails.

use crate::{DutyStatus, Interval, LogSheet, Recap, StatusMap, MINUTES_PER_DAY};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How the trailing edge of an interval maps onto grid cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round the end up: any partial cell is drawn
    InclusiveCeil,
    /// Round the end down: a partial cell shorter than the resolution is dropped
    #[default]
    Truncate,
}

/// Grid geometry: cell width, cells per day and rounding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSpec {
    pub resolution_minutes: u32,
    pub slots_per_day: usize,
    pub rounding: RoundingPolicy,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            resolution_minutes: 15,
            slots_per_day: 96,
            rounding: RoundingPolicy::Truncate,
        }
    }
}

impl GridSpec {
    /// Cell range `[first, last)` covered by an interval, before clamping to the day.
    fn slot_range(&self, interval: &Interval) -> (i64, i64) {
        let res = i64::from(self.resolution_minutes.max(1));
        let start = i64::from(interval.start.max(0));
        let end = i64::from(interval.end.max(0));

        let first = start.div_euclid(res);
        let last = match self.rounding {
            RoundingPolicy::InclusiveCeil => (end + res - 1).div_euclid(res),
            RoundingPolicy::Truncate => end.div_euclid(res),
        };
        (first, last)
    }
}

/// Discretize one status's intervals into a row of cells.
pub fn compile_row(intervals: &[Interval], spec: &GridSpec) -> Vec<bool> {
    let mut row = vec![false; spec.slots_per_day];
    let slots = spec.slots_per_day as i64;

    for interval in intervals {
        let (first, last) = spec.slot_range(interval);
        let last = last.min(slots);
        if first >= last {
            continue;
        }
        for cell in &mut row[first as usize..last as usize] {
            *cell = true;
        }
    }

    row
}

/// Exact hours covered by a status's intervals.
///
/// Only the part of each interval inside the day counts; reversed intervals
/// contribute nothing.
pub fn total_hours(intervals: &[Interval]) -> f64 {
    intervals
        .iter()
        .map(|interval| f64::from(interval.minutes()))
        .sum::<f64>()
        / 60.0
}

/// The four rows of a day plus their exact totals.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledGrid {
    pub rows: StatusMap<Vec<bool>>,
    pub totals: StatusMap<f64>,
}

impl CompiledGrid {
    /// Sum of the four status totals in hours.
    pub fn total_hours(&self) -> f64 {
        self.totals.iter().map(|(_, hours)| *hours).sum()
    }

    /// Number of drawn cells for a status.
    pub fn active_slots(&self, status: DutyStatus) -> usize {
        self.rows.get(status).iter().filter(|active| **active).count()
    }
}

/// Compile all four statuses of a day.
pub fn compile_intervals(intervals: &StatusMap<Vec<Interval>>, spec: &GridSpec) -> CompiledGrid {
    CompiledGrid {
        rows: intervals.map(|_, list| compile_row(list, spec)),
        totals: intervals.map(|_, list| total_hours(list)),
    }
}

/// A daily log ready for presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledSheet {
    pub date: String,
    pub grid: CompiledGrid,
    pub recap: Recap,
    pub remarks: Vec<String>,
    pub coverage: CoverageReport,
}

/// Compile one log sheet. The recap and remarks pass through unchanged.
pub fn compile_sheet(sheet: &LogSheet, spec: &GridSpec) -> CompiledSheet {
    let coverage = check_coverage(&sheet.grid);
    if !coverage.is_complete() {
        warn!(
            date = %sheet.date,
            gaps = coverage.gap_minutes,
            overlaps = coverage.overlap_minutes,
            malformed = coverage.malformed,
            "log sheet does not partition the day, rendering as-is"
        );
    }

    let grid = compile_intervals(&sheet.grid, spec);
    debug!(date = %sheet.date, hours = grid.total_hours(), "compiled log sheet");

    CompiledSheet {
        date: sheet.date.clone(),
        grid,
        recap: sheet.recap,
        remarks: sheet.remarks.clone(),
        coverage,
    }
}

/// How well a day's intervals partition `[0, 1440)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Minutes of the day covered by no status
    pub gap_minutes: u32,
    /// Minutes of the day covered by more than one interval
    pub overlap_minutes: u32,
    /// Intervals that are reversed or leave the day
    pub malformed: usize,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.gap_minutes == 0 && self.overlap_minutes == 0 && self.malformed == 0
    }
}

/// Measure gaps and overlaps at minute resolution.
pub fn check_coverage(intervals: &StatusMap<Vec<Interval>>) -> CoverageReport {
    let mut counts = [0u8; MINUTES_PER_DAY as usize];
    let mut report = CoverageReport::default();

    for (_, list) in intervals.iter() {
        for interval in list {
            if !interval.is_well_formed() {
                report.malformed += 1;
            }
            let start = interval.start.clamp(0, MINUTES_PER_DAY) as usize;
            let end = interval.end.clamp(0, MINUTES_PER_DAY) as usize;
            if start < end {
                for count in &mut counts[start..end] {
                    *count = count.saturating_add(1);
                }
            }
        }
    }

    for count in counts {
        match count {
            0 => report.gap_minutes += 1,
            1 => {}
            n => report.overlap_minutes += u32::from(n - 1),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_day() -> StatusMap<Vec<Interval>> {
        StatusMap {
            driving: vec![Interval::new(0, 240)],
            off_duty: vec![Interval::new(240, 300)],
            sleeper_berth: vec![Interval::new(300, 900)],
            on_duty_not_driving: vec![Interval::new(900, 1440)],
        }
    }

    fn rounding_up() -> GridSpec {
        GridSpec {
            rounding: RoundingPolicy::InclusiveCeil,
            ..GridSpec::default()
        }
    }

    #[test]
    fn test_full_day_totals() {
        let grid = compile_intervals(&full_day(), &GridSpec::default());
        assert!((grid.totals.driving - 4.0).abs() < 1e-9);
        assert!((grid.totals.off_duty - 1.0).abs() < 1e-9);
        assert!((grid.totals.sleeper_berth - 10.0).abs() < 1e-9);
        assert!((grid.totals.on_duty_not_driving - 9.0).abs() < 1e-9);
        assert!((grid.total_hours() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_day_fills_every_slot_once() {
        let grid = compile_intervals(&full_day(), &GridSpec::default());
        for slot in 0..96 {
            let active = DutyStatus::ALL
                .iter()
                .filter(|status| grid.rows.get(**status)[slot])
                .count();
            assert_eq!(active, 1, "slot {slot} should belong to exactly one status");
        }
        assert_eq!(grid.active_slots(DutyStatus::Driving), 16);
        assert_eq!(grid.active_slots(DutyStatus::OnDutyNotDriving), 36);
    }

    #[test]
    fn test_partial_trailing_slot_rounds_up() {
        let row = compile_row(&[Interval::new(10, 20)], &rounding_up());
        assert_eq!(row.iter().filter(|a| **a).count(), 2);
        assert!(row[0] && row[1]);
        assert!(!row[2]);
    }

    #[test]
    fn test_partial_trailing_slot_truncates() {
        let row = compile_row(&[Interval::new(10, 20)], &GridSpec::default());
        assert_eq!(row.iter().filter(|a| **a).count(), 1);
        assert!(row[0]);

        // Shorter than one cell and inside it: nothing is drawn
        let row = compile_row(&[Interval::new(16, 29)], &GridSpec::default());
        assert!(row.iter().all(|a| !*a));
    }

    fn drawn_minutes(interval: Interval, spec: &GridSpec) -> i32 {
        compile_row(&[interval], spec).iter().filter(|a| **a).count() as i32 * 15
    }

    #[test]
    fn test_active_slots_within_one_slot_of_duration() {
        let spec = GridSpec::default();
        for start in (0..1440).step_by(7) {
            for len in [1, 14, 15, 16, 44, 61, 300] {
                let end = (start + len).min(1439);
                if end <= start {
                    continue;
                }
                let drawn = drawn_minutes(Interval::new(start, end), &spec);
                let duration = end - start;
                assert!(
                    (drawn - duration).abs() < 15,
                    "[{start},{end}) drew {drawn} minutes"
                );
            }
        }
    }

    #[test]
    fn test_rounding_up_never_undercounts() {
        let spec = rounding_up();
        for start in (0..1440).step_by(7) {
            for len in [1, 14, 15, 16, 44, 61, 300] {
                let end = (start + len).min(1439);
                if end <= start {
                    continue;
                }
                let drawn = drawn_minutes(Interval::new(start, end), &spec);
                let duration = end - start;
                assert!(drawn >= duration && drawn - duration < 30);
            }
        }
    }

    #[test]
    fn test_truncation_keeps_contiguous_intervals_disjoint() {
        let day = StatusMap {
            driving: vec![Interval::new(0, 10), Interval::new(250, 1440)],
            on_duty_not_driving: vec![Interval::new(10, 250)],
            ..StatusMap::default()
        };
        let grid = compile_intervals(&day, &GridSpec::default());
        for slot in 0..96 {
            let active = DutyStatus::ALL
                .iter()
                .filter(|status| grid.rows.get(**status)[slot])
                .count();
            assert_eq!(active, 1, "slot {slot}");
        }

        // Rounding up draws the short leading interval on top of the next one
        let grid = compile_intervals(&day, &rounding_up());
        assert!(grid.rows.driving[0] && grid.rows.on_duty_not_driving[0]);
    }

    #[test]
    fn test_slots_past_end_of_day_are_discarded() {
        let row = compile_row(&[Interval::new(1410, 1600)], &rounding_up());
        assert_eq!(row.len(), 96);
        assert!(row[94] && row[95]);
        assert_eq!(row.iter().filter(|a| **a).count(), 2);
    }

    #[test]
    fn test_malformed_intervals_contribute_nothing() {
        let intervals = [Interval::new(300, 200)];
        let row = compile_row(&intervals, &GridSpec::default());
        assert!(row.iter().all(|a| !*a));
        assert_eq!(total_hours(&intervals), 0.0);

        // Negative start is clamped to midnight
        let row = compile_row(&[Interval::new(-30, 15)], &rounding_up());
        assert!(row[0]);
        assert_eq!(row.iter().filter(|a| **a).count(), 1);
    }

    #[test]
    fn test_totals_clamp_out_of_day_bounds() {
        let extreme = [Interval::new(-2, i32::MAX)];
        assert!((total_hours(&extreme) - 24.0).abs() < 1e-9);

        let spilling = [Interval::new(-100, 2000)];
        let row = compile_row(&spilling, &GridSpec::default());
        assert_eq!(row.iter().filter(|a| **a).count(), 96);
        assert!((total_hours(&spilling) - 24.0).abs() < 1e-9);

        assert_eq!(total_hours(&[Interval::new(i32::MAX, i32::MIN)]), 0.0);
        assert_eq!(total_hours(&[Interval::new(1500, 1600)]), 0.0);
    }

    #[test]
    fn test_coverage_of_well_formed_day() {
        assert!(check_coverage(&full_day()).is_complete());
    }

    #[test]
    fn test_coverage_reports_gaps_and_overlaps() {
        let mut day = full_day();
        day.off_duty = vec![Interval::new(250, 300)]; // 10 minute gap
        day.driving.push(Interval::new(1400, 1450)); // 40 minutes overlap, leaves the day

        let report = check_coverage(&day);
        assert_eq!(report.gap_minutes, 10);
        assert_eq!(report.overlap_minutes, 40);
        assert_eq!(report.malformed, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_compile_sheet_passes_recap_through() {
        let sheet = LogSheet {
            date: "03/01/2025".to_string(),
            grid: full_day(),
            remarks: vec!["08:00 AM - Pre-trip inspection".to_string()],
            recap: Recap {
                on_duty_today: 13.0,
                total_last_7_days: 40.0,
                available_tomorrow_70: 30.0,
                total_last_5_days: 40.0,
            },
            ..LogSheet::default()
        };

        let compiled = compile_sheet(&sheet, &GridSpec::default());
        assert_eq!(compiled.recap, sheet.recap);
        assert_eq!(compiled.remarks, sheet.remarks);
        assert!(compiled.coverage.is_complete());
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let day = full_day();
        let spec = GridSpec::default();
        assert_eq!(compile_intervals(&day, &spec), compile_intervals(&day, &spec));
    }
}
