//! # Daily Log Builder
//!
//! Splits a timestamped duty-status timeline into one [`LogSheet`] per calendar day,
//! so a saved timeline can be turned into log grids without the backend.
//!
//! ## Day Boundaries
//!
//! Days are calendar days in the UTC offset of the first event. An event that runs
//! past midnight contributes to both days. Minutes of a day that no event covers
//! (before the trip starts, after it ends) are logged as off duty, so every sheet
//! accounts for all 24 hours.
//!
//! ## Recap
//!
//! Cycle hours accumulate from sheet to sheet starting at `current_cycle_used`:
//! - `on_duty_today`: driving plus on-duty-not-driving hours of the day
//! - `total_last_7_days`: cycle hours used through the end of the day
//! - `available_tomorrow_70`: what remains of the 70 hours, never negative
//! - `total_last_5_days`: same as the 7-day figure

use crate::grid::total_hours;
use crate::trip::{TripRequest, CYCLE_LIMIT_HOURS};
use crate::{DutyStatus, Interval, LogSheet, Recap, StatusMap, TimelineEvent, MINUTES_PER_DAY};
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tracing::debug;

/// Longest span a timeline may cover, in days
pub const MAX_TRIP_DAYS: i64 = 31;

#[derive(Error, Debug)]
pub enum LogBuildError {
    #[error("timeline is empty")]
    EmptyTimeline,

    #[error("event {index} ends more than {max_days} days after the trip starts")]
    DurationOutOfRange { index: usize, max_days: i64 },

    #[error("event {index} has an unreadable time {value:?}: {source}")]
    Timestamp {
        index: usize,
        value: String,
        source: chrono::ParseError,
    },
}

/// Header fields copied onto every sheet of a trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetHeader {
    pub from: String,
    pub to: String,
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
}

impl SheetHeader {
    pub fn from_request(request: &TripRequest) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            from: request.current_location.clone(),
            to: request.dropoff_location.clone(),
            total_mileage: String::new(),
            carrier_name: text(&request.carrier_name),
            main_office_address: text(&request.main_office_address),
            home_terminal_address: text(&request.home_terminal_address),
            truck_tractor_number: text(&request.truck_tractor),
            trailer_number: text(&request.trailer),
            driver_name: text(&request.driver_name),
            co_driver_name: text(&request.co_driver_name),
            dvl_manifest_no: text(&request.dvl_manifest_no),
            shipper_commodity: text(&request.shipper_commodity),
        }
    }
}

/// An event placed on the trip's minute axis (minute 0 is midnight of the first day).
struct PlacedEvent<'a> {
    event: &'a TimelineEvent,
    local_start: NaiveDateTime,
    start: i64,
    end: i64,
}

/// Accept RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_event_time(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).or_else(|rfc_err| {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|_| rfc_err)
    })
}

/// End minute of an event, or `None` when it lands past `max_minutes`.
fn event_end(start: i64, duration_hours: f64, max_minutes: i64) -> Option<i64> {
    let minutes = (duration_hours.max(0.0) * 60.0).round();
    if !minutes.is_finite() || minutes > max_minutes as f64 {
        return None;
    }
    start
        .checked_add(minutes as i64)
        .filter(|end| *end <= max_minutes)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build one log sheet per calendar day covered by the timeline.
pub fn build_log_sheets(
    timeline: &[TimelineEvent],
    header: &SheetHeader,
    total_miles: f64,
    current_cycle_used: f64,
) -> Result<Vec<LogSheet>, LogBuildError> {
    let first = timeline.first().ok_or(LogBuildError::EmptyTimeline)?;
    let first_time = parse_event_time(&first.time).map_err(|source| LogBuildError::Timestamp {
        index: 0,
        value: first.time.clone(),
        source,
    })?;
    let offset = *first_time.offset();
    let origin = first_time
        .naive_local()
        .date()
        .and_time(NaiveTime::MIN);

    let max_minutes = MAX_TRIP_DAYS * i64::from(MINUTES_PER_DAY);
    let mut placed = Vec::with_capacity(timeline.len());
    for (index, event) in timeline.iter().enumerate() {
        let time = parse_event_time(&event.time).map_err(|source| LogBuildError::Timestamp {
            index,
            value: event.time.clone(),
            source,
        })?;
        let local_start = time.with_timezone(&offset).naive_local();
        let start = (local_start - origin).num_minutes();
        let end = event_end(start, event.duration, max_minutes).ok_or(
            LogBuildError::DurationOutOfRange {
                index,
                max_days: MAX_TRIP_DAYS,
            },
        )?;
        placed.push(PlacedEvent {
            event,
            local_start,
            start,
            end,
        });
    }

    let trip_end = placed.iter().map(|p| p.end).max().unwrap_or(0);
    let day_minutes = i64::from(MINUTES_PER_DAY);
    let day_count = ((trip_end + day_minutes - 1) / day_minutes).max(1);

    let mut days: Vec<LogSheet> = (0..day_count)
        .map(|day| build_day(&placed, origin, day, header))
        .collect();

    apportion_miles(&mut days, total_miles);
    fill_recap(&mut days, current_cycle_used);

    debug!(sheets = days.len(), events = timeline.len(), "built log sheets");
    Ok(days)
}

fn build_day(
    placed: &[PlacedEvent<'_>],
    origin: NaiveDateTime,
    day: i64,
    header: &SheetHeader,
) -> LogSheet {
    let day_minutes = i64::from(MINUTES_PER_DAY);
    let (lo, hi) = (day * day_minutes, (day + 1) * day_minutes);

    let mut grid: StatusMap<Vec<Interval>> = StatusMap::default();
    let mut remarks = Vec::new();

    for p in placed {
        let (start, end) = (p.start.max(lo), p.end.min(hi));
        if start < end {
            grid.get_mut(p.event.status)
                .push(Interval::new((start - lo) as i32, (end - lo) as i32));
        }
        if (lo..hi).contains(&p.start) {
            remarks.push(remark(p));
        }
    }

    fill_gaps_off_duty(&mut grid);
    for status in DutyStatus::ALL {
        merge_touching(grid.get_mut(status));
    }

    let totals = grid.map(|_, intervals| round2(total_hours(intervals)));
    let date = (origin + Duration::days(day)).format("%m/%d/%Y").to_string();

    LogSheet {
        date,
        from: header.from.clone(),
        to: header.to.clone(),
        total_miles_driving: 0.0,
        total_mileage: header.total_mileage.clone(),
        carrier_name: header.carrier_name.clone(),
        main_office_address: header.main_office_address.clone(),
        home_terminal_address: header.home_terminal_address.clone(),
        truck_tractor_number: header.truck_tractor_number.clone(),
        trailer_number: header.trailer_number.clone(),
        driver_name: header.driver_name.clone(),
        co_driver_name: header.co_driver_name.clone(),
        dvl_manifest_no: header.dvl_manifest_no.clone(),
        shipper_commodity: header.shipper_commodity.clone(),
        grid,
        totals,
        remarks,
        recap: Recap::default(),
    }
}

fn remark(p: &PlacedEvent<'_>) -> String {
    let time = p.local_start.format("%I:%M %p");
    match p.event.location.as_deref().filter(|l| !l.is_empty()) {
        Some(location) => format!("{time} - {} - {location}", p.event.description),
        None => format!("{time} - {}", p.event.description),
    }
}

/// Minutes covered by no status become off duty.
fn fill_gaps_off_duty(grid: &mut StatusMap<Vec<Interval>>) {
    let mut covered: Vec<Interval> = grid.iter().flat_map(|(_, list)| list.iter().copied()).collect();
    covered.sort_by_key(|interval| interval.start);

    let mut cursor = 0;
    let mut gaps = Vec::new();
    for interval in covered {
        if interval.start > cursor {
            gaps.push(Interval::new(cursor, interval.start));
        }
        cursor = cursor.max(interval.end);
    }
    if cursor < MINUTES_PER_DAY {
        gaps.push(Interval::new(cursor, MINUTES_PER_DAY));
    }

    grid.off_duty.extend(gaps);
}

/// Sort and join intervals that touch or overlap.
fn merge_touching(intervals: &mut Vec<Interval>) {
    intervals.sort_by_key(|interval| interval.start);
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals.drain(..) {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
            _ => merged.push(interval),
        }
    }
    *intervals = merged;
}

/// Spread route miles over the days in proportion to their driving hours.
fn apportion_miles(days: &mut [LogSheet], total_miles: f64) {
    let driving: f64 = days.iter().map(|d| d.totals.driving).sum();
    for day in days.iter_mut() {
        day.total_miles_driving = if driving > 0.0 {
            round2(total_miles * day.totals.driving / driving)
        } else {
            0.0
        };
    }
}

fn fill_recap(days: &mut [LogSheet], current_cycle_used: f64) {
    let mut cycle = current_cycle_used;
    for day in days.iter_mut() {
        let on_duty_today = day.totals.driving + day.totals.on_duty_not_driving;
        cycle += on_duty_today;
        day.recap = Recap {
            on_duty_today: round2(on_duty_today),
            total_last_7_days: round2(cycle),
            available_tomorrow_70: round2((CYCLE_LIMIT_HOURS - cycle).max(0.0)),
            total_last_5_days: round2(cycle),
        };
    }
}
