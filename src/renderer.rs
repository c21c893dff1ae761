//! # Daily Log Rendering
//!
//! This module renders compiled trips as plain text for the terminal. The layout
//! follows the paper DOT daily log: header block, the four status rows on a
//! 24-hour axis, totals, remarks and the recap box. A trip summary with the route
//! distance, fuel stops and rest-break positions is printed first.

use crate::config::Config;
use crate::grid::{compile_sheet, CompiledSheet, GridSpec};
use crate::route::{locate_rest_breaks, RestBreakMarker};
use crate::trip::TripResponse;
use crate::{DutyStatus, LogSheet};

/// Width of the status label column
const LABEL_WIDTH: usize = 22;

/// Printed in place of an empty header field
const BLANK_FIELD: &str = "________________";

fn or_blank(value: &str) -> &str {
    if value.trim().is_empty() {
        BLANK_FIELD
    } else {
        value
    }
}

/// Hour labels above the grid: `M` for midnight, `N` for noon.
fn hour_axis(slots_per_day: usize) -> String {
    let per_hour = slots_per_day / 24;
    let mut axis = vec![' '; slots_per_day];
    if per_hour == 0 {
        return axis.into_iter().collect();
    }

    for hour in 0..24 {
        let label = match hour {
            0 => "M".to_string(),
            12 => "N".to_string(),
            h => (h % 12).to_string(),
        };
        for (offset, ch) in label.chars().enumerate() {
            if let Some(cell) = axis.get_mut(hour * per_hour + offset) {
                *cell = ch;
            }
        }
    }
    axis.into_iter().collect()
}

fn grid_row(cells: &[bool]) -> String {
    cells.iter().map(|&on| if on { '█' } else { '·' }).collect()
}

/// Render one daily log.
pub fn render_sheet(sheet: &LogSheet, compiled: &CompiledSheet) -> String {
    let mut lines = Vec::new();
    let slots = compiled.grid.rows.off_duty.len();

    lines.push("U.S. DEPARTMENT OF TRANSPORTATION".to_string());
    lines.push("DRIVER'S DAILY LOG (ONE CALENDAR DAY - 24 HOURS)".to_string());
    lines.push(format!(
        "Date: {}   From: {}   To: {}",
        or_blank(&compiled.date),
        or_blank(&sheet.from),
        or_blank(&sheet.to)
    ));
    lines.push(format!(
        "Carrier: {}   Main office: {}   Home terminal: {}",
        or_blank(&sheet.carrier_name),
        or_blank(&sheet.main_office_address),
        or_blank(&sheet.home_terminal_address)
    ));

    let vehicles = [
        sheet.truck_tractor_number.as_str(),
        sheet.trailer_number.as_str(),
    ]
    .into_iter()
    .filter(|v| !v.trim().is_empty())
    .collect::<Vec<_>>()
    .join(" / ");
    lines.push(format!(
        "Truck/trailer: {}   Miles driving today: {:.1}",
        or_blank(&vehicles),
        sheet.total_miles_driving
    ));
    lines.push(format!(
        "Driver: {}   Co-driver: {}",
        or_blank(&sheet.driver_name),
        or_blank(&sheet.co_driver_name)
    ));
    lines.push(String::new());

    lines.push(format!(
        "{:<width$}│{}│ Hours",
        "",
        hour_axis(slots),
        width = LABEL_WIDTH
    ));
    for status in DutyStatus::ALL {
        lines.push(format!(
            "{:<width$}│{}│ {:>5.2}",
            status.label(),
            grid_row(compiled.grid.rows.get(status)),
            compiled.grid.totals.get(status),
            width = LABEL_WIDTH
        ));
    }
    lines.push(format!(
        "{:<width$} {:>slots$}  {:>5.2}",
        "Total hours",
        "",
        compiled.grid.total_hours(),
        width = LABEL_WIDTH,
        slots = slots
    ));
    if !compiled.coverage.is_complete() {
        lines.push(format!(
            "⚠ Incomplete log: {} min uncovered, {} min overlapping",
            compiled.coverage.gap_minutes, compiled.coverage.overlap_minutes
        ));
    }
    lines.push(String::new());

    lines.push("REMARKS".to_string());
    for remark in &compiled.remarks {
        lines.push(format!("  {remark}"));
    }
    if !sheet.dvl_manifest_no.is_empty() || !sheet.shipper_commodity.is_empty() {
        let mut shipping = format!("  Pro or Shipping No.: {}", sheet.dvl_manifest_no);
        if !sheet.shipper_commodity.is_empty() {
            shipping.push_str(&format!(" - {}", sheet.shipper_commodity));
        }
        lines.push(shipping);
    }
    lines.push(String::new());

    let recap = &compiled.recap;
    lines.push("RECAP".to_string());
    lines.push(format!("  On Duty Today: {:.2} hrs", recap.on_duty_today));
    lines.push(format!("  Total Last 7 Days: {:.2} hrs", recap.total_last_7_days));
    lines.push(format!(
        "  Available Tomorrow (70hr): {:.2} hrs",
        recap.available_tomorrow_70
    ));
    lines.push(format!("  Total Last 5 Days: {:.2} hrs", recap.total_last_5_days));

    lines.join("\n")
}

/// Render the route and compliance summary.
pub fn render_summary(trip: &TripResponse, markers: &[RestBreakMarker]) -> String {
    let mut lines = Vec::new();
    let summary = &trip.summary;
    let compliance = &trip.compliance;

    lines.push("TRIP SUMMARY".to_string());
    lines.push(format!("  Total Distance: {:.2} miles", trip.route.distance_miles));
    lines.push(format!(
        "  Driving: {:.2} hrs   On duty: {:.2} hrs",
        summary.total_driving_hours, summary.total_on_duty_hours
    ));
    if let Some(arrival) = &summary.estimated_arrival {
        lines.push(format!("  Estimated arrival: {arrival}"));
    }
    if compliance.compliant {
        lines.push(format!(
            "  ✓ Compliant: {:.2} hrs available in the 70-hour cycle",
            compliance.available_hours
        ));
    } else {
        lines.push(format!(
            "  ⚠ Exceeds the 70-hour cycle by {:.2} hrs",
            compliance.exceeds_by
        ));
    }

    lines.push(format!("  Fuel Stops: {}", trip.route.fuel_stops.len()));
    for (index, stop) in trip.route.fuel_stops.iter().enumerate() {
        lines.push(format!(
            "    {}. {:.0} miles at ({:.4}, {:.4})",
            index + 1,
            stop.distance,
            stop.location.1,
            stop.location.0
        ));
    }

    lines.push(format!("  Rest Breaks: {}", markers.len()));
    for (index, marker) in markers.iter().enumerate() {
        lines.push(format!(
            "    {}. {} at ({:.4}, {:.4}), ~{:.0} miles",
            index + 1,
            marker.description,
            marker.position.0,
            marker.position.1,
            marker.miles_from_origin
        ));
    }

    lines.join("\n")
}

/// Compile and render a whole trip.
pub fn render_trip(trip: &TripResponse, config: &Config) -> String {
    let spec: GridSpec = config.grid.spec();
    let markers = locate_rest_breaks(
        &trip.timeline,
        &trip.route.geometry,
        config.route.avg_speed_mph,
    );

    let mut sections = vec![render_summary(trip, &markers)];
    for sheet in &trip.log_sheets {
        let compiled = compile_sheet(sheet, &spec);
        sections.push(render_sheet(sheet, &compiled));
    }
    sections.join("\n\n")
}

/// Render a trip to the terminal.
pub fn draw_ascii(trip: &TripResponse, config: &Config) {
    println!("{}", render_trip(trip, config));
}
