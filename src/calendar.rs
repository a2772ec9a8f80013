use chrono::{Datelike, Duration, NaiveDate};
use uuid::Uuid;

use crate::models::{AppointmentRecord, AppointmentStatus};

/// Five full weeks, Monday through Sunday.
pub const GRID_DAYS: i64 = 35;

#[derive(Debug, Clone)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub appointments: Vec<AppointmentRecord>,
}

/// The Monday on or before the first of the month.
pub fn grid_start(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let back = first.weekday().num_days_from_monday() as i64;
    Some(first - Duration::days(back))
}

/// Buckets a month's appointments into a 35-cell week grid. Cancelled
/// appointments are dropped; a non-empty `technician_ids` restricts the
/// view to that subset. Appointments within a cell keep input order.
pub fn month_grid(
    year: i32,
    month: u32,
    appointments: &[AppointmentRecord],
    technician_ids: &[Uuid],
) -> Option<Vec<DayCell>> {
    let start = grid_start(year, month)?;

    let mut cells: Vec<DayCell> = (0..GRID_DAYS)
        .map(|offset| {
            let date = start + Duration::days(offset);
            DayCell {
                date,
                in_month: date.month() == month && date.year() == year,
                appointments: Vec::new(),
            }
        })
        .collect();

    for apt in appointments {
        if apt.status == AppointmentStatus::Cancelled {
            continue;
        }
        if !technician_ids.is_empty() && !technician_ids.contains(&apt.technician_id) {
            continue;
        }

        let day = apt.scheduled_at.date_naive();
        let offset = (day - start).num_days();
        if (0..GRID_DAYS).contains(&offset) {
            cells[offset as usize].appointments.push(apt.clone());
        }
    }

    Some(cells)
}
