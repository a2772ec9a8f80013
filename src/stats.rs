use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{AppointmentRecord, AppointmentStatus};

#[derive(Debug, Clone)]
pub struct TechnicianBreakdown {
    pub technician_id: Uuid,
    pub technician_name: String,
    pub count: usize,
    pub completed: usize,
}

#[derive(Debug, Clone)]
pub struct MonthDelta {
    pub appointments_diff: i64,
    pub completion_rate_diff: i64,
}

#[derive(Debug, Clone)]
pub struct MonthlyStats {
    pub total_appointments: usize,
    pub completed_appointments: usize,
    pub cancelled_appointments: usize,
    pub completion_rate: u32,
    pub distinct_customers: usize,
    pub average_duration_minutes: i64,
    pub by_technician: Vec<TechnicianBreakdown>,
    pub previous_month: MonthDelta,
}

/// Completed over total as a rounded whole percentage; an empty month
/// is 0, never a division fault.
pub fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// Rolls a month of appointments into dashboard aggregates. Cancelled
/// appointments count toward the cancelled tally only; everything else
/// (totals, durations, customer and technician counts) is over active
/// appointments. The previous month goes through the same filters so
/// the delta compares like with like.
pub fn monthly_rollup(
    current: &[AppointmentRecord],
    previous: &[AppointmentRecord],
) -> MonthlyStats {
    let active: Vec<&AppointmentRecord> = current
        .iter()
        .filter(|apt| apt.status != AppointmentStatus::Cancelled)
        .collect();

    let total = active.len();
    let completed = active
        .iter()
        .filter(|apt| apt.status == AppointmentStatus::Completed)
        .count();
    let cancelled = current.len() - total;

    let total_duration: i64 = active.iter().map(|apt| apt.duration_minutes as i64).sum();
    let average_duration_minutes = if total == 0 {
        0
    } else {
        ((total_duration as f64) / (total as f64)).round() as i64
    };

    let distinct_customers = active
        .iter()
        .map(|apt| apt.customer_id)
        .collect::<HashSet<_>>()
        .len();

    let mut by_technician: HashMap<Uuid, TechnicianBreakdown> = HashMap::new();
    for apt in &active {
        let entry = by_technician
            .entry(apt.technician_id)
            .or_insert_with(|| TechnicianBreakdown {
                technician_id: apt.technician_id,
                technician_name: apt.technician_name.clone(),
                count: 0,
                completed: 0,
            });
        entry.count += 1;
        if apt.status == AppointmentStatus::Completed {
            entry.completed += 1;
        }
    }
    let mut by_technician: Vec<TechnicianBreakdown> = by_technician.into_values().collect();
    by_technician.sort_by(|a, b| b.count.cmp(&a.count).then(a.technician_name.cmp(&b.technician_name)));

    let prev_active = previous
        .iter()
        .filter(|apt| apt.status != AppointmentStatus::Cancelled)
        .count();
    let prev_completed = previous
        .iter()
        .filter(|apt| apt.status == AppointmentStatus::Completed)
        .count();

    let rate = completion_rate(completed, total);
    let prev_rate = completion_rate(prev_completed, prev_active);

    MonthlyStats {
        total_appointments: total,
        completed_appointments: completed,
        cancelled_appointments: cancelled,
        completion_rate: rate,
        distinct_customers,
        average_duration_minutes,
        by_technician,
        previous_month: MonthDelta {
            appointments_diff: total as i64 - prev_active as i64,
            completion_rate_diff: rate as i64 - prev_rate as i64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn appointment(
        status: AppointmentStatus,
        duration: i32,
        customer_id: Uuid,
        technician_id: Uuid,
        technician_name: &str,
    ) -> AppointmentRecord {
        AppointmentRecord {
            id: Uuid::new_v4(),
            scheduled_at: Utc.with_ymd_and_hms(2026, 3, 9, 10, 0, 0).unwrap(),
            duration_minutes: duration,
            status,
            customer_id,
            customer_name: "Rossi".to_string(),
            customer_address: "Via Roma 1".to_string(),
            customer_city: "Milano".to_string(),
            technician_id,
            technician_name: technician_name.to_string(),
            signature: None,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn empty_month_is_all_zeros() {
        let stats = monthly_rollup(&[], &[]);
        assert_eq!(stats.total_appointments, 0);
        assert_eq!(stats.completed_appointments, 0);
        assert_eq!(stats.completion_rate, 0);
        assert_eq!(stats.distinct_customers, 0);
        assert_eq!(stats.average_duration_minutes, 0);
        assert!(stats.by_technician.is_empty());
        assert_eq!(stats.previous_month.appointments_diff, 0);
    }

    #[test]
    fn completion_rate_rounds_to_whole_percent() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(3, 3), 100);
        assert_eq!(completion_rate(0, 0), 0);
    }

    #[test]
    fn cancelled_appointments_only_count_as_cancelled() {
        let customer = Uuid::new_v4();
        let tech = Uuid::new_v4();
        let current = vec![
            appointment(AppointmentStatus::Completed, 60, customer, tech, "Marco"),
            appointment(AppointmentStatus::Cancelled, 90, customer, tech, "Marco"),
        ];
        let stats = monthly_rollup(&current, &[]);
        assert_eq!(stats.total_appointments, 1);
        assert_eq!(stats.cancelled_appointments, 1);
        assert_eq!(stats.completion_rate, 100);
        assert_eq!(stats.average_duration_minutes, 60);
    }

    #[test]
    fn distinct_customers_counted_once() {
        let shared = Uuid::new_v4();
        let tech = Uuid::new_v4();
        let current = vec![
            appointment(AppointmentStatus::Completed, 60, shared, tech, "Marco"),
            appointment(AppointmentStatus::Scheduled, 60, shared, tech, "Marco"),
            appointment(AppointmentStatus::Scheduled, 60, Uuid::new_v4(), tech, "Marco"),
        ];
        let stats = monthly_rollup(&current, &[]);
        assert_eq!(stats.distinct_customers, 2);
    }

    #[test]
    fn breakdown_accumulates_per_technician() {
        let customer = Uuid::new_v4();
        let marco = Uuid::new_v4();
        let laura = Uuid::new_v4();
        let current = vec![
            appointment(AppointmentStatus::Completed, 60, customer, marco, "Marco"),
            appointment(AppointmentStatus::Scheduled, 60, customer, marco, "Marco"),
            appointment(AppointmentStatus::Completed, 60, customer, laura, "Laura"),
        ];
        let stats = monthly_rollup(&current, &[]);
        assert_eq!(stats.by_technician.len(), 2);
        let top = &stats.by_technician[0];
        assert_eq!(top.technician_id, marco);
        assert_eq!(top.technician_name, "Marco");
        assert_eq!(top.count, 2);
        assert_eq!(top.completed, 1);
    }

    #[test]
    fn delta_compares_against_previous_month() {
        let customer = Uuid::new_v4();
        let tech = Uuid::new_v4();
        let current = vec![
            appointment(AppointmentStatus::Completed, 60, customer, tech, "Marco"),
            appointment(AppointmentStatus::Completed, 60, customer, tech, "Marco"),
            appointment(AppointmentStatus::Scheduled, 60, customer, tech, "Marco"),
        ];
        let previous = vec![
            appointment(AppointmentStatus::Completed, 60, customer, tech, "Marco"),
            appointment(AppointmentStatus::Scheduled, 60, customer, tech, "Marco"),
        ];
        let stats = monthly_rollup(&current, &previous);
        assert_eq!(stats.previous_month.appointments_diff, 1);
        // 67% now vs 50% before
        assert_eq!(stats.previous_month.completion_rate_diff, 17);
    }

    #[test]
    fn average_duration_rounds() {
        let customer = Uuid::new_v4();
        let tech = Uuid::new_v4();
        let current = vec![
            appointment(AppointmentStatus::Scheduled, 60, customer, tech, "Marco"),
            appointment(AppointmentStatus::Scheduled, 45, customer, tech, "Marco"),
        ];
        let stats = monthly_rollup(&current, &[]);
        assert_eq!(stats.average_duration_minutes, 53);
    }
}
