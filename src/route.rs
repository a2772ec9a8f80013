use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::AppointmentRecord;

/// Average leg between two consecutive stops, used until a real distance
/// matrix provider is wired in.
const KM_PER_LEG: u32 = 15;
const MIN_PER_LEG: u32 = 20;

#[derive(Debug, Clone)]
pub struct RouteStop {
    pub appointment_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub customer_name: String,
    pub address: String,
    pub city: String,
    pub position: Option<(f64, f64)>,
    pub signed: bool,
}

#[derive(Debug, Clone)]
pub struct DayRoute {
    pub stops: Vec<RouteStop>,
    pub total_distance_km: u32,
    pub total_time_min: u32,
}

/// Orders a day's appointments chronologically and estimates the route
/// cost as a flat per-leg constant. Same-timestamp appointments keep
/// their input order. An empty day is a valid zero-cost route.
pub fn build_day_route(appointments: &[AppointmentRecord]) -> DayRoute {
    let mut sorted: Vec<&AppointmentRecord> = appointments.iter().collect();
    sorted.sort_by_key(|apt| apt.scheduled_at);

    let stops: Vec<RouteStop> = sorted
        .iter()
        .map(|apt| RouteStop {
            appointment_id: apt.id,
            scheduled_at: apt.scheduled_at,
            customer_name: apt.customer_name.clone(),
            address: apt.customer_address.clone(),
            city: apt.customer_city.clone(),
            position: apt.latitude.zip(apt.longitude),
            signed: apt.signature.is_some(),
        })
        .collect();

    let legs = stops.len().saturating_sub(1) as u32;

    DayRoute {
        stops,
        total_distance_km: KM_PER_LEG * legs,
        total_time_min: MIN_PER_LEG * legs,
    }
}

/// Driving-directions URL through every stop, in route order. Geocoded
/// stops use their coordinates, the rest fall back to the address.
pub fn maps_directions_url(route: &DayRoute) -> Option<String> {
    if route.stops.is_empty() {
        return None;
    }

    let waypoints: Vec<String> = route
        .stops
        .iter()
        .map(|stop| match stop.position {
            Some((lat, lng)) => format!("{lat},{lng}"),
            None => urlencode(&format!("{}, {}", stop.address, stop.city)),
        })
        .collect();

    Some(format!(
        "https://www.google.com/maps/dir/{}",
        waypoints.join("/")
    ))
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
