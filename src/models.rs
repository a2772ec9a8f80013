use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// An appointment joined with the customer and technician it references,
/// as materialized by the query layer.
#[derive(Debug, Clone)]
pub struct AppointmentRecord {
    pub id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_city: String,
    pub technician_id: Uuid,
    pub technician_name: String,
    pub signature: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub equipment_type: Option<String>,
    pub last_service_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct TechnicianRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub push_token: Option<String>,
}

/// Attendance event type. Stored values outside the four known kinds are
/// kept verbatim so reports can echo them instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeEntryKind {
    StartDay,
    StartBreak,
    EndBreak,
    EndDay,
    Other(String),
}

impl TimeEntryKind {
    pub fn parse(value: &str) -> Self {
        match value {
            "start_day" => Self::StartDay,
            "start_break" => Self::StartBreak,
            "end_break" => Self::EndBreak,
            "end_day" => Self::EndDay,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeEntryRecord {
    pub id: Uuid,
    pub technician_id: Uuid,
    pub entry_date: NaiveDate,
    pub kind: TimeEntryKind,
    pub recorded_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_remote: bool,
    pub remote_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    New,
    Updated,
    Cancelled,
    Reminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Cancelled => "cancelled",
            Self::Reminder => "reminder",
        }
    }
}

/// Ephemeral notification payload, constructed per dispatch call.
#[derive(Debug, Clone)]
pub struct PushIntent {
    pub appointment_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}
