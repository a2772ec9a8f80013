use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NotificationKind, PushIntent};
use crate::timeclock::MONTHS_IT;

/// Provider-mandated maximum messages per request.
pub const MAX_CHUNK: usize = 100;

const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push token is not in the provider's expected format")]
    InvalidToken,
    #[error("push request timed out")]
    Timeout,
    #[error("push transport failed: {0}")]
    Transport(String),
    #[error("provider rejected the message: {0}")]
    Rejected(String),
}

/// Process-wide notification behavior, passed in at startup instead of
/// registered through a mutable global handler.
#[derive(Debug, Clone, Copy)]
pub struct PushBehavior {
    pub show_alert: bool,
    pub play_sound: bool,
    pub set_badge: bool,
}

impl Default for PushBehavior {
    fn default() -> Self {
        Self {
            show_alert: true,
            play_sound: true,
            set_badge: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<&'static str>,
    pub title: String,
    pub body: String,
    pub data: MessageData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<u32>,
    pub priority: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageData {
    #[serde(rename = "appointmentId")]
    pub appointment_id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushTicket {
    pub status: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PushTicket {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    data: Vec<PushTicket>,
}

/// Expo token shape: `ExponentPushToken[...]` (classic) or
/// `ExpoPushToken[...]` with a non-empty payload.
pub fn is_valid_push_token(token: &str) -> bool {
    let inner = token
        .strip_prefix("ExponentPushToken[")
        .or_else(|| token.strip_prefix("ExpoPushToken["));
    match inner.and_then(|rest| rest.strip_suffix(']')) {
        Some(payload) => !payload.is_empty(),
        None => false,
    }
}

pub(crate) fn chunked(messages: Vec<PushMessage>) -> Vec<Vec<PushMessage>> {
    messages
        .chunks(MAX_CHUNK)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Delivery seam: one round trip carrying a chunk of messages, returning
/// per-message tickets. Swapped out in tests for a counting mock.
pub trait PushTransport {
    fn deliver(
        &self,
        chunk: &[PushMessage],
    ) -> impl std::future::Future<Output = Result<Vec<PushTicket>, PushError>> + Send;
}

/// Production transport over the Expo push HTTP endpoint, bounded by an
/// explicit request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new() -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PushError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: EXPO_PUSH_URL.to_string(),
        })
    }
}

impl PushTransport for HttpTransport {
    async fn deliver(&self, chunk: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(chunk)
            .send()
            .await
            .map_err(classify_reqwest_error)?
            .error_for_status()
            .map_err(classify_reqwest_error)?;

        let parsed: PushResponse = response
            .json()
            .await
            .map_err(classify_reqwest_error)?;
        Ok(parsed.data)
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> PushError {
    if err.is_timeout() {
        PushError::Timeout
    } else {
        PushError::Transport(err.to_string())
    }
}

pub struct PushClient<T: PushTransport> {
    transport: T,
    behavior: PushBehavior,
}

impl PushClient<HttpTransport> {
    pub fn http(behavior: PushBehavior) -> Result<Self, PushError> {
        Ok(Self::new(HttpTransport::new()?, behavior))
    }
}

impl<T: PushTransport> PushClient<T> {
    pub fn new(transport: T, behavior: PushBehavior) -> Self {
        Self { transport, behavior }
    }

    fn build_message(&self, token: &str, intent: &PushIntent) -> PushMessage {
        PushMessage {
            to: token.to_string(),
            sound: self.behavior.play_sound.then_some("default"),
            title: intent.title.clone(),
            body: intent.body.clone(),
            data: MessageData {
                appointment_id: intent.appointment_id,
                kind: intent.kind.as_str(),
            },
            badge: self.behavior.set_badge.then_some(1),
            priority: if self.behavior.show_alert {
                "high"
            } else {
                "normal"
            },
        }
    }

    /// Delivers one notification. The token is validated before any
    /// network activity; messages go out in provider-sized chunks and a
    /// failed chunk does not stop the remaining ones. Any error ticket
    /// collapses the whole call to failure.
    pub async fn send(&self, token: &str, intent: &PushIntent) -> Result<(), PushError> {
        if !is_valid_push_token(token) {
            tracing::warn!(token, "push token is not a valid Expo token");
            return Err(PushError::InvalidToken);
        }

        let message = self.build_message(token, intent);
        let mut tickets = Vec::new();
        let mut chunk_failure: Option<PushError> = None;

        for chunk in chunked(vec![message]) {
            match self.transport.deliver(&chunk).await {
                Ok(chunk_tickets) => tickets.extend(chunk_tickets),
                Err(err) => {
                    tracing::error!(error = %err, "push chunk delivery failed");
                    if chunk_failure.is_none() {
                        chunk_failure = Some(err);
                    }
                }
            }
        }

        for ticket in &tickets {
            if let Some(id) = &ticket.id {
                tracing::debug!(ticket = %id, "push ticket accepted");
            }
            if ticket.is_error() {
                let message = ticket
                    .message
                    .clone()
                    .unwrap_or_else(|| "unspecified provider error".to_string());
                tracing::error!(%message, "push ticket reported an error");
                return Err(PushError::Rejected(message));
            }
        }

        match chunk_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub async fn notify_new_appointment(
        &self,
        token: &str,
        appointment_id: Uuid,
        customer_name: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), PushError> {
        let intent = PushIntent {
            appointment_id,
            kind: NotificationKind::New,
            title: "🆕 Nuovo Appuntamento".to_string(),
            body: format!("{customer_name} - {}", day_month_time_it(scheduled_at)),
        };
        self.send(token, &intent).await
    }

    pub async fn notify_appointment_updated(
        &self,
        token: &str,
        appointment_id: Uuid,
        customer_name: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<(), PushError> {
        let intent = PushIntent {
            appointment_id,
            kind: NotificationKind::Updated,
            title: "📝 Appuntamento Modificato".to_string(),
            body: format!(
                "{customer_name} - Nuovo orario: {}",
                day_month_time_it(scheduled_at)
            ),
        };
        self.send(token, &intent).await
    }

    pub async fn notify_appointment_cancelled(
        &self,
        token: &str,
        appointment_id: Uuid,
        customer_name: &str,
    ) -> Result<(), PushError> {
        let intent = PushIntent {
            appointment_id,
            kind: NotificationKind::Cancelled,
            title: "❌ Appuntamento Cancellato".to_string(),
            body: format!("L'appuntamento con {customer_name} è stato cancellato"),
        };
        self.send(token, &intent).await
    }

    pub async fn notify_appointment_reminder(
        &self,
        token: &str,
        appointment_id: Uuid,
        customer_name: &str,
        address: &str,
    ) -> Result<(), PushError> {
        let intent = PushIntent {
            appointment_id,
            kind: NotificationKind::Reminder,
            title: "⏰ Promemoria Appuntamento".to_string(),
            body: format!("Tra 30 minuti: {customer_name} - {address}"),
        };
        self.send(token, &intent).await
    }
}

fn day_month_time_it(at: DateTime<Utc>) -> String {
    format!(
        "{} {} {:02}:{:02}",
        at.day(),
        MONTHS_IT[at.month0() as usize],
        at.hour(),
        at.minute()
    )
}
