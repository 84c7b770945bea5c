// src/dispatch.rs

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
//
use crate::{error::SmsError, gateway::Transport, session::Session};

/// Where the client is running, reported with every tracking event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub device: String,
    pub os: String,
    pub browser: String,
}

impl ClientInfo {
    pub fn current() -> Self {
        Self {
            device: "terminal".to_string(),
            os: std::env::consts::OS.to_string(),
            browser: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub event_type: String,
    pub user_id: String,
    pub user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub practice_id: Option<String>,
    pub device: String,
    pub os: String,
    pub browser: String,
    pub timestamp: String,
}

impl TrackingEvent {
    pub fn page_view(session: &Session, practice_id: Option<&str>, client: &ClientInfo) -> Self {
        Self {
            event_type: "page_view".to_string(),
            user_id: session.user_id.clone(),
            user_email: session.user_email.clone(),
            practice_id: practice_id.map(str::to_string),
            device: client.device.clone(),
            os: client.os.clone(),
            browser: client.browser.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Fire-and-forget analytics. `send` never waits on the network; outcomes only
/// reach the log.
pub struct Tracker {
    transport: Arc<dyn Transport>,
    url: Option<String>,
    client: ClientInfo,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Tracker {
    pub fn new(transport: Arc<dyn Transport>, url: Option<String>) -> Self {
        Self {
            transport,
            url,
            client: ClientInfo::current(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Records a page view for a signed-in user. Signed-out views are not tracked.
    pub fn page_view(&self, session: &Session, practice_id: Option<&str>) {
        if !session.signed_in {
            return;
        }

        self.send(TrackingEvent::page_view(session, practice_id, &self.client));
    }

    pub fn send(&self, event: TrackingEvent) {
        let Some(url) = self.url.clone() else {
            tracing::debug!(event_type = %event.event_type, "tracking disabled, event dropped");
            return;
        };

        let body = match serde_json::to_value(&event) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode tracking event");
                return;
            }
        };

        let transport = self.transport.clone();
        let handle = tokio::spawn(async move {
            match transport.post_json(&url, &body).await {
                Ok(reply) if reply.is_success() => {
                    tracing::debug!(event_type = %event.event_type, "tracking event recorded");
                }
                Ok(reply) => {
                    tracing::warn!(status = reply.status, event_type = %event.event_type, "tracking sink rejected event");
                }
                Err(e) => {
                    tracing::warn!(error = %e, event_type = %event.event_type, "tracking sink unreachable");
                }
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Gives outstanding events up to `timeout` to finish before exit.
    pub async fn flush(&self, timeout: Duration) {
        let handles: Vec<JoinHandle<()>> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return,
        };

        if handles.is_empty() {
            return;
        }

        if tokio::time::timeout(timeout, futures::future::join_all(handles)).await.is_err() {
            tracing::warn!("tracking events still in flight at exit");
        }
    }
}

/// Allows one SMS request at a time.
#[derive(Debug, Default)]
pub struct SmsGate {
    busy: AtomicBool,
}

static PROCESS_SMS_GATE: SmsGate = SmsGate::new();

impl SmsGate {
    pub const fn new() -> Self {
        Self { busy: AtomicBool::new(false) }
    }

    /// The gate shared by every dispatcher in this process.
    pub fn process() -> &'static SmsGate {
        &PROCESS_SMS_GATE
    }

    pub fn try_acquire(&self) -> Option<SmsPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SmsPermit { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held while a request is outstanding; dropping it reopens the gate.
pub struct SmsPermit<'a> {
    gate: &'a SmsGate,
}

impl Drop for SmsPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[derive(Deserialize)]
struct SmsReply {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct SmsDispatcher {
    transport: Arc<dyn Transport>,
    endpoint: String,
    gate: &'static SmsGate,
}

impl SmsDispatcher {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self::with_gate(transport, endpoint, SmsGate::process())
    }

    pub fn with_gate(transport: Arc<dyn Transport>, endpoint: impl Into<String>, gate: &'static SmsGate) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            gate,
        }
    }

    /// Sends one report link. A second call while one is outstanding is refused
    /// without touching the network.
    pub async fn send(&self, phone: Option<&str>, report_link: &str) -> Result<(), SmsError> {
        let phone = phone.map(str::trim).filter(|p| !p.is_empty()).ok_or(SmsError::NoPhoneOnRecord)?;

        let _permit = self.gate.try_acquire().ok_or_else(|| {
            tracing::info!("sms request refused, another is in flight");
            SmsError::AlreadySending
        })?;

        let body = serde_json::json!({
            "recipientPhoneNumber": phone,
            "reportLink": report_link,
        });

        let reply = self.transport.post_json(&self.endpoint, &body).await.map_err(|e| {
            tracing::warn!(error = %e, "sms backend unreachable");
            SmsError::Unreachable
        })?;

        if !reply.is_success() {
            tracing::warn!(status = reply.status, "sms backend returned an error status");
            return Err(SmsError::RequestFailed { status: reply.status });
        }

        let parsed: SmsReply = serde_json::from_str(&reply.body).map_err(|e| {
            tracing::warn!(error = %e, body = %reply.body, "sms backend reply unreadable");
            SmsError::BadReply(e.to_string())
        })?;

        if !parsed.success {
            let reason = parsed.error.unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(reason = %reason, "sms backend refused the message");
            return Err(SmsError::Rejected(reason));
        }

        tracing::info!(report_link, "sms dispatched");

        Ok(())
    }
}
