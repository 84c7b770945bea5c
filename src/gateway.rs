// src/gateway.rs

use std::{sync::Arc, time::Duration};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
//
use crate::{
    customer::{Customer, RawCustomer},
    error::{FetchError, TransportError},
    metrics::DashboardPayload,
};

/// Status line and raw body of an HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, TransportError>;
}

/// `Transport` over a shared reqwest client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, TransportError> {
        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Unreachable(e.to_string())
            } else if e.is_timeout() {
                TransportError::Unreachable(format!("timed out after {}s", self.timeout.as_secs()))
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(HttpReply {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[derive(Deserialize)]
struct CustomerList {
    value: Vec<RawCustomer>,
}

/// Client for the two workflow endpoints that feed the pages.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    dashboard_url: String,
    customers_url: String,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, dashboard_url: impl Into<String>, customers_url: impl Into<String>) -> Self {
        Self {
            transport,
            dashboard_url: dashboard_url.into(),
            customers_url: customers_url.into(),
        }
    }

    /// One POST of `{ practiceId }`. A missing or blank id fails before any
    /// request is made.
    pub async fn fetch_dashboard(&self, practice_id: Option<&str>) -> Result<DashboardPayload, FetchError> {
        let practice_id = practice_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(FetchError::MissingPracticeId)?;

        tracing::info!(practice_id = %practice_id, "fetching dashboard");

        let data = self
            .post(&self.dashboard_url, json!({ "practiceId": practice_id }), "dashboard data")
            .await?;

        if !data.is_object() {
            return Err(unexpected(&data));
        }

        decode::<DashboardPayload>(data)
    }

    /// One POST of `{}`; the list is read from the `value` array.
    pub async fn fetch_customers(&self) -> Result<Vec<Customer>, FetchError> {
        tracing::info!("fetching customer list");

        let data = self.post(&self.customers_url, json!({}), "customer data").await?;

        if !data.is_object() {
            return Err(unexpected(&data));
        }

        let list = decode::<CustomerList>(data)?;
        let customers: Vec<Customer> = list.value.into_iter().map(Customer::from).collect();

        tracing::info!(count = customers.len(), "customer list loaded");

        Ok(customers)
    }

    async fn post(&self, url: &str, body: Value, what: &'static str) -> Result<Value, FetchError> {
        let reply = self.transport.post_json(url, &body).await.map_err(|e| {
            tracing::error!(error = %e, what, "request did not reach the gateway");
            FetchError::from(e)
        })?;

        if !reply.is_success() {
            tracing::error!(status = reply.status, what, "gateway returned an error status");
            return Err(FetchError::RequestFailed {
                what,
                status: reply.status,
                status_text: reply.status_text,
            });
        }

        serde_json::from_str(&reply.body).map_err(|e| {
            tracing::error!(error = %e, what, "gateway body is not JSON");
            FetchError::Parse(e.to_string())
        })
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, FetchError> {
    serde_json::from_value(data.clone()).map_err(|e| {
        tracing::error!(error = %e, payload = %data, "unexpected response shape");
        FetchError::UnexpectedFormat
    })
}

fn unexpected(data: &Value) -> FetchError {
    tracing::error!(payload = %data, "unexpected response shape");
    FetchError::UnexpectedFormat
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    const DASHBOARD: &str = r#"{
        "practiceName": "Cheyne Eye Center",
        "dateRange": "3/24/25 - 3/29/25",
        "prescriberData": [
            { "name": "Manuel Debesa", "shortName": "M. Debesa", "measurements": 27, "portalViews": 27, "highSx": 13, "orders": 0 },
            { "name": "Chris Cheyne", "shortName": "C. Cheyne", "measurements": 18, "portalViews": 18, "highSx": 10, "orders": 1 }
        ],
        "dailyData": [
            { "name": "Mon 03/24", "measurements": 34, "portalViews": 27, "highSx": 14, "orders": 0 }
        ],
        "patientsHelped": 4
    }"#;

    fn gateway(transport: Arc<ScriptedTransport>) -> Gateway {
        Gateway::new(transport, "https://flows.test/dashboard", "https://flows.test/customers")
    }

    #[tokio::test]
    async fn dashboard_posts_practice_id() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, DASHBOARD));
        let payload = gateway(transport.clone()).fetch_dashboard(Some("p-17")).await.unwrap();

        assert_eq!(payload.practice_name, "Cheyne Eye Center");
        assert_eq!(payload.prescriber_data.len(), 2);
        assert_eq!(payload.daily_data[0].day, "Mon 03/24");
        assert_eq!(payload.patients_helped, 4);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, "https://flows.test/dashboard");
        assert_eq!(requests[0].1, json!({ "practiceId": "p-17" }));
    }

    #[tokio::test]
    async fn missing_practice_id_never_hits_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let gw = gateway(transport.clone());

        assert_eq!(gw.fetch_dashboard(None).await, Err(FetchError::MissingPracticeId));
        assert_eq!(gw.fetch_dashboard(Some("  ")).await, Err(FetchError::MissingPracticeId));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn server_error_reports_status() {
        let transport = Arc::new(ScriptedTransport::new().reply(500, "boom"));
        let err = gateway(transport).fetch_dashboard(Some("p1")).await.unwrap_err();

        assert!(matches!(err, FetchError::RequestFailed { status: 500, .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn invalid_json_is_surfaced_as_parse_error() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, "<html>oops</html>"));
        let err = gateway(transport).fetch_customers().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_server() {
        let transport = Arc::new(ScriptedTransport::new().fail(TransportError::Unreachable("refused".into())));
        let err = gateway(transport).fetch_customers().await.unwrap_err();
        assert_eq!(err.to_string(), "Could not reach server.");
    }

    #[tokio::test]
    async fn customers_are_read_from_value_array() {
        let body = r#"{ "value": [
            { "id": "c1", "name": "Cheyne Eye Center", "tam": "Dana Ortiz", "tamPhone": "+15550001", "isFocusAccount": "Yes" },
            { "id": "c2", "name": "Bright Vision", "tam": "Sam Cheng", "isFocusAccount": "No" }
        ] }"#;
        let transport = Arc::new(ScriptedTransport::new().reply(200, body));
        let customers = gateway(transport.clone()).fetch_customers().await.unwrap();

        assert_eq!(customers.len(), 2);
        assert!(customers[0].is_focus);
        assert!(!customers[1].is_focus);
        assert_eq!(transport.requests.lock().unwrap()[0].1, json!({}));
    }

    #[tokio::test]
    async fn customer_body_without_array_is_unexpected() {
        for body in [r#"{ "items": [] }"#, r#"{ "value": {} }"#, "[]", "null"] {
            let transport = Arc::new(ScriptedTransport::new().reply(200, body));
            let err = gateway(transport).fetch_customers().await.unwrap_err();
            assert_eq!(err, FetchError::UnexpectedFormat, "body {body}");
            assert_eq!(err.to_string(), "Received unexpected data format from the server.");
        }
    }

    #[tokio::test]
    async fn dashboard_with_wrong_shape_is_unexpected() {
        for body in [r#"{ "practiceName": "X" }"#, "[1, 2]", r#""text""#] {
            let transport = Arc::new(ScriptedTransport::new().reply(200, body));
            let err = gateway(transport).fetch_dashboard(Some("p1")).await.unwrap_err();
            assert_eq!(err, FetchError::UnexpectedFormat, "body {body}");
        }
    }
}
