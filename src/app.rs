// src/app.rs

use std::{sync::Arc, time::Duration};
//
use crate::{
    config::Config,
    customer::Customer,
    dispatch::{SmsDispatcher, Tracker},
    error::{ReportError, TransportError, UnknownColumn},
    gateway::{Gateway, HttpTransport, Transport},
    navigator::Navigator,
};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Sort and search applied to a one-shot render.
#[derive(Clone, Debug, Default)]
pub struct ViewArgs {
    pub sort: Option<String>,
    pub descending: bool,
    pub search: Option<String>,
}

pub struct App {
    pub config: Config,
    pub gateway: Gateway,
    pub tracker: Arc<Tracker>,
    pub sms: SmsDispatcher,
}

impl App {
    pub fn new(config: Config) -> Result<Self, TransportError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.timeout)?);

        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let gateway = Gateway::new(transport.clone(), &config.dashboard_url, &config.customers_url);
        let tracker = Arc::new(Tracker::new(transport.clone(), config.tracking_url.clone()));
        let sms = SmsDispatcher::new(transport, config.sms_endpoint());

        Self { config, gateway, tracker, sms }
    }

    pub fn navigator(&self) -> Navigator {
        Navigator::new(self.config.session.clone(), self.tracker.clone())
    }

    /// Opens `path`, waits for its data and returns the rendered screen.
    pub async fn show(&self, path: &str, args: &ViewArgs) -> Result<String, UnknownColumn> {
        let mut nav = self.navigator();
        let fetch = nav.navigate(path);

        // a redirect to sign-in has no table to sort
        if nav.route().has_table() {
            if let Some(key) = &args.sort {
                nav.set_sort(key, args.descending)?;
            }
            if let Some(term) = &args.search {
                nav.search(term);
            }
        }

        if let Some(fetch) = fetch {
            let outcome = fetch.run(&self.gateway).await;
            nav.apply(outcome);
        }

        Ok(nav.render())
    }

    /// Texts the customer's TAM a link to the public report.
    pub async fn send_report(&self, customer: &Customer) -> Result<String, ReportError> {
        let link = self.config.report_link(&customer.id);
        self.sms.send(customer.tam_phone.as_deref(), &link).await?;

        Ok(format!(
            "Report for {} sent via SMS to {}.",
            customer.name.as_deref().unwrap_or(&customer.id),
            customer.tam_phone.as_deref().unwrap_or_default()
        ))
    }

    /// Looks the customer up in a fresh list, then sends the report.
    pub async fn send_report_by_id(&self, customer_id: &str) -> Result<String, ReportError> {
        let customers = self.gateway.fetch_customers().await?;
        let customer = customers
            .iter()
            .find(|c| c.id == customer_id)
            .ok_or_else(|| ReportError::UnknownCustomer(customer_id.to_string()))?;

        self.send_report(customer).await
    }

    pub async fn shutdown(&self) {
        self.tracker.flush(FLUSH_TIMEOUT).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SmsError, gateway::testing::ScriptedTransport, session::Session};

    fn config(session: Session) -> Config {
        let mut config = Config::from_lookup(|name| match name {
            "IDENTITY_PUBLISHABLE_KEY" => Some("pk_test".into()),
            "DASHBOARD_URL" => Some("http://flows.test/dashboard".into()),
            "CUSTOMERS_URL" => Some("http://flows.test/customers".into()),
            "REPORT_BASE_URL" => Some("http://reports.test".into()),
            _ => None,
        })
        .unwrap();
        config.session = session;
        config
    }

    const CUSTOMERS: &str = r#"{ "value": [
        { "id": "c1", "name": "Alpine Eye", "tam": "Dana Ortiz", "tamPhone": "+15550001", "isFocusAccount": "Yes" },
        { "id": "c2", "name": "Bright Vision", "tam": "Sam Cheng", "isFocusAccount": "No" }
    ] }"#;

    #[tokio::test]
    async fn show_applies_sort_and_search() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, CUSTOMERS));
        let app = App::with_transport(config(Session::signed_in("u", "u@example.com")), transport);

        let args = ViewArgs {
            sort: Some("isTop12Focus".into()),
            descending: true,
            search: None,
        };
        let screen = app.show("/all", &args).await.unwrap();
        assert!(screen.contains("Top 12 Focus ▼"));
        assert!(screen.find("Bright Vision").unwrap() < screen.find("Alpine Eye").unwrap());
    }

    #[tokio::test]
    async fn show_rejects_unknown_sort_column() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, CUSTOMERS));
        let app = App::with_transport(config(Session::signed_in("u", "u@example.com")), transport);

        let args = ViewArgs { sort: Some("revenue".into()), ..ViewArgs::default() };
        assert!(app.show("/all", &args).await.is_err());
    }

    #[tokio::test]
    async fn signed_out_show_with_sort_lands_on_sign_in() {
        let transport = Arc::new(ScriptedTransport::new());
        let app = App::with_transport(config(Session::signed_out()), transport.clone());

        let args = ViewArgs {
            sort: Some("name".into()),
            descending: true,
            search: Some("eye".into()),
        };
        let screen = app.show("/all", &args).await.unwrap();
        assert!(screen.contains("Sign in required"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn report_goes_to_public_link() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, CUSTOMERS)
                .reply(200, r#"{ "success": true }"#),
        );
        let app = App::with_transport(config(Session::signed_in("u", "u@example.com")), transport.clone());

        let message = app.send_report_by_id("c1").await.unwrap();
        assert_eq!(message, "Report for Alpine Eye sent via SMS to +15550001.");

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[1].0, "http://localhost:3001/api/send-sms");
        assert_eq!(requests[1].1["reportLink"], "http://reports.test/public/dashboard/c1");
    }

    #[tokio::test]
    async fn report_without_phone_is_refused() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, CUSTOMERS));
        let app = App::with_transport(config(Session::signed_in("u", "u@example.com")), transport.clone());

        let err = app.send_report_by_id("c2").await.unwrap_err();
        assert_eq!(err, ReportError::Sms(SmsError::NoPhoneOnRecord));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn report_for_unknown_customer() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, CUSTOMERS));
        let app = App::with_transport(config(Session::signed_in("u", "u@example.com")), transport);

        let err = app.send_report_by_id("c9").await.unwrap_err();
        assert_eq!(err, ReportError::UnknownCustomer("c9".into()));
    }
}
