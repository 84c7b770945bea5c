// src/config.rs

use std::time::Duration;
//
use crate::{error::ConfigError, session::Session};

pub const DEFAULT_SMS_BACKEND_URL: &str = "http://localhost:3001";
pub const DEFAULT_REPORT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct Config {
    pub identity_key: String,
    pub dashboard_url: String,
    pub customers_url: String,
    pub tracking_url: Option<String>,
    pub sms_backend_url: String,
    pub report_base_url: String,
    pub timeout: Duration,
    pub session: Session,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        // without the identity key there is no session to gate on
        let identity_key = require("IDENTITY_PUBLISHABLE_KEY")?;
        let dashboard_url = require("DASHBOARD_URL")?;
        let customers_url = require("CUSTOMERS_URL")?;

        let timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                value: raw.clone(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let session = match get("SESSION_USER_ID") {
            Some(user_id) => Session::signed_in(user_id, get("SESSION_USER_EMAIL").unwrap_or_default()),
            None => Session::signed_out(),
        };

        Ok(Self {
            identity_key,
            dashboard_url,
            customers_url,
            tracking_url: get("TRACKING_URL"),
            sms_backend_url: trim_base(get("SMS_BACKEND_URL").as_deref().unwrap_or(DEFAULT_SMS_BACKEND_URL)),
            report_base_url: trim_base(get("REPORT_BASE_URL").as_deref().unwrap_or(DEFAULT_REPORT_BASE_URL)),
            timeout: Duration::from_secs(timeout),
            session,
        })
    }

    pub fn sms_endpoint(&self) -> String {
        format!("{}/api/send-sms", self.sms_backend_url)
    }

    /// Public, unauthenticated link to a practice's report.
    pub fn report_link(&self, practice_id: &str) -> String {
        format!("{}/public/dashboard/{}", self.report_base_url, practice_id)
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("IDENTITY_PUBLISHABLE_KEY", "pk_test_123"),
        ("DASHBOARD_URL", "https://flows.example.com/dashboard"),
        ("CUSTOMERS_URL", "https://flows.example.com/customers"),
    ];

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.sms_endpoint(), "http://localhost:3001/api/send-sms");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.tracking_url.is_none());
        assert!(!config.session.signed_in);
    }

    #[test]
    fn missing_identity_key_is_fatal() {
        let err = Config::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("IDENTITY_PUBLISHABLE_KEY"));
    }

    #[test]
    fn blank_identity_key_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("IDENTITY_PUBLISHABLE_KEY", "   ");
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("IDENTITY_PUBLISHABLE_KEY"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("REQUEST_TIMEOUT_SECS", "soon"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "REQUEST_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn session_and_links_come_from_settings() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("SESSION_USER_ID", "user_42"),
            ("SESSION_USER_EMAIL", "tam@example.com"),
            ("REPORT_BASE_URL", "https://reports.example.com/"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.session.signed_in);
        assert_eq!(config.session.user_id, "user_42");
        assert_eq!(
            config.report_link("p-1"),
            "https://reports.example.com/public/dashboard/p-1"
        );
    }
}
