// src/session.rs

use serde::{Deserialize, Serialize};

/// Identity context handed to whatever needs it. Sign-in itself happens at the
/// identity provider; this only carries the outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    pub signed_in: bool,
    pub user_id: String,
    pub user_email: String,
}

impl Session {
    pub fn signed_in(user_id: impl Into<String>, user_email: impl Into<String>) -> Self {
        Self {
            signed_in: true,
            user_id: user_id.into(),
            user_email: user_email.into(),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}
