// src/customer.rs

use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
//
use crate::derive::{FieldValue, Record};

/// Sentinel the workflow uses for a focus account. Matched exactly.
pub const FOCUS_ACCOUNT_YES: &str = "Yes";

/// One practice as the customer-list workflow sends it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCustomer {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tam: Option<String>,
    #[serde(default)]
    pub tam_phone: Option<String>,
    #[serde(default)]
    pub tam_email: Option<String>,
    #[serde(default)]
    pub is_focus_account: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: String,
    pub name: Option<String>,
    pub tam: Option<String>,
    pub tam_phone: Option<String>,
    pub tam_email: Option<String>,
    pub is_focus: bool,
}

impl From<RawCustomer> for Customer {
    fn from(raw: RawCustomer) -> Self {
        let id = match raw.id {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        Self {
            id,
            name: non_blank(raw.name),
            tam: non_blank(raw.tam),
            tam_phone: non_blank(raw.tam_phone),
            tam_email: non_blank(raw.tam_email),
            is_focus: raw.is_focus_account.as_deref() == Some(FOCUS_ACCOUNT_YES),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomerField {
    Id,
    Name,
    Tam,
    TamPhone,
    TamEmail,
    Focus,
}

impl CustomerField {
    /// Accepts the workflow's field names as well as short forms.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "tam" => Some(Self::Tam),
            "tamPhone" | "phone" => Some(Self::TamPhone),
            "tamEmail" | "email" => Some(Self::TamEmail),
            "isTop12Focus" | "isFocusAccount" | "focus" => Some(Self::Focus),
            _ => None,
        }
    }
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Tam => "tam",
            Self::TamPhone => "tamPhone",
            Self::TamEmail => "tamEmail",
            Self::Focus => "isTop12Focus",
        };
        f.write_str(key)
    }
}

impl Record for Customer {
    type Field = CustomerField;

    fn value(&self, field: CustomerField) -> FieldValue<'_> {
        match field {
            CustomerField::Id => FieldValue::Text(Some(&self.id)),
            CustomerField::Name => FieldValue::Text(self.name.as_deref()),
            CustomerField::Tam => FieldValue::Text(self.tam.as_deref()),
            CustomerField::TamPhone => FieldValue::Text(self.tam_phone.as_deref()),
            CustomerField::TamEmail => FieldValue::Text(self.tam_email.as_deref()),
            CustomerField::Focus => FieldValue::Flag(self.is_focus),
        }
    }

    fn label(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
