// src/metrics.rs

use std::{fmt, iter::Sum, ops::Add};
use serde::{Deserialize, Serialize};
//
use crate::derive::{FieldValue, Record};

/// Prescriber label the workflow uses for activity with no assigned provider.
pub const NO_PROVIDER_LABEL: &str = "No provider";

/// The four counters every metric row carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub measurements: u64,
    pub portal_views: u64,
    pub high_sx: u64,
    pub orders: u64,
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            measurements: self.measurements.saturating_add(rhs.measurements),
            portal_views: self.portal_views.saturating_add(rhs.portal_views),
            high_sx: self.high_sx.saturating_add(rhs.high_sx),
            orders: self.orders.saturating_add(rhs.orders),
        }
    }
}

impl<'a> Sum<&'a Counts> for Counts {
    fn sum<I: Iterator<Item = &'a Counts>>(iter: I) -> Counts {
        iter.fold(Counts::default(), |acc, c| acc + *c)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    Measurements,
    PortalViews,
    HighSx,
    Orders,
}

impl Counter {
    pub const ALL: [Counter; 4] = [
        Counter::Measurements,
        Counter::PortalViews,
        Counter::HighSx,
        Counter::Orders,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Counter::Measurements => "Measurements",
            Counter::PortalViews => "Portal Views",
            Counter::HighSx => "Highly Symptomatic",
            Counter::Orders => "Orders",
        }
    }
}

impl Counts {
    pub fn get(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Measurements => self.measurements,
            Counter::PortalViews => self.portal_views,
            Counter::HighSx => self.high_sx,
            Counter::Orders => self.orders,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriberRow {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(flatten)]
    pub counts: Counts,
}

impl PrescriberRow {
    pub fn chart_label(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRow {
    #[serde(alias = "name")]
    pub day: String,
    #[serde(flatten)]
    pub counts: Counts,
}

/// Body of a successful dashboard fetch.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub practice_name: String,
    pub date_range: String,
    pub prescriber_data: Vec<PrescriberRow>,
    pub daily_data: Vec<DailyRow>,
    pub patients_helped: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrescriberField {
    Name,
    ShortName,
    Count(Counter),
}

impl PrescriberField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "shortName" => Some(Self::ShortName),
            "measurements" | "measures" => Some(Self::Count(Counter::Measurements)),
            "portalViews" => Some(Self::Count(Counter::PortalViews)),
            "highSx" => Some(Self::Count(Counter::HighSx)),
            "orders" => Some(Self::Count(Counter::Orders)),
            _ => None,
        }
    }
}

impl fmt::Display for PrescriberField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::Name => "name",
            Self::ShortName => "shortName",
            Self::Count(Counter::Measurements) => "measurements",
            Self::Count(Counter::PortalViews) => "portalViews",
            Self::Count(Counter::HighSx) => "highSx",
            Self::Count(Counter::Orders) => "orders",
        };
        f.write_str(key)
    }
}

impl Record for PrescriberRow {
    type Field = PrescriberField;

    fn value(&self, field: PrescriberField) -> FieldValue<'_> {
        match field {
            PrescriberField::Name => FieldValue::Text(Some(&self.name)),
            PrescriberField::ShortName => FieldValue::Text(self.short_name.as_deref()),
            PrescriberField::Count(c) => FieldValue::Count(self.counts.get(c)),
        }
    }

    fn label(&self) -> Option<&str> {
        Some(&self.name)
    }
}
