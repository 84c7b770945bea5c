// src/derive.rs

use std::{
    cmp::Ordering,
    fmt::{Debug, Display},
};
//
use crate::{
    customer::{Customer, CustomerField},
    metrics::{Counter, Counts, DailyRow, DashboardPayload, PrescriberField, PrescriberRow, NO_PROVIDER_LABEL},
};

/// A field as seen by the sort and filter code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Flag(bool),
    Count(u64),
    /// `None` sorts as the empty string.
    Text(Option<&'a str>),
}

pub trait Record {
    type Field: Copy + Eq + Debug + Display;

    fn value(&self, field: Self::Field) -> FieldValue<'_>;

    /// Display name, used to recognise sentinel rows.
    fn label(&self) -> Option<&str>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn indicator(self) -> &'static str {
        match self {
            Direction::Ascending => " ▲",
            Direction::Descending => " ▼",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: K,
    pub direction: Direction,
}

impl<K: Copy + Eq> SortState<K> {
    pub fn ascending(key: K) -> Self {
        Self { key, direction: Direction::Ascending }
    }

    pub fn descending(key: K) -> Self {
        Self { key, direction: Direction::Descending }
    }

    /// Header click: the active ascending column flips to descending, anything
    /// else becomes the ascending key.
    pub fn toggle(&mut self, key: K) {
        self.direction = if self.key == key && self.direction == Direction::Ascending {
            Direction::Descending
        } else {
            Direction::Ascending
        };
        self.key = key;
    }
}

fn compare_values(a: FieldValue<'_>, b: FieldValue<'_>, direction: Direction) -> Ordering {
    let ordering = match (a, b) {
        // true leads when ascending
        (FieldValue::Flag(a), FieldValue::Flag(b)) => b.cmp(&a),
        (FieldValue::Count(a), FieldValue::Count(b)) => a.cmp(&b),
        (FieldValue::Text(a), FieldValue::Text(b)) => a.unwrap_or_default().cmp(b.unwrap_or_default()),
        (a, b) => coerce(a).cmp(&coerce(b)),
    };

    match direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}

fn coerce(value: FieldValue<'_>) -> String {
    match value {
        FieldValue::Flag(b) => b.to_string(),
        FieldValue::Count(n) => n.to_string(),
        FieldValue::Text(t) => t.unwrap_or_default().to_string(),
    }
}

/// Stable sort; rows labelled `sentinel` always go last.
pub fn sort_rows<R: Record>(rows: &mut [R], state: &SortState<R::Field>, sentinel: Option<&str>) {
    let is_sentinel = |r: &R| sentinel.is_some() && r.label() == sentinel;

    // slice::sort_by is stable, equal rows keep their source order
    rows.sort_by(|a, b| match (is_sentinel(a), is_sentinel(b)) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => compare_values(a.value(state.key), b.value(state.key), state.direction),
    });
}

/// Case-insensitive substring match on any of `fields`. Only an empty term
/// keeps every row; whitespace is part of the term.
pub fn matches<R: Record>(row: &R, term: &str, fields: &[R::Field]) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();

    fields.iter().any(|field| match row.value(*field) {
        FieldValue::Text(Some(text)) => text.to_lowercase().contains(&needle),
        _ => false,
    })
}

/// Filters then sorts a copy of `source`; the source is left untouched.
pub fn derive_rows<R: Record + Clone>(
    source: &[R],
    state: &SortState<R::Field>,
    term: &str,
    fields: &[R::Field],
    sentinel: Option<&str>,
) -> Vec<R> {
    let mut rows: Vec<R> = source
        .iter()
        .filter(|row| matches(*row, term, fields))
        .cloned()
        .collect();

    sort_rows(&mut rows, state, sentinel);

    rows
}

pub const CUSTOMER_SEARCH_FIELDS: [CustomerField; 2] = [CustomerField::Name, CustomerField::Tam];
pub const PRESCRIBER_SEARCH_FIELDS: [PrescriberField; 2] = [PrescriberField::Name, PrescriberField::ShortName];

pub fn default_customer_sort() -> SortState<CustomerField> {
    SortState::ascending(CustomerField::Name)
}

pub fn default_prescriber_sort() -> SortState<PrescriberField> {
    SortState::descending(PrescriberField::Count(Counter::HighSx))
}

pub fn derive_customers(source: &[Customer], state: &SortState<CustomerField>, term: &str) -> Vec<Customer> {
    derive_rows(source, state, term, &CUSTOMER_SEARCH_FIELDS, None)
}

/// How the authoritative "patients helped" figure relates to the orders that
/// could be matched to a prescriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub patients_helped: u64,
    /// Summed in 128 bits so no row count or counter size can wrap it.
    pub known_orders: u128,
    /// `patients_helped - known_orders`, kept signed. Negative means upstream
    /// counted more matched orders than patients helped.
    pub unknown: i128,
}

impl Reconciliation {
    pub fn new(patients_helped: u64, rows: &[PrescriberRow]) -> Self {
        let known_orders: u128 = rows.iter().map(|r| u128::from(r.counts.orders)).sum();
        let unknown = i128::from(patients_helped) - known_orders as i128;

        if unknown < 0 {
            tracing::warn!(patients_helped, %known_orders, %unknown, "matched orders exceed patients helped");
        }

        Self { patients_helped, known_orders, unknown }
    }

    /// The synthetic "Unknown" row appears only for a positive remainder.
    pub fn unknown_row(&self) -> Option<u64> {
        u64::try_from(self.unknown).ok().filter(|n| *n > 0)
    }

    pub fn is_overcounted(&self) -> bool {
        self.unknown < 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardView {
    pub practice_name: String,
    pub date_range: String,
    pub prescribers: Vec<PrescriberRow>,
    pub daily: Vec<DailyRow>,
    /// Sums over every prescriber row, regardless of the filter.
    pub totals: Counts,
    pub reconciliation: Reconciliation,
}

impl DashboardView {
    /// Orders cell of the totals row: the authoritative figure, which already
    /// includes unmatched orders.
    pub fn total_orders(&self) -> u64 {
        self.reconciliation.patients_helped
    }
}

pub fn derive_dashboard(payload: &DashboardPayload, state: &SortState<PrescriberField>, term: &str) -> DashboardView {
    let totals: Counts = payload.prescriber_data.iter().map(|r| &r.counts).sum();

    DashboardView {
        practice_name: payload.practice_name.clone(),
        date_range: payload.date_range.clone(),
        prescribers: derive_rows(
            &payload.prescriber_data,
            state,
            term,
            &PRESCRIBER_SEARCH_FIELDS,
            Some(NO_PROVIDER_LABEL),
        ),
        daily: payload.daily_data.clone(),
        totals,
        reconciliation: Reconciliation::new(payload.patients_helped, &payload.prescriber_data),
    }
}
