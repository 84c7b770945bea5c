// src/render.rs

use std::fmt::Write;
//
use crate::{
    customer::{Customer, CustomerField},
    derive::{DashboardView, Direction, SortState},
    error::FetchError,
    metrics::{Counter, Counts, PrescriberField},
    session::Session,
};

pub const RETRY_SUGGESTION: &str =
    "Please check your connection or try again later. If the problem persists, contact support.";
pub const UNKNOWN_PRESCRIBER_NOTE: &str = "* Orders placed with SpecCheck typically appear per unique prescriber. \
Unknown prescriber values are counts for patient measurements not assigned a provider and/or orders not matched to a patient.";
pub const MISSING: &str = "N/A";
const BAR_WIDTH: u64 = 40;
const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartStyle {
    Bar,
    Area,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Prescriber,
    Count(Counter),
}

impl Column {
    pub fn title(self) -> &'static str {
        match self {
            Column::Prescriber => "Prescriber",
            Column::Count(Counter::Measurements) => "Measures",
            Column::Count(Counter::PortalViews) => "Portal Views",
            Column::Count(Counter::HighSx) => "High Sx",
            Column::Count(Counter::Orders) => "Orders",
        }
    }

    pub fn sort_field(self) -> PrescriberField {
        match self {
            Column::Prescriber => PrescriberField::Name,
            Column::Count(c) => PrescriberField::Count(c),
        }
    }
}

/// Which parts of the dashboard to draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewConfig {
    pub columns: Vec<Column>,
    pub trend_chart: ChartStyle,
    pub daily_table: bool,
}

impl ViewConfig {
    pub fn full() -> Self {
        Self {
            columns: std::iter::once(Column::Prescriber)
                .chain(Counter::ALL.into_iter().map(Column::Count))
                .collect(),
            trend_chart: ChartStyle::Area,
            daily_table: true,
        }
    }

    /// Layout for the unauthenticated report link.
    pub fn public() -> Self {
        Self {
            daily_table: false,
            ..Self::full()
        }
    }
}

/// The current page, already derived and ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub enum Screen<'a> {
    SignIn(&'a Session),
    NotFound(&'a str),
    Loading(&'static str),
    Failed(&'static str, &'a FetchError),
    Customers {
        rows: Vec<Customer>,
        sort: SortState<CustomerField>,
        term: &'a str,
    },
    Dashboard {
        view: DashboardView,
        layout: ViewConfig,
        sort: SortState<PrescriberField>,
    },
}

impl Screen<'_> {
    /// The loaded table pages.
    pub fn has_data(&self) -> bool {
        matches!(self, Screen::Customers { .. } | Screen::Dashboard { .. })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

struct Table {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: Vec<String>, align: Vec<Align>) -> Self {
        Self { headers, align, rows: Vec::new() }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .chain(std::iter::once(&self.headers[i]))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| {
            cells
                .iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths[i], self.align[i]))
                .collect::<Vec<_>>()
                .join(" │ ")
        };

        let mut out = String::new();
        let _ = writeln!(out, "{}", line(&self.headers));
        let _ = writeln!(
            out,
            "{}",
            widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("─┼─")
        );
        for row in &self.rows {
            let _ = writeln!(out, "{}", line(row));
        }
        out
    }
}

fn pad(cell: &str, width: usize, align: Align) -> String {
    let gap = width.saturating_sub(cell.chars().count());
    match align {
        Align::Left => format!("{}{}", cell, " ".repeat(gap)),
        Align::Center => {
            let left = gap / 2;
            format!("{}{}{}", " ".repeat(left), cell, " ".repeat(gap - left))
        }
    }
}

/// Column title with the sort indicator when it is the active key.
pub fn sort_header<K: PartialEq + Copy>(title: &str, key: K, sort: &SortState<K>) -> String {
    if sort.key == key {
        format!("{}{}", title, sort.direction.indicator())
    } else {
        title.to_string()
    }
}

pub fn render_loading(what: &str) -> String {
    format!("Loading {}...\n", what)
}

pub fn render_error(what: &str, error: &FetchError) -> String {
    format!("Error Loading {}\n\n{}\n{}\n", what, error, RETRY_SUGGESTION)
}

/// Plain-text form of a screen, for one-shot output.
pub fn render_screen(screen: &Screen<'_>) -> String {
    match screen {
        Screen::SignIn(session) => render_login(session),
        Screen::NotFound(path) => render_not_found(path),
        Screen::Loading(what) => render_loading(what),
        Screen::Failed(what, e) => render_error(what, e),
        Screen::Customers { rows, sort, term } => render_customers(rows, sort, term),
        Screen::Dashboard { view, layout, sort } => render_dashboard(view, layout, sort),
    }
}

pub fn render_login(session: &Session) -> String {
    if session.signed_in {
        return format!("Signed in as {}.\n", session.user_email);
    }

    "Sign in required.\n\nSign in with your identity provider, then set SESSION_USER_ID and \
SESSION_USER_EMAIL and open /all-customers.\n"
        .to_string()
}

pub fn render_not_found(path: &str) -> String {
    format!("Nothing here: {}\n", path)
}

pub fn render_customers(rows: &[Customer], sort: &SortState<CustomerField>, term: &str) -> String {
    let mut out = String::from("Weekly Performance Summaries\n\n");
    if !term.is_empty() {
        let _ = writeln!(out, "Search: {}\n", term);
    }

    if rows.is_empty() {
        out.push_str(if term.is_empty() {
            "No customer data available.\n"
        } else {
            "No customers match your search.\n"
        });
        return out;
    }

    let mut table = Table::new(
        vec![
            sort_header("Customer Name", CustomerField::Name, sort),
            sort_header("TAM", CustomerField::Tam, sort),
            sort_header("Top 12 Focus", CustomerField::Focus, sort),
            "SMS".to_string(),
            "Email".to_string(),
            "ID".to_string(),
        ],
        vec![Align::Left, Align::Left, Align::Center, Align::Left, Align::Left, Align::Left],
    );

    for c in rows {
        table.push(vec![
            c.name.clone().unwrap_or_else(|| MISSING.to_string()),
            c.tam.clone().unwrap_or_else(|| MISSING.to_string()),
            if c.is_focus { "✔".to_string() } else { String::new() },
            c.tam_phone.clone().unwrap_or_else(|| MISSING.to_string()),
            c.tam_email.clone().unwrap_or_else(|| MISSING.to_string()),
            c.id.clone(),
        ]);
    }

    out.push_str(&table.render());
    out
}

fn bar(value: u64, max: u64) -> String {
    if max == 0 || value == 0 {
        return String::new();
    }
    let len = (u128::from(value) * u128::from(BAR_WIDTH) / u128::from(max)).max(1);
    "█".repeat(len as usize)
}

fn spark(values: &[u64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|v| match max {
            0 => SPARKS[0],
            _ => SPARKS[(u128::from(*v) * 7 / u128::from(max)) as usize],
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    Prescriber,
    Unknown,
    Totals,
}

/// One line of the prescriber table, cells in `columns` order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    pub kind: RowKind,
    pub cells: Vec<String>,
}

/// Prescriber rows, then the Unknown row when there is a positive remainder,
/// then TOTALS.
pub fn prescriber_rows(view: &DashboardView, columns: &[Column]) -> Vec<TableRow> {
    let row = |kind, label: &str, counts: Vec<String>| {
        let mut counts = counts.into_iter();
        let cells = columns
            .iter()
            .map(|col| match col {
                Column::Prescriber => label.to_string(),
                Column::Count(_) => counts.next().unwrap_or_default(),
            })
            .collect();
        TableRow { kind, cells }
    };

    let mut rows: Vec<TableRow> = view
        .prescribers
        .iter()
        .map(|p| row(RowKind::Prescriber, &p.name, count_cells(&p.counts, columns)))
        .collect();

    if let Some(unknown) = view.reconciliation.unknown_row() {
        let cells = columns
            .iter()
            .filter_map(|col| match col {
                Column::Prescriber => None,
                Column::Count(Counter::Orders) => Some(unknown.to_string()),
                Column::Count(_) => Some("-".to_string()),
            })
            .collect();
        rows.push(row(RowKind::Unknown, "Unknown", cells));
    }

    let totals = Counts {
        orders: view.total_orders(),
        ..view.totals
    };
    rows.push(row(RowKind::Totals, "TOTALS", count_cells(&totals, columns)));

    rows
}

/// Visible warning for matched orders exceeding the authoritative total.
pub fn data_check(view: &DashboardView) -> Option<String> {
    let r = &view.reconciliation;
    r.is_overcounted().then(|| {
        format!(
            "! Data check: matched orders ({}) exceed patients helped ({}), difference {}.",
            r.known_orders, r.patients_helped, r.unknown
        )
    })
}

fn count_cells(counts: &Counts, columns: &[Column]) -> Vec<String> {
    columns
        .iter()
        .filter_map(|col| match col {
            Column::Prescriber => None,
            Column::Count(c) => Some(counts.get(*c).to_string()),
        })
        .collect()
}

pub fn render_dashboard(view: &DashboardView, config: &ViewConfig, sort: &SortState<PrescriberField>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - Prescriber Summary", view.practice_name);
    let _ = writeln!(out, "Date Range: {}\n", view.date_range);

    // high symptom bar chart
    out.push_str("Highly Symptomatic Patients by Provider\n");
    let label_width = view
        .prescribers
        .iter()
        .map(|r| r.chart_label().chars().count())
        .max()
        .unwrap_or(0);
    let max = view.prescribers.iter().map(|r| r.counts.high_sx).max().unwrap_or(0);
    for row in &view.prescribers {
        let _ = writeln!(
            out,
            "  {} {} {}",
            pad(row.chart_label(), label_width, Align::Left),
            bar(row.counts.high_sx, max),
            row.counts.high_sx
        );
    }

    // prescriber table
    out.push_str("\nPrescriber Performance Summary\n");
    let headers = config
        .columns
        .iter()
        .map(|col| sort_header(col.title(), col.sort_field(), sort))
        .collect();
    let align = config
        .columns
        .iter()
        .map(|col| if *col == Column::Prescriber { Align::Left } else { Align::Center })
        .collect();
    let mut table = Table::new(headers, align);
    for row in prescriber_rows(view, &config.columns) {
        table.push(row.cells);
    }

    out.push_str(&table.render());

    if let Some(line) = data_check(view) {
        let _ = writeln!(out, "{}", line);
    }
    let _ = writeln!(out, "{}\n", UNKNOWN_PRESCRIBER_NOTE);

    // daily trend
    out.push_str("Daily Activity Trend\n");
    if view.daily.is_empty() {
        out.push_str("  No daily activity in this period.\n");
    } else {
        match config.trend_chart {
            ChartStyle::Area => {
                let width = Counter::ALL.iter().map(|c| c.title().len()).max().unwrap_or(0);
                for counter in Counter::ALL {
                    let series: Vec<u64> = view.daily.iter().map(|d| d.counts.get(counter)).collect();
                    let _ = writeln!(out, "  {} {}", pad(counter.title(), width, Align::Left), spark(&series));
                }
                let days: Vec<&str> = view.daily.iter().map(|d| d.day.as_str()).collect();
                let _ = writeln!(out, "  {} {}", " ".repeat(width), days.join(", "));
            }
            ChartStyle::Bar => {
                let width = view.daily.iter().map(|d| d.day.chars().count()).max().unwrap_or(0);
                let max = view.daily.iter().map(|d| d.counts.measurements).max().unwrap_or(0);
                for day in &view.daily {
                    let _ = writeln!(
                        out,
                        "  {} {} {}",
                        pad(&day.day, width, Align::Left),
                        bar(day.counts.measurements, max),
                        day.counts.measurements
                    );
                }
            }
        }
    }

    if config.daily_table && !view.daily.is_empty() {
        out.push('\n');
        let mut table = Table::new(
            std::iter::once("Day".to_string())
                .chain(Counter::ALL.iter().map(|c| c.title().to_string()))
                .collect(),
            std::iter::once(Align::Left)
                .chain(Counter::ALL.iter().map(|_| Align::Center))
                .collect(),
        );
        for day in &view.daily {
            table.push(
                std::iter::once(day.day.clone())
                    .chain(Counter::ALL.iter().map(|c| day.counts.get(*c).to_string()))
                    .collect(),
            );
        }
        out.push_str(&table.render());
    }

    out
}

/// Short label for the sort state, used in the browse prompt.
pub fn describe_sort<K: std::fmt::Display>(sort: &SortState<K>) -> String {
    let direction = match sort.direction {
        Direction::Ascending => "ascending",
        Direction::Descending => "descending",
    };
    format!("{} {}", sort.key, direction)
}
