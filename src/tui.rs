// src/tui.rs

use ratatui::{
    layout::{Constraint, Direction as Axis, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, BorderType, Cell, Paragraph, Row, Sparkline, Table, Wrap},
    Frame,
};
//
use crate::{
    customer::{Customer, CustomerField},
    derive::{DashboardView, SortState},
    metrics::{Counter, PrescriberField},
    render::{self, ChartStyle, Column, RowKind, Screen, ViewConfig, MISSING, UNKNOWN_PRESCRIBER_NOTE},
};

const HINT: &str = "open <path> · sort <column> · search [term] · sms <id> · refresh · help · Esc quits";

/// Largest value handed to chart widgets; bigger series are scaled down.
const CHART_CEILING: u64 = u32::MAX as u64;

/// Everything drawn around the page itself.
#[derive(Clone, Debug, Default)]
pub struct Chrome<'a> {
    pub location: String,
    pub sort: Option<String>,
    pub input: &'a str,
    pub status: Option<&'a str>,
}

fn panel(title: impl Into<String>) -> Block<'static> {
    Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Blue))
        .title(title.into())
}

fn heading() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

/// Keeps chart arithmetic small; labels still carry the real numbers.
fn chart_value(value: u64, max: u64) -> u64 {
    if max <= CHART_CEILING {
        value
    } else {
        (u128::from(value) * u128::from(CHART_CEILING) / u128::from(max)) as u64
    }
}

fn scaled(series: &[u64]) -> Vec<u64> {
    let max = series.iter().copied().max().unwrap_or(0);
    series.iter().map(|v| chart_value(*v, max)).collect()
}

pub fn draw(frame: &mut Frame, screen: &Screen<'_>, chrome: &Chrome<'_>) {
    let [header, body, status, input] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    let mut location = vec![
        Span::styled(" practice-summary ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(chrome.location.clone()),
    ];
    if let Some(sort) = &chrome.sort {
        location.push(Span::styled(format!("  sorted by {}", sort), Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(location)).block(panel("")), header);

    draw_body(frame, body, screen);

    let status_line = match chrome.status {
        Some(alert) => Paragraph::new(alert).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(HINT).style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status_line, status);

    frame.render_widget(
        Paragraph::new(format!("> {}", chrome.input)).block(panel(" Command ")),
        input,
    );
}

fn draw_body(frame: &mut Frame, area: Rect, screen: &Screen<'_>) {
    match screen {
        Screen::Customers { rows, sort, term } => draw_customers(frame, area, rows, sort, term),
        Screen::Dashboard { view, layout, sort } => draw_dashboard(frame, area, view, layout, sort),
        Screen::Failed(..) => frame.render_widget(
            Paragraph::new(render::render_screen(screen))
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false })
                .block(panel("")),
            area,
        ),
        _ => frame.render_widget(
            Paragraph::new(render::render_screen(screen))
                .wrap(Wrap { trim: false })
                .block(panel("")),
            area,
        ),
    }
}

fn or_missing(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| MISSING.to_string())
}

fn draw_customers(frame: &mut Frame, area: Rect, rows: &[Customer], sort: &SortState<CustomerField>, term: &str) {
    let title = if term.is_empty() {
        " Weekly Performance Summaries ".to_string()
    } else {
        format!(" Weekly Performance Summaries · search: {} ", term)
    };

    if rows.is_empty() {
        let message = if term.is_empty() {
            "No customer data available."
        } else {
            "No customers match your search."
        };
        frame.render_widget(Paragraph::new(message).block(panel(title)), area);
        return;
    }

    let header = Row::new([
        Cell::from(render::sort_header("Customer Name", CustomerField::Name, sort)),
        Cell::from(render::sort_header("TAM", CustomerField::Tam, sort)),
        Cell::from(render::sort_header("Top 12 Focus", CustomerField::Focus, sort)),
        Cell::from("SMS"),
        Cell::from("Email"),
        Cell::from("ID"),
    ])
    .style(heading())
    .bottom_margin(1);

    let body = rows.iter().map(|c| {
        Row::new([
            Cell::from(or_missing(&c.name)),
            Cell::from(or_missing(&c.tam)),
            Cell::from(Line::from(if c.is_focus { "✔" } else { "" }).centered()),
            Cell::from(or_missing(&c.tam_phone)),
            Cell::from(or_missing(&c.tam_email)),
            Cell::from(Span::styled(c.id.clone(), Style::default().fg(Color::DarkGray))),
        ])
    });

    let table = Table::new(
        body,
        [
            Constraint::Percentage(26),
            Constraint::Percentage(16),
            Constraint::Length(15),
            Constraint::Length(16),
            Constraint::Percentage(24),
            Constraint::Min(6),
        ],
    )
    .header(header)
    .block(panel(title));

    frame.render_widget(table, area);
}

fn draw_dashboard(
    frame: &mut Frame,
    area: Rect,
    view: &DashboardView,
    layout: &ViewConfig,
    sort: &SortState<PrescriberField>,
) {
    let block = panel(format!(" {} - Prescriber Summary ", view.practice_name))
        .title_bottom(format!(" Date Range: {} ", view.date_range));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chart_height = (view.prescribers.len() as u16 + 2).clamp(6, 14);
    let [charts, tables, notes] = Layout::vertical([
        Constraint::Length(chart_height),
        Constraint::Min(5),
        Constraint::Length(4),
    ])
    .areas(inner);
    let [bars, trend] = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(charts);

    frame.render_widget(high_sx_chart(view), bars);
    draw_trend(frame, trend, view, layout.trend_chart);

    if layout.daily_table && !view.daily.is_empty() {
        let [left, right] = Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(tables);
        frame.render_widget(prescriber_table(view, &layout.columns, sort), left);
        frame.render_widget(daily_table(view), right);
    } else {
        frame.render_widget(prescriber_table(view, &layout.columns, sort), tables);
    }

    let mut lines = Vec::new();
    if let Some(check) = render::data_check(view) {
        lines.push(Line::styled(check, Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)));
    }
    lines.push(Line::styled(UNKNOWN_PRESCRIBER_NOTE, Style::default().fg(Color::DarkGray)));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), notes);
}

fn high_sx_chart(view: &DashboardView) -> BarChart<'static> {
    let series: Vec<u64> = view.prescribers.iter().map(|r| r.counts.high_sx).collect();
    let bars: Vec<Bar<'static>> = view
        .prescribers
        .iter()
        .zip(scaled(&series))
        .map(|(row, value)| {
            Bar::default()
                .value(value)
                .text_value(row.counts.high_sx.to_string())
                .label(Line::from(row.chart_label().to_string()))
        })
        .collect();

    BarChart::default()
        .block(panel(" Highly Symptomatic Patients by Provider "))
        .direction(Axis::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
        .data(BarGroup::default().bars(&bars))
}

fn draw_trend(frame: &mut Frame, area: Rect, view: &DashboardView, style: ChartStyle) {
    let block = panel(" Daily Activity Trend ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if view.daily.is_empty() {
        frame.render_widget(Paragraph::new("No daily activity in this period."), inner);
        return;
    }

    match style {
        ChartStyle::Area => {
            let rows = Layout::vertical([Constraint::Ratio(1, 4); 4]).split(inner);
            for (counter, row) in Counter::ALL.into_iter().zip(rows.iter()) {
                let series: Vec<u64> = view.daily.iter().map(|d| d.counts.get(counter)).collect();
                let series = scaled(&series);
                let [label, spark] = Layout::horizontal([Constraint::Length(20), Constraint::Min(1)]).areas(*row);

                frame.render_widget(Paragraph::new(counter.title()), label);
                frame.render_widget(
                    Sparkline::default().data(&series).style(Style::default().fg(Color::Green)),
                    spark,
                );
            }
        }
        ChartStyle::Bar => {
            let series: Vec<u64> = view.daily.iter().map(|d| d.counts.measurements).collect();
            let bars: Vec<Bar<'static>> = view
                .daily
                .iter()
                .zip(scaled(&series))
                .map(|(day, value)| {
                    Bar::default()
                        .value(value)
                        .text_value(day.counts.measurements.to_string())
                        .label(Line::from(day.day.clone()))
                })
                .collect();

            frame.render_widget(
                BarChart::default()
                    .bar_width(9)
                    .bar_gap(1)
                    .bar_style(Style::default().fg(Color::Green))
                    .data(BarGroup::default().bars(&bars)),
                inner,
            );
        }
    }
}

fn prescriber_table(view: &DashboardView, columns: &[Column], sort: &SortState<PrescriberField>) -> Table<'static> {
    let header = Row::new(
        columns
            .iter()
            .map(|col| Cell::from(render::sort_header(col.title(), col.sort_field(), sort))),
    )
    .style(heading());

    let rows = render::prescriber_rows(view, columns).into_iter().map(|row| {
        let style = match row.kind {
            RowKind::Prescriber => Style::default(),
            RowKind::Unknown => Style::default().fg(Color::Magenta),
            RowKind::Totals => Style::default().add_modifier(Modifier::BOLD),
        };
        Row::new(row.cells.into_iter().map(Cell::from)).style(style)
    });

    let widths = columns.iter().map(|col| match col {
        Column::Prescriber => Constraint::Min(16),
        Column::Count(_) => Constraint::Length(14),
    });

    Table::new(rows, widths)
        .header(header)
        .block(panel(" Prescriber Performance Summary "))
}

fn daily_table(view: &DashboardView) -> Table<'static> {
    let header = Row::new(
        std::iter::once("Day".to_string())
            .chain(Counter::ALL.iter().map(|c| c.title().to_string()))
            .map(Cell::from),
    )
    .style(heading());

    let rows = view.daily.iter().map(|day| {
        Row::new(
            std::iter::once(day.day.clone())
                .chain(Counter::ALL.iter().map(|c| day.counts.get(*c).to_string()))
                .map(Cell::from),
        )
    });

    let widths = std::iter::once(Constraint::Min(10)).chain(Counter::ALL.iter().map(|_| Constraint::Length(9)));

    Table::new(rows, widths).header(header).block(panel(" Daily Breakdown "))
}

#[cfg(test)]
mod tests {
    use ratatui::{backend::TestBackend, Terminal};
    //
    use super::*;
    use crate::{
        derive::{default_customer_sort, default_prescriber_sort, derive_dashboard},
        error::FetchError,
        metrics::{Counts, DailyRow, DashboardPayload, PrescriberRow},
    };

    fn screen_text(screen: &Screen<'_>, chrome: &Chrome<'_>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 50)).unwrap();
        terminal.draw(|frame| draw(frame, screen, chrome)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn payload(patients_helped: u64, high_sx: u64) -> DashboardPayload {
        DashboardPayload {
            practice_name: "Cheyne Eye Center".into(),
            date_range: "3/24/25 - 3/29/25".into(),
            prescriber_data: vec![
                PrescriberRow {
                    name: "Chris Cheyne".into(),
                    short_name: Some("C. Cheyne".into()),
                    counts: Counts { measurements: 18, portal_views: 18, high_sx, orders: 1 },
                },
                PrescriberRow {
                    name: "Nicole Stout".into(),
                    short_name: None,
                    counts: Counts { measurements: 18, portal_views: 16, high_sx: 9, orders: 0 },
                },
            ],
            daily_data: vec![DailyRow {
                day: "Mon 03/24".into(),
                counts: Counts { measurements: u64::MAX, portal_views: 27, high_sx: 14, orders: 0 },
            }],
            patients_helped,
        }
    }

    #[test]
    fn customer_table_shows_rows_and_sort_marker() {
        let rows = vec![Customer {
            id: "c1".into(),
            name: Some("Alpine Eye".into()),
            tam: Some("Dana Ortiz".into()),
            tam_phone: None,
            tam_email: Some("dana@example.com".into()),
            is_focus: true,
        }];
        let screen = Screen::Customers { rows, sort: default_customer_sort(), term: "" };
        let text = screen_text(&screen, &Chrome { location: "/all".into(), ..Chrome::default() });

        assert!(text.contains("Customer Name ▲"));
        assert!(text.contains("Alpine Eye"));
        assert!(text.contains("Dana Ortiz"));
        assert!(text.contains("N/A"));
        assert!(text.contains("/all"));
    }

    #[test]
    fn empty_search_result_says_so() {
        let screen = Screen::Customers { rows: vec![], sort: default_customer_sort(), term: "zzz" };
        let text = screen_text(&screen, &Chrome::default());
        assert!(text.contains("No customers match your search."));
    }

    #[test]
    fn dashboard_draws_tables_and_charts() {
        let view = derive_dashboard(&payload(3, 10), &default_prescriber_sort(), "");
        let screen = Screen::Dashboard { view, layout: ViewConfig::full(), sort: default_prescriber_sort() };
        let text = screen_text(&screen, &Chrome::default());

        assert!(text.contains("Cheyne Eye Center - Prescriber Summary"));
        assert!(text.contains("Highly Symptomatic Patients by Provider"));
        assert!(text.contains("High Sx ▼"));
        assert!(text.contains("Unknown"));
        assert!(text.contains("TOTALS"));
        assert!(text.contains("Daily Breakdown"));
    }

    #[test]
    fn huge_counters_draw_without_overflow() {
        let view = derive_dashboard(&payload(u64::MAX, u64::MAX), &default_prescriber_sort(), "");
        let screen = Screen::Dashboard { view, layout: ViewConfig::public(), sort: default_prescriber_sort() };
        let text = screen_text(&screen, &Chrome::default());

        assert!(text.contains("TOTALS"));
        assert!(!text.contains("Daily Breakdown"));
    }

    #[test]
    fn failures_and_alerts_are_visible() {
        let err = FetchError::RequestFailed {
            what: "dashboard data",
            status: 500,
            status_text: "Internal Server Error".into(),
        };
        let chrome = Chrome { status: Some("SMS not sent: busy"), input: "sort na", ..Chrome::default() };
        let text = screen_text(&Screen::Failed("Dashboard", &err), &chrome);

        assert!(text.contains("Error Loading Dashboard"));
        assert!(text.contains("500"));
        assert!(text.contains("SMS not sent: busy"));
        assert!(text.contains("> sort na"));
    }

    #[test]
    fn chart_values_scale_into_range() {
        assert_eq!(scaled(&[1, 2, 3]), [1, 2, 3]);
        let big = scaled(&[0, u64::MAX / 2, u64::MAX]);
        assert_eq!(big[0], 0);
        assert_eq!(big[2], CHART_CEILING);
        assert!(big[1] < CHART_CEILING);
    }
}
