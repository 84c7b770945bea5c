// src/navigator.rs

use std::sync::Arc;
//
use crate::{
    customer::{Customer, CustomerField},
    derive::{default_customer_sort, default_prescriber_sort, derive_customers, derive_dashboard, SortState},
    dispatch::Tracker,
    error::{FetchError, UnknownColumn},
    gateway::Gateway,
    metrics::{DashboardPayload, PrescriberField},
    page::{Page, PageState, Ticket},
    render::{self, Screen, ViewConfig},
    route::{Resolved, Route},
    session::Session,
};

const MAX_REDIRECTS: usize = 4;

/// A request the navigator wants made. Run it and hand the outcome back to
/// `Navigator::apply`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetch {
    Customers(Ticket<()>),
    Dashboard(Ticket<String>),
}

#[derive(Debug)]
pub enum Outcome {
    Customers(Ticket<()>, Result<Vec<Customer>, FetchError>),
    Dashboard(Ticket<String>, Result<DashboardPayload, FetchError>),
}

impl Fetch {
    pub async fn run(self, gateway: &Gateway) -> Outcome {
        match self {
            Fetch::Customers(ticket) => Outcome::Customers(ticket, gateway.fetch_customers().await),
            Fetch::Dashboard(ticket) => {
                let result = gateway.fetch_dashboard(Some(&ticket.params)).await;
                Outcome::Dashboard(ticket, result)
            }
        }
    }
}

/// Current screen plus its ephemeral sort and search state.
pub struct Navigator {
    session: Session,
    tracker: Arc<Tracker>,
    route: Route,
    customers: Page<(), Vec<Customer>>,
    dashboard: Page<String, DashboardPayload>,
    customer_sort: SortState<CustomerField>,
    prescriber_sort: SortState<PrescriberField>,
    search: String,
}

impl Navigator {
    pub fn new(session: Session, tracker: Arc<Tracker>) -> Self {
        Self {
            session,
            tracker,
            route: Route::Root,
            customers: Page::new(),
            dashboard: Page::new(),
            customer_sort: default_customer_sort(),
            prescriber_sort: default_prescriber_sort(),
            search: String::new(),
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn customers(&self) -> Option<&Vec<Customer>> {
        self.customers.loaded()
    }

    /// Moves to `path`, following redirects. Sort and search start over.
    pub fn navigate(&mut self, path: &str) -> Option<Fetch> {
        let mut route = Route::parse(path);
        for _ in 0..MAX_REDIRECTS {
            match route.clone().resolve(&self.session) {
                Resolved::Show(shown) => {
                    route = shown;
                    break;
                }
                Resolved::Redirect(next) => {
                    tracing::info!(from = %route, to = %next, "redirecting");
                    route = next;
                }
            }
        }

        self.route = route.clone();
        self.customer_sort = default_customer_sort();
        self.prescriber_sort = default_prescriber_sort();
        self.search.clear();

        match route {
            Route::AllCustomers => {
                self.tracker.page_view(&self.session, None);
                Some(Fetch::Customers(self.customers.begin(())))
            }
            Route::Dashboard(id) | Route::PublicDashboard(id) => {
                self.tracker.page_view(&self.session, id.as_deref());
                match id.filter(|id| !id.trim().is_empty()) {
                    Some(id) => Some(Fetch::Dashboard(self.dashboard.begin(id))),
                    None => {
                        self.dashboard.fail(String::new(), FetchError::MissingPracticeId);
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Returns `false` when the outcome belonged to a superseded request.
    pub fn apply(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Customers(ticket, result) => self.customers.resolve(&ticket, result),
            Outcome::Dashboard(ticket, result) => self.dashboard.resolve(&ticket, result),
        }
    }

    /// Header click on the current table.
    pub fn toggle_sort(&mut self, key: &str) -> Result<(), UnknownColumn> {
        match self.route {
            Route::AllCustomers => {
                let field = CustomerField::from_key(key).ok_or_else(|| UnknownColumn(key.to_string()))?;
                self.customer_sort.toggle(field);
            }
            Route::Dashboard(_) | Route::PublicDashboard(_) => {
                let field = PrescriberField::from_key(key).ok_or_else(|| UnknownColumn(key.to_string()))?;
                self.prescriber_sort.toggle(field);
            }
            _ => return Err(UnknownColumn(key.to_string())),
        }
        Ok(())
    }

    pub fn set_sort(&mut self, key: &str, descending: bool) -> Result<(), UnknownColumn> {
        let ascending = !descending;
        match self.route {
            Route::AllCustomers => {
                let field = CustomerField::from_key(key).ok_or_else(|| UnknownColumn(key.to_string()))?;
                self.customer_sort = if ascending { SortState::ascending(field) } else { SortState::descending(field) };
            }
            Route::Dashboard(_) | Route::PublicDashboard(_) => {
                let field = PrescriberField::from_key(key).ok_or_else(|| UnknownColumn(key.to_string()))?;
                self.prescriber_sort = if ascending { SortState::ascending(field) } else { SortState::descending(field) };
            }
            _ => return Err(UnknownColumn(key.to_string())),
        }
        Ok(())
    }

    pub fn search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    pub fn sort_summary(&self) -> Option<String> {
        match self.route {
            Route::AllCustomers => Some(render::describe_sort(&self.customer_sort)),
            Route::Dashboard(_) | Route::PublicDashboard(_) => Some(render::describe_sort(&self.prescriber_sort)),
            _ => None,
        }
    }

    /// Derives from the current source data, sort and search on every call.
    pub fn screen(&self) -> Screen<'_> {
        match &self.route {
            Route::Login | Route::Root => Screen::SignIn(&self.session),
            Route::NotFound(path) => Screen::NotFound(path),
            Route::AllCustomers => match self.customers.state() {
                PageState::Idle | PageState::Loading => Screen::Loading("Customers"),
                PageState::Failed(e) => Screen::Failed("Customers", e),
                PageState::Loaded(list) => Screen::Customers {
                    rows: derive_customers(list, &self.customer_sort, &self.search),
                    sort: self.customer_sort,
                    term: &self.search,
                },
            },
            Route::Dashboard(_) | Route::PublicDashboard(_) => match self.dashboard.state() {
                PageState::Idle | PageState::Loading => Screen::Loading("Dashboard"),
                PageState::Failed(e) => Screen::Failed("Dashboard", e),
                PageState::Loaded(payload) => Screen::Dashboard {
                    view: derive_dashboard(payload, &self.prescriber_sort, &self.search),
                    layout: match self.route {
                        Route::PublicDashboard(_) => ViewConfig::public(),
                        _ => ViewConfig::full(),
                    },
                    sort: self.prescriber_sort,
                },
            },
        }
    }

    pub fn render(&self) -> String {
        render::render_screen(&self.screen())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    //
    use super::*;
    use crate::gateway::testing::ScriptedTransport;

    fn dashboard_body(name: &str) -> String {
        format!(
            r#"{{ "practiceName": "{name}", "dateRange": "3/24/25 - 3/29/25",
                 "prescriberData": [
                    {{ "name": "Chris Cheyne", "shortName": "C. Cheyne", "measurements": 18, "portalViews": 18, "highSx": 10, "orders": 1 }},
                    {{ "name": "Nicole Stout", "shortName": "N. Stout", "measurements": 18, "portalViews": 16, "highSx": 9, "orders": 0 }}
                 ],
                 "dailyData": [],
                 "patientsHelped": 3 }}"#
        )
    }

    const CUSTOMERS: &str = r#"{ "value": [
        { "id": "c2", "name": "Bright Vision", "tam": "Sam Cheng", "isFocusAccount": "No" },
        { "id": "c1", "name": "Alpine Eye", "tam": "Dana Ortiz", "tamPhone": "+15550001", "isFocusAccount": "Yes" }
    ] }"#;

    fn setup(transport: Arc<ScriptedTransport>, session: Session) -> (Navigator, Gateway, Arc<Tracker>) {
        let gateway = Gateway::new(transport.clone(), "http://flows.test/dashboard", "http://flows.test/customers");
        let tracker = Arc::new(Tracker::new(transport, None));
        (Navigator::new(session, tracker.clone()), gateway, tracker)
    }

    fn signed_in() -> Session {
        Session::signed_in("user_1", "tam@example.com")
    }

    #[tokio::test]
    async fn loads_and_renders_dashboard() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, dashboard_body("Cheyne Eye Center")));
        let (mut nav, gateway, _) = setup(transport, signed_in());

        let fetch = nav.navigate("/dashboard/p1").unwrap();
        assert!(nav.render().starts_with("Loading Dashboard"));

        assert!(nav.apply(fetch.run(&gateway).await));
        let screen = nav.render();
        assert!(screen.contains("Cheyne Eye Center - Prescriber Summary"));
        assert!(screen.lines().any(|l| l.starts_with("Unknown")));
    }

    #[tokio::test]
    async fn signed_out_visit_lands_on_login() {
        let transport = Arc::new(ScriptedTransport::new());
        let (mut nav, _, _) = setup(transport.clone(), Session::signed_out());

        assert!(nav.navigate("/all").is_none());
        assert_eq!(nav.route(), &Route::Login);
        assert!(nav.render().contains("Sign in required"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn public_dashboard_needs_no_session() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, dashboard_body("Public Practice")));
        let (mut nav, gateway, _) = setup(transport, Session::signed_out());

        let fetch = nav.navigate("/public/dashboard/p1").unwrap();
        nav.apply(fetch.run(&gateway).await);
        assert!(nav.render().contains("Public Practice"));
    }

    #[tokio::test]
    async fn stale_dashboard_does_not_overwrite_newer_practice() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, dashboard_body("Second Practice"))
                .reply(200, dashboard_body("First Practice")),
        );
        let (mut nav, gateway, _) = setup(transport, signed_in());

        let first = nav.navigate("/dashboard/p1").unwrap();
        let second = nav.navigate("/dashboard/p2").unwrap();

        assert!(nav.apply(second.run(&gateway).await));
        assert!(!nav.apply(first.run(&gateway).await));
        assert!(nav.render().contains("Second Practice"));
    }

    #[tokio::test]
    async fn http_500_shows_error_panel_only() {
        let transport = Arc::new(ScriptedTransport::new().reply(500, ""));
        let (mut nav, gateway, _) = setup(transport, signed_in());

        let fetch = nav.navigate("/dashboard/p1").unwrap();
        nav.apply(fetch.run(&gateway).await);

        let screen = nav.render();
        assert!(screen.contains("Error Loading Dashboard"));
        assert!(screen.contains("500"));
        assert!(!screen.contains("TOTALS"));
        assert!(!screen.contains("Highly Symptomatic"));
    }

    #[tokio::test]
    async fn missing_practice_id_fails_without_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let (mut nav, _, _) = setup(transport.clone(), signed_in());

        assert!(nav.navigate("/dashboard/").is_none());
        assert!(nav.render().contains("No practice ID provided."));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn customer_sort_and_search_rerender_immediately() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, CUSTOMERS));
        let (mut nav, gateway, _) = setup(transport, signed_in());

        let fetch = nav.navigate("/all-customers").unwrap();
        nav.apply(fetch.run(&gateway).await);

        let screen = nav.render();
        assert!(screen.find("Alpine Eye").unwrap() < screen.find("Bright Vision").unwrap());

        nav.toggle_sort("name").unwrap();
        let screen = nav.render();
        assert!(screen.contains("Customer Name ▼"));
        assert!(screen.find("Bright Vision").unwrap() < screen.find("Alpine Eye").unwrap());

        nav.search("ortiz");
        let screen = nav.render();
        assert!(screen.contains("Alpine Eye"));
        assert!(!screen.contains("Bright Vision"));

        assert_eq!(nav.toggle_sort("revenue"), Err(UnknownColumn("revenue".into())));
    }

    #[tokio::test]
    async fn navigation_resets_sort_and_search() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, CUSTOMERS).reply(200, CUSTOMERS));
        let (mut nav, gateway, _) = setup(transport, signed_in());

        let fetch = nav.navigate("/all").unwrap();
        nav.apply(fetch.run(&gateway).await);
        nav.set_sort("tam", true).unwrap();
        nav.search("zzz");

        let fetch = nav.navigate("/all").unwrap();
        nav.apply(fetch.run(&gateway).await);
        assert_eq!(nav.sort_summary().as_deref(), Some("name ascending"));
        assert!(nav.render().contains("Alpine Eye"));
    }

    #[tokio::test]
    async fn page_views_are_tracked_for_signed_in_users() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, "{}"));
        let tracker = Arc::new(Tracker::new(transport.clone(), Some("http://track.test".into())));
        let mut nav = Navigator::new(signed_in(), tracker.clone());

        let _ = nav.navigate("/dashboard/p7");
        tracker.flush(Duration::from_secs(1)).await;

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1["practiceId"], "p7");
    }
}
