// src/route.rs

use std::{borrow::Cow, fmt};
use percent_encoding::percent_decode_str;
//
use crate::session::Session;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    AllCustomers,
    /// `None` when the path carried no practice id.
    Dashboard(Option<String>),
    PublicDashboard(Option<String>),
    NotFound(String),
}

/// Outcome of passing a route through the session gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    Show(Route),
    Redirect(Route),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let decoded: Vec<Cow<'_, str>> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy())
            .collect();
        let segments: Vec<&str> = decoded.iter().map(|s| &**s).collect();

        match segments.as_slice() {
            [] => Route::Root,
            ["login"] => Route::Login,
            ["all"] | ["all-customers"] => Route::AllCustomers,
            ["dashboard"] => Route::Dashboard(None),
            ["dashboard", id] => Route::Dashboard(Some(id.to_string())),
            ["public", "dashboard"] => Route::PublicDashboard(None),
            ["public", "dashboard", id] => Route::PublicDashboard(Some(id.to_string())),
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::AllCustomers | Route::Dashboard(_))
    }

    /// Pages with a sortable, searchable table.
    pub fn has_table(&self) -> bool {
        matches!(self, Route::AllCustomers | Route::Dashboard(_) | Route::PublicDashboard(_))
    }

    pub fn practice_id(&self) -> Option<&str> {
        match self {
            Route::Dashboard(id) | Route::PublicDashboard(id) => id.as_deref(),
            _ => None,
        }
    }

    /// Applies the sign-in rules: `/` goes to sign-in, protected pages need a
    /// session, and a signed-in user skips the sign-in page.
    pub fn resolve(self, session: &Session) -> Resolved {
        match self {
            Route::Root => Resolved::Redirect(Route::Login),
            Route::Login if session.signed_in => Resolved::Redirect(Route::AllCustomers),
            route if route.is_protected() && !session.signed_in => Resolved::Redirect(Route::Login),
            route => Resolved::Show(route),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Root => write!(f, "/"),
            Route::Login => write!(f, "/login"),
            Route::AllCustomers => write!(f, "/all"),
            Route::Dashboard(id) => write!(f, "/dashboard/{}", id.as_deref().unwrap_or_default()),
            Route::PublicDashboard(id) => {
                write!(f, "/public/dashboard/{}", id.as_deref().unwrap_or_default())
            }
            Route::NotFound(path) => write!(f, "{}", path),
        }
    }
}
