// src/page.rs

use crate::error::FetchError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageState<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(FetchError),
}

/// Identifies one fetch. Results are applied only while the ticket is current.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket<P> {
    pub generation: u64,
    pub params: P,
}

/// Lifecycle of one page: `Idle -> Loading -> Loaded | Failed`, restarting at
/// `Loading` on every navigation.
#[derive(Debug)]
pub struct Page<P, T> {
    generation: u64,
    params: Option<P>,
    state: PageState<T>,
}

impl<P: Clone + PartialEq + std::fmt::Debug, T> Page<P, T> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            params: None,
            state: PageState::Idle,
        }
    }

    pub fn state(&self) -> &PageState<T> {
        &self.state
    }

    pub fn params(&self) -> Option<&P> {
        self.params.as_ref()
    }

    /// Starts a request for `params`, superseding whatever was in flight.
    pub fn begin(&mut self, params: P) -> Ticket<P> {
        self.generation += 1;
        self.params = Some(params.clone());
        self.state = PageState::Loading;

        Ticket { generation: self.generation, params }
    }

    /// Applies a finished request. Returns `false` when the ticket is stale and
    /// the outcome was dropped.
    pub fn resolve(&mut self, ticket: &Ticket<P>, outcome: Result<T, FetchError>) -> bool {
        if ticket.generation != self.generation || self.params.as_ref() != Some(&ticket.params) {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                params = ?ticket.params,
                "discarding stale response"
            );
            return false;
        }

        self.state = match outcome {
            Ok(data) => PageState::Loaded(data),
            Err(e) => PageState::Failed(e),
        };

        true
    }

    /// Local validation failure: no request is issued.
    pub fn fail(&mut self, params: P, error: FetchError) {
        self.generation += 1;
        self.params = Some(params);
        self.state = PageState::Failed(error);
    }

    pub fn loaded(&self) -> Option<&T> {
        match &self.state {
            PageState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

impl<P: Clone + PartialEq + std::fmt::Debug, T> Default for Page<P, T> {
    fn default() -> Self {
        Self::new()
    }
}
