//! Paged trace browsing.

use chrono::NaiveDateTime;
use kate_client::GatewayClient;
use kate_core::error::KateError;
use kate_core::state::{StateCell, Subscription};
use kate_core::trace::{AuthType, PagedResult, Trace, TraceDetail};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// The `(page, count)` window of the current listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub count: u32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            page: 1,
            count: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Status predicate: `404` or a class like `5xx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Exact(u16),
    Class(u8),
}

impl StatusFilter {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusFilter::Exact(code) => status == *code,
            StatusFilter::Class(class) => status / 100 == u16::from(*class),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if let Some(class) = lower.strip_suffix("xx") {
            return match class.parse::<u8>() {
                Ok(c @ 1..=5) => Ok(StatusFilter::Class(c)),
                _ => Err(format!("invalid status class: {s}")),
            };
        }
        s.parse::<u16>()
            .map(StatusFilter::Exact)
            .map_err(|_| format!("invalid status: {s}"))
    }
}

/// Client-side predicates over the current page. Empty fields match all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceFilter {
    pub route: Option<String>,
    pub status: Option<StatusFilter>,
    /// Keep traces recorded at or after this time
    pub since: Option<NaiveDateTime>,
    pub auth_type: Option<AuthType>,
    /// Case-insensitive match over id, route, method and source IP
    pub text: Option<String>,
}

impl TraceFilter {
    pub fn is_empty(&self) -> bool {
        *self == TraceFilter::default()
    }

    pub fn matches(&self, trace: &Trace) -> bool {
        if let Some(route) = &self.route {
            if !trace.route.contains(route.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !status.matches(trace.status) {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if trace.timestamp < *since {
                return false;
            }
        }
        if let Some(auth) = &self.auth_type {
            if trace.auth_type != *auth {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = [&trace.id, &trace.route, &trace.method, &trace.source_ip]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceState {
    pub is_loading: bool,
    pub paged_result: Option<PagedResult<Trace>>,
    pub cursor: PageCursor,
    pub filter: TraceFilter,
    pub error: Option<String>,
}

impl TraceState {
    /// Items of the current page that pass the filter.
    pub fn visible_traces(&self) -> Vec<&Trace> {
        self.paged_result
            .iter()
            .flat_map(|p| p.items.iter())
            .filter(|t| self.filter.matches(t))
            .collect()
    }

    pub fn total_pages(&self) -> u64 {
        self.paged_result.as_ref().map_or(0, PagedResult::total_pages)
    }

    pub fn find(&self, id: &str) -> Option<&Trace> {
        self.paged_result.as_ref()?.items.iter().find(|t| t.id == id)
    }
}

#[derive(Clone)]
pub struct TraceRepository {
    client: GatewayClient,
    state: Arc<StateCell<TraceState>>,
    page_size: u32,
}

impl TraceRepository {
    pub fn new(client: GatewayClient) -> Self {
        Self::with_page_size(client, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(client: GatewayClient, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let state = TraceState {
            cursor: PageCursor { page: 1, count: page_size },
            ..TraceState::default()
        };
        Self {
            client,
            state: Arc::new(StateCell::new(state)),
            page_size,
        }
    }

    pub fn state(&self) -> Arc<TraceState> {
        self.state.snapshot()
    }

    pub fn cell(&self) -> &Arc<StateCell<TraceState>> {
        &self.state
    }

    pub fn subscribe(&self, listener: impl Fn(&TraceState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch one page. On success the page is replaced and the cursor moves
    /// to the page the gateway returned; on failure the previous page stays
    /// and the error is stored. A `count` of 0 is sent as 1.
    pub async fn fetch_traces(&self, page: u32, count: u32) {
        let count = count.max(1);
        self.state.update(|s| TraceState {
            is_loading: true,
            ..s.clone()
        });
        match self.client.traces(page, count).await {
            Ok(result) => {
                debug!(page, count, returned = result.page, total = result.total, items = result.items.len(), "traces fetched");
                let cursor = PageCursor {
                    page: result.page.max(1),
                    count,
                };
                self.state.update(|s| TraceState {
                    is_loading: false,
                    paged_result: Some(result),
                    cursor,
                    ..s.clone()
                });
            }
            Err(e) => self.fail(page, e),
        }
    }

    pub async fn fetch_first_page(&self) {
        self.fetch_traces(1, self.page_size).await;
    }

    /// Fetch the page after the one on screen. Does nothing when the current
    /// page has no successor.
    pub async fn next_page(&self) -> bool {
        let state = self.state();
        match &state.paged_result {
            Some(p) if p.has_next => {
                self.fetch_traces(p.page.saturating_add(1), state.cursor.count).await;
                true
            }
            _ => false,
        }
    }

    pub async fn previous_page(&self) -> bool {
        let state = self.state();
        match &state.paged_result {
            Some(p) if p.has_previous => {
                self.fetch_traces(p.page.saturating_sub(1).max(1), state.cursor.count).await;
                true
            }
            _ => false,
        }
    }

    pub async fn refresh(&self) {
        let cursor = self.state().cursor;
        self.fetch_traces(cursor.page, cursor.count).await;
    }

    pub fn set_filter(&self, filter: TraceFilter) {
        self.state.update(|s| TraceState {
            filter,
            ..s.clone()
        });
    }

    pub fn clear_filter(&self) {
        self.set_filter(TraceFilter::default());
    }

    pub fn dismiss_error(&self) {
        self.state.update(|s| TraceState {
            error: None,
            ..s.clone()
        });
    }

    /// Detail view of a trace on the current page.
    pub fn detail(&self, id: &str) -> Option<TraceDetail> {
        self.state().find(id).map(TraceDetail::from)
    }

    fn fail(&self, page: u32, e: KateError) {
        error!(page, error = ?e, "trace fetch failed");
        self.state.update(|s| TraceState {
            is_loading: false,
            error: Some(e.to_string()),
            ..s.clone()
        });
    }
}
