//! Forwarded command requests — messages for the collaborator that owns
//! tab/window state.
//!
//! Requests are fire-and-forget: the interpreter never blocks or retries on
//! the host. Failures are logged and swallowed; only the quick-search overlay
//! observes results, and it renders an empty set on failure.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// What a quick-search overlay searches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickSearchKind {
    Bookmarks,
    History,
    Tabs,
}

/// A request forwarded to the tab/window owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostRequest {
    NextTab,
    PrevTab,
    CloseTab,
    HistoryBack,
    HistoryForward,
    OpenQuickSearch {
        kind: QuickSearchKind,
        new_tab: bool,
    },
}

/// One quick-search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Forward a request to the host, logging and swallowing failures.
pub fn forward(tx: &mpsc::Sender<HostRequest>, request: HostRequest) {
    tracing::debug!(?request, "Forwarding host request");
    if let Err(e) = tx.try_send(request) {
        tracing::warn!(error = %e, "Host request dropped");
    }
}
