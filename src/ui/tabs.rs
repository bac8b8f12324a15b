//! Tab and history management for the demo driver.
//!
//! The workspace owns the open pages and services the requests the
//! interpreter forwards: tab cycling, tab close, per-tab history, and the
//! quick-search overlay. Local markdown links load in place; http(s) links
//! hand off to the system browser.

use crate::host::{HostRequest, QuickSearchKind, SearchHit};
use crate::page::{DocPage, Navigation, Page};
use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyModifiers};
use url::Url;

/// One open page with its back/forward stacks.
pub struct Tab {
    pub page: DocPage,
    back: Vec<DocPage>,
    forward: Vec<DocPage>,
}

impl Tab {
    fn new(page: DocPage) -> Self {
        Self {
            page,
            back: Vec::new(),
            forward: Vec::new(),
        }
    }
}

/// Quick-search overlay state: what is searched, the query so far, and the
/// highlighted row.
pub struct QuickSearchState {
    pub kind: QuickSearchKind,
    pub new_tab: bool,
    pub input: String,
    pub selected: usize,
}

/// What accepting a quick-search row does.
enum MatchAction {
    SwitchTab(usize),
    Open(String),
}

struct QuickMatch {
    hit: SearchHit,
    action: MatchAction,
}

pub struct Workspace {
    tabs: Vec<Tab>,
    active: usize,
    /// Pages visited this session, most recent first, deduplicated by url.
    visits: Vec<SearchHit>,
    view_width: usize,
    view_height: usize,
    pub quick_search: Option<QuickSearchState>,
}

impl Workspace {
    /// Build a workspace over the initially opened pages. `pages` must be
    /// non-empty; the first page is active.
    pub fn new(pages: Vec<DocPage>, width: usize, height: usize) -> Self {
        let mut ws = Self {
            tabs: Vec::new(),
            active: 0,
            visits: Vec::new(),
            view_width: width,
            view_height: height,
            quick_search: None,
        };
        for mut page in pages {
            page.set_viewport(width, height);
            ws.record_visit(&page);
            ws.tabs.push(Tab::new(page));
        }
        ws
    }

    pub fn active_page(&self) -> &DocPage {
        &self.tabs[self.active].page
    }

    pub fn active_page_mut(&mut self) -> &mut DocPage {
        &mut self.tabs[self.active].page
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    /// Propagate a terminal resize to every open page.
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.view_width = width;
        self.view_height = height;
        for tab in &mut self.tabs {
            tab.page.set_viewport(width, height);
        }
    }

    /// Service one forwarded request. Returns false when the last tab was
    /// closed and the application should exit.
    pub fn handle_request(&mut self, request: HostRequest) -> bool {
        match request {
            HostRequest::NextTab => {
                self.active = (self.active + 1) % self.tabs.len();
            }
            HostRequest::PrevTab => {
                self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
            }
            HostRequest::CloseTab => {
                self.tabs.remove(self.active);
                if self.tabs.is_empty() {
                    return false;
                }
                self.active = self.active.min(self.tabs.len() - 1);
            }
            HostRequest::HistoryBack => self.history_back(),
            HostRequest::HistoryForward => self.history_forward(),
            HostRequest::OpenQuickSearch { kind, new_tab } => {
                self.quick_search = Some(QuickSearchState {
                    kind,
                    new_tab,
                    input: String::new(),
                    selected: 0,
                });
            }
        }
        true
    }

    fn history_back(&mut self) {
        let tab = &mut self.tabs[self.active];
        if let Some(prev) = tab.back.pop() {
            let current = std::mem::replace(&mut tab.page, prev);
            tab.forward.push(current);
        }
    }

    fn history_forward(&mut self) {
        let tab = &mut self.tabs[self.active];
        if let Some(next) = tab.forward.pop() {
            let current = std::mem::replace(&mut tab.page, next);
            tab.back.push(current);
        }
    }

    /// Perform a navigation requested by a page activation. Http(s) addresses
    /// open in the system browser; everything else resolves against the
    /// current page and loads as a markdown document.
    pub fn navigate(&mut self, nav: Navigation) -> Result<()> {
        let (target, new_tab) = match nav {
            Navigation::Here(url) => (url, false),
            Navigation::NewTab(url) => (url, true),
        };

        let resolved = self.resolve(&target)?;
        if matches!(resolved.scheme(), "http" | "https") {
            tracing::info!(url = %resolved, "Opening external address");
            open::that_detached(resolved.as_str())
                .with_context(|| format!("Failed to open {resolved}"))?;
            return Ok(());
        }

        let path = resolved
            .to_file_path()
            .map_err(|()| anyhow::anyhow!("Not a loadable address: {resolved}"))?;
        let mut page = DocPage::load(&path, self.view_width, self.view_height)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        page.set_viewport(self.view_width, self.view_height);
        self.record_visit(&page);

        if new_tab {
            // Background tab: focus stays where it is
            self.tabs.push(Tab::new(page));
        } else {
            let tab = &mut self.tabs[self.active];
            let current = std::mem::replace(&mut tab.page, page);
            tab.back.push(current);
            tab.forward.clear();
        }
        Ok(())
    }

    /// Resolve a link destination against the active page's address.
    fn resolve(&self, target: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(target) {
            return Ok(url);
        }
        let base = Url::parse(self.active_page().address())
            .with_context(|| format!("Unresolvable base address {}", self.active_page().address()))?;
        base.join(target)
            .with_context(|| format!("Unresolvable link target {target}"))
    }

    fn record_visit(&mut self, page: &DocPage) {
        let url = page.address().to_string();
        self.visits.retain(|hit| hit.url != url);
        self.visits.insert(
            0,
            SearchHit {
                title: page.title().to_string(),
                url,
            },
        );
    }

    // ------------------------------------------------------------------
    // Quick search
    // ------------------------------------------------------------------

    /// Rows matching the current quick-search query, for display.
    pub fn quick_search_hits(&self) -> Vec<SearchHit> {
        self.quick_matches().into_iter().map(|m| m.hit).collect()
    }

    fn quick_matches(&self) -> Vec<QuickMatch> {
        let Some(state) = &self.quick_search else {
            return Vec::new();
        };
        let query = state.input.to_lowercase();
        let matches = |hit: &SearchHit| {
            query.is_empty()
                || hit.title.to_lowercase().contains(&query)
                || hit.url.to_lowercase().contains(&query)
        };

        match state.kind {
            QuickSearchKind::Tabs => self
                .tabs
                .iter()
                .enumerate()
                .map(|(i, tab)| QuickMatch {
                    hit: SearchHit {
                        title: tab.page.title().to_string(),
                        url: tab.page.address().to_string(),
                    },
                    action: MatchAction::SwitchTab(i),
                })
                .filter(|m| matches(&m.hit))
                .collect(),
            // The demo has no separate bookmark store; both kinds search
            // the session visit log.
            QuickSearchKind::Bookmarks | QuickSearchKind::History => self
                .visits
                .iter()
                .filter(|hit| matches(hit))
                .map(|hit| QuickMatch {
                    hit: hit.clone(),
                    action: MatchAction::Open(hit.url.clone()),
                })
                .collect(),
        }
    }

    /// Keystrokes while the quick-search overlay is open. Returns true when
    /// the key was consumed by the overlay.
    pub fn handle_quick_search_key(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<bool> {
        if self.quick_search.is_none() {
            return Ok(false);
        }
        if modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        match code {
            KeyCode::Esc => {
                self.quick_search = None;
            }
            KeyCode::Enter => {
                let matches = self.quick_matches();
                if let Some(state) = self.quick_search.take() {
                    if let Some(m) = matches.into_iter().nth(state.selected) {
                        match m.action {
                            MatchAction::SwitchTab(i) => self.active = i,
                            MatchAction::Open(url) => {
                                let nav = if state.new_tab {
                                    Navigation::NewTab(url)
                                } else {
                                    Navigation::Here(url)
                                };
                                self.navigate(nav)?;
                            }
                        }
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(state) = self.quick_search.as_mut() {
                    state.input.pop();
                    state.selected = 0;
                }
            }
            KeyCode::Up => {
                if let Some(state) = self.quick_search.as_mut() {
                    state.selected = state.selected.saturating_sub(1);
                }
            }
            KeyCode::Down => {
                let count = self.quick_matches().len();
                if let Some(state) = self.quick_search.as_mut() {
                    state.selected = (state.selected + 1).min(count.saturating_sub(1));
                }
            }
            KeyCode::Char(c) => {
                if let Some(state) = self.quick_search.as_mut() {
                    state.input.push(c);
                    state.selected = 0;
                }
            }
            _ => {}
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::DocPage;
    use pretty_assertions::assert_eq;

    fn doc(address: &str, title: &str) -> DocPage {
        DocPage::from_markdown(address, &format!("# {title}\n"), 80, 24)
    }

    fn workspace() -> Workspace {
        Workspace::new(
            vec![
                doc("file:///a.md", "Alpha"),
                doc("file:///b.md", "Beta"),
                doc("file:///c.md", "Gamma"),
            ],
            80,
            24,
        )
    }

    #[test]
    fn test_tab_cycling_wraps() {
        let mut ws = workspace();
        assert_eq!(ws.active_index(), 0);
        ws.handle_request(HostRequest::PrevTab);
        assert_eq!(ws.active_index(), 2);
        ws.handle_request(HostRequest::NextTab);
        assert_eq!(ws.active_index(), 0);
    }

    #[test]
    fn test_close_tab_keeps_valid_active() {
        let mut ws = workspace();
        ws.handle_request(HostRequest::PrevTab);
        assert!(ws.handle_request(HostRequest::CloseTab));
        assert_eq!(ws.tab_count(), 2);
        assert_eq!(ws.active_index(), 1);
    }

    #[test]
    fn test_closing_last_tab_requests_exit() {
        let mut ws = Workspace::new(vec![doc("file:///a.md", "Alpha")], 80, 24);
        assert!(!ws.handle_request(HostRequest::CloseTab));
    }

    #[test]
    fn test_history_back_and_forward() {
        let dir = std::env::temp_dir().join("keypilot_tabs_test_history");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("next.md");
        std::fs::write(&path, "# Next\n").unwrap();

        let start = DocPage::load(&path, 80, 24).unwrap();
        let start_address = start.address().to_string();
        let mut ws = Workspace::new(vec![start], 80, 24);

        let other = dir.join("other.md");
        std::fs::write(&other, "# Other\n").unwrap();
        ws.navigate(Navigation::Here("other.md".to_string())).unwrap();
        assert_eq!(ws.active_page().title(), "Other");

        ws.handle_request(HostRequest::HistoryBack);
        assert_eq!(ws.active_page().address(), start_address);
        ws.handle_request(HostRequest::HistoryForward);
        assert_eq!(ws.active_page().title(), "Other");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_navigate_new_tab_keeps_focus() {
        let dir = std::env::temp_dir().join("keypilot_tabs_test_newtab");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("main.md"), "# Main\n").unwrap();
        std::fs::write(dir.join("side.md"), "# Side\n").unwrap();

        let start = DocPage::load(&dir.join("main.md"), 80, 24).unwrap();
        let mut ws = Workspace::new(vec![start], 80, 24);
        ws.navigate(Navigation::NewTab("side.md".to_string())).unwrap();

        assert_eq!(ws.tab_count(), 2);
        assert_eq!(ws.active_index(), 0);
        assert_eq!(ws.active_page().title(), "Main");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_navigate_missing_file_is_an_error() {
        let mut ws = workspace();
        assert!(ws
            .navigate(Navigation::Here("file:///does/not/exist.md".to_string()))
            .is_err());
        // The current page is untouched
        assert_eq!(ws.active_page().title(), "Alpha");
    }

    #[test]
    fn test_quick_search_filters_tabs() {
        let mut ws = workspace();
        ws.handle_request(HostRequest::OpenQuickSearch {
            kind: QuickSearchKind::Tabs,
            new_tab: false,
        });
        assert_eq!(ws.quick_search_hits().len(), 3);

        for c in "bet".chars() {
            ws.handle_quick_search_key(KeyCode::Char(c), KeyModifiers::NONE)
                .unwrap();
        }
        let hits = ws.quick_search_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Beta");

        ws.handle_quick_search_key(KeyCode::Enter, KeyModifiers::NONE)
            .unwrap();
        assert!(ws.quick_search.is_none());
        assert_eq!(ws.active_page().title(), "Beta");
    }

    #[test]
    fn test_quick_search_history_orders_recent_first() {
        let mut ws = workspace();
        ws.handle_request(HostRequest::OpenQuickSearch {
            kind: QuickSearchKind::History,
            new_tab: false,
        });
        let hits = ws.quick_search_hits();
        // Gamma was recorded last
        assert_eq!(hits[0].title, "Gamma");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_quick_search_escape_closes_overlay() {
        let mut ws = workspace();
        ws.handle_request(HostRequest::OpenQuickSearch {
            kind: QuickSearchKind::Bookmarks,
            new_tab: false,
        });
        assert!(ws
            .handle_quick_search_key(KeyCode::Esc, KeyModifiers::NONE)
            .unwrap());
        assert!(ws.quick_search.is_none());
    }

    #[test]
    fn test_quick_search_selection_moves_and_clamps() {
        let mut ws = workspace();
        ws.handle_request(HostRequest::OpenQuickSearch {
            kind: QuickSearchKind::Tabs,
            new_tab: false,
        });
        for _ in 0..5 {
            ws.handle_quick_search_key(KeyCode::Down, KeyModifiers::NONE)
                .unwrap();
        }
        assert_eq!(ws.quick_search.as_ref().unwrap().selected, 2);
        ws.handle_quick_search_key(KeyCode::Up, KeyModifiers::NONE)
            .unwrap();
        assert_eq!(ws.quick_search.as_ref().unwrap().selected, 1);
    }

    #[test]
    fn test_keys_ignored_when_overlay_closed() {
        let mut ws = workspace();
        assert!(!ws
            .handle_quick_search_key(KeyCode::Char('x'), KeyModifiers::NONE)
            .unwrap());
    }
}
