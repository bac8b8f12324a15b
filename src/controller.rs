//! Per-page interpreter state: mode, pending sequence, active hint session.
//!
//! One `Controller` per page context, owning both state machines. They are
//! mutually exclusive: opening a hint session resets any pending sequence,
//! and no sequence can start while a session is open. All routing happens
//! here — exclusion check, then hints, then insert mode, then the resolver.

use crate::config::Config;
use crate::dispatch;
use crate::exclude::ExclusionList;
use crate::hints::{HintOutcome, HintSession};
use crate::host::HostRequest;
use crate::keymap::{KeyToken, Keymap, NamedKey};
use crate::page::{self, Page, TargetId};
use crate::resolver::{KeyFate, SequenceResolver};
use crossterm::event::{KeyCode, KeyModifiers};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How long the mode indicator stays on screen.
const INDICATOR_TTL: Duration = Duration::from_millis(1500);

/// Keystroke interpretation layer (the hint session, when open, is an
/// implicit third layer that outranks both).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Insert,
}

/// Whether the embedder should forward the key to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Consumed,
    PassThrough,
}

pub struct Controller {
    keymap: Keymap,
    exclusions: ExclusionList,
    resolver: SequenceResolver,
    hints: Option<HintSession<TargetId>>,
    mode: Mode,
    alphabet: Vec<char>,
    scroll_step: usize,
    show_help: bool,
    indicator: Option<(String, Instant)>,
    host_tx: mpsc::Sender<HostRequest>,
}

impl Controller {
    pub fn new(config: &Config, host_tx: mpsc::Sender<HostRequest>) -> Self {
        let mut controller = Self {
            keymap: Keymap::new(),
            exclusions: ExclusionList::default(),
            resolver: SequenceResolver::default(),
            hints: None,
            mode: Mode::Command,
            alphabet: Vec::new(),
            scroll_step: 60,
            show_help: false,
            indicator: None,
            host_tx,
        };
        controller.apply_config(config);
        controller
    }

    /// Rebuild table-driven state from a (re)loaded config. Pending sequences
    /// and open hint sessions do not survive a reload.
    pub fn apply_config(&mut self, config: &Config) {
        let mut keymap = Keymap::new();
        for warning in keymap.apply_overrides(&config.keymap) {
            tracing::warn!(warning = %warning, "Keymap override rejected");
        }
        self.keymap = keymap;
        self.exclusions = ExclusionList::new(&config.exclusions);
        self.alphabet = config.hint_alphabet_chars();
        self.scroll_step = config.scroll_step;
        self.resolver = SequenceResolver::new(config.sequence_timeout());
        self.hints = None;
    }

    /// Route one keystroke. Exactly one interpreter sees it: the help
    /// overlay, the hint session, insert mode, or the sequence resolver.
    pub fn handle_key<P: Page>(
        &mut self,
        page: &mut P,
        code: KeyCode,
        modifiers: KeyModifiers,
        now: Instant,
    ) -> Disposition {
        if self.exclusions.is_excluded(page.address()) {
            return Disposition::PassThrough;
        }

        let Some(token) = KeyToken::from_event(code, modifiers) else {
            return Disposition::PassThrough;
        };

        if self.show_help {
            if matches!(
                token,
                KeyToken::Named(NamedKey::Esc) | KeyToken::Char('?')
            ) {
                self.show_help = false;
            }
            return Disposition::Consumed;
        }

        if self.hints.is_some() {
            return self.handle_hint_key(page, token);
        }

        if self.mode == Mode::Insert {
            if token == KeyToken::Named(NamedKey::Esc) {
                self.enter_command_mode(now);
                return Disposition::Consumed;
            }
            return Disposition::PassThrough;
        }

        if page.editable_focused() {
            return Disposition::PassThrough;
        }

        let outcome = self.resolver.handle_key(&self.keymap, token, now);
        for cmd in outcome.commands {
            dispatch::run(self, page, cmd, now);
        }
        match outcome.fate {
            KeyFate::PassThrough => Disposition::PassThrough,
            KeyFate::Consumed | KeyFate::Pending => Disposition::Consumed,
        }
    }

    /// Keystrokes while a hint session is open: Esc cancels, letters narrow,
    /// everything else is swallowed.
    fn handle_hint_key<P: Page>(&mut self, page: &mut P, token: KeyToken) -> Disposition {
        match token {
            KeyToken::Named(NamedKey::Esc) => {
                self.cancel_hints();
            }
            KeyToken::Char(c) if c.is_alphabetic() => {
                if let Some(session) = self.hints.as_mut() {
                    match session.feed_char(c) {
                        HintOutcome::Narrowed => {}
                        HintOutcome::Activated(id) => {
                            let new_tab = session.new_tab();
                            self.hints = None;
                            page.activate(id, new_tab);
                        }
                        HintOutcome::Exhausted => {
                            self.hints = None;
                        }
                    }
                }
            }
            _ => {}
        }
        Disposition::Consumed
    }

    /// Periodic tick: resolver deadline and indicator expiry. Returns true
    /// when the screen should be redrawn.
    pub fn on_tick<P: Page>(&mut self, page: &mut P, now: Instant) -> bool {
        let mut redraw = false;

        if let Some(cmd) = self.resolver.poll(now) {
            dispatch::run(self, page, cmd, now);
            redraw = true;
        }

        if let Some((_, shown_at)) = &self.indicator {
            if now.duration_since(*shown_at) >= INDICATOR_TTL {
                self.indicator = None;
                redraw = true;
            }
        }

        redraw
    }

    /// Open a hint session over the currently visible targets. A session and
    /// a pending sequence are mutually exclusive, so the resolver is reset
    /// first. Zero eligible targets means no session at all.
    pub(crate) fn start_hints<P: Page>(&mut self, page: &P, new_tab: bool) {
        self.resolver.reset();
        let targets = page::visible_targets(page);
        self.hints = HintSession::new(targets, &self.alphabet, new_tab);
        if self.hints.is_none() {
            tracing::debug!(address = %page.address(), "No hintable targets");
        }
    }

    pub fn cancel_hints(&mut self) {
        self.hints = None;
    }

    pub(crate) fn enter_insert_mode(&mut self, now: Instant) {
        self.mode = Mode::Insert;
        self.resolver.reset();
        self.set_indicator("INSERT MODE", now);
    }

    pub fn enter_command_mode(&mut self, now: Instant) {
        self.mode = Mode::Command;
        self.resolver.reset();
        self.set_indicator("COMMAND MODE", now);
    }

    pub(crate) fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    fn set_indicator(&mut self, text: &str, now: Instant) {
        self.indicator = Some((text.to_string(), now));
    }

    // ------------------------------------------------------------------
    // Accessors (dispatch + rendering)
    // ------------------------------------------------------------------

    pub(crate) fn host_tx(&self) -> &mpsc::Sender<HostRequest> {
        &self.host_tx
    }

    pub(crate) fn scroll_step(&self) -> usize {
        self.scroll_step
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn indicator(&self) -> Option<&str> {
        self.indicator.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn hint_session(&self) -> Option<&HintSession<TargetId>> {
        self.hints.as_ref()
    }

    pub fn help_visible(&self) -> bool {
        self.show_help
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// Typed-so-far prefix for the status line, empty when nothing pends.
    pub fn pending_display(&self) -> String {
        self.resolver
            .pending_keys()
            .iter()
            .map(|t| match t {
                KeyToken::Char(c) => *c,
                KeyToken::Named(_) => '?',
            })
            .collect()
    }

    /// Earliest instant the next tick must observe, for loop scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resolver.deadline()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Bounds, TargetId, Viewport};
    use pretty_assertions::assert_eq;

    /// Minimal in-memory page: a tall document with three links near the top.
    struct StubPage {
        address: String,
        scroll: usize,
        height: usize,
        links: Vec<(Bounds, String)>,
        activated: Vec<(TargetId, bool)>,
        editable: bool,
    }

    impl StubPage {
        fn new() -> Self {
            let links = vec![
                (bounds(1), "one.md".to_string()),
                (bounds(2), "two.md".to_string()),
                (bounds(3), "three.md".to_string()),
            ];
            Self {
                address: "file:///stub.md".to_string(),
                scroll: 0,
                height: 200,
                links,
                activated: Vec::new(),
                editable: false,
            }
        }
    }

    fn bounds(top: usize) -> Bounds {
        Bounds {
            top,
            left: 0,
            width: 8,
            height: 1,
        }
    }

    impl Page for StubPage {
        fn address(&self) -> &str {
            &self.address
        }

        fn viewport(&self) -> Viewport {
            Viewport {
                top: self.scroll,
                height: 24,
                width: 80,
            }
        }

        fn scroll_offset(&self) -> usize {
            self.scroll
        }

        fn set_scroll(&mut self, offset: usize) {
            self.scroll = offset.min(self.height.saturating_sub(24));
        }

        fn content_height(&self) -> usize {
            self.height
        }

        fn targets(&self) -> Vec<(TargetId, Bounds)> {
            self.links
                .iter()
                .enumerate()
                .map(|(id, (b, _))| (id, *b))
                .collect()
        }

        fn activate(&mut self, id: TargetId, new_tab: bool) {
            self.activated.push((id, new_tab));
        }

        fn link_destination(&self, id: TargetId) -> Option<&str> {
            self.links.get(id).map(|(_, url)| url.as_str())
        }

        fn editable_focused(&self) -> bool {
            self.editable
        }
    }

    fn controller() -> (Controller, mpsc::Receiver<HostRequest>) {
        let (tx, rx) = mpsc::channel(16);
        (Controller::new(&Config::default(), tx), rx)
    }

    fn press(ctrl: &mut Controller, page: &mut StubPage, c: char, now: Instant) -> Disposition {
        ctrl.handle_key(page, KeyCode::Char(c), KeyModifiers::NONE, now)
    }

    fn press_esc(ctrl: &mut Controller, page: &mut StubPage, now: Instant) -> Disposition {
        ctrl.handle_key(page, KeyCode::Esc, KeyModifiers::NONE, now)
    }

    #[test]
    fn test_scroll_command_moves_page() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        assert_eq!(press(&mut ctrl, &mut page, 'j', now), Disposition::Consumed);
        assert_eq!(page.scroll_offset(), 60);
        press(&mut ctrl, &mut page, 'k', now);
        assert_eq!(page.scroll_offset(), 0);
    }

    #[test]
    fn test_gg_scrolls_to_top_after_deferral() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        page.set_scroll(100);
        assert_eq!(press(&mut ctrl, &mut page, 'g', now), Disposition::Consumed);
        assert_eq!(page.scroll_offset(), 100);
        press(&mut ctrl, &mut page, 'g', now);
        assert_eq!(page.scroll_offset(), 0);
    }

    #[test]
    fn test_deferred_short_fires_via_tick() {
        // Override makes j both a binding and a prefix of jj.
        let mut config = Config::default();
        config
            .keymap
            .insert("close_tab".to_string(), "jj".to_string());
        let (tx, mut rx) = mpsc::channel(16);
        let mut ctrl = Controller::new(&config, tx);
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'j', now);
        assert_eq!(page.scroll_offset(), 0);

        assert!(!ctrl.on_tick(&mut page, now + Duration::from_millis(500)));
        assert!(ctrl.on_tick(&mut page, now + Duration::from_millis(1000)));
        assert_eq!(page.scroll_offset(), 60);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_forwarded_commands_reach_host() {
        let (mut ctrl, mut rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'J', now);
        press(&mut ctrl, &mut page, 'x', now);
        press(&mut ctrl, &mut page, 'T', now);
        assert_eq!(rx.try_recv(), Ok(HostRequest::NextTab));
        assert_eq!(rx.try_recv(), Ok(HostRequest::CloseTab));
        assert_eq!(
            rx.try_recv(),
            Ok(HostRequest::OpenQuickSearch {
                kind: crate::host::QuickSearchKind::Tabs,
                new_tab: false,
            })
        );
    }

    #[test]
    fn test_unbound_key_passes_through_to_page() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        assert_eq!(
            press(&mut ctrl, &mut page, 'z', Instant::now()),
            Disposition::PassThrough
        );
    }

    #[test]
    fn test_insert_mode_suppresses_commands_until_escape() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'i', now);
        assert_eq!(ctrl.mode(), Mode::Insert);
        assert_eq!(ctrl.indicator(), Some("INSERT MODE"));

        // Bound keys no longer resolve; they go to the page
        assert_eq!(
            press(&mut ctrl, &mut page, 'j', now),
            Disposition::PassThrough
        );
        assert_eq!(page.scroll_offset(), 0);

        assert_eq!(press_esc(&mut ctrl, &mut page, now), Disposition::Consumed);
        assert_eq!(ctrl.mode(), Mode::Command);
        assert_eq!(ctrl.indicator(), Some("COMMAND MODE"));
    }

    #[test]
    fn test_indicator_expires_on_tick() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'i', now);
        assert!(ctrl.indicator().is_some());
        assert!(!ctrl.on_tick(&mut page, now + Duration::from_millis(1000)));
        assert!(ctrl.on_tick(&mut page, now + Duration::from_millis(1500)));
        assert_eq!(ctrl.indicator(), None);
    }

    #[test]
    fn test_excluded_page_disables_everything() {
        let mut config = Config::default();
        config.exclusions.push("stub.md".to_string());
        let (tx, _rx) = mpsc::channel(16);
        let mut ctrl = Controller::new(&config, tx);
        let mut page = StubPage::new();
        let now = Instant::now();

        assert_eq!(
            press(&mut ctrl, &mut page, 'j', now),
            Disposition::PassThrough
        );
        assert_eq!(page.scroll_offset(), 0);
        press(&mut ctrl, &mut page, 'f', now);
        assert!(ctrl.hint_session().is_none());
    }

    #[test]
    fn test_editable_focus_passes_keys_through() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        page.editable = true;
        assert_eq!(
            press(&mut ctrl, &mut page, 'j', Instant::now()),
            Disposition::PassThrough
        );
        assert_eq!(page.scroll_offset(), 0);
    }

    #[test]
    fn test_hint_flow_activates_target() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'f', now);
        let session = ctrl.hint_session().expect("session open");
        assert_eq!(session.remaining(), 3);

        // 's' is the label of the second target
        press(&mut ctrl, &mut page, 's', now);
        assert!(ctrl.hint_session().is_none());
        assert_eq!(page.activated, vec![(1, false)]);
    }

    #[test]
    fn test_hint_new_tab_flag_reaches_activation() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'F', now);
        press(&mut ctrl, &mut page, 'a', now);
        assert_eq!(page.activated, vec![(0, true)]);
    }

    #[test]
    fn test_hint_escape_cancels_without_activation() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'f', now);
        press_esc(&mut ctrl, &mut page, now);
        assert!(ctrl.hint_session().is_none());
        assert!(page.activated.is_empty());
    }

    #[test]
    fn test_hint_no_match_exhausts_session() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'f', now);
        press(&mut ctrl, &mut page, 'z', now);
        assert!(ctrl.hint_session().is_none());
        assert!(page.activated.is_empty());

        // Session is gone: further keys resolve as commands again
        press(&mut ctrl, &mut page, 'j', now);
        assert_eq!(page.scroll_offset(), 60);
    }

    #[test]
    fn test_hints_swallow_unrelated_keys() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'f', now);
        assert_eq!(press(&mut ctrl, &mut page, '3', now), Disposition::Consumed);
        assert_eq!(ctrl.hint_session().map(|s| s.remaining()), Some(3));
    }

    #[test]
    fn test_hints_with_zero_targets_end_immediately() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        page.links.clear();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'f', now);
        assert!(ctrl.hint_session().is_none());
        // Interpreter is still live
        press(&mut ctrl, &mut page, 'j', now);
        assert_eq!(page.scroll_offset(), 60);
    }

    #[test]
    fn test_opening_hints_clears_pending_sequence() {
        // Bind hints to a named key so a prefix can be pending when it fires.
        let mut config = Config::default();
        config
            .keymap
            .insert("link_hints".to_string(), "F5".to_string());
        let (tx, _rx) = mpsc::channel(16);
        let mut ctrl = Controller::new(&config, tx);
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'g', now);
        assert!(!ctrl.pending_display().is_empty());

        ctrl.handle_key(&mut page, KeyCode::F(5), KeyModifiers::NONE, now);
        assert!(ctrl.hint_session().is_some());
        assert!(ctrl.pending_display().is_empty());
        assert_eq!(ctrl.next_deadline(), None);
    }

    #[test]
    fn test_help_overlay_captures_keys() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, '?', now);
        assert!(ctrl.help_visible());

        // Keys are captured while the overlay is up
        assert_eq!(press(&mut ctrl, &mut page, 'j', now), Disposition::Consumed);
        assert_eq!(page.scroll_offset(), 0);

        press(&mut ctrl, &mut page, '?', now);
        assert!(!ctrl.help_visible());
    }

    #[test]
    fn test_apply_config_rebuilds_tables_and_cancels_session() {
        let (mut ctrl, _rx) = controller();
        let mut page = StubPage::new();
        let now = Instant::now();

        press(&mut ctrl, &mut page, 'f', now);
        assert!(ctrl.hint_session().is_some());

        let mut config = Config::default();
        config
            .keymap
            .insert("scroll_down".to_string(), "n".to_string());
        ctrl.apply_config(&config);

        assert!(ctrl.hint_session().is_none());
        press(&mut ctrl, &mut page, 'n', now);
        assert_eq!(page.scroll_offset(), 60);
        assert_eq!(
            press(&mut ctrl, &mut page, 'j', now),
            Disposition::PassThrough
        );
    }
}
