//! Command dispatch: map a resolved [`Command`] onto its effect.
//!
//! Commands act on one of three surfaces: the page (scrolling, hints), the
//! controller itself (mode, help), or the host channel (tab and history
//! commands, quick search). Dispatch is synchronous and never blocks; host
//! effects go out as fire-and-forget requests.

use crate::controller::Controller;
use crate::host::{self, HostRequest, QuickSearchKind};
use crate::keymap::Command;
use crate::page::Page;
use crate::scroll::{self, Motion};
use std::time::Instant;

pub(crate) fn run<P: Page>(ctrl: &mut Controller, page: &mut P, cmd: Command, now: Instant) {
    tracing::debug!(command = %cmd.describe(), "Dispatching command");
    match cmd {
        Command::ScrollDown => scroll_page(ctrl, page, Motion::StepDown),
        Command::ScrollUp => scroll_page(ctrl, page, Motion::StepUp),
        Command::ScrollHalfDown => scroll_page(ctrl, page, Motion::HalfDown),
        Command::ScrollHalfUp => scroll_page(ctrl, page, Motion::HalfUp),
        Command::ScrollToTop => scroll_page(ctrl, page, Motion::Top),
        Command::ScrollToBottom => scroll_page(ctrl, page, Motion::Bottom),

        Command::LinkHints => ctrl.start_hints(page, false),
        Command::LinkHintsNewTab => ctrl.start_hints(page, true),

        Command::InsertMode => ctrl.enter_insert_mode(now),
        Command::Help => ctrl.toggle_help(),

        Command::NextTab => host::forward(ctrl.host_tx(), HostRequest::NextTab),
        Command::PrevTab => host::forward(ctrl.host_tx(), HostRequest::PrevTab),
        Command::CloseTab => host::forward(ctrl.host_tx(), HostRequest::CloseTab),
        Command::HistoryBack => host::forward(ctrl.host_tx(), HostRequest::HistoryBack),
        Command::HistoryForward => host::forward(ctrl.host_tx(), HostRequest::HistoryForward),

        Command::QuickSearch => quick_search(ctrl, QuickSearchKind::Bookmarks, false),
        Command::QuickSearchNewTab => quick_search(ctrl, QuickSearchKind::Bookmarks, true),
        Command::TabSearch => quick_search(ctrl, QuickSearchKind::Tabs, false),
    }
}

fn scroll_page<P: Page>(ctrl: &Controller, page: &mut P, motion: Motion) {
    let viewport = page.viewport();
    let next = scroll::apply(
        motion,
        page.scroll_offset(),
        viewport.height,
        page.content_height(),
        ctrl.scroll_step(),
    );
    page.set_scroll(next);
}

fn quick_search(ctrl: &Controller, kind: QuickSearchKind, new_tab: bool) {
    host::forward(ctrl.host_tx(), HostRequest::OpenQuickSearch { kind, new_tab });
}
