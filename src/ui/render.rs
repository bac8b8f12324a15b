//! Render functions for the TUI.
//!
//! One frame is: tab strip, page body, status line. Overlays (hint labels,
//! quick search, help) draw on top of the body.

use crate::controller::{Controller, Mode};
use crate::host::QuickSearchKind;
use crate::page::Page;
use crate::ui::tabs::Workspace;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};
use std::borrow::Cow;
use unicode_width::UnicodeWidthStr;

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 20;
pub(super) const MIN_HEIGHT: u16 = 5;

/// Rows reserved outside the page body (tab strip + status line).
pub(super) const CHROME_ROWS: u16 = 2;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, ctrl: &Controller, ws: &Workspace, status: Option<&str>) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        f.render_widget(Paragraph::new("Too small"), area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_tab_strip(f, ws, chunks[0]);
    render_page(f, ctrl, ws, chunks[1]);
    render_status(f, ctrl, ws, status, chunks[2]);

    if ws.quick_search.is_some() {
        render_quick_search(f, ws);
    }

    if ctrl.help_visible() {
        render_help(f, ctrl);
    }
}

/// One cell per tab: index, truncated title, active tab highlighted.
fn render_tab_strip(f: &mut Frame, ws: &Workspace, area: Rect) {
    let mut spans: Vec<Span> = Vec::new();
    for (i, tab) in ws.tabs().enumerate() {
        let title = truncate(tab.page.title(), 20);
        let label = format!(" {}:{} ", i + 1, title);
        let style = if i == ws.active_index() {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray).fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// The visible slice of the page, with hint labels overlaid when a session
/// is open.
fn render_page(f: &mut Frame, ctrl: &Controller, ws: &Workspace, area: Rect) {
    let page = ws.active_page();
    let top = page.scroll_offset();
    let visible: Vec<Line> = page
        .lines()
        .iter()
        .skip(top)
        .take(area.height as usize)
        .map(|l| Line::from(l.as_str()))
        .collect();
    f.render_widget(Paragraph::new(visible), area);

    let Some(session) = ctrl.hint_session() else {
        return;
    };
    let typed = session.typed().len();
    for (label, id) in session.visible() {
        let Some(link) = page.links().get(*id) else {
            continue;
        };
        let b = link.bounds;
        if b.top < top || b.top - top >= area.height as usize {
            continue;
        }
        let width = (label.width() as u16).min(area.width.saturating_sub(b.left as u16));
        if width == 0 {
            continue;
        }
        let overlay = Rect {
            x: area.x + b.left as u16,
            y: area.y + (b.top - top) as u16,
            width,
            height: 1,
        };
        // Typed prefix dimmed, remainder highlighted
        let (done, rest) = label.split_at(typed.min(label.len()));
        let line = Line::from(vec![
            Span::styled(
                done.to_string(),
                Style::default().bg(Color::Yellow).fg(Color::DarkGray),
            ),
            Span::styled(
                rest.to_string(),
                Style::default()
                    .bg(Color::Yellow)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        f.render_widget(Clear, overlay);
        f.render_widget(Paragraph::new(line), overlay);
    }
}

/// Status line: errors, then mode indicator, then pending keys, then the
/// page address.
fn render_status(
    f: &mut Frame,
    ctrl: &Controller,
    ws: &Workspace,
    status: Option<&str>,
    area: Rect,
) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let pending = ctrl.pending_display();
    let text: Cow<'_, str> = if let Some(msg) = status {
        Cow::Borrowed(msg)
    } else if let Some(indicator) = ctrl.indicator() {
        Cow::Owned(format!("-- {indicator} --"))
    } else if ctrl.hint_session().is_some() {
        Cow::Borrowed("Type a hint label | Esc cancel")
    } else if !pending.is_empty() {
        Cow::Owned(format!("Keys: {pending}"))
    } else if ctrl.mode() == Mode::Insert {
        Cow::Borrowed("-- INSERT -- (Esc to leave)")
    } else {
        Cow::Owned(truncate(ws.active_page().address(), area.width as usize))
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Quick-search overlay: query line plus filtered result rows.
fn render_quick_search(f: &mut Frame, ws: &Workspace) {
    let Some(state) = &ws.quick_search else {
        return;
    };
    let area = f.area();
    let overlay = centered_rect(70, 60, area);
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    let title = match state.kind {
        QuickSearchKind::Bookmarks => " Open Page ",
        QuickSearchKind::History => " History ",
        QuickSearchKind::Tabs => " Tabs ",
    };

    let hits = ws.quick_search_hits();
    let mut lines = vec![Line::from(format!("> {}_", state.input)), Line::from("")];
    let visible = overlay.height.saturating_sub(4) as usize;
    for (i, hit) in hits.iter().take(visible).enumerate() {
        let marker = if i == state.selected { "> " } else { "  " };
        let style = if i == state.selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{}{}  {}",
                marker,
                truncate(&hit.title, 30),
                truncate(&hit.url, overlay.width.saturating_sub(36) as usize)
            ),
            style,
        )));
    }
    if hits.is_empty() {
        lines.push(Line::from("  (no matches)"));
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_alignment(Alignment::Left),
    );
    f.render_widget(paragraph, overlay);
}

/// Help overlay — the full binding table with descriptions.
fn render_help(f: &mut Frame, ctrl: &Controller) {
    let area = f.area();
    let overlay = centered_rect(60, 80, area);
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    f.render_widget(Clear, overlay);

    let visible = overlay.height.saturating_sub(4) as usize;
    let rows: Vec<Row> = ctrl
        .keymap()
        .all_bindings()
        .into_iter()
        .take(visible)
        .map(|(keys, description)| Row::new(vec![format!("  {keys}"), description.to_string()]))
        .collect();

    let widths = [Constraint::Length(12), Constraint::Min(20)];
    let table = Table::new(rows, widths)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (? to close) "),
        )
        .header(
            Row::new(vec!["Key", "Action"])
                .style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                )
                .bottom_margin(1),
        );

    f.render_widget(table, overlay);
}

fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Create a centered rectangle with the given percentage of the parent area.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
