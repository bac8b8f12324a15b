//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, forwarded host requests, periodic ticks, and
//! Unix signals with `tokio::select!`. The tick drives everything deadline
//! based: sequence disambiguation and mode indicator expiry.

use crate::config::Config;
use crate::controller::Controller;
use crate::host::HostRequest;
use crate::ui::render::{render, CHROME_ROWS};
use crate::ui::tabs::Workspace;
use anyhow::Result;
use crossterm::{
    event::{Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Result of handling a key press event.
pub enum Action {
    Continue,
    Quit,
}

/// Runs the TUI event loop.
///
/// Event sources, in select priority order: shutdown signals, SIGHUP config
/// reload, terminal input, forwarded host requests, and a 250ms tick.
///
/// Installs a panic hook that restores terminal state before unwinding, so
/// the terminal is not left in raw mode on panic.
pub async fn run(
    ctrl: &mut Controller,
    ws: &mut Workspace,
    mut host_rx: mpsc::Receiver<HostRequest>,
    config_path: PathBuf,
) -> Result<()> {
    // Install panic hook BEFORE setting up terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let size = terminal.size()?;
    ws.set_viewport(
        size.width as usize,
        size.height.saturating_sub(CHROME_ROWS) as usize,
    );

    let mut event_stream = crossterm::event::EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;
    #[cfg(unix)]
    let mut sighup = signal(SignalKind::hangup())?;

    let mut needs_redraw = true;
    let mut status: Option<String> = None;

    loop {
        if needs_redraw {
            terminal.draw(|f| render(f, ctrl, ws, status.as_deref()))?;
            needs_redraw = false;
        }

        // Drain pending host requests before blocking on input
        let mut closed = false;
        while let Ok(request) = host_rx.try_recv() {
            needs_redraw = true;
            if !ws.handle_request(request) {
                closed = true;
            }
        }
        if closed {
            break;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sighup_fut = sighup.recv();
        #[cfg(not(unix))]
        let sighup_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            _ = sighup_fut => {
                tracing::info!(path = %config_path.display(), "SIGHUP: reloading configuration");
                match Config::load(&config_path) {
                    Ok(config) => {
                        ctrl.apply_config(&config);
                        status = Some("Configuration reloaded".to_string());
                    }
                    Err(e) => status = Some(format!("Config reload failed: {e}")),
                }
                needs_redraw = true;
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        needs_redraw = true;
                        status = None;
                        match handle_key(ctrl, ws, key.code, key.modifiers, &mut status) {
                            Action::Quit => break,
                            Action::Continue => {}
                        }
                    }
                    Some(Ok(Event::Resize(width, height))) => {
                        needs_redraw = true;
                        ws.set_viewport(
                            width as usize,
                            height.saturating_sub(CHROME_ROWS) as usize,
                        );
                    }
                    _ => {}
                }
            }

            Some(request) = host_rx.recv() => {
                needs_redraw = true;
                if !ws.handle_request(request) {
                    break;
                }
            }

            _ = tick_interval.tick() => {
                if ctrl.on_tick(ws.active_page_mut(), Instant::now()) {
                    needs_redraw = true;
                    drain_navigation(ws, &mut status);
                }
            }
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// Route one key press: quick-search overlay first, then the interpreter.
/// Ctrl+C quits even in raw mode, where no SIGINT is generated.
fn handle_key(
    ctrl: &mut Controller,
    ws: &mut Workspace,
    code: KeyCode,
    modifiers: KeyModifiers,
    status: &mut Option<String>,
) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match ws.handle_quick_search_key(code, modifiers) {
        Ok(true) => return Action::Continue,
        Ok(false) => {}
        Err(e) => {
            *status = Some(format!("Error: {e}"));
            return Action::Continue;
        }
    }

    ctrl.handle_key(ws.active_page_mut(), code, modifiers, Instant::now());
    drain_navigation(ws, status);
    Action::Continue
}

/// Perform any navigation the active page queued during activation.
fn drain_navigation(ws: &mut Workspace, status: &mut Option<String>) {
    while let Some(nav) = ws.active_page_mut().take_navigation() {
        if let Err(e) = ws.navigate(nav) {
            tracing::warn!(error = %e, "Navigation failed");
            *status = Some(format!("Error: {e}"));
        }
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
