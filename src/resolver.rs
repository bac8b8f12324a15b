//! Key-sequence resolver — turns a keystroke stream into commands.
//!
//! The binding table may contain a sequence that is simultaneously a complete
//! binding and a strict prefix of a longer one ("j" vs "jk"). The resolver
//! holds the shorter match back for a bounded window: if the longer sequence
//! completes in time it wins, otherwise the deferred short command fires when
//! the deadline lapses.
//!
//! The deadline lives inside the resolver state and is checked by the event
//! loop's periodic tick (`poll`), the same shape as the debounced-search
//! deadline in the UI loop. Every state-clearing transition resets it
//! synchronously, so a lapsed deadline can never resurrect cleared state.

use crate::keymap::{Command, KeyToken, Keymap};
use std::time::{Duration, Instant};

/// What happened to the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFate {
    /// Swallowed by a resolved command.
    Consumed,
    /// Swallowed; a sequence is still pending.
    Pending,
    /// Not ours; forward to the page unmodified.
    PassThrough,
}

/// Result of feeding one key to the resolver.
///
/// A single keystroke can resolve up to two commands: breaking a pending
/// prefix flushes the deferred short command, then the key is reprocessed
/// fresh and may itself resolve. `commands` is in firing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub commands: Vec<Command>,
    pub fate: KeyFate,
}

impl Outcome {
    fn pass() -> Self {
        Self {
            commands: Vec::new(),
            fate: KeyFate::PassThrough,
        }
    }

    fn pending() -> Self {
        Self {
            commands: Vec::new(),
            fate: KeyFate::Pending,
        }
    }

    fn fired(cmd: Command) -> Self {
        Self {
            commands: vec![cmd],
            fate: KeyFate::Consumed,
        }
    }
}

/// Default disambiguation window.
pub const DEFAULT_SEQUENCE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Incremental matcher over the binding table.
///
/// One instance per page context; strictly single-threaded. `handle_key` and
/// `poll` never overlap.
#[derive(Debug)]
pub struct SequenceResolver {
    /// Keys typed so far that are a strict prefix of at least one binding.
    pending: Vec<KeyToken>,
    /// Binding exactly equal to `pending`, deferred until the window lapses.
    pending_short: Option<Command>,
    /// When the pending sequence resolves to `pending_short` or is discarded.
    deadline: Option<Instant>,
    window: Duration,
}

impl SequenceResolver {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: Vec::new(),
            pending_short: None,
            deadline: None,
            window,
        }
    }

    /// Feed one normalized keystroke.
    pub fn handle_key(&mut self, keymap: &Keymap, token: KeyToken, now: Instant) -> Outcome {
        // Non-character keys bypass the sequence logic: direct length-1 lookup.
        if !token.is_char() {
            return match keymap.exact(&[token]) {
                Some(cmd) => Outcome::fired(cmd),
                None => Outcome::pass(),
            };
        }

        if self.pending.is_empty() {
            return self.start(keymap, token, now);
        }

        let mut attempt = self.pending.clone();
        attempt.push(token);

        // Exact matches always win immediately, even when a still-longer
        // binding also starts with the attempt.
        if let Some(cmd) = keymap.exact(&attempt) {
            self.reset();
            return Outcome::fired(cmd);
        }

        if keymap.has_longer_prefix(&attempt) {
            self.pending_short = keymap.exact(&attempt);
            self.pending = attempt;
            self.deadline = Some(now + self.window);
            return Outcome::pending();
        }

        // Sequence broken: flush the deferred short command if any, then
        // reprocess this key as a fresh event.
        let flushed = self.pending_short.take();
        self.reset();
        let mut outcome = self.start(keymap, token, now);
        if let Some(cmd) = flushed {
            tracing::debug!(?cmd, "Prefix broken, flushing deferred command");
            outcome.commands.insert(0, cmd);
        }
        outcome
    }

    /// First key of a fresh sequence (rules 1 and 2).
    fn start(&mut self, keymap: &Keymap, token: KeyToken, now: Instant) -> Outcome {
        let single = [token];
        if keymap.has_longer_prefix(&single) {
            self.pending = vec![token];
            self.pending_short = keymap.exact(&single);
            self.deadline = Some(now + self.window);
            return Outcome::pending();
        }
        match keymap.exact(&single) {
            Some(cmd) => Outcome::fired(cmd),
            None => Outcome::pass(),
        }
    }

    /// Deadline check, driven by the event loop tick.
    ///
    /// On lapse, fires the deferred short command (if any) and always clears
    /// pending state. Returns None when nothing is due; once cleared, further
    /// polls are no-ops.
    pub fn poll(&mut self, now: Instant) -> Option<Command> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                let cmd = self.pending_short.take();
                self.reset();
                if let Some(cmd) = cmd {
                    tracing::debug!(?cmd, "Sequence window lapsed, firing deferred command");
                }
                cmd
            }
            _ => None,
        }
    }

    /// Discard all pending state. Used on mode switches and hint activation.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.pending_short = None;
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The accumulated prefix, for the status line.
    pub fn pending_keys(&self) -> &[KeyToken] {
        &self.pending
    }

    /// Next deadline, for the event loop to schedule its tick against.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Default for SequenceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SEQUENCE_TIMEOUT)
    }
}

// ============================================================================
// Tests
// ============================================================================
