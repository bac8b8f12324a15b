//! Binding table — maps commands to literal key sequences with config overrides.
//!
//! Replaces hardcoded key match arms with a data-driven table that supports
//! user customization via config.toml. Sequences may be ambiguous prefixes of
//! each other ("j" vs "jk"); resolving that ambiguity is the resolver's job,
//! not the table's.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Command Enum
// ============================================================================

/// All user-facing commands that can be bound to a key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ScrollDown,
    ScrollUp,
    ScrollHalfDown,
    ScrollHalfUp,
    ScrollToTop,
    ScrollToBottom,
    LinkHints,
    LinkHintsNewTab,
    NextTab,
    PrevTab,
    CloseTab,
    HistoryBack,
    HistoryForward,
    QuickSearch,
    QuickSearchNewTab,
    TabSearch,
    InsertMode,
    Help,
}

impl Command {
    /// Human-readable description for the help overlay.
    pub fn describe(self) -> &'static str {
        match self {
            Self::ScrollDown => "Scroll down",
            Self::ScrollUp => "Scroll up",
            Self::ScrollHalfDown => "Scroll down half page",
            Self::ScrollHalfUp => "Scroll up half page",
            Self::ScrollToTop => "Scroll to top",
            Self::ScrollToBottom => "Scroll to bottom",
            Self::LinkHints => "Show link hints",
            Self::LinkHintsNewTab => "Link hints (new tab)",
            Self::NextTab => "Next tab",
            Self::PrevTab => "Previous tab",
            Self::CloseTab => "Close tab",
            Self::HistoryBack => "History back",
            Self::HistoryForward => "History forward",
            Self::QuickSearch => "Open quick search",
            Self::QuickSearchNewTab => "Quick search (new tab)",
            Self::TabSearch => "Search tabs",
            Self::InsertMode => "Enter insert mode",
            Self::Help => "Show help",
        }
    }
}

/// Parse a command name string (from config) into a Command.
///
/// Accepts snake_case and the camelCase names used by older configs.
fn parse_command_name(name: &str) -> Option<Command> {
    match name.to_lowercase().as_str() {
        "scroll_down" | "scrolldown" => Some(Command::ScrollDown),
        "scroll_up" | "scrollup" => Some(Command::ScrollUp),
        "scroll_half_down" | "scrolldownhalf" | "scroll_down_half" => Some(Command::ScrollHalfDown),
        "scroll_half_up" | "scrolluphalf" | "scroll_up_half" => Some(Command::ScrollHalfUp),
        "scroll_to_top" | "scrolltotop" | "top" => Some(Command::ScrollToTop),
        "scroll_to_bottom" | "scrolltobottom" | "bottom" => Some(Command::ScrollToBottom),
        "link_hints" | "linkhints" | "hints" => Some(Command::LinkHints),
        "link_hints_new_tab" | "linkhintsnewtab" => Some(Command::LinkHintsNewTab),
        "next_tab" | "nexttab" => Some(Command::NextTab),
        "prev_tab" | "prevtab" => Some(Command::PrevTab),
        "close_tab" | "closetab" => Some(Command::CloseTab),
        "history_back" | "historyback" | "back" => Some(Command::HistoryBack),
        "history_forward" | "historyforward" | "forward" => Some(Command::HistoryForward),
        "quick_search" | "quicksearch" | "omnibar" => Some(Command::QuickSearch),
        "quick_search_new_tab" | "quicksearchnewtab" | "omnibarnewtab" => {
            Some(Command::QuickSearchNewTab)
        }
        "tab_search" | "tabsearch" => Some(Command::TabSearch),
        "insert_mode" | "insertmode" | "insert" => Some(Command::InsertMode),
        "help" => Some(Command::Help),
        _ => None,
    }
}

// ============================================================================
// Key Tokens
// ============================================================================

/// Non-character keys that can appear as a (length-1) binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Esc,
    Enter,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Backspace,
    F(u8),
}

/// The normalized unit of sequence matching: one physical keystroke.
///
/// A held shift on a printable character uppercases it; no other modifier
/// alters the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
}

impl KeyToken {
    /// Normalize a terminal key event into a token, or None for keys that
    /// can never participate in matching (bare modifiers, media keys).
    pub fn from_event(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyToken> {
        match code {
            KeyCode::Char(c) => {
                let c = if modifiers.contains(KeyModifiers::SHIFT) && c.is_ascii_lowercase() {
                    c.to_ascii_uppercase()
                } else {
                    c
                };
                Some(KeyToken::Char(c))
            }
            KeyCode::Esc => Some(KeyToken::Named(NamedKey::Esc)),
            KeyCode::Enter => Some(KeyToken::Named(NamedKey::Enter)),
            KeyCode::Tab => Some(KeyToken::Named(NamedKey::Tab)),
            KeyCode::Up => Some(KeyToken::Named(NamedKey::Up)),
            KeyCode::Down => Some(KeyToken::Named(NamedKey::Down)),
            KeyCode::Left => Some(KeyToken::Named(NamedKey::Left)),
            KeyCode::Right => Some(KeyToken::Named(NamedKey::Right)),
            KeyCode::Backspace => Some(KeyToken::Named(NamedKey::Backspace)),
            KeyCode::F(n) => Some(KeyToken::Named(NamedKey::F(n))),
            _ => None,
        }
    }

    pub fn is_char(self) -> bool {
        matches!(self, KeyToken::Char(_))
    }
}

// ============================================================================
// Key Sequences
// ============================================================================

/// A non-empty ordered sequence of key tokens.
///
/// Multi-token sequences are always plain characters ("gg"); named keys only
/// occur as single-token sequences since they bypass the sequence logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence(Vec<KeyToken>);

impl KeySequence {
    /// Parse a sequence string from config.
    ///
    /// Supported formats:
    /// - Character runs: "j", "gg", "?"
    /// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Backspace", "Space"
    /// - Function keys: "F1" through "F12"
    ///
    /// Returns None for empty or unrecognized strings.
    pub fn parse(s: &str) -> Option<KeySequence> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        // Named keys (case-insensitive)
        let named = match s.to_lowercase().as_str() {
            "enter" | "return" => Some(NamedKey::Enter),
            "esc" | "escape" => Some(NamedKey::Esc),
            "tab" => Some(NamedKey::Tab),
            "up" => Some(NamedKey::Up),
            "down" => Some(NamedKey::Down),
            "left" => Some(NamedKey::Left),
            "right" => Some(NamedKey::Right),
            "backspace" => Some(NamedKey::Backspace),
            _ => None,
        };
        if let Some(key) = named {
            return Some(KeySequence(vec![KeyToken::Named(key)]));
        }
        if s.eq_ignore_ascii_case("space") {
            return Some(KeySequence(vec![KeyToken::Char(' ')]));
        }

        // Function keys
        if (s.starts_with('F') || s.starts_with('f')) && s.len() > 1 {
            if let Ok(n) = s[1..].parse::<u8>() {
                if (1..=12).contains(&n) {
                    return Some(KeySequence(vec![KeyToken::Named(NamedKey::F(n))]));
                }
            }
        }

        // Character run: each char is one token
        Some(KeySequence(s.chars().map(KeyToken::Char).collect()))
    }

    pub fn tokens(&self) -> &[KeyToken] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &[KeyToken]) -> bool {
        self.0.len() >= prefix.len() && self.0[..prefix.len()] == *prefix
    }

    /// Human-readable form for the help overlay.
    pub fn display(&self) -> String {
        self.0
            .iter()
            .map(|t| match t {
                KeyToken::Char(' ') => "Space".to_string(),
                KeyToken::Char(c) => c.to_string(),
                KeyToken::Named(NamedKey::Esc) => "Esc".to_string(),
                KeyToken::Named(NamedKey::Enter) => "Enter".to_string(),
                KeyToken::Named(NamedKey::Tab) => "Tab".to_string(),
                KeyToken::Named(NamedKey::Up) => "Up".to_string(),
                KeyToken::Named(NamedKey::Down) => "Down".to_string(),
                KeyToken::Named(NamedKey::Left) => "Left".to_string(),
                KeyToken::Named(NamedKey::Right) => "Right".to_string(),
                KeyToken::Named(NamedKey::Backspace) => "Backspace".to_string(),
                KeyToken::Named(NamedKey::F(n)) => format!("F{}", n),
            })
            .collect()
    }
}

// ============================================================================
// Keymap
// ============================================================================

/// Ordered binding table, defaults overlaid with config overrides.
///
/// Lookups are linear scans: the table never exceeds a couple dozen entries
/// and the resolver needs prefix queries that a hash map cannot answer.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<(Command, KeySequence)>,
}

impl Keymap {
    /// Default table matching the stock key layout.
    pub fn new() -> Self {
        let defaults: &[(Command, &str)] = &[
            (Command::ScrollDown, "j"),
            (Command::ScrollUp, "k"),
            (Command::ScrollHalfDown, "d"),
            (Command::ScrollHalfUp, "u"),
            (Command::ScrollToTop, "gg"),
            (Command::ScrollToBottom, "G"),
            (Command::LinkHints, "f"),
            (Command::LinkHintsNewTab, "F"),
            (Command::NextTab, "J"),
            (Command::PrevTab, "K"),
            (Command::CloseTab, "x"),
            (Command::HistoryBack, "H"),
            (Command::HistoryForward, "L"),
            (Command::QuickSearch, "o"),
            (Command::QuickSearchNewTab, "O"),
            (Command::TabSearch, "T"),
            (Command::InsertMode, "i"),
            (Command::Help, "?"),
        ];

        let bindings = defaults
            .iter()
            .filter_map(|(cmd, s)| KeySequence::parse(s).map(|seq| (*cmd, seq)))
            .collect();
        Self { bindings }
    }

    /// Apply user overrides from the config keymap table.
    ///
    /// Keys are command names ("scroll_to_top"), values are sequence strings
    /// ("gg", "Esc", "F5"). Malformed entries are skipped; returns warnings
    /// for each skipped entry.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, seq_str) in overrides {
            let command = match parse_command_name(name) {
                Some(c) => c,
                None => {
                    warnings.push(format!("Unknown command '{}', ignoring", name));
                    continue;
                }
            };

            let seq = match KeySequence::parse(seq_str) {
                Some(s) if !s.is_empty() => s,
                _ => {
                    warnings.push(format!(
                        "Cannot parse key sequence '{}' for command '{}', ignoring",
                        seq_str, name
                    ));
                    continue;
                }
            };

            self.bindings.retain(|(c, _)| *c != command);
            self.bindings.push((command, seq));

            tracing::info!(command = %name, sequence = %seq_str, "Applied keymap override");
        }

        warnings
    }

    /// First binding whose sequence equals `seq` exactly.
    pub fn exact(&self, seq: &[KeyToken]) -> Option<Command> {
        self.bindings
            .iter()
            .find(|(_, s)| s.tokens() == seq)
            .map(|(c, _)| *c)
    }

    /// Whether any binding strictly longer than `seq` starts with `seq`.
    pub fn has_longer_prefix(&self, seq: &[KeyToken]) -> bool {
        self.bindings
            .iter()
            .any(|(_, s)| s.len() > seq.len() && s.starts_with(seq))
    }

    /// All bindings for the help overlay: (display string, description).
    pub fn all_bindings(&self) -> Vec<(String, &'static str)> {
        self.bindings
            .iter()
            .map(|(cmd, seq)| (seq.display(), cmd.describe()))
            .collect()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
