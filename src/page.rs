//! Page collaborator — the surface the interpreter drives.
//!
//! The state machines never touch a document directly; they go through the
//! `Page` trait for scrolling, target discovery, and activation. `DocPage` is
//! the markdown-backed implementation used by the demo driver and tests:
//! links become activatable targets with line-based bounding boxes.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use std::path::Path;
use thiserror::Error;

/// Index of a target within a page's document-order target list.
pub type TargetId = usize;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Failed to read page file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page path is not valid UTF-8: {0}")]
    InvalidPath(String),
}

// ============================================================================
// Geometry
// ============================================================================

/// Bounding box in content coordinates (text cells; `top` is a line index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub top: usize,
    pub left: usize,
    pub width: usize,
    pub height: usize,
}

/// The window onto the content: scroll offset plus visible extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top: usize,
    pub height: usize,
    pub width: usize,
}

impl Bounds {
    /// Fully inside the viewport; partially clipped boxes do not qualify.
    pub fn within(&self, vp: &Viewport) -> bool {
        self.top >= vp.top
            && self.top + self.height <= vp.top + vp.height
            && self.left + self.width <= vp.width
    }
}

// ============================================================================
// Page Trait
// ============================================================================

/// What the interpreter needs from a page: address, scroll surface, and
/// activatable targets.
pub trait Page {
    fn address(&self) -> &str;

    fn viewport(&self) -> Viewport;

    fn scroll_offset(&self) -> usize;

    fn set_scroll(&mut self, offset: usize);

    fn content_height(&self) -> usize;

    /// Every activatable target with its bounds, in document order.
    fn targets(&self) -> Vec<(TargetId, Bounds)>;

    /// Click-equivalent activation. For a navigable link with `new_tab` set,
    /// the destination opens in a new background context instead.
    fn activate(&mut self, id: TargetId, new_tab: bool);

    /// Destination address if the target is a navigable link.
    fn link_destination(&self, id: TargetId) -> Option<&str>;

    /// Whether an editable element has focus; command keys then pass through.
    fn editable_focused(&self) -> bool {
        false
    }
}

/// Targets whose bounding box is fully within the current viewport, in
/// document order. This order determines hint label assignment.
pub fn visible_targets<P: Page + ?Sized>(page: &P) -> Vec<TargetId> {
    let vp = page.viewport();
    page.targets()
        .into_iter()
        .filter(|(_, bounds)| bounds.within(&vp))
        .map(|(id, _)| id)
        .collect()
}

// ============================================================================
// Markdown-backed page
// ============================================================================

/// A navigation the page wants the tab manager to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Replace this page's document.
    Here(String),
    /// Open in a new background tab.
    NewTab(String),
}

/// A link extracted from the document.
#[derive(Debug, Clone)]
pub struct Link {
    pub text: String,
    pub url: String,
    pub bounds: Bounds,
}

/// A scrollable plain-text rendering of a markdown document.
#[derive(Debug)]
pub struct DocPage {
    address: String,
    title: String,
    lines: Vec<String>,
    links: Vec<Link>,
    scroll: usize,
    view_height: usize,
    view_width: usize,
    pending_nav: Option<Navigation>,
}

impl DocPage {
    pub fn from_markdown(address: &str, markdown: &str, width: usize, height: usize) -> Self {
        let (lines, links) = render_markdown(markdown);
        let title = lines
            .iter()
            .find(|l| !l.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| address.to_string());
        Self {
            address: address.to_string(),
            title,
            lines,
            links,
            scroll: 0,
            view_height: height,
            view_width: width,
            pending_nav: None,
        }
    }

    /// Load a markdown file. The page address is its file:// URL.
    pub fn load(path: &Path, width: usize, height: usize) -> Result<Self, PageError> {
        let markdown = std::fs::read_to_string(path)?;
        let address = match url::Url::from_file_path(path) {
            Ok(u) => u.to_string(),
            Err(()) => path
                .to_str()
                .ok_or_else(|| PageError::InvalidPath(path.display().to_string()))?
                .to_string(),
        };
        Ok(Self::from_markdown(&address, &markdown, width, height))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Resize the viewport (terminal resize).
    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.view_width = width;
        self.view_height = height;
        let max = self.lines.len().saturating_sub(height);
        self.scroll = self.scroll.min(max);
    }

    /// Navigation requested by the last activation, if any.
    pub fn take_navigation(&mut self) -> Option<Navigation> {
        self.pending_nav.take()
    }
}

impl Page for DocPage {
    fn address(&self) -> &str {
        &self.address
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            top: self.scroll,
            height: self.view_height,
            width: self.view_width,
        }
    }

    fn scroll_offset(&self) -> usize {
        self.scroll
    }

    fn set_scroll(&mut self, offset: usize) {
        let max = self.lines.len().saturating_sub(self.view_height);
        self.scroll = offset.min(max);
    }

    fn content_height(&self) -> usize {
        self.lines.len()
    }

    fn targets(&self) -> Vec<(TargetId, Bounds)> {
        self.links
            .iter()
            .enumerate()
            .map(|(id, link)| (id, link.bounds))
            .collect()
    }

    fn activate(&mut self, id: TargetId, new_tab: bool) {
        let Some(link) = self.links.get(id) else {
            tracing::warn!(id, "Activation of unknown target, ignoring");
            return;
        };
        tracing::debug!(url = %link.url, new_tab, "Activating link");
        self.pending_nav = Some(if new_tab {
            Navigation::NewTab(link.url.clone())
        } else {
            Navigation::Here(link.url.clone())
        });
    }

    fn link_destination(&self, id: TargetId) -> Option<&str> {
        self.links.get(id).map(|l| l.url.as_str())
    }
}

// ============================================================================
// Markdown rendering
// ============================================================================

/// Flatten markdown to plain-text lines, extracting links with their bounds.
///
/// Lines are not wrapped; the viewport width only limits hint eligibility.
fn render_markdown(markdown: &str) -> (Vec<String>, Vec<Link>) {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut links: Vec<Link> = Vec::new();
    // (url, text-so-far, start column) of the link being parsed
    let mut open_link: Option<(String, String, usize)> = None;

    let flush = |lines: &mut Vec<String>, current: &mut String| {
        lines.push(std::mem::take(current));
    };

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Paragraph) | Event::Start(Tag::Heading { .. }) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
            }
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_)) => {
                flush(&mut lines, &mut current);
                lines.push(String::new());
            }
            Event::Start(Tag::Item) => {
                if !current.is_empty() {
                    flush(&mut lines, &mut current);
                }
                current.push_str("- ");
            }
            Event::End(TagEnd::Item) => {
                flush(&mut lines, &mut current);
            }
            Event::End(TagEnd::List(_)) => {
                lines.push(String::new());
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                open_link = Some((dest_url.to_string(), String::new(), current.chars().count()));
            }
            Event::End(TagEnd::Link) => {
                if let Some((url, text, start)) = open_link.take() {
                    let width = text.chars().count();
                    links.push(Link {
                        text,
                        url,
                        bounds: Bounds {
                            top: lines.len(),
                            left: start,
                            width,
                            height: 1,
                        },
                    });
                }
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, text, _)) = open_link.as_mut() {
                    text.push_str(&t);
                }
                current.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak => {
                // A link spanning a break keeps its bounds on the start line
                flush(&mut lines, &mut current);
            }
            Event::Rule => {
                flush(&mut lines, &mut current);
                lines.push("---".to_string());
                lines.push(String::new());
            }
            _ => {}
        }
    }
    if !current.is_empty() {
        flush(&mut lines, &mut current);
    }

    (lines, links)
}

// ============================================================================
// Tests
// ============================================================================
