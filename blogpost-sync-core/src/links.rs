//! Rewrites relative image references in markdown into absolute URLs.
//!
//! Image references look like `![alt](target)`. The scanner is
//! loose: it looks for `![`, then the next `]`, then the next `(`, then the next
//! `)`, so whitespace between `]` and `(` is tolerated. Markup that never closes
//! stops the scan; whatever was rewritten up to that point is kept.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use tracing::debug;

const IMAGE_MARKER: &str = "![";

fn absolute_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:[a-z][a-z0-9+.\-]*://|//)").expect("absolute url pattern is valid")
    })
}

/// True when `target` already carries a scheme (`https://...`) or is protocol-relative.
pub fn is_absolute_url(target: &str) -> bool {
    absolute_url_pattern().is_match(target.trim_start())
}

/// Byte offsets of one image reference inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImageRef {
    /// Offset of the `!` of the `![` marker.
    pub start: usize,
    /// Everything between `(` and `)`.
    pub target: Range<usize>,
    /// Offset just past the closing `)`.
    pub end: usize,
}

enum Scan {
    Image(ImageRef),
    Malformed,
    Done,
}

fn scan_image(doc: &str, from: usize) -> Scan {
    let Some(start) = doc[from..].find(IMAGE_MARKER).map(|i| from + i) else {
        return Scan::Done;
    };
    let after_marker = start + IMAGE_MARKER.len();
    let Some(close) = doc[after_marker..].find(']').map(|i| after_marker + i) else {
        return Scan::Malformed;
    };
    let Some(open) = doc[close + 1..].find('(').map(|i| close + 1 + i) else {
        return Scan::Malformed;
    };
    let Some(end) = doc[open + 1..].find(')').map(|i| open + 1 + i) else {
        return Scan::Malformed;
    };
    Scan::Image(ImageRef {
        start,
        target: open + 1..end,
        end: end + 1,
    })
}

/// Resolve a raw link target against `base`.
///
/// Returns `None` when the target is already absolute, empty, or cannot be
/// joined. An optional title after the link (`pic.png "Title"`) is preserved.
fn resolve_target(raw: &str, base: &Url) -> Option<String> {
    let trimmed = raw.trim();
    let (link, title) = match trimmed.find(char::is_whitespace) {
        Some(i) => (&trimmed[..i], &trimmed[i..]),
        None => (trimmed, ""),
    };
    if link.is_empty() || is_absolute_url(link) {
        return None;
    }
    // Leading `/` means "from this folder", not "from the host root".
    let relative = link.trim_start_matches("./").trim_start_matches('/');
    match base.join(relative) {
        Ok(url) => Some(format!("{url}{title}")),
        Err(e) => {
            debug!(target = link, error = %e, "Leaving unresolvable image target untouched");
            None
        }
    }
}

/// Replace every relative image target in `markdown` with its absolute form.
///
/// The input is returned borrowed when nothing had to change.
pub fn resolve_relative_links<'a>(markdown: &'a str, base: &Url) -> Cow<'a, str> {
    if !markdown.contains(IMAGE_MARKER) {
        return Cow::Borrowed(markdown);
    }

    let mut doc = markdown.to_string();
    let mut changed = false;
    let mut pos = 0;
    loop {
        match scan_image(&doc, pos) {
            Scan::Done => break,
            Scan::Malformed => {
                debug!(offset = pos, "Unterminated image markup, stopping link rewrite");
                break;
            }
            Scan::Image(image) => {
                if let Some(resolved) = resolve_target(&doc[image.target.clone()], base) {
                    doc.replace_range(image.target, &resolved);
                    changed = true;
                }
                // Resume on the rewritten string, just past this marker.
                pos = image.start + IMAGE_MARKER.len();
            }
        }
    }

    if changed {
        Cow::Owned(doc)
    } else {
        Cow::Borrowed(markdown)
    }
}

/// If `body` opens with an image reference, return its absolute URL and the
/// remainder of the body with that image removed.
pub(crate) fn split_leading_image<'a>(body: &'a str, base: &Url) -> Option<(String, &'a str)> {
    if !body.starts_with(IMAGE_MARKER) {
        return None;
    }
    let Scan::Image(image) = scan_image(body, 0) else {
        return None;
    };
    let raw = body[image.target.clone()].trim();
    let link = raw.split_whitespace().next()?;
    let url = resolve_target(link, base).unwrap_or_else(|| link.to_string());
    Some((url, body[image.end..].trim_start()))
}
