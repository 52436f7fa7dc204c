//! When typing starts an abbreviation and when an edit ends tracking.

use std::sync::OnceLock;

use regex::Regex;

use super::span::Span;
use super::text::Edit;

/// Prefix `<` that JSX abbreviations must start with.
const JSX_PREFIX: char = '<';

/// Last two characters: an optional word bound followed by an abbreviation start.
fn word_bound() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^[\s>;"']?[a-zA-Z.#!@\[(]$"#).expect("valid regex"))
}

fn jsx_abbreviation_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z.#\[(]$").expect("valid regex"))
}

/// Open `style="..."` attribute value at the end of a tag's text.
fn open_style_attribute() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bstyle\s*=\s*["'][^"']*$"#).expect("valid regex"))
}

fn closing_pair(c: char) -> Option<char> {
    match c {
        '{' => Some('}'),
        '[' => Some(']'),
        '(' => Some(')'),
        _ => None,
    }
}

/// Decide whether the single-character insertion `edit` (already applied to
/// `source`) starts a new abbreviation, and return the span to track.
pub fn abbreviation_start(source: &str, edit: &Edit, jsx: bool) -> Option<Span> {
    if edit.removed != 0 || edit.inserted == 0 {
        return None;
    }
    let pos = edit.caret();
    let before = source.get(..pos)?;

    let mut tail = before.chars().rev().take(2).collect::<Vec<_>>();
    tail.reverse();
    let prefix: String = tail.iter().collect();
    let last = *tail.last()?;

    let start = if jsx {
        let [first, second] = tail.as_slice() else {
            return None;
        };
        if *first != JSX_PREFIX || !jsx_abbreviation_start().is_match(&second.to_string()) {
            return None;
        }
        pos - first.len_utf8() - second.len_utf8()
    } else {
        if !word_bound().is_match(&prefix) {
            return None;
        }
        pos - last.len_utf8()
    };

    let mut end = pos;
    if let Some(pair) = closing_pair(last) {
        if source[pos..].starts_with(pair) {
            end += pair.len_utf8();
        }
    }

    Some(Span::new(start, end))
}

/// True when `offset` sits inside the value of an HTML `style` attribute,
/// where abbreviations expand to inline CSS.
pub fn is_inline_context(source: &str, offset: usize) -> bool {
    let Some(before) = source.get(..offset) else {
        return false;
    };
    let Some(tag_start) = before.rfind('<') else {
        return false;
    };
    let tag = &before[tag_start..];
    !tag.contains('>') && open_style_attribute().is_match(tag)
}

pub fn has_line_break(text: &str) -> bool {
    text.contains(['\n', '\r'])
}

/// The marker as it looks once the host applied an edit and the marker
/// re-read its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedSpan {
    /// Span tracked before the edit.
    pub before: Option<Span>,
    /// Span re-read from the highlight slot after the edit.
    pub after: Option<Span>,
    pub valid: bool,
    pub forced: bool,
}

/// What the host does with a marker after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingDecision {
    Keep,
    /// Text was typed right before the span: track this wider span instead.
    Extend(Span),
    Stop,
}

/// Decide what happens to a tracked abbreviation after `edit`. `text` is the
/// contents of the span after the edit.
///
/// Forced markers only stop when their highlight is gone. Other markers stop
/// when the span became empty, was replaced as a whole, holds a line break or
/// lies away from the edit. Typing at the end of an invalid abbreviation also
/// stops tracking, so a sentence starting with a tag name is not underlined
/// word after word.
pub fn decide(tracked: &TrackedSpan, edit: &Edit, text: &str) -> TrackingDecision {
    let Some(after) = tracked.after else {
        return TrackingDecision::Stop;
    };
    if tracked.forced {
        return TrackingDecision::Keep;
    }
    if after.is_empty() || has_line_break(text) {
        return TrackingDecision::Stop;
    }

    if let Some(before) = tracked.before {
        let replaced = edit.removed > 0
            && edit.offset <= before.start
            && edit.offset + edit.removed >= before.end;
        if replaced {
            return TrackingDecision::Stop;
        }
    }

    if edit.inserted > 0 && edit.offset < after.start && edit.caret() == after.start {
        return TrackingDecision::Extend(Span::new(edit.offset, after.end));
    }
    if !after.touches(edit.offset) {
        return TrackingDecision::Stop;
    }
    if !tracked.valid && edit.inserted > 0 && edit.caret() == after.end {
        return TrackingDecision::Stop;
    }

    TrackingDecision::Keep
}
