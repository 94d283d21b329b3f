//! BBCode-style markup scanner.
//!
//! The input language knows exactly four tags — `[b]`, `[i]`, `[u]` and
//! `[color=#rrggbb]` (the `#` is optional) — with mirrored closing forms
//! and a `[br]` line-break shorthand. Tags nest arbitrarily.
//!
//! The scanner walks the input left to right with an explicit stack of
//! open style scopes; it never builds a tree. Malformed or unknown tag
//! tokens are not matched and stay literal text, and a closing tag with
//! nothing open is a no-op, so parsing cannot fail.

use std::sync::OnceLock;

use regex::Regex;

use crate::style::{Rgb, TextStyle};

/// A literal text span with its fully-resolved style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    /// The literal text between tags.
    pub text: String,
    /// OR of every bold/italic/underline scope open at this point.
    pub style: TextStyle,
    /// Most recently opened color scope, black when none is open.
    pub color: Rgb,
}

/// One entry of the open-scope stack.
#[derive(Debug, Clone, Copy)]
enum StyleScope {
    Bold,
    Italic,
    Underline,
    Color(Rgb),
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"\[(/)?(b|i|u|color)(=#?[0-9a-fA-F]{6})?\]")
            .expect("tag pattern is valid")
    })
}

/// Resolve the effective style of the current stack.
///
/// Flags accumulate across the whole stack; for color the most recently
/// pushed scope wins outright, colors are never blended.
fn resolve(stack: &[StyleScope]) -> (TextStyle, Rgb) {
    let mut style = TextStyle::NONE;
    let mut color = Rgb::BLACK;
    for scope in stack {
        match scope {
            StyleScope::Bold => style |= TextStyle::BOLD,
            StyleScope::Italic => style |= TextStyle::ITALIC,
            StyleScope::Underline => style |= TextStyle::UNDERLINE,
            StyleScope::Color(rgb) => color = *rgb,
        }
    }
    (style, color)
}

/// Scan `markup` into styled spans.
///
/// Zero-length spans between adjacent tags are dropped. Trailing text
/// after the last tag is emitted with whatever scopes are still open
/// (none, for well-formed input).
pub fn parse(markup: &str) -> Vec<StyledSpan> {
    let markup = markup.replace("[br]", "\n");

    let mut spans = Vec::new();
    let mut stack: Vec<StyleScope> = Vec::new();
    let mut start = 0;

    for caps in tag_regex().captures_iter(&markup) {
        let whole = caps.get(0).expect("group 0 always present");

        let literal = &markup[start..whole.start()];
        if !literal.is_empty() {
            let (style, color) = resolve(&stack);
            spans.push(StyledSpan {
                text: literal.to_owned(),
                style,
                color,
            });
        }
        start = whole.end();

        if caps.get(1).is_some() {
            // Closing form: pop the innermost scope, no-op when empty.
            stack.pop();
            continue;
        }

        match &caps[2] {
            "b" => stack.push(StyleScope::Bold),
            "i" => stack.push(StyleScope::Italic),
            "u" => stack.push(StyleScope::Underline),
            _ => {
                // `[color]` with no argument opens a black scope.
                let color = caps
                    .get(3)
                    .and_then(|arg| Rgb::parse_hex(&arg.as_str()[1..]))
                    .unwrap_or(Rgb::BLACK);
                stack.push(StyleScope::Color(color));
            }
        }
    }

    let trailing = &markup[start..];
    if !trailing.is_empty() {
        let (style, color) = resolve(&stack);
        spans.push(StyledSpan {
            text: trailing.to_owned(),
            style,
            color,
        });
    }

    spans
}
