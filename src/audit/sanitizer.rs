//! Repairs for common JSON text defects found in audit log exports.
//!
//! Exported payloads are frequently double-encoded (`""` for every quote),
//! wrapped across lines by the exporting tool, or left with trailing commas.
//! [`Sanitizer::sanitize`] repairs these in a fixed order:
//!
//! 1. Quote un-escaping (doubled quotes and/or `\/` escapes)
//! 2. Carriage return and line feed removal
//! 3. Trailing comma removal before `}` and `]`
//!
//! Sanitizing never fails. Text that is still invalid afterwards is left for
//! the parser to report.

use serde::Deserialize;

/// How quotes and slashes are escaped in the source payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteConvention {
    /// Un-double quotes only for payloads that open with `{""`, always resolve `\/`
    #[default]
    Auto,
    /// Every `""` is a single quote
    DoubledQuotes,
    /// `\/` stands for `/`
    EscapedSlashes,
    /// Leave quotes and slashes untouched
    None,
}

/// Stateless payload text repairer
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    convention: QuoteConvention,
}

impl Sanitizer {
    pub fn new(convention: QuoteConvention) -> Self {
        Self { convention }
    }

    /// Apply all repairs in order. Returns the input unchanged if nothing applies.
    pub fn sanitize(&self, text: &str) -> String {
        let unescaped = match self.convention {
            QuoteConvention::Auto => {
                if looks_double_encoded(text) {
                    unescape_slashes(&undouble_quotes(text))
                } else {
                    unescape_slashes(text)
                }
            }
            QuoteConvention::DoubledQuotes => undouble_quotes(text),
            QuoteConvention::EscapedSlashes => unescape_slashes(text),
            QuoteConvention::None => text.to_string(),
        };

        let single_line = strip_line_breaks(&unescaped);
        strip_trailing_commas(&single_line)
    }
}

/// Convenience wrapper using the default convention
pub fn sanitize(text: &str) -> String {
    Sanitizer::default().sanitize(text)
}

/// A double-encoded payload opens with `{""` (or `[{""`), ignoring whitespace.
fn looks_double_encoded(text: &str) -> bool {
    let trimmed = text.trim_start();
    let object = trimmed
        .strip_prefix('[')
        .map_or(trimmed, str::trim_start);
    object
        .strip_prefix('{')
        .is_some_and(|rest| rest.trim_start().starts_with("\"\""))
}

fn undouble_quotes(text: &str) -> String {
    text.replace("\"\"", "\"")
}

/// Resolve `\/` to `/` while leaving every other escape (including `\\`) intact.
fn unescape_slashes(text: &str) -> String {
    if !text.contains("\\/") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn strip_line_breaks(text: &str) -> String {
    text.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Drop commas followed (after optional whitespace) by `}` or `]`.
///
/// Commas inside string literals are kept.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let closes = chars[i + 1..]
                    .iter()
                    .find(|next| !next.is_whitespace())
                    .is_some_and(|next| *next == '}' || *next == ']');
                if !closes {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
