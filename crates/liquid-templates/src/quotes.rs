//! Quote-aware scanning helpers.
//!
//! Filter pipelines and tag arguments may contain `|`, `:`, `,` and
//! whitespace inside string literals; these helpers split only on
//! occurrences outside single- or double-quoted regions. A `\` inside a
//! quoted region escapes the next character.

/// Split `s` on every unquoted occurrence of `delimiter`, returning each
/// segment together with its byte offset in `s`.
pub fn split_unquoted(s: &str, delimiter: char) -> Vec<(&str, usize)> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escape = false;

    for (idx, ch) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if quote.is_some() => escape = true,
            '"' | '\'' if quote == Some(ch) => quote = None,
            '"' | '\'' if quote.is_none() => quote = Some(ch),
            _ if quote.is_some() => {}
            _ if ch == delimiter => {
                segments.push((&s[start..idx], start));
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }

    segments.push((&s[start..], start));
    segments
}

/// Find the first unquoted occurrence of `delimiter` in `s`.
pub(crate) fn find_unquoted(s: &str, delimiter: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escape = false;

    for (idx, ch) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if quote.is_some() => escape = true,
            '"' | '\'' if quote == Some(ch) => quote = None,
            '"' | '\'' if quote.is_none() => quote = Some(ch),
            _ if quote.is_some() => {}
            _ if ch == delimiter => return Some(idx),
            _ => {}
        }
    }

    None
}

/// Split `s` on whitespace while respecting quoted regions (with escape
/// handling). Returns owned strings for each token.
pub(crate) fn split_words(s: &str) -> Vec<String> {
    let mut pieces = Vec::with_capacity((s.len() / 8).clamp(2, 8));
    let mut start = None;
    let mut quote: Option<char> = None;
    let mut escape = false;

    for (idx, ch) in s.char_indices() {
        if escape {
            escape = false;
            if start.is_none() {
                start = Some(idx.saturating_sub(1));
            }
            continue;
        }
        match ch {
            '\\' if quote.is_some() => {
                escape = true;
                if start.is_none() {
                    start = Some(idx);
                }
            }
            '"' | '\'' if quote == Some(ch) => {
                quote = None;
                if start.is_none() {
                    start = Some(idx);
                }
            }
            '"' | '\'' if quote.is_none() => {
                quote = Some(ch);
                if start.is_none() {
                    start = Some(idx);
                }
            }
            _ if quote.is_some() => {
                if start.is_none() {
                    start = Some(idx);
                }
            }
            _ if ch.is_whitespace() => {
                if let Some(word_start) = start.take() {
                    pieces.push(s[word_start..idx].to_owned());
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(idx);
                }
            }
        }
    }
    if let Some(word_start) = start {
        pieces.push(s[word_start..].to_owned());
    }
    pieces
}
