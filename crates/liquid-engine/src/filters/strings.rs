//! String filters.

use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

use super::int_arg;
use super::string_arg;
use super::string_input;
use super::FilterRegistry;
use crate::error::FilterError;
use crate::value::Value;

/// Form-style encoding: keep unreserved characters, encode the rest
/// (space is handled separately as `+`).
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.insert_builtin("upcase", upcase);
    registry.insert_builtin("downcase", downcase);
    registry.insert_builtin("capitalize", capitalize);
    registry.insert_builtin("strip", strip);
    registry.insert_builtin("strip_html", strip_html);
    registry.insert_builtin("strip_newlines", strip_newlines);
    registry.insert_builtin("escape", escape);
    registry.insert_builtin("escape_once", escape_once);
    registry.insert_builtin("truncate", truncate);
    registry.insert_builtin("truncatewords", truncatewords);
    registry.insert_builtin("replace", replace);
    registry.insert_builtin("replace_first", replace_first);
    registry.insert_builtin("remove", remove);
    registry.insert_builtin("remove_first", remove_first);
    registry.insert_builtin("prepend", prepend);
    registry.insert_builtin("append", append);
    registry.insert_builtin("slice", slice);
    registry.insert_builtin("url_encode", url_encode);
    registry.insert_builtin("url_decode", url_decode);
    registry.insert_builtin("newline_to_br", newline_to_br);
}

fn upcase(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::String(string_input(input).to_uppercase()))
}

fn downcase(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::String(string_input(input).to_lowercase()))
}

/// First letter uppercased, the rest left unchanged.
fn capitalize(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let mut chars = s.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    Ok(Value::String(capitalized))
}

fn strip(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::String(string_input(input).trim().to_string()))
}

fn strip_html(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => out.push(ch),
        }
    }
    Ok(Value::String(out))
}

fn strip_newlines(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    Ok(Value::String(
        s.chars().filter(|c| *c != '\n' && *c != '\r').collect(),
    ))
}

fn escape(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    Ok(Value::String(escape_str(&string_input(input))))
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Like `escape`, but ampersands that already start an entity are left
/// alone, so escaping is idempotent.
fn escape_once(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    for (idx, ch) in s.char_indices() {
        match ch {
            '&' if entity_length(&bytes[idx..]).is_some() => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Ok(Value::String(out))
}

/// Length of a well-formed entity (`&amp;`, `&#39;`) at the start of
/// `bytes`, if any.
fn entity_length(bytes: &[u8]) -> Option<usize> {
    debug_assert_eq!(bytes.first(), Some(&b'&'));
    let body_start = if bytes.get(1) == Some(&b'#') { 2 } else { 1 };
    let mut idx = body_start;
    while idx < bytes.len() && bytes[idx] != b';' {
        let valid = if body_start == 2 {
            bytes[idx].is_ascii_digit()
        } else {
            bytes[idx].is_ascii_alphanumeric()
        };
        if !valid {
            return None;
        }
        idx += 1;
    }
    (idx > body_start && idx < bytes.len()).then_some(idx + 1)
}

/// Shorten to at most `length` characters, ellipsis included.
fn truncate(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let length = if args.is_empty() {
        50
    } else {
        usize::try_from(int_arg("truncate", args, 0)?).unwrap_or(0)
    };
    let ellipsis = args
        .get(1)
        .map_or_else(|| "...".to_string(), string_input);

    if s.chars().count() <= length {
        return Ok(Value::String(s));
    }

    let ellipsis_len = ellipsis.chars().count();
    let keep = length.saturating_sub(ellipsis_len);
    let mut out: String = s.chars().take(keep).collect();
    out.extend(ellipsis.chars().take(length));
    Ok(Value::String(out))
}

fn truncatewords(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let count = if args.is_empty() {
        15
    } else {
        usize::try_from(int_arg("truncatewords", args, 0)?).unwrap_or(0)
    }
    .max(1);
    let ellipsis = args
        .get(1)
        .map_or_else(|| "...".to_string(), string_input);

    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= count {
        return Ok(Value::String(s));
    }
    Ok(Value::String(words[..count].join(" ") + &ellipsis))
}

fn replace(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let from = string_arg("replace", args, 0)?;
    let to = args.get(1).map_or_else(String::new, string_input);
    Ok(Value::String(s.replace(&from, &to)))
}

fn replace_first(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let from = string_arg("replace_first", args, 0)?;
    let to = args.get(1).map_or_else(String::new, string_input);
    Ok(Value::String(s.replacen(&from, &to, 1)))
}

fn remove(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let target = string_arg("remove", args, 0)?;
    Ok(Value::String(s.replace(&target, "")))
}

fn remove_first(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let target = string_arg("remove_first", args, 0)?;
    Ok(Value::String(s.replacen(&target, "", 1)))
}

fn prepend(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let prefix = string_arg("prepend", args, 0)?;
    Ok(Value::String(prefix + &string_input(input)))
}

fn append(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let suffix = string_arg("append", args, 0)?;
    Ok(Value::String(string_input(input) + &suffix))
}

/// `slice: offset[, length]` over characters of a string or elements of
/// an array; negative offsets count from the end.
fn slice(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let offset = int_arg("slice", args, 0)?;
    let length = if args.len() > 1 {
        usize::try_from(int_arg("slice", args, 1)?).unwrap_or(0)
    } else {
        1
    };

    match input {
        Value::Array(items) => {
            let start = slice_start(offset, items.len());
            let taken: Vec<Value> = items.iter().skip(start).take(length).cloned().collect();
            Ok(Value::Array(taken))
        }
        _ => {
            let s = string_input(input);
            let total = s.chars().count();
            let start = slice_start(offset, total);
            Ok(Value::String(s.chars().skip(start).take(length).collect()))
        }
    }
}

fn slice_start(offset: i64, len: usize) -> usize {
    if offset >= 0 {
        usize::try_from(offset).unwrap_or(usize::MAX)
    } else {
        len.saturating_sub(usize::try_from(-offset).unwrap_or(usize::MAX))
    }
}

fn url_encode(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input);
    let encoded = utf8_percent_encode(&s, URL_ENCODE_SET)
        .to_string()
        .replace(' ', "+");
    Ok(Value::String(encoded))
}

fn url_decode(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input).replace('+', " ");
    let decoded = percent_decode_str(&s)
        .decode_utf8()
        .map_err(|err| FilterError::invalid_input("url_decode", err.to_string()))?;
    Ok(Value::String(decoded.into_owned()))
}

fn newline_to_br(input: &Value, _args: &[Value]) -> Result<Value, FilterError> {
    let s = string_input(input).replace("\r\n", "\n").replace('\n', "<br />\n");
    Ok(Value::String(s))
}
