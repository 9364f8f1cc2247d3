//! Strict and tolerant JSON decoding for configuration comments.
//!
//! Configuration arrives while text is still streaming in, so a comment like
//! `<!--{"chartType":"bar","x":"mo` must still yield whatever is complete. Decoding never fails
//! loudly: if neither parser succeeds, the caller treats the comment as carrying no config.

use serde_json::{Map, Value};

/// Decode `text` as strict JSON, falling back to [`parse_partial`].
pub fn parse_config(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!("strict config parse failed ({err}), trying tolerant parse");
            parse_partial(text)
        }
    }
}

/// Configuration as an object; any other JSON value is wrapped as `{"config": value}`.
pub fn config_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => Map::from_iter([("config".to_string(), other)]),
    }
}

/// Decode the longest well-formed prefix of an incomplete JSON document.
///
/// Open strings and containers are closed; when that is not enough, the text is cut back to the
/// last member boundary (a `,` or just after an opening bracket) and closed there.
pub fn parse_partial(text: &str) -> Option<Value> {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut cuts: Vec<(usize, Vec<char>)> = Vec::new();

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => {
                stack.push(ch);
                cuts.push((index + 1, stack.clone()));
            }
            '}' | ']' => {
                stack.pop();
            }
            ',' => cuts.push((index, stack.clone())),
            _ => {}
        }
    }

    let mut head = text.to_string();
    if in_string {
        if escaped {
            head.pop();
        }
        head.push('"');
    }
    if let Some(value) = close_and_parse(&head, &stack) {
        return Some(value);
    }

    cuts.iter()
        .rev()
        .find_map(|(cut, stack)| close_and_parse(&text[..*cut], stack))
}

fn close_and_parse(head: &str, stack: &[char]) -> Option<Value> {
    let mut candidate = head.trim_end().trim_end_matches(',').to_string();
    for open in stack.iter().rev() {
        candidate.push(if *open == '{' { '}' } else { ']' });
    }
    serde_json::from_str(&candidate).ok()
}
