//! Text level normalization applied before structural parsing
//!
//! Each pass is a pure `&str -> String` function. [`preprocess`] chains them in a fixed order,
//! honouring the toggles of [`ConvertOptions`]:
//!
//! 1. CJK/Latin spacing
//! 2. tagged block extraction (`<think>…</think>` into a fenced block)
//! 3. custom tag stripping (off by default)
//! 4. table newline normalization

use crate::common::html::is_standard_tag;
use crate::common::width::is_cjk;
use crate::options::ConvertOptions;
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of the markers that stand in for fences nested inside an extracted block.
pub const CODE_BLOCK_SENTINEL: char = '\u{200B}';

static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)(?:\s[^<>]*)?>").expect("valid open tag regex")
});
static SEPARATOR_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)*\|?\s*$").expect("valid separator regex")
});

const OPENING_CJK_PUNCTUATION: &[char] = &['（', '【', '「', '《'];

/// Run every enabled pass over `text`.
pub fn preprocess(text: &str, options: &ConvertOptions) -> String {
    let mut text = text.to_string();
    if options.normalize_spacing {
        text = normalize_spacing(&text);
    }
    if options.extract_tagged_blocks {
        text = extract_tagged_blocks(&text, &options.think_tag);
    }
    if options.strip_custom_tags {
        text = strip_custom_tags(&text, &options.answer_tag);
    }
    if options.normalize_table_newlines {
        text = normalize_table_newlines(&text);
    }
    text
}

/// The fence run (three or more backticks or tildes) opening `line`, if any.
fn fence_run(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.len() - trimmed.trim_start_matches(marker).len();
    (run >= 3).then(|| &trimmed[..run])
}

/// Tracks whether lines are inside a fenced code block.
#[derive(Default)]
struct FenceState {
    open: Option<String>,
}

impl FenceState {
    /// Feed one line; returns true when the line is part of a fence (markers included).
    fn feed(&mut self, line: &str) -> bool {
        let run = fence_run(line);
        if let Some(open) = &self.open {
            if run.is_some_and(|run| run.starts_with(open.as_str())) {
                self.open = None;
            }
            return true;
        }
        match run {
            Some(run) => {
                self.open = Some(run.to_string());
                true
            }
            None => false,
        }
    }
}

/// Insert a space between CJK characters and adjacent Latin letters, and between a Latin
/// letter or digit and an opening CJK bracket. Idempotent.
///
/// Code, math, link destinations, HTML tags and comments are left untouched.
pub fn normalize_spacing(text: &str) -> String {
    let mut fences = FenceState::default();
    let mut in_comment = false;
    text.split('\n')
        .map(|line| {
            if !in_comment && fences.feed(line) {
                line.to_string()
            } else {
                space_line(line, &mut in_comment)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn space_line(line: &str, in_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut plain_start = 0;
    let mut i = 0;

    if *in_comment {
        match line.find("-->") {
            Some(end) => {
                *in_comment = false;
                i = end + 3;
                plain_start = i;
                out.push_str(&line[..i]);
            }
            None => return line.to_string(),
        }
    }

    let bytes = line.as_bytes();
    while i < line.len() {
        let rest = &line[i..];
        let escaped = i > 0 && bytes[i - 1] == b'\\';
        let protected = match bytes[i] {
            _ if escaped => None,
            b'`' => Some(code_span_len(rest)),
            b'<' => tag_len(rest, in_comment),
            b'$' => math_span_len(rest),
            b'(' if i > 0 && bytes[i - 1] == b']' => destination_len(rest),
            _ => None,
        };
        match protected {
            Some(len) => {
                out.push_str(&space_segment(&line[plain_start..i], out.chars().last()));
                out.push_str(&rest[..len]);
                i += len;
                plain_start = i;
            }
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    out.push_str(&space_segment(&line[plain_start..], out.chars().last()));
    out
}

/// A code span, or the bare backtick run when it has no closing run on this line.
fn code_span_len(rest: &str) -> usize {
    let run = rest.len() - rest.trim_start_matches('`').len();
    let fence = &rest[..run];
    match rest[run..].find(fence) {
        Some(end) => run + end + run,
        None => run,
    }
}

/// An HTML tag, autolink or comment. A comment left open continues on the next lines.
fn tag_len(rest: &str, in_comment: &mut bool) -> Option<usize> {
    if let Some(body) = rest.strip_prefix("<!--") {
        return match body.find("-->") {
            Some(end) => Some(4 + end + 3),
            None => {
                *in_comment = true;
                Some(rest.len())
            }
        };
    }
    let next = rest[1..].chars().next()?;
    if !(next.is_ascii_alphabetic() || next == '/') {
        return None;
    }
    let end = rest.find('>')?;
    (!rest[1..end].contains('<')).then_some(end + 1)
}

/// `$…$` or `$$…$$` closed on the same line.
fn math_span_len(rest: &str) -> Option<usize> {
    let run = (rest.len() - rest.trim_start_matches('$').len()).min(2);
    let delimiter = &rest[..run];
    let end = rest[run..].find(delimiter)?;
    (end > 0).then_some(run + end + run)
}

/// A link or image destination starting at `(`, up to its balanced `)`.
fn destination_len(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (index, ch) in rest.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn needs_space(prev: char, next: char) -> bool {
    (is_cjk(prev) && next.is_ascii_alphabetic())
        || (prev.is_ascii_alphabetic() && is_cjk(next))
        || (prev.is_ascii_alphanumeric() && OPENING_CJK_PUNCTUATION.contains(&next))
}

fn space_segment(segment: &str, before: Option<char>) -> String {
    let mut out = String::with_capacity(segment.len() + 8);
    let mut prev = before;
    for ch in segment.chars() {
        if prev.is_some_and(|prev| needs_space(prev, ch)) && !out.is_empty() {
            out.push(' ');
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

/// Rewrite `<tag>content</tag>` into a fenced block whose language is `tag`.
///
/// Fences inside `content` are replaced by `\u{200B}[CODE_BLOCK:lang]` / `\u{200B}[/CODE_BLOCK]`
/// so they cannot close the outer fence. An unclosed tag yields an unclosed fence, which the
/// parser reads to the end of the document.
pub fn extract_tagged_blocks(text: &str, tag: &str) -> String {
    if tag.is_empty() {
        return text.to_string();
    }
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;

    while let Some(start) = rest.find(&open) {
        let (before, tail) = rest.split_at(start);
        out.push_str(before);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        let body_start = &tail[open.len()..];
        let (content, remainder, closed) = match body_start.find(&close) {
            Some(end) => (&body_start[..end], &body_start[end + close.len()..], true),
            None => (body_start, "", false),
        };

        out.push_str("```");
        out.push_str(tag);
        out.push('\n');
        let content = mask_inner_fences(content.trim_matches('\n'));
        if !content.is_empty() {
            out.push_str(&content);
            out.push('\n');
        }
        if closed {
            out.push_str("```");
            if !remainder.is_empty() && !remainder.starts_with('\n') {
                out.push('\n');
            }
        }
        rest = remainder;
    }
    out.push_str(rest);
    out
}

fn mask_inner_fences(content: &str) -> String {
    let mut open = false;
    content
        .split('\n')
        .map(|line| match fence_run(line) {
            Some(run) if !open => {
                open = true;
                let language = line.trim_start()[run.len()..].trim();
                format!("{CODE_BLOCK_SENTINEL}[CODE_BLOCK:{language}]")
            }
            Some(_) => {
                open = false;
                format!("{CODE_BLOCK_SENTINEL}[/CODE_BLOCK]")
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove non-standard tag pairs, keeping their content verbatim, until nothing changes.
/// Tags named `keep` are left alone.
pub fn strip_custom_tags(text: &str, keep: &str) -> String {
    let mut current = text.to_string();
    loop {
        let Some(next) = strip_one(&current, keep) else {
            return current;
        };
        current = next;
    }
}

fn strip_one(text: &str, keep: &str) -> Option<String> {
    for caps in OPEN_TAG.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let name = name.as_str();
        if is_standard_tag(name) || name.eq_ignore_ascii_case(keep) {
            continue;
        }
        let close = format!("</{name}>");
        if let Some(offset) = text[whole.end()..].find(&close) {
            let close_start = whole.end() + offset;
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..whole.start()]);
            out.push_str(&text[whole.end()..close_start]);
            out.push_str(&text[close_start + close.len()..]);
            return Some(out);
        }
    }
    None
}

fn is_separator(line: &str) -> bool {
    line.contains('-') && SEPARATOR_ROW.is_match(line)
}

/// Keep table rows on one line and separate tables from what follows.
///
/// Inside a table, a row that starts with `|` but does not end with one swallows the following
/// non-row lines, joined with `<br>`. After the table exactly one blank line is enforced.
pub fn normalize_table_newlines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut fences = FenceState::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let starts_table = !fences.feed(line)
            && line.contains('|')
            && lines.get(i + 1).is_some_and(|next| is_separator(next));
        if !starts_table {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        out.push(line.to_string());
        out.push(lines[i + 1].to_string());
        i += 2;
        while i < lines.len() && !lines[i].trim().is_empty() && lines[i].contains('|') {
            let mut row = lines[i].to_string();
            i += 1;
            while row.trim_start().starts_with('|')
                && !row.trim_end().ends_with('|')
                && i < lines.len()
                && !lines[i].trim().is_empty()
                && !lines[i].trim_start().starts_with('|')
            {
                row.push_str("<br>");
                row.push_str(lines[i].trim());
                i += 1;
            }
            out.push(row);
        }

        if i < lines.len() {
            while i < lines.len() && lines[i].trim().is_empty() {
                i += 1;
            }
            out.push(String::new());
        }
    }
    out.join("\n")
}
