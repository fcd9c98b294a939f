//! Line-oriented cleanup applied to converted article bodies and to exported
//! markdown in cleanup mode. The passes run in a fixed order; each later pass
//! assumes the earlier ones already ran.
use std::sync::OnceLock;

use regex::Regex;

fn bare_timestamp() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[?\d{1,2}:\d{2}(?::\d{2})?\]?$").expect("static regex"))
}

fn speaker_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(speaker\s*\d+|host|guest)\s*[:\-]").expect("static regex")
    })
}

fn timestamp_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\[?\d{1,2}:\d{2}(?::\d{2})?\]?\s*").expect("static regex")
    })
}

/// Run all four passes. Idempotent.
pub fn normalize_markdown(markdown: &str) -> String {
    let scrubbed = scrub_transcript_lines(markdown);
    let headings = remove_blank_after_headings(&scrubbed);
    let lists = collapse_blank_lines_in_lists(&headings);
    let collapsed = collapse_blank_runs(&lists);
    let trimmed = collapsed.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

/// Pass 1: drop bare timestamps and speaker labels, strip leading inline timestamps.
pub fn scrub_transcript_lines(markdown: &str) -> String {
    let mut out = Vec::new();
    for line in markdown.lines() {
        if bare_timestamp().is_match(line.trim()) {
            continue;
        }
        let mut rest = line;
        while let Some(found) = timestamp_prefix().find(rest) {
            rest = &rest[found.end()..];
        }
        // A stripped prefix can expose a speaker label or a second bare stamp.
        if speaker_label().is_match(rest) || bare_timestamp().is_match(rest.trim()) {
            continue;
        }
        out.push(rest);
    }
    out.join("\n")
}

/// Pass 2: no blank line directly under a heading.
pub fn remove_blank_after_headings(markdown: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in markdown.lines() {
        let after_heading = out.last().is_some_and(|prev| is_heading(prev));
        if after_heading && is_blank(line) {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Pass 3: drop blank separators that split one list, i.e. blanks whose next
/// content line is a bullet and whose previous content line is a bullet, ends
/// with a colon, or is a heading.
pub fn collapse_blank_lines_in_lists(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if is_blank(line) {
            let prev = lines[..i].iter().rev().find(|l| !is_blank(l));
            let next = lines[i + 1..].iter().find(|l| !is_blank(l));
            if let (Some(prev), Some(next)) = (prev, next) {
                let prev = prev.trim();
                if is_bullet(next) && (is_bullet(prev) || prev.ends_with(':') || is_heading(prev)) {
                    continue;
                }
            }
        }
        out.push(*line);
    }
    out.join("\n")
}

/// Pass 4: three or more consecutive line breaks become one blank line.
pub fn collapse_blank_runs(markdown: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = false;
    for line in markdown.lines() {
        let blank = is_blank(line);
        if blank && previous_blank {
            continue;
        }
        out.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    out.join("\n")
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_bullet(line: &str) -> bool {
    line.trim().starts_with(['-', '*'])
}
