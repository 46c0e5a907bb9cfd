//! Help-text parsing
//!
//! Help output comes in a handful of conventional shapes. Each
//! [`HelpFormat`] pairs a recognition predicate with an extractor; the
//! extractors share one line tokenizer and differ in which sections of the
//! text they read and whether flag lines must be indented.
//!
//! ```text
//!   -o, --output <FILE>     Write to FILE instead of stdout
//!   └┬┘ └──┬───┘ └──┬─┘     └──────────────┬─────────────┘
//!  short  long   placeholder          description (may continue on
//!                                     more-indented following lines)
//! ```

use crate::flag::{CommandFlag, ParsedHelp};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Diagnostic attached when no strategy produced flags.
pub const NO_FLAGS_DIAGNOSTIC: &str = "no flags recognized in help output";

/// Value type names printed by Go's pflag/cobra.
const TYPE_WORDS: &[&str] = &[
    "string",
    "strings",
    "stringArray",
    "stringSlice",
    "stringToString",
    "int",
    "ints",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "float",
    "float32",
    "float64",
    "duration",
    "bytesHex",
    "bytesBase64",
    "ip",
    "ipNet",
    "ipMask",
];

/// A line starting with `-` this far beyond the current flag's indentation
/// is description text, not a new flag.
const DESCRIPTION_INDENT: usize = 8;

/// Help-text conventions, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelpFormat {
    /// Python argparse (`usage:` plus `options:`)
    Argparse,
    /// Rust clap (`Usage:` plus `Options:`)
    Clap,
    /// Go cobra/pflag (`Flags:` sections)
    Cobra,
    /// GNU getopt_long style indented option table
    Gnu,
    /// Any line starting with a dash
    Generic,
}

impl HelpFormat {
    /// The fixed parser chain.
    pub const CHAIN: [HelpFormat; 5] = [
        HelpFormat::Argparse,
        HelpFormat::Clap,
        HelpFormat::Cobra,
        HelpFormat::Gnu,
        HelpFormat::Generic,
    ];

    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Argparse => "argparse",
            Self::Clap => "clap",
            Self::Cobra => "cobra",
            Self::Gnu => "gnu",
            Self::Generic => "generic",
        }
    }

    /// Whether `text` looks like this format.
    pub fn recognizes(self, text: &str) -> bool {
        match self {
            Self::Argparse => {
                text.lines().any(|l| l.starts_with("usage: "))
                    && has_header(text, &["options:", "optional arguments:"])
            }
            Self::Clap => {
                text.lines().any(|l| l.starts_with("Usage: ")) && has_header(text, &["Options:"])
            }
            Self::Cobra => has_header(text, &["Flags:", "Global Flags:"]),
            Self::Gnu => gnu_option_line().is_some_and(|re| re.is_match(text)),
            Self::Generic => true,
        }
    }

    /// Extract flags from `text`.
    pub fn extract(self, text: &str) -> Vec<CommandFlag> {
        extract_flags(text, self)
    }

    /// Whether flag lines under the heading `name` are read. `None` is the
    /// text before the first heading.
    fn reads_section(self, name: Option<&str>) -> bool {
        match self {
            // clap help headings are free-form ("Feature Selection:")
            Self::Clap => name.is_some(),
            Self::Cobra => name.is_some_and(|name| name.ends_with("flags")),
            Self::Argparse | Self::Gnu | Self::Generic => true,
        }
    }
}

impl std::fmt::Display for HelpFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse help text with the strategy chain.
///
/// The first strategy that recognizes the text and yields at least one flag
/// wins. Otherwise the result is empty and carries a diagnostic.
pub fn parse(program: &str, text: &str) -> ParsedHelp {
    for format in HelpFormat::CHAIN {
        if !format.recognizes(text) {
            continue;
        }
        let flags = format.extract(text);
        if !flags.is_empty() {
            return ParsedHelp {
                program: program.to_string(),
                flags,
                invocation: None,
                format: Some(format),
                diagnostic: None,
            };
        }
    }
    ParsedHelp::empty(program, NO_FLAGS_DIAGNOSTIC)
}

fn gnu_option_line() -> Option<&'static Regex> {
    static RE: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]+(?:-[A-Za-z0-9?], )?--[A-Za-z0-9][\w-]*").ok())
        .as_ref()
}

fn has_header(text: &str, headers: &[&str]) -> bool {
    text.lines().any(|l| headers.contains(&l.trim_end()))
}

/// Unindented `Name:` line.
fn section_header(line: &str) -> Option<String> {
    let body = line.trim_end();
    if body.starts_with(char::is_whitespace) || body.starts_with('-') || !body.ends_with(':') {
        return None;
    }
    Some(body.trim_end_matches(':').to_lowercase())
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 8 - width % 8,
            _ => break,
        }
    }
    width
}

fn extract_flags(text: &str, format: HelpFormat) -> Vec<CommandFlag> {
    let require_indent = format != HelpFormat::Generic;
    let mut flags = Vec::new();
    let mut current: Option<(CommandFlag, usize)> = None;
    let mut in_section = format.reads_section(None);

    for raw in text.lines() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if let Some(name) = section_header(line) {
            flags.extend(current.take().map(|(flag, _)| flag));
            in_section = format.reads_section(Some(&name));
            continue;
        }
        if !in_section {
            continue;
        }

        let indent = indent_width(line);
        let body = line.trim_start();
        let continues = current
            .as_ref()
            .is_some_and(|(_, flag_indent)| indent > *flag_indent);
        let deep = current
            .as_ref()
            .is_some_and(|(_, flag_indent)| indent >= flag_indent + DESCRIPTION_INDENT);

        if body.starts_with('-') && (indent > 0 || !require_indent) && !deep {
            if let Some(flag) = parse_flag_line(body) {
                flags.extend(current.take().map(|(flag, _)| flag));
                current = Some((flag, indent));
                continue;
            }
        }

        if continues {
            if let Some((flag, _)) = current.as_mut() {
                append_description(&mut flag.description, body);
            }
            continue;
        }
        flags.extend(current.take().map(|(flag, _)| flag));
    }
    flags.extend(current.take().map(|(flag, _)| flag));

    dedupe(flags)
}

fn dedupe(flags: Vec<CommandFlag>) -> Vec<CommandFlag> {
    let mut seen = HashSet::new();
    flags
        .into_iter()
        .filter(|flag| seen.insert(flag.key().to_string()))
        .collect()
}

fn append_description(description: &mut String, text: &str) {
    if !description.is_empty() {
        description.push(' ');
    }
    description.push_str(text.trim());
}

/// Parse one line starting with `-`.
fn parse_flag_line(body: &str) -> Option<CommandFlag> {
    let (spec, rest) = split_spec(body);
    let mut flag = CommandFlag {
        long: None,
        short: None,
        description: String::new(),
        takes_value: false,
        value_hint: None,
    };
    let mut leading_words: Vec<&str> = Vec::new();
    let tokens = tokenize(spec);
    let mut index = 0;

    while let Some(&token) = tokens.get(index) {
        index += 1;
        if !leading_words.is_empty() {
            leading_words.push(token);
            continue;
        }
        if let Some((form, value)) = classify_form(token) {
            match form {
                Form::Short(name) => {
                    flag.short.get_or_insert(name);
                }
                Form::Long(name) => {
                    flag.long.get_or_insert(name);
                }
            }
            if let Some(hint) = value.and_then(clean_hint) {
                flag.takes_value = true;
                flag.value_hint.get_or_insert(hint);
            }
        } else if let Some(hint) = value_placeholder(token) {
            flag.takes_value = true;
            flag.value_hint.get_or_insert(hint);
        } else if is_word(token) && tokens.get(index) == Some(&":") {
            // `-c cmd : program passed in as string`
            flag.takes_value = true;
            flag.value_hint.get_or_insert_with(|| token.to_string());
            index += 1;
        } else if token != ":" {
            leading_words.push(token);
        }
    }

    if flag.long.is_none() && flag.short.is_none() {
        return None;
    }
    for word in leading_words {
        append_description(&mut flag.description, word);
    }
    let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
    if !rest.is_empty() {
        append_description(&mut flag.description, rest);
    }
    Some(flag)
}

/// Split at the first run of two spaces or a tab.
fn split_spec(body: &str) -> (&str, &str) {
    let bytes = body.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let gap = b == b'\t' || (b == b' ' && bytes.get(i + 1) == Some(&b' '));
        if gap {
            return (&body[..i], body[i..].trim());
        }
    }
    (body, "")
}

/// Split a flag spec on spaces, commas and pipes outside brackets.
fn tokenize(spec: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (i, c) in spec.char_indices() {
        match c {
            '<' | '[' | '{' | '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            '>' | ']' | '}' | ')' => {
                depth = depth.saturating_sub(1);
                start.get_or_insert(i);
            }
            ' ' | ',' | '|' if depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&spec[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&spec[s..]);
    }
    tokens
}

enum Form {
    Short(String),
    Long(String),
}

/// Recognize `-x`, `--name`, `-name` with an optional attached value.
fn classify_form(token: &str) -> Option<(Form, Option<&str>)> {
    let token = token.trim_end_matches("...");

    // `--[no-]color` is keyed by its positive form
    if let Some(rest) = token.strip_prefix("--[no-]") {
        let (name, value) = split_attached(rest, 0);
        return valid_long(name).then(|| (Form::Long(format!("--{name}")), value));
    }

    let (name, value) = split_attached(token, 1);
    if let Some(rest) = name.strip_prefix("--") {
        return valid_long(rest).then(|| (Form::Long(name.to_string()), value));
    }

    let rest = name.strip_prefix('-')?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() || c == '?' => {
            Some((Form::Short(name.to_string()), value))
        }
        (Some(c), Some(_)) if c.is_ascii_alphabetic() && valid_long(rest) => {
            Some((Form::Long(name.to_string()), value))
        }
        _ => None,
    }
}

/// Split off an attached `=VALUE`, `[=VALUE]` or `<VALUE>` found past `min`.
fn split_attached(token: &str, min: usize) -> (&str, Option<&str>) {
    match token.find(['=', '[', '<']) {
        Some(i) if i > min => (&token[..i], Some(&token[i..])),
        _ => (token, None),
    }
}

fn valid_long(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

/// Lowercase placeholder word such as `cmd` or `file_name`.
fn is_word(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_lowercase())
        && token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
}

/// Recognize a detached value placeholder.
fn value_placeholder(token: &str) -> Option<String> {
    if token.starts_with(['=', '<', '[', '{']) {
        return clean_hint(token);
    }
    if TYPE_WORDS.contains(&token) {
        return Some(token.to_string());
    }
    let bare = token.trim_end_matches("...");
    let upper = !bare.is_empty()
        && bare.chars().any(|c| c.is_ascii_uppercase())
        && bare
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '_' | '-'));
    upper.then(|| bare.to_string())
}

fn clean_hint(raw: &str) -> Option<String> {
    let hint = raw
        .trim_end_matches("...")
        .trim_matches(|c| matches!(c, '[' | ']' | '<' | '>' | '{' | '}' | '='))
        .trim_end_matches("...")
        .trim();
    (!hint.is_empty()).then(|| hint.to_string())
}
