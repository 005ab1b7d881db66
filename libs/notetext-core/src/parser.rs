//! Parser for note documents.
//!
//! # Format
//! ```markdown
//! model: Basic
//! tags: vocabulary
//!
//! # Note 1
//! deck: Languages
//!
//! ## Front
//! What is Rust?
//!
//! ## Back
//! A systems programming language.
//! ```
//!
//! Lines before the first `#` header set defaults for every note. A `#` header
//! starts a note, `key: value` lines directly below it override the defaults,
//! and every `##` header opens a field whose body runs until the next header.
//! Fenced code blocks are copied verbatim and suspend header recognition.

use crate::error::{ParseError, Result};
use crate::types::{Defaults, NoteDocument, NoteRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// Source name used in errors when the caller does not provide one.
pub const UNNAMED_SOURCE: &str = "<input>";

static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```\w*\s*$").unwrap());
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```\s*$").unwrap());
static KEY_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+): (.*)$").unwrap());
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+)\s*(.*)$").unwrap());

/// Parse a note document.
pub fn parse(content: &str) -> Result<NoteDocument> {
    parse_source(content, UNNAMED_SOURCE)
}

/// Parse a note document, naming `source_name` in errors.
pub fn parse_source(content: &str, source_name: &str) -> Result<NoteDocument> {
    let mut parser = Parser::new(source_name);

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        parser.process_line(line, idx + 1)?;
    }

    Ok(parser.finalize())
}

/// Split a raw line into its content and the line break to keep in field bodies.
fn split_line_ending(raw: &str) -> (&str, &str) {
    match raw.strip_suffix('\n') {
        Some(rest) => (rest.strip_suffix('\r').unwrap_or(rest), "\n"),
        None => (raw.strip_suffix('\r').unwrap_or(raw), ""),
    }
}

/// Trailing whitespace and leading blank lines are not part of a field body.
fn clean_body(body: &str) -> String {
    let body = body.trim_end();
    let mut start = 0;
    for line in body.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    body[start..].to_string()
}

enum LineType<'a> {
    Fence,
    KeyValue(&'a str, &'a str),
    Header { level: usize, title: &'a str },
    Text,
}

struct Parser<'s> {
    source_name: &'s str,
    defaults: Defaults,
    notes: Vec<NoteRecord>,
    current: Option<NoteRecord>,
    current_field: Option<String>,
    buffer: String,
    in_codeblock: bool,
}

impl<'s> Parser<'s> {
    fn new(source_name: &'s str) -> Self {
        Self {
            source_name,
            defaults: Defaults::default(),
            notes: Vec::new(),
            current: None,
            current_field: None,
            buffer: String::new(),
            in_codeblock: false,
        }
    }

    fn process_line(&mut self, raw: &str, line_num: usize) -> Result<()> {
        let (line, ending) = split_line_ending(raw);

        if self.in_codeblock {
            self.append(line, ending);
            if FENCE_CLOSE.is_match(line) {
                self.in_codeblock = false;
            }
            return Ok(());
        }

        match self.parse_line(line) {
            LineType::Fence => {
                self.in_codeblock = true;
                self.append(line, ending);
            }
            LineType::KeyValue(key, value) => self.handle_key_value(key, value),
            LineType::Header { level: 1, title } => self.handle_note(title, line_num),
            LineType::Header { title, .. } => self.handle_field(title, line_num)?,
            LineType::Text => self.append(line, ending),
        }
        Ok(())
    }

    fn parse_line<'a>(&self, line: &'a str) -> LineType<'a> {
        if FENCE_OPEN.is_match(line) {
            return LineType::Fence;
        }

        if self.current_field.is_none() {
            if let Some(caps) = KEY_VALUE.captures(line) {
                let key = caps.get(1).map_or("", |m| m.as_str());
                let value = caps.get(2).map_or("", |m| m.as_str());
                return LineType::KeyValue(key, value);
            }
        }

        if let Some(caps) = HEADER.captures(line) {
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            let title = caps.get(2).map_or("", |m| m.as_str().trim_end());
            return LineType::Header { level, title };
        }

        LineType::Text
    }

    fn handle_key_value(&mut self, key: &str, value: &str) {
        let key = key.to_lowercase();
        let value = value.trim();

        let Some(note) = self.current.as_mut() else {
            apply_default(&mut self.defaults, &key, value);
            return;
        };

        match key.as_str() {
            "tag" | "tags" => {
                let tags = value.replace(',', "");
                let current = note.tags.trim();
                note.tags = if current.is_empty() {
                    tags
                } else {
                    format!("{current} {tags}")
                };
            }
            "markdown" | "md" => note.markdown = parse_flag(value),
            "model" => note.model = value.to_string(),
            "deck" => note.deck = Some(value.to_string()),
            "nid" => note.nid = Some(value.to_string()),
            "cid" => note.cid = Some(value.to_string()),
            _ => {
                note.extra.insert(key.clone(), value.to_string());
            }
        }
    }

    fn handle_note(&mut self, title: &str, line_num: usize) {
        self.flush_buffer();
        self.finish_note();
        self.current = Some(NoteRecord::from_defaults(title, &self.defaults, line_num));
    }

    fn handle_field(&mut self, title: &str, line_num: usize) -> Result<()> {
        self.flush_buffer();

        // Field headers before the first note have nowhere to go.
        let Some(note) = self.current.as_mut() else {
            return Ok(());
        };

        if note.fields.contains_key(title) {
            return Err(ParseError::DuplicateField {
                field: title.to_string(),
                note: note.title.clone(),
                line: line_num,
                source_name: self.source_name.to_string(),
            });
        }

        note.fields.insert(title.to_string(), String::new());
        self.current_field = Some(title.to_string());
        Ok(())
    }

    fn append(&mut self, line: &str, ending: &str) {
        if self.current_field.is_some() {
            self.buffer.push_str(line);
            self.buffer.push_str(ending);
        }
    }

    fn flush_buffer(&mut self) {
        let Some(field) = self.current_field.take() else {
            return;
        };
        let body = clean_body(&self.buffer);
        self.buffer.clear();

        if let Some(note) = self.current.as_mut() {
            note.fields.insert(field, body);
        }
    }

    /// Push the open note unless it never got a field.
    fn finish_note(&mut self) {
        if let Some(note) = self.current.take() {
            if !note.fields.is_empty() {
                self.notes.push(note);
            }
        }
    }

    fn finalize(mut self) -> NoteDocument {
        self.flush_buffer();
        self.finish_note();

        NoteDocument {
            defaults: self.defaults,
            notes: self.notes,
        }
    }
}

fn apply_default(defaults: &mut Defaults, key: &str, value: &str) {
    match key {
        "tag" | "tags" => defaults.tags = value.replace(',', ""),
        "markdown" | "md" => defaults.markdown = Some(parse_flag(value)),
        "model" => defaults.model = Some(value.to_string()),
        "deck" => defaults.deck = Some(value.to_string()),
        "nid" => defaults.nid = Some(value.to_string()),
        "cid" => defaults.cid = Some(value.to_string()),
        _ => {
            defaults.extra.insert(key.to_string(), value.to_string());
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "true" | "yes")
}
