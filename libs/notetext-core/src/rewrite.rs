//! Writing note ids back into note documents.

use crate::types::NoteId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static NOTE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(model|tags?|deck|markdown|md):").unwrap());
static NID_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^nid:").unwrap());

/// Insert `nid: <id>` lines into `content`.
///
/// `id_assignments` pairs the line number of a note header with the id the
/// note received. The id goes below the last `model`, `tags`, `deck` or
/// `markdown` line of the note, or directly below the header. Notes that
/// already carry a `nid:` line are left alone, so the rewrite can be applied
/// repeatedly. Everything else, including the document preamble and line
/// endings, is kept as it was.
pub fn inject_note_ids(content: &str, id_assignments: &[(usize, NoteId)]) -> String {
    if id_assignments.is_empty() {
        return content.to_string();
    }

    let assignments: HashMap<usize, NoteId> = id_assignments.iter().copied().collect();
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut insertions: HashMap<usize, NoteId> = HashMap::new();

    for (&header_line, &id) in &assignments {
        let header_idx = header_line.wrapping_sub(1);
        if header_idx >= lines.len() {
            tracing::debug!(line = header_line, "no note header at line, id not written");
            continue;
        }
        if let Some(insert_after) = insertion_point(&lines, header_idx) {
            insertions.insert(insert_after, id);
        }
    }

    let mut result = String::with_capacity(content.len() + insertions.len() * 24);
    for (idx, line) in lines.iter().enumerate() {
        result.push_str(line);
        if let Some(id) = insertions.get(&idx) {
            let ending = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
            if !line.ends_with('\n') {
                result.push_str(ending);
            }
            result.push_str(&format!("nid: {id}"));
            result.push_str(ending);
        }
    }

    result
}

/// Index of the line the id should follow, or `None` if the note has an id.
fn insertion_point(lines: &[&str], header_idx: usize) -> Option<usize> {
    let mut insert_after = header_idx;

    for (idx, line) in lines.iter().enumerate().skip(header_idx + 1) {
        if line.starts_with('#') {
            break;
        }
        if NID_KEY.is_match(line) {
            return None;
        }
        if NOTE_KEY.is_match(line) {
            insert_after = idx;
        }
    }

    Some(insert_after)
}
