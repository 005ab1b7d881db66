//! Sample note documents.

/// A document with `num_notes` Basic notes and no ids.
pub fn sample_document(num_notes: usize) -> String {
    let notes: Vec<String> = (0..num_notes)
        .map(|i| {
            format!(
                "# Note {n}\n## Front\nQuestion {n}?\n\n## Back\nAnswer **{n}**.\n",
                n = i + 1
            )
        })
        .collect();

    format!("model: Basic\ntags: sample\n\n{}", notes.join("\n"))
}

/// A document mixing models, decks and math.
pub fn mixed_document() -> &'static str {
    "\
tags: mixed

# Euler
deck: Math
## Front
What is $e^{i\\pi}$?

## Back
$$-1$$

# Capital
model: Basic (and reversed card)
tags: geo
## Front
Capital of France
## Back
Paris

# Cloze note
model: Cloze
markdown: false
## Text
{{c1::Rust}} is a language
## Back Extra
<b>systems</b>
"
}

/// A document whose second note has three fields for a two-field model.
pub fn wrong_field_count() -> &'static str {
    "# Good\n## Front\nA\n## Back\nB\n\n# Bad\n## Front\nA\n## Back\nB\n## Extra\nC\n"
}

/// A document whose first and third notes share a front.
pub fn repeated_front() -> &'static str {
    "# A\n## Front\nsame\n## Back\n1\n\n# B\n## Front\nother\n## Back\n2\n\n# C\n## Front\nsame\n## Back\n3\n"
}
