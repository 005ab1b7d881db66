//! In-memory note collection.

use chrono::Utc;
use notetext_core::{
    field_to_text, AssembledNote, Collection, CollectionError, NoteId, NoteTarget, NoteView,
};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

type Result<T> = std::result::Result<T, CollectionError>;

pub const DEFAULT_DECK: &str = "Default";

#[derive(Debug, Clone)]
struct Model {
    name: String,
    fields: Vec<String>,
    card_count: usize,
}

#[derive(Debug, Clone)]
struct StoredNote {
    model: String,
    deck: String,
    tags: Vec<String>,
    fields: Vec<(String, String)>,
    checksum: String,
    cards: Vec<i64>,
}

/// A collection that lives for the duration of the process.
///
/// Ids are millisecond timestamps, bumped so they stay strictly increasing.
#[derive(Debug)]
pub struct MemoryCollection {
    models: Vec<Model>,
    notes: BTreeMap<NoteId, StoredNote>,
    cards: HashMap<i64, NoteId>,
    last_id: i64,
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCollection {
    /// A collection with the stock `Basic`, `Basic (and reversed card)` and `Cloze` models.
    pub fn new() -> Self {
        let mut collection = Self {
            models: Vec::new(),
            notes: BTreeMap::new(),
            cards: HashMap::new(),
            last_id: 0,
        };
        collection.add_model("Basic", &["Front", "Back"], 1);
        collection.add_model("Basic (and reversed card)", &["Front", "Back"], 2);
        collection.add_model("Cloze", &["Text", "Back Extra"], 1);
        collection
    }

    pub fn add_model(&mut self, name: &str, fields: &[&str], card_count: usize) {
        let model = Model {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            card_count: card_count.max(1),
        };
        match self.models.iter_mut().find(|m| m.name == name) {
            Some(existing) => *existing = model,
            None => self.models.push(model),
        }
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Card ids of a note, in creation order.
    pub fn card_ids(&self, id: NoteId) -> Result<Vec<i64>> {
        self.notes
            .get(&id)
            .map(|note| note.cards.clone())
            .ok_or(CollectionError::NoteNotFound(id))
    }

    pub fn deck_names(&self) -> Vec<&str> {
        let mut decks: Vec<&str> = self.notes.values().map(|n| n.deck.as_str()).collect();
        decks.sort_unstable();
        decks.dedup();
        decks
    }

    fn model(&self, name: &str) -> Result<&Model> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CollectionError::ModelNotFound(name.to_string()))
    }

    fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    fn add_note(&mut self, note: &AssembledNote, checksum: String) -> Result<NoteId> {
        let model = self.model(&note.model)?;
        let card_count = model.card_count;

        let duplicate = self
            .notes
            .values()
            .any(|n| n.model == note.model && n.checksum == checksum);
        if duplicate {
            let field = note.fields.first().map(|(name, _)| name.clone()).unwrap_or_default();
            return Err(CollectionError::Duplicate { field });
        }

        let id = self.next_id();
        let cards: Vec<i64> = (0..card_count).map(|_| self.next_id()).collect();
        for card in &cards {
            self.cards.insert(*card, id);
        }

        self.notes.insert(
            id,
            StoredNote {
                model: note.model.clone(),
                deck: deck_name(note),
                tags: note.tags.clone(),
                fields: note.fields.clone(),
                checksum,
                cards,
            },
        );
        tracing::debug!(id, model = %note.model, "added note");
        Ok(id)
    }

    fn update_note(&mut self, id: NoteId, note: &AssembledNote, checksum: String) -> Result<NoteId> {
        self.model(&note.model)?;
        let stored = self
            .notes
            .get_mut(&id)
            .ok_or(CollectionError::NoteNotFound(id))?;

        stored.model = note.model.clone();
        if let Some(deck) = &note.deck {
            stored.deck = deck.clone();
        }
        stored.tags = note.tags.clone();
        stored.fields = note.fields.clone();
        stored.checksum = checksum;
        tracing::debug!(id, "updated note");
        Ok(id)
    }

    fn matches(&self, id: NoteId, note: &StoredNote, term: &Term) -> bool {
        match term {
            Term::Nid(nid) => *nid == id,
            Term::Tag(tag) => note.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
            Term::Deck(deck) => note.deck.eq_ignore_ascii_case(deck),
            Term::Model(model) => note.model.eq_ignore_ascii_case(model),
            Term::Text(text) => note
                .fields
                .iter()
                .any(|(_, html)| field_to_text(html).to_lowercase().contains(text)),
        }
    }
}

impl Collection for MemoryCollection {
    fn model_fields(&self, model: &str) -> Result<Vec<String>> {
        Ok(self.model(model)?.fields.clone())
    }

    fn create_or_update_note(&mut self, note: &AssembledNote) -> Result<NoteId> {
        let checksum = first_field_checksum(note);

        match note.target {
            NoteTarget::New => self.add_note(note, checksum),
            NoteTarget::Note(id) => self.update_note(id, note, checksum),
            NoteTarget::Card(card) => {
                let id = *self
                    .cards
                    .get(&card)
                    .ok_or(CollectionError::CardNotFound(card))?;
                self.update_note(id, note, checksum)
            }
        }
    }

    fn find_notes(&self, query: &str) -> Result<Vec<NoteId>> {
        let terms = query
            .split_whitespace()
            .filter(|t| *t != "*")
            .map(Term::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(self
            .notes
            .iter()
            .filter(|(id, note)| terms.iter().all(|term| self.matches(**id, note, term)))
            .map(|(id, _)| *id)
            .collect())
    }

    fn note(&self, id: NoteId) -> Result<NoteView> {
        let note = self.notes.get(&id).ok_or(CollectionError::NoteNotFound(id))?;
        Ok(NoteView {
            id,
            model: note.model.clone(),
            tags: note.tags.clone(),
            deck: note.deck.clone(),
            fields: note.fields.clone(),
        })
    }
}

enum Term {
    Nid(NoteId),
    Tag(String),
    Deck(String),
    Model(String),
    Text(String),
}

impl Term {
    fn parse(term: &str) -> Result<Self> {
        let Some((key, value)) = term.split_once(':') else {
            return Ok(Term::Text(term.to_lowercase()));
        };

        match key.to_lowercase().as_str() {
            "nid" => value
                .parse()
                .map(Term::Nid)
                .map_err(|_| CollectionError::InvalidQuery(term.to_string())),
            "tag" => Ok(Term::Tag(value.to_string())),
            "deck" => Ok(Term::Deck(value.to_string())),
            "model" | "note" => Ok(Term::Model(value.to_string())),
            _ => Ok(Term::Text(term.to_lowercase())),
        }
    }
}

fn deck_name(note: &AssembledNote) -> String {
    note.deck.clone().unwrap_or_else(|| DEFAULT_DECK.to_string())
}

fn first_field_checksum(note: &AssembledNote) -> String {
    let text = note.first_field().map(field_to_text).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}
