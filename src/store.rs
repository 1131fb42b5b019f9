//! Collaborator traits.
//!
//! The engine never touches physical storage or an outbox; it speaks to
//! three small traits instead. [`EntityStore`] answers questions about the
//! entities a scope describes, [`RecordStore`] keeps the letter records that
//! the eligibility probes reason about, and [`LetterSender`] performs the
//! actual delivery. Hosts implement these over whatever they have; the test
//! suite implements them in memory.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::scope::Scope;

/// An entity picked out by a scope: just enough identity to address letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    /// Normalized entity kind, e.g. `dragons`.
    pub kind: String,
}

/// One letter sent (or being sent) to a subject.
///
/// A record is created the moment dispatch decides to send, with `sent_at`
/// empty; it is marked sent only after the sender confirms delivery. The
/// eligibility probes therefore count attempts, not confirmations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterRecord {
    pub id: i64,
    pub subject_id: i64,
    pub subject_kind: String,
    pub letter_type: String,
    /// Name of the flight that produced this record.
    pub flight: String,
    pub created_at: NaiveDateTime,
    pub sent_at: Option<NaiveDateTime>,
}

/// Failure inside a store implementation. Fatal wherever it surfaces.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("store error: {0}")]
pub struct StoreError(String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        StoreError(message.into())
    }
}

/// Boxed error from a letter sender. The dispatcher only logs these.
pub type DeliveryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Read access to the entities letters are addressed to.
pub trait EntityStore {
    /// Whether a collection of this kind exists. `kind` arrives normalized
    /// (lowercase, underscores).
    fn has_kind(&self, kind: &str) -> bool;

    /// Number of entities the scope matches.
    fn count(&self, scope: &Scope) -> Result<u64, StoreError>;

    /// Iterate the entities the scope matches, fetching at most `batch` at a
    /// time. This is the only place result-set size bounds memory, so
    /// implementations must not materialize everything up front.
    fn find_each(
        &self,
        scope: &Scope,
        batch: usize,
    ) -> Box<dyn Iterator<Item = Result<Subject, StoreError>> + '_>;
}

/// Write access to letter records.
///
/// Every record carries a creation time; [`LetterRecord`] makes the null
/// case unrepresentable. A host whose physical schema still allows a null
/// `created_at` must keep such rows out of probe answers.
pub trait RecordStore {
    fn create(
        &self,
        subject: &Subject,
        letter_type: &str,
        flight: &str,
        at: NaiveDateTime,
    ) -> Result<LetterRecord, StoreError>;

    fn mark_sent(&self, record: &LetterRecord, at: NaiveDateTime) -> Result<(), StoreError>;
}

/// The delivery boundary.
pub trait LetterSender {
    /// Whether this letter type can be delivered at all. Assembly fails fast
    /// on letters the sender does not know.
    fn is_deliverable(&self, letter_type: &str) -> bool;

    /// Deliver one letter. A failure here is logged and skipped by the
    /// dispatcher; it never aborts the batch.
    fn deliver(&self, subject: &Subject, letter_type: &str, flight: &str) -> Result<(), DeliveryError>;
}

// --- Kind naming ------------------------------------------------------------

/// Lowercase, whitespace runs to single underscores: `"RED  Dragons"` becomes
/// `red_dragons`.
pub(crate) fn normalize_kind(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join("_")
}

/// Candidate store kinds for a base text, most literal first: the normalized
/// text itself, then its plural, then its singular. Only the last word is
/// inflected, so `red_dragon` offers `red_dragons`.
pub(crate) fn kind_candidates(text: &str) -> Vec<String> {
    let normalized = normalize_kind(text);
    let mut candidates = vec![normalized.clone()];
    for inflected in [pluralize(&normalized), singularize(&normalized)].into_iter().flatten() {
        if !candidates.contains(&inflected) {
            candidates.push(inflected);
        }
    }
    candidates
}

fn split_last_word(kind: &str) -> (&str, &str) {
    match kind.rfind('_') {
        Some(idx) => kind.split_at(idx + 1),
        None => ("", kind),
    }
}

fn pluralize(kind: &str) -> Option<String> {
    let (prefix, word) = split_last_word(kind);
    if word.is_empty() || word.ends_with('s') {
        return None;
    }
    let plural = if let Some(stem) = word.strip_suffix('y') {
        let penultimate = stem.chars().last()?;
        if "aeiou".contains(penultimate) {
            format!("{word}s")
        } else {
            format!("{stem}ies")
        }
    } else if word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        format!("{word}es")
    } else {
        format!("{word}s")
    };
    Some(format!("{prefix}{plural}"))
}

fn singularize(kind: &str) -> Option<String> {
    let (prefix, word) = split_last_word(kind);
    let singular = if let Some(stem) = word.strip_suffix("ies") {
        if stem.is_empty() {
            return None;
        }
        format!("{stem}y")
    } else if let Some(stem) = word.strip_suffix("es") {
        if stem.ends_with('x')
            || stem.ends_with('z')
            || stem.ends_with('s')
            || stem.ends_with("ch")
            || stem.ends_with("sh")
        {
            stem.to_string()
        } else {
            // `es` after anything else is just an `s` ending: `scales` ->
            // `scale`.
            format!("{stem}e")
        }
    } else if let Some(stem) = word.strip_suffix('s') {
        if stem.is_empty() || stem.ends_with('s') {
            return None;
        }
        stem.to_string()
    } else {
        return None;
    };
    Some(format!("{prefix}{singular}"))
}
