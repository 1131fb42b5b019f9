//! Error taxonomy.
//!
//! Everything that can go wrong before the first letter moves is a
//! [`ConfigError`]: unreadable or malformed plan documents, bad extension
//! patterns, and per-sentence assembly failures (wrapped with their flight
//! and sentence so the message points at the offending line). Assembly is
//! fail-fast; there are no partial results. The one recovered failure class
//! in the whole crate is letter delivery, which never surfaces here.

use std::path::PathBuf;

use thiserror::Error;

use crate::elements::RelativeAction;
use crate::store::StoreError;

/// Errors from loading a flight plan, registering extensions, or assembling
/// and dispatching flights.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The plan file could not be read.
    #[error("failed to read flight plan {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The plan document is not valid JSON of the expected shape.
    #[error("malformed flight plan: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The plan document has no `flights` object.
    #[error("flight plan has no flights object")]
    MissingFlights,

    /// An extension pattern failed to compile at registration time.
    #[error("invalid extension pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A flight with no sentences.
    #[error("no letters defined for flight {flight}")]
    EmptyFlight { flight: String },

    /// A sentence failed to assemble; carries enough context to find it.
    #[error("flight {flight}, sentence {sentence:?}: {source}")]
    Flight {
        flight: String,
        sentence: String,
        #[source]
        source: FlightConfigError,
    },

    /// A collaborating store failed; fatal like everything else here.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConfigError {
    /// Wrap a per-sentence failure with its flight context.
    pub(crate) fn in_flight(flight: &str, sentence: &str, source: FlightConfigError) -> Self {
        ConfigError::Flight {
            flight: flight.to_string(),
            sentence: sentence.to_string(),
            source,
        }
    }
}

/// Ways a single sentence can fail to assemble.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlightConfigError {
    /// The sentence does not belong to the grammar.
    #[error("sentence does not parse")]
    Grammar,

    /// Neither a base nor a joiner: the sentence hangs in the air.
    #[error("sentence names no base and continues nothing (no joiner)")]
    MissingJoiner,

    /// A continuation sentence before any base was established.
    #[error("the first sentence of a flight must establish a base")]
    MissingBase,

    /// Base text matched no extension and no store kind.
    #[error("unknown base {base:?}")]
    UnknownBase { base: String },

    /// The sender does not know how to deliver this letter type.
    #[error("no deliverable letter {letter:?}")]
    UnknownLetter { letter: String },

    /// `after that` with an empty letter chain.
    #[error("`after that` needs a previous letter in the flight")]
    AmbiguousChain,

    /// A relative action the assembler has no semantics for.
    #[error("relative action {action} is not supported")]
    UnsupportedRelative { action: RelativeAction },

    /// Conditional text no condition extension claimed.
    #[error("no condition extension matched {text:?}")]
    UnmatchedConditional { text: String },

    /// Event text no event extension claimed.
    #[error("no event extension matched {text:?}")]
    UnmatchedEvent { text: String },
}
