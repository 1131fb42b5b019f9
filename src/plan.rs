//! Flight-plan documents.
//!
//! A plan is a JSON object with one `flights` table. Each flight maps a name
//! to either a plain sentence list, or a table carrying an optional `base`
//! override plus the sentences:
//!
//! ```json
//! {
//!   "flights": {
//!     "aflight": ["dragons get a welcome letter"],
//!     "bflight": {
//!       "base": "red dragons",
//!       "letters": [
//!         "gets a hello letter",
//!         "then gets a goodnight letter 1 hour after that"
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Flight names double as cohort labels: the plan keeps them in a `BTreeMap`
//! so iteration order, and with it each flight's cohort index, is the
//! lexicographic name order and nothing else.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// One flight: its sentences, with or without a base override.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlightConfig {
    /// Shorthand form: just the sentences.
    Letters(Vec<String>),
    /// Full form: an optional base established before the first sentence.
    Detailed {
        #[serde(default)]
        base: Option<String>,
        letters: Vec<String>,
    },
}

impl FlightConfig {
    pub fn letters(&self) -> &[String] {
        match self {
            FlightConfig::Letters(letters) => letters,
            FlightConfig::Detailed { letters, .. } => letters,
        }
    }

    pub fn base(&self) -> Option<&str> {
        match self {
            FlightConfig::Letters(_) => None,
            FlightConfig::Detailed { base, .. } => base.as_deref(),
        }
    }
}

/// A whole plan: flight name to flight config, lexicographically ordered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlightPlan {
    pub flights: BTreeMap<String, FlightConfig>,
}

impl FlightPlan {
    /// Parse a plan from its JSON text.
    ///
    /// Two passes: first probe the envelope for a `flights` object, then
    /// deserialize the typed plan. A document that is valid JSON but has no
    /// `flights` table reports as exactly that instead of as an opaque
    /// deserialization error.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let envelope: serde_json::Value = serde_json::from_str(document)?;
        match envelope.get("flights") {
            Some(flights) if flights.is_object() => {}
            _ => return Err(ConfigError::MissingFlights),
        }
        Ok(serde_json::from_value(envelope)?)
    }

    /// Read and parse a plan file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&document)
    }
}
