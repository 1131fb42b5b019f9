//! Per-sentence scope assembly.
//!
//! Takes one parsed sentence plus the flight's running state and produces
//! the eligibility scope for that letter, by pure conjunction:
//!
//! 1. settle the base population (sentence base, else carried base),
//! 2. cut the cohort (`id % flights = index`),
//! 3. verify the letter is deliverable,
//! 4. require cooldown quiet time,
//! 5. require the letter itself not sent (ever, or within its window),
//! 6. anchor relative sentences (`after that` / signup / events),
//! 7. apply conditional extensions,
//! 8. update the chain for the sentences that follow.
//!
//! Any miss along the way is fatal for the whole run; the assembler never
//! guesses.

use chrono::{Duration, NaiveDateTime};

use crate::clock;
use crate::elements::{Joiner, RelativeAction, RuleElements};
use crate::error::FlightConfigError;
use crate::extensions::Extensions;
use crate::scope::Scope;
use crate::store::{self, EntityStore, LetterSender};

use super::checks;

/// The flight's position in the cohort partition: `index` of `count`.
#[derive(Debug, Clone, Copy)]
pub(super) struct Cohort {
    pub index: u32,
    pub count: u32,
}

/// State threaded through one flight's sentences, in document order.
///
/// `base_scope` is the population sentences without a base continue from;
/// `previous_letters` is the chain `after that` refers back to. Both reset
/// between flights.
#[derive(Debug, Default)]
pub(super) struct RunState {
    pub base_scope: Option<Scope>,
    pub previous_letters: Vec<String>,
}

impl RunState {
    pub fn new(base_scope: Option<Scope>) -> Self {
        RunState { base_scope, previous_letters: Vec::new() }
    }
}

/// Everything sentence assembly needs besides the sentence itself.
pub(super) struct Assembler<'a> {
    pub extensions: &'a Extensions,
    pub entities: &'a dyn EntityStore,
    pub sender: &'a dyn LetterSender,
    pub cooldown: Duration,
    pub now: NaiveDateTime,
}

impl Assembler<'_> {
    /// Assemble the scope for one sentence, updating `state` for the next.
    pub fn assemble(
        &self,
        elements: &RuleElements,
        state: &mut RunState,
        cohort: Cohort,
    ) -> Result<Scope, FlightConfigError> {
        // A sentence without a joiner starts over; the chain does not leak
        // across it.
        if elements.joiner.is_none() {
            state.previous_letters.clear();
        }

        if let Some(text) = &elements.base_element {
            state.base_scope = Some(self.resolve_base(text)?);
        } else if elements.joiner.is_none() {
            return Err(FlightConfigError::MissingJoiner);
        }
        let mut scope = match &state.base_scope {
            Some(base) => base.clone(),
            None => return Err(FlightConfigError::MissingBase),
        };

        scope = scope.id_modulo(cohort.count, cohort.index);

        let letter_type = elements.letter_type.as_str();
        if !self.sender.is_deliverable(letter_type) {
            return Err(FlightConfigError::UnknownLetter { letter: letter_type.to_string() });
        }

        scope = checks::outside_cooldown(scope, self.now - self.cooldown);

        let relative_time =
            elements.time_metric.as_ref().map(|metric| clock::resolve(metric, self.now));

        scope = if elements.recurring {
            checks::not_received_since(scope, letter_type, relative_time.unwrap_or(self.now))
        } else {
            checks::not_yet_received(scope, letter_type)
        };

        // `then` is sugar for `after that`.
        if elements.relative.is_some() || elements.joiner == Some(Joiner::Then) {
            if let Some(relative) = &elements.relative {
                if relative.action != RelativeAction::After {
                    return Err(FlightConfigError::UnsupportedRelative { action: relative.action });
                }
            }
            let cutoff = relative_time.unwrap_or(self.now);
            let anchor =
                elements.relative.as_ref().map(|r| r.time_item.as_str()).unwrap_or("that");

            if anchor == "that" {
                if state.previous_letters.is_empty() {
                    return Err(FlightConfigError::AmbiguousChain);
                }
                scope = checks::received_then_quiet(scope, &state.previous_letters, cutoff);
            } else if is_signup_synonym(anchor) {
                scope = scope.created_before(cutoff);
            } else {
                scope = self.extensions.apply_events(scope, cutoff, anchor)?;
            }
        }

        if let Some(text) = &elements.conditionals {
            scope = self.extensions.apply_conditionals(scope, text)?;
        }

        // Chain bookkeeping: a joined, base-less, conditional sentence rides
        // along with the previous letters; anything else starts a new chain.
        if elements.base_element.is_none()
            && elements.joiner.is_some()
            && elements.conditionals.is_some()
        {
            state.previous_letters.push(letter_type.to_string());
        } else {
            state.previous_letters = vec![letter_type.to_string()];
        }

        Ok(scope)
    }

    /// Settle a base text: extensions first, then store kinds (literal,
    /// plural, singular).
    pub fn resolve_base(&self, text: &str) -> Result<Scope, FlightConfigError> {
        if let Some(scope) = self.extensions.resolve_base(text) {
            return Ok(scope);
        }
        for kind in store::kind_candidates(text) {
            if self.entities.has_kind(&kind) {
                return Ok(Scope::all(kind));
            }
        }
        Err(FlightConfigError::UnknownBase { base: text.to_string() })
    }
}

/// The handful of phrasings that anchor a letter to the entity's own
/// creation instead of an event extension.
fn is_signup_synonym(anchor: &str) -> bool {
    regex!(r"(?i)^(sign((ing )|[-]|[ ])?up)|(creat(e|ion))$").is_match(anchor)
}
