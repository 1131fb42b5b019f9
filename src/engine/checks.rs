//! Letter-record eligibility probes.
//!
//! Every windowing rule in the system reduces to existence probes over the
//! entity's letter records. These builders say *which* probes; the store
//! decides how to evaluate them.

use chrono::NaiveDateTime;

use crate::scope::{LetterProbe, Scope};

/// No letter of any type since the cooldown cutoff: the entity has had quiet
/// time and may be written to again.
pub(super) fn outside_cooldown(scope: Scope, cutoff: NaiveDateTime) -> Scope {
    scope.letters(LetterProbe { negated: true, letter_types: None, created_after: Some(cutoff) })
}

/// This letter was never sent to the entity at all (non-recurring letters go
/// out exactly once).
pub(super) fn not_yet_received(scope: Scope, letter_type: &str) -> Scope {
    scope.letters(LetterProbe {
        negated: true,
        letter_types: Some(vec![letter_type.to_string()]),
        created_after: None,
    })
}

/// This letter was not sent since the recurrence window opened; one letter
/// per window.
pub(super) fn not_received_since(
    scope: Scope,
    letter_type: &str,
    window_start: NaiveDateTime,
) -> Scope {
    scope.letters(LetterProbe {
        negated: true,
        letter_types: Some(vec![letter_type.to_string()]),
        created_after: Some(window_start),
    })
}

/// The chain case (`after that`): some previous letter of the flight has
/// arrived, and none of them arrived after the cutoff. The entity finished
/// the previous step long enough ago.
pub(super) fn received_then_quiet(
    scope: Scope,
    previous_letters: &[String],
    cutoff: NaiveDateTime,
) -> Scope {
    scope
        .letters(LetterProbe {
            negated: false,
            letter_types: Some(previous_letters.to_vec()),
            created_after: None,
        })
        .letters(LetterProbe {
            negated: true,
            letter_types: Some(previous_letters.to_vec()),
            created_after: Some(cutoff),
        })
}
