//! Structured output of the sentence grammar.
//!
//! A parsed sentence becomes one [`RuleElements`] value: every clause the
//! grammar recognizes, captured as plain data. The assembler consumes these
//! without ever looking back at the sentence text, so everything downstream
//! (scope narrowing, chain bookkeeping, time resolution) is driven by this
//! struct alone. Elements are built once by the parser and never mutated.

/// Connective that links a sentence to the flight's previous sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// `and`: carry the running base scope forward.
    And,
    /// `then`: carry the base forward *and* imply `after that`.
    Then,
}

/// Unit of a time metric (`2 days`, `1 fortnight`, `every time`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// The degenerate unit: `every time` resolves to the reference instant.
    Time,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl TimeUnit {
    /// Map a unit word (optionally pluralized with a trailing `s`) to a unit.
    pub(crate) fn parse(word: &str) -> Option<Self> {
        let singular = match word.strip_suffix(['s', 'S']) {
            Some(rest) if !rest.is_empty() => rest,
            _ => word,
        };
        let unit = match singular.to_ascii_lowercase().as_str() {
            "time" => TimeUnit::Time,
            "second" => TimeUnit::Second,
            "minute" => TimeUnit::Minute,
            "hour" => TimeUnit::Hour,
            "day" => TimeUnit::Day,
            "week" => TimeUnit::Week,
            "fortnight" => TimeUnit::Fortnight,
            "month" => TimeUnit::Month,
            "year" => TimeUnit::Year,
            _ => return None,
        };
        Some(unit)
    }
}

/// A parsed time quantity, e.g. `2 days` or bare `week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeMetric {
    /// Always at least 1; a missing coefficient in the sentence means 1.
    pub coefficient: u32,
    pub unit: TimeUnit,
}

/// Direction of a relative clause.
///
/// The grammar only ever produces [`After`](RelativeAction::After); `Before`
/// exists so callers constructing elements by hand get an explicit
/// "unsupported" error from the assembler instead of silently inverted
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeAction {
    After,
    Before,
}

impl std::fmt::Display for RelativeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelativeAction::After => f.write_str("after"),
            RelativeAction::Before => f.write_str("before"),
        }
    }
}

/// A relative clause: `after <time item>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relative {
    pub action: RelativeAction,
    /// The raw anchor text, original case, surrounding whitespace trimmed:
    /// `that`, `signup`, `hatching`, `defeating Azog`, ...
    pub time_item: String,
}

/// Everything the grammar extracted from one rule sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleElements {
    /// Leading connective, when the sentence continues a flight.
    pub joiner: Option<Joiner>,
    /// Raw base text (original case and spacing), e.g. `red dragons`.
    pub base_element: Option<String>,
    /// Raw conditional text following `who`/`who've`/`who have`.
    pub conditionals: Option<String>,
    /// Normalized letter name: lowercased, whitespace runs become `_`.
    pub letter_type: String,
    /// True when the sentence says `every`.
    pub recurring: bool,
    pub time_metric: Option<TimeMetric>,
    pub relative: Option<Relative>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_words_accept_plurals() {
        assert_eq!(TimeUnit::parse("day"), Some(TimeUnit::Day));
        assert_eq!(TimeUnit::parse("days"), Some(TimeUnit::Day));
        assert_eq!(TimeUnit::parse("Fortnights"), Some(TimeUnit::Fortnight));
        assert_eq!(TimeUnit::parse("times"), Some(TimeUnit::Time));
    }

    #[test]
    fn unknown_unit_words_are_rejected() {
        assert_eq!(TimeUnit::parse("eon"), None);
        assert_eq!(TimeUnit::parse("s"), None);
        assert_eq!(TimeUnit::parse(""), None);
    }
}
