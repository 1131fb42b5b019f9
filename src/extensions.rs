//! Extension registry.
//!
//! Extensions are how a host teaches the engine its own vocabulary: what
//! `red dragons` means as a base population, what `own treasure` means as a
//! condition, what `hatching` means as an event anchor. Each entry pairs a
//! regex (compiled case-insensitively at registration) with a handler that
//! narrows a [`Scope`].
//!
//! Registration happens once through [`ExtensionsBuilder`]; the resulting
//! [`Extensions`] value is immutable and gets passed by reference into every
//! run, so a run always sees one consistent snapshot no matter what other
//! threads are doing.
//!
//! Resolution policy differs by category and matters:
//! - **bases**: first matching entry wins, in registration order;
//! - **conditions / events**: every matching entry applies, in registration
//!   order, each narrowing the scope further; matching none is fatal.

use chrono::NaiveDateTime;
use regex::{Captures, Regex, RegexBuilder};

use crate::error::{ConfigError, FlightConfigError};
use crate::scope::Scope;

/// Computes the base scope for a matched base text.
pub type BaseHandler = Box<dyn Fn(&Captures<'_>) -> Scope + Send + Sync>;
/// Narrows a scope for a matched condition text.
pub type ConditionHandler = Box<dyn Fn(Scope, &Captures<'_>) -> Scope + Send + Sync>;
/// Narrows a scope for a matched event anchor, given the resolved cutoff.
pub type EventHandler = Box<dyn Fn(Scope, NaiveDateTime, &Captures<'_>) -> Scope + Send + Sync>;

struct BaseRule {
    pattern: Regex,
    handler: BaseHandler,
}

struct ConditionRule {
    pattern: Regex,
    handler: ConditionHandler,
}

struct EventRule {
    pattern: Regex,
    handler: EventHandler,
}

/// The immutable registry of base, condition and event extensions.
#[derive(Default)]
pub struct Extensions {
    bases: Vec<BaseRule>,
    conditionals: Vec<ConditionRule>,
    events: Vec<EventRule>,
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("bases", &self.bases.len())
            .field("conditionals", &self.conditionals.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Extensions {
    pub fn builder() -> ExtensionsBuilder {
        ExtensionsBuilder::default()
    }

    /// First base entry whose pattern matches, in registration order.
    pub(crate) fn resolve_base(&self, text: &str) -> Option<Scope> {
        self.bases
            .iter()
            .find_map(|rule| rule.pattern.captures(text).map(|caps| (rule.handler)(&caps)))
    }

    /// Apply every matching condition entry; zero matches is fatal.
    pub(crate) fn apply_conditionals(
        &self,
        mut scope: Scope,
        text: &str,
    ) -> Result<Scope, FlightConfigError> {
        let mut matched = false;
        for rule in &self.conditionals {
            if let Some(caps) = rule.pattern.captures(text) {
                matched = true;
                scope = (rule.handler)(scope, &caps);
            }
        }
        if matched {
            Ok(scope)
        } else {
            Err(FlightConfigError::UnmatchedConditional { text: text.to_string() })
        }
    }

    /// Apply every matching event entry; zero matches is fatal.
    pub(crate) fn apply_events(
        &self,
        mut scope: Scope,
        relative_time: NaiveDateTime,
        text: &str,
    ) -> Result<Scope, FlightConfigError> {
        let mut matched = false;
        for rule in &self.events {
            if let Some(caps) = rule.pattern.captures(text) {
                matched = true;
                scope = (rule.handler)(scope, relative_time, &caps);
            }
        }
        if matched {
            Ok(scope)
        } else {
            Err(FlightConfigError::UnmatchedEvent { text: text.to_string() })
        }
    }
}

/// Builds an [`Extensions`] value; each registration can fail on a bad
/// pattern, so the calls chain with `?`.
#[derive(Default)]
pub struct ExtensionsBuilder {
    bases: Vec<BaseRule>,
    conditionals: Vec<ConditionRule>,
    events: Vec<EventRule>,
}

impl std::fmt::Debug for ExtensionsBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionsBuilder")
            .field("bases", &self.bases.len())
            .field("conditionals", &self.conditionals.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl ExtensionsBuilder {
    pub fn base<H>(mut self, pattern: &str, handler: H) -> Result<Self, ConfigError>
    where
        H: Fn(&Captures<'_>) -> Scope + Send + Sync + 'static,
    {
        let pattern = compile(pattern)?;
        self.bases.push(BaseRule { pattern, handler: Box::new(handler) });
        Ok(self)
    }

    pub fn condition<H>(mut self, pattern: &str, handler: H) -> Result<Self, ConfigError>
    where
        H: Fn(Scope, &Captures<'_>) -> Scope + Send + Sync + 'static,
    {
        let pattern = compile(pattern)?;
        self.conditionals.push(ConditionRule { pattern, handler: Box::new(handler) });
        Ok(self)
    }

    pub fn event<H>(mut self, pattern: &str, handler: H) -> Result<Self, ConfigError>
    where
        H: Fn(Scope, NaiveDateTime, &Captures<'_>) -> Scope + Send + Sync + 'static,
    {
        let pattern = compile(pattern)?;
        self.events.push(EventRule { pattern, handler: Box::new(handler) });
        Ok(self)
    }

    pub fn build(self) -> Extensions {
        Extensions { bases: self.bases, conditionals: self.conditionals, events: self.events }
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::Pattern { pattern: pattern.to_string(), source })
}
