//! Drip letters for your entities: sentences like `"dragons get a welcome
//! letter 2 days after signup"` become eligibility scopes, and scopes become
//! sent letters. See [`Aviary`] for the entry point, [`parse`] for the
//! sentence grammar on its own, and [`Extensions`] for teaching the engine
//! your domain's bases, conditions and events.

extern crate self as aviary;

#[macro_use]
mod macros;
mod api;
mod clock;
mod elements;
mod engine;
mod error;
mod extensions;
mod grammar;
mod plan;
mod scope;
mod store;

pub use api::{Aviary, Context, Evaluation, Options, Settings};
pub use elements::{Joiner, Relative, RelativeAction, RuleElements, TimeMetric, TimeUnit};
pub use error::{ConfigError, FlightConfigError};
pub use extensions::{Extensions, ExtensionsBuilder};
pub use grammar::{ParseFailure, parse};
pub use plan::{FlightConfig, FlightPlan};
pub use scope::{CmpOp, LetterProbe, Predicate, Scope, Value};
pub use store::{
    DeliveryError, EntityStore, LetterRecord, LetterSender, RecordStore, StoreError, Subject,
};
