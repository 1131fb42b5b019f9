use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::engine::Orchestrator;
use crate::error::ConfigError;
use crate::extensions::Extensions;
use crate::plan::FlightPlan;
use crate::scope::Scope;
use crate::store::{EntityStore, LetterSender, RecordStore};

/// Run context.
///
/// This holds the environment needed to resolve relative clauses (like
/// "2 days after signup") and to stamp records consistently; one run sees
/// exactly one instant.
#[derive(Debug, Clone)]
pub struct Context {
    /// Reference datetime used to resolve relative clauses and stamp
    /// records.
    pub reference_time: NaiveDateTime,
}

impl Default for Context {
    fn default() -> Self {
        if cfg!(test) {
            let date = NaiveDate::from_ymd_opt(2013, 2, 12).unwrap();
            let time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
            Self { reference_time: NaiveDateTime::new(date, time) }
        } else {
            Self { reference_time: Local::now().naive_local() }
        }
    }
}

/// Options that affect a single run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Whether to actually dispatch letters. With `send: false` the run is a
    /// dry run: scopes are assembled and counted, nothing is written or
    /// delivered.
    pub send: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { send: true }
    }
}

/// Tunables that outlive a single run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Quiet time required since the subject's last letter of any type.
    pub cooldown: Duration,
    /// Batch size handed to [`EntityStore::find_each`] during dispatch.
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { cooldown: Duration::days(2), batch_size: 1000 }
    }
}

/// What one sentence of a flight evaluated to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Normalized letter type, e.g. `punk_rock`.
    pub letter_type: String,
    /// Kind of entity the scope selects, e.g. `dragons`.
    pub entity: String,
    /// Rendered form of the scope, for logs and inspection.
    pub query: String,
    /// How many entities the scope matched at assembly time.
    pub count: u64,
    /// The assembled scope itself.
    pub scope: Scope,
}

/// The engine handle: extension registry, stores, and settings, wired
/// together once and reused across runs.
///
/// Runs never mutate the handle; a flight plan can be assembled repeatedly
/// (say, from a scheduler tick) against the same `Aviary`.
pub struct Aviary<'a> {
    extensions: &'a Extensions,
    entities: &'a dyn EntityStore,
    records: &'a dyn RecordStore,
    sender: &'a dyn LetterSender,
    settings: Settings,
}

impl<'a> Aviary<'a> {
    pub fn new(
        extensions: &'a Extensions,
        entities: &'a dyn EntityStore,
        records: &'a dyn RecordStore,
        sender: &'a dyn LetterSender,
    ) -> Self {
        Self::with_settings(extensions, entities, records, sender, Settings::default())
    }

    pub fn with_settings(
        extensions: &'a Extensions,
        entities: &'a dyn EntityStore,
        records: &'a dyn RecordStore,
        sender: &'a dyn LetterSender,
        settings: Settings,
    ) -> Self {
        Aviary { extensions, entities, records, sender, settings }
    }

    /// Assemble (and, unless `options.send` is off, dispatch) every flight in
    /// the plan. Returns the per-flight evaluations in flight-name order.
    pub fn assemble(
        &self,
        plan: &FlightPlan,
        context: &Context,
        options: &Options,
    ) -> Result<BTreeMap<String, Vec<Evaluation>>, ConfigError> {
        let orchestrator = Orchestrator {
            extensions: self.extensions,
            entities: self.entities,
            records: self.records,
            sender: self.sender,
            settings: &self.settings,
        };
        orchestrator.run(plan, context, options)
    }

    /// Load a plan file and [`assemble`](Self::assemble) it.
    pub fn assemble_path(
        &self,
        path: impl AsRef<Path>,
        context: &Context,
        options: &Options,
    ) -> Result<BTreeMap<String, Vec<Evaluation>>, ConfigError> {
        let plan = FlightPlan::from_path(path)?;
        self.assemble(&plan, context, options)
    }
}

impl fmt::Debug for Aviary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aviary")
            .field("extensions", self.extensions)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
