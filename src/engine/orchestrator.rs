//! Whole-plan runs.
//!
//! Flights run in name order, each owning one cohort slot (`id % flights =
//! position`). Within a flight, sentences assemble in document order against
//! the flight's running state, are counted, and, unless the run is a dry
//! run, handed to the dispatcher. The first configuration or store failure
//! aborts the whole run with its flight and sentence attached.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{ConfigError, FlightConfigError};
use crate::extensions::Extensions;
use crate::grammar;
use crate::plan::FlightPlan;
use crate::store::{EntityStore, LetterSender, RecordStore};
use crate::{Context, Evaluation, Options, Settings};

use super::assembler::{Assembler, Cohort, RunState};
use super::dispatcher;

pub(crate) struct Orchestrator<'a> {
    pub extensions: &'a Extensions,
    pub entities: &'a dyn EntityStore,
    pub records: &'a dyn RecordStore,
    pub sender: &'a dyn LetterSender,
    pub settings: &'a Settings,
}

impl Orchestrator<'_> {
    /// Run every flight in the plan. Returns the per-flight evaluations in
    /// flight-name order.
    pub fn run(
        &self,
        plan: &FlightPlan,
        context: &Context,
        options: &Options,
    ) -> Result<BTreeMap<String, Vec<Evaluation>>, ConfigError> {
        let assembler = Assembler {
            extensions: self.extensions,
            entities: self.entities,
            sender: self.sender,
            cooldown: self.settings.cooldown,
            now: context.reference_time,
        };

        let count = plan.flights.len() as u32;
        let mut results = BTreeMap::new();

        for (index, (name, config)) in plan.flights.iter().enumerate() {
            let sentences = config.letters();
            if sentences.is_empty() {
                return Err(ConfigError::EmptyFlight { flight: name.clone() });
            }

            let base_scope = match config.base() {
                Some(text) => {
                    let scope = assembler
                        .resolve_base(text)
                        .map_err(|source| ConfigError::in_flight(name, text, source))?;
                    Some(scope)
                }
                None => None,
            };
            let mut state = RunState::new(base_scope);
            let cohort = Cohort { index: index as u32, count };

            let mut evaluations = Vec::with_capacity(sentences.len());
            for sentence in sentences {
                let elements = grammar::parse(sentence).map_err(|_| {
                    ConfigError::in_flight(name, sentence, FlightConfigError::Grammar)
                })?;
                let scope = assembler
                    .assemble(&elements, &mut state, cohort)
                    .map_err(|source| ConfigError::in_flight(name, sentence, source))?;
                let matched = self.entities.count(&scope)?;

                debug!(
                    flight = %name,
                    letter = %elements.letter_type,
                    matched,
                    query = %scope.to_query(),
                    "assembled letter scope"
                );

                if options.send {
                    dispatcher::send_letters(
                        self.entities,
                        self.records,
                        self.sender,
                        name,
                        &elements.letter_type,
                        &scope,
                        context.reference_time,
                        self.settings.batch_size,
                    )?;
                }

                evaluations.push(Evaluation {
                    letter_type: elements.letter_type,
                    entity: scope.kind().to_string(),
                    query: scope.to_query(),
                    count: matched,
                    scope,
                });
            }
            results.insert(name.clone(), evaluations);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use crate::store::{DeliveryError, LetterRecord, StoreError, Subject};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::cell::RefCell;

    struct Herd;

    impl EntityStore for Herd {
        fn has_kind(&self, kind: &str) -> bool {
            kind == "dragons"
        }

        fn count(&self, _scope: &Scope) -> Result<u64, StoreError> {
            Ok(4)
        }

        fn find_each(
            &self,
            _scope: &Scope,
            _batch: usize,
        ) -> Box<dyn Iterator<Item = Result<Subject, StoreError>> + '_> {
            Box::new((1..=2).map(|id| Ok(Subject { id, kind: "dragons".to_string() })))
        }
    }

    #[derive(Default)]
    struct Ledger {
        created: RefCell<Vec<LetterRecord>>,
    }

    impl RecordStore for Ledger {
        fn create(
            &self,
            subject: &Subject,
            letter_type: &str,
            flight: &str,
            at: NaiveDateTime,
        ) -> Result<LetterRecord, StoreError> {
            let record = LetterRecord {
                id: self.created.borrow().len() as i64 + 1,
                subject_id: subject.id,
                subject_kind: subject.kind.clone(),
                letter_type: letter_type.to_string(),
                flight: flight.to_string(),
                created_at: at,
                sent_at: None,
            };
            self.created.borrow_mut().push(record.clone());
            Ok(record)
        }

        fn mark_sent(&self, _record: &LetterRecord, _at: NaiveDateTime) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Post;

    impl LetterSender for Post {
        fn is_deliverable(&self, letter_type: &str) -> bool {
            letter_type != "unprintable"
        }

        fn deliver(
            &self,
            _subject: &Subject,
            _letter_type: &str,
            _flight: &str,
        ) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn context() -> Context {
        let reference_time =
            NaiveDate::from_ymd_opt(2013, 2, 12).unwrap().and_hms_opt(4, 30, 0).unwrap();
        Context { reference_time }
    }

    fn orchestrator<'a>(
        extensions: &'a Extensions,
        records: &'a Ledger,
        settings: &'a Settings,
    ) -> Orchestrator<'a> {
        Orchestrator { extensions, entities: &Herd, records, sender: &Post, settings }
    }

    fn plan(document: &str) -> FlightPlan {
        FlightPlan::from_json(document).unwrap()
    }

    #[test]
    fn flights_split_the_cohort_in_name_order() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        let results = orchestrator
            .run(
                &plan(
                    r#"{"flights": {
                        "bflight": ["dragons get a hello letter"],
                        "aflight": ["dragons get a welcome letter"]
                    }}"#,
                ),
                &context(),
                &Options { send: false },
            )
            .unwrap();

        let names: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(names, ["aflight", "bflight"]);
        assert!(results["aflight"][0].query.contains("id % 2 = 0"), "{}", results["aflight"][0].query);
        assert!(results["bflight"][0].query.contains("id % 2 = 1"), "{}", results["bflight"][0].query);
        assert_eq!(results["aflight"][0].count, 4);
        assert_eq!(results["aflight"][0].entity, "dragons");
        assert_eq!(results["aflight"][0].letter_type, "welcome");
    }

    #[test]
    fn dry_runs_never_touch_the_record_store() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);
        let document = r#"{"flights": {"aflight": ["dragons get a welcome letter"]}}"#;

        orchestrator.run(&plan(document), &context(), &Options { send: false }).unwrap();
        assert!(records.created.borrow().is_empty());

        orchestrator.run(&plan(document), &context(), &Options::default()).unwrap();
        assert_eq!(records.created.borrow().len(), 2, "one record per herd member");
    }

    #[test]
    fn detailed_flights_seed_the_base_for_baseless_sentences() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        let results = orchestrator
            .run(
                &plan(
                    r#"{"flights": {"aflight": {
                        "base": "dragon",
                        "letters": ["and gets a welcome letter", "then gets a goodnight letter"]
                    }}}"#,
                ),
                &context(),
                &Options { send: false },
            )
            .unwrap();

        let evaluations = &results["aflight"];
        assert_eq!(evaluations.len(), 2);
        assert!(evaluations.iter().all(|e| e.entity == "dragons"));
    }

    #[test]
    fn a_seeded_base_does_not_excuse_a_missing_joiner() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        let err = orchestrator
            .run(
                &plan(
                    r#"{"flights": {"aflight": {
                        "base": "dragons",
                        "letters": ["gets a welcome letter"]
                    }}}"#,
                ),
                &context(),
                &Options { send: false },
            )
            .unwrap_err();
        match err {
            ConfigError::Flight { sentence, source, .. } => {
                assert_eq!(sentence, "gets a welcome letter");
                assert_eq!(source, FlightConfigError::MissingJoiner);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_flights_are_config_errors() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        let err = orchestrator
            .run(&plan(r#"{"flights": {"aflight": []}}"#), &context(), &Options { send: false })
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFlight { flight } if flight == "aflight"));
    }

    #[test]
    fn sentence_failures_name_the_flight_and_sentence() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        let err = orchestrator
            .run(
                &plan(r#"{"flights": {"aflight": ["dragons get letter"]}}"#),
                &context(),
                &Options { send: false },
            )
            .unwrap_err();
        match err {
            ConfigError::Flight { flight, sentence, source } => {
                assert_eq!(flight, "aflight");
                assert_eq!(sentence, "dragons get letter");
                assert_eq!(source, FlightConfigError::Grammar);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = orchestrator
            .run(
                &plan(r#"{"flights": {"aflight": ["dragons get an unprintable letter"]}}"#),
                &context(),
                &Options { send: false },
            )
            .unwrap_err();
        match err {
            ConfigError::Flight { source, .. } => {
                assert_eq!(source, FlightConfigError::UnknownLetter { letter: "unprintable".to_string() });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn an_unmatched_conditional_aborts_the_whole_run() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        // aflight fails first in name order; bflight is healthy but must
        // never dispatch.
        let err = orchestrator
            .run(
                &plan(
                    r#"{"flights": {
                        "aflight": ["dragons who've hoarded gold get a welcome letter"],
                        "bflight": ["dragons get a hello letter"]
                    }}"#,
                ),
                &context(),
                &Options::default(),
            )
            .unwrap_err();
        match err {
            ConfigError::Flight { flight, sentence, source } => {
                assert_eq!(flight, "aflight");
                assert_eq!(sentence, "dragons who've hoarded gold get a welcome letter");
                assert_eq!(
                    source,
                    FlightConfigError::UnmatchedConditional { text: "hoarded gold".to_string() }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(records.created.borrow().is_empty(), "no letters move when a flight fails");
    }

    #[test]
    fn unknown_detailed_base_fails_with_the_base_text() {
        let extensions = Extensions::default();
        let records = Ledger::default();
        let settings = Settings::default();
        let orchestrator = orchestrator(&extensions, &records, &settings);

        let err = orchestrator
            .run(
                &plan(r#"{"flights": {"aflight": {"base": "basilisks", "letters": ["gets a welcome letter"]}}}"#),
                &context(),
                &Options { send: false },
            )
            .unwrap_err();
        match err {
            ConfigError::Flight { flight, sentence, source } => {
                assert_eq!(flight, "aflight");
                assert_eq!(sentence, "basilisks");
                assert_eq!(source, FlightConfigError::UnknownBase { base: "basilisks".to_string() });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
