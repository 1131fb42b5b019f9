//! Assembly and dispatch engine.
//!
//! This module is the working core behind [`crate::Aviary`]: it turns a
//! flight plan plus the host's stores into per-letter eligibility scopes and,
//! unless the run is a dry run, into delivered letters.
//!
//! ## How the parts work together
//!
//! Running a plan is a pipeline:
//!
//! ```text
//! plan (flights, name order) ──┐
//!                              │  Orchestrator::run        (orchestrator.rs)
//!                              └───────────┬──────────────
//!                                          │  per flight: cohort slot,
//!                                          │  fresh RunState
//!                                          v
//!                          grammar::parse each sentence
//!                                          │
//!                                          v
//!                          Assembler::assemble (assembler.rs)
//!                            - settle the base population
//!                            - conjoin eligibility checks (checks.rs)
//!                            - anchor "after" clauses
//!                            - update the chain state
//!                                          │
//!                                          v
//!                          count + send_letters (dispatcher.rs)
//! ```
//!
//! Everything here is fail-fast: the first sentence that cannot be parsed,
//! resolved, or checked aborts the whole run with the flight and sentence
//! attached. The single exception is delivery itself, where a failing letter
//! is logged and skipped so one dead mailbox cannot ground a flight.
//!
//! ## Responsibilities by module
//!
//! - `assembler.rs`: one sentence in, one [`crate::Scope`] out; owns the
//!   running base and chain state.
//! - `checks.rs`: the letter-record probes (cooldown, send-once, recurrence
//!   windows, chain predecessors).
//! - `orchestrator.rs`: flight ordering, cohort slots, evaluation results.
//! - `dispatcher.rs`: batched record-create / deliver / mark-sent.

#[path = "engine/assembler.rs"]
mod assembler;
#[path = "engine/checks.rs"]
mod checks;
#[path = "engine/dispatcher.rs"]
mod dispatcher;
#[path = "engine/orchestrator.rs"]
mod orchestrator;

pub(crate) use orchestrator::Orchestrator;
