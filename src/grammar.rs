//! Sentence grammar.
//!
//! Rule sentences are short English-like lines such as
//! `"then who've eaten get a food letter 1 hour after that."`. This module
//! turns one sentence into a [`RuleElements`](crate::RuleElements) value or a
//! [`ParseFailure`]: there is a single parse attempt and no error recovery,
//! so a sentence either belongs to the grammar or the whole run aborts.
//!
//! ## Shape of a sentence
//!
//! ```text
//! [joiner] [article] [base..] [who [have] cond..] get(s) [article] name.. letter
//!     [every] [[N] unit] [after <anchor text>] [. | !]
//! ```
//!
//! ## How the parts work together
//!
//! ```text
//! sentence ── lexer::strip_terminal ── at most one trailing `.` / `!`
//!             lexer::words           ── whitespace split, byte offsets kept
//!                     │
//!                     v
//!             parser::parse (cursor over words)
//!               - keywords matched case-insensitively
//!               - free text returned as slices of the original sentence,
//!                 case and spacing intact
//!               - the letter name runs to the last `letter` keyword whose
//!                 remainder still reads as a time clause
//!                     │
//!                     v
//!               RuleElements
//! ```
//!
//! Free-text positions (base, conditional, letter name) only admit word
//! characters; the `after` anchor is the raw tail of the sentence and may
//! contain anything except sentence punctuation.

#[path = "grammar/lexer.rs"]
mod lexer;
#[path = "grammar/parser.rs"]
mod parser;

pub use parser::{ParseFailure, parse};
