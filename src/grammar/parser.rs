//! Single-pass cursor parser over the word list.
//!
//! Keywords (`and`, `then`, `who`, `get`, `letter`, `every`, `after`, unit
//! words) are matched case-insensitively; everything between them is free
//! text. The only lookahead is inside the letter clause, where the name runs
//! greedily to the last `letter` keyword whose remainder still reads as a
//! time clause, so `"gets a dead letter office letter"` names the letter
//! `dead_letter_office`.

use thiserror::Error;

use super::lexer::{self, Word};
use crate::elements::{Joiner, Relative, RelativeAction, RuleElements, TimeMetric, TimeUnit};

/// A sentence the grammar does not accept. Carries the sentence itself so the
/// failure stays printable away from the call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sentence does not parse: {sentence:?}")]
pub struct ParseFailure {
    pub sentence: String,
}

/// Parse one rule sentence.
///
/// There is exactly one parse attempt; callers treat a failure as fatal for
/// the run.
///
/// # Example
/// ```
/// use aviary::parse;
///
/// let elements = parse("dragons get a welcome letter every 2 days").unwrap();
/// assert_eq!(elements.letter_type, "welcome");
/// assert!(elements.recurring);
/// ```
pub fn parse(sentence: &str) -> Result<RuleElements, ParseFailure> {
    let body = lexer::strip_terminal(sentence);
    let words = lexer::words(body);
    let cursor = Cursor { body, words: &words, pos: 0 };
    cursor.parse_sentence().ok_or_else(|| ParseFailure { sentence: sentence.to_string() })
}

/// Everything the time clause of a sentence can say.
struct TimeClause {
    recurring: bool,
    time_metric: Option<TimeMetric>,
    relative: Option<Relative>,
}

#[derive(Clone, Copy)]
struct Cursor<'a> {
    body: &'a str,
    words: &'a [Word<'a>],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<Word<'a>> {
        self.words.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Word<'a>> {
        let word = self.peek();
        if word.is_some() {
            self.pos += 1;
        }
        word
    }

    fn at_end(&self) -> bool {
        self.pos >= self.words.len()
    }

    /// Consume `keyword` (case-insensitive) if it is next.
    fn eat(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(w) if w.text.eq_ignore_ascii_case(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn eat_article(&mut self) {
        if let Some(w) = self.peek() {
            let is_article = w.text.eq_ignore_ascii_case("a")
                || w.text.eq_ignore_ascii_case("an")
                || w.text.eq_ignore_ascii_case("all");
            if is_article {
                self.pos += 1;
            }
        }
    }

    /// Consume plain words up to (not including) the first stop keyword or
    /// the end. Fails if a non-plain word shows up before a stop.
    fn plain_run(&mut self, stops: &[&str]) -> Option<(usize, usize)> {
        let start = self.pos;
        while let Some(w) = self.peek() {
            if stops.iter().any(|s| w.text.eq_ignore_ascii_case(s)) {
                break;
            }
            if !lexer::is_plain_word(w.text) {
                return None;
            }
            self.pos += 1;
        }
        Some((start, self.pos))
    }

    /// Original-text slice covering a word range; `None` when empty.
    fn slice_text(&self, range: (usize, usize)) -> Option<String> {
        let (start, end) = range;
        if start == end {
            return None;
        }
        let from = self.words[start].start;
        let to = self.words[end - 1].end;
        Some(self.body[from..to].to_string())
    }

    fn parse_sentence(mut self) -> Option<RuleElements> {
        let joiner = self.parse_joiner();
        self.eat_article();
        let base_run = self.plain_run(&["who", "who've", "get", "gets"])?;
        let base_element = self.slice_text(base_run);
        let conditionals = self.parse_conditionals()?;
        self.parse_letter_clause(joiner, base_element, conditionals)
    }

    fn parse_joiner(&mut self) -> Option<Joiner> {
        if self.eat("and") {
            Some(Joiner::And)
        } else if self.eat("then") {
            Some(Joiner::Then)
        } else {
            None
        }
    }

    /// `who [have] <text>` / `who've <text>`. Outer `None` fails the parse;
    /// inner `None` means the sentence has no conditional clause.
    fn parse_conditionals(&mut self) -> Option<Option<String>> {
        let head = match self.peek() {
            Some(w) => w,
            None => return Some(None),
        };
        let attached_have = head.text.eq_ignore_ascii_case("who've");
        if !attached_have && !head.text.eq_ignore_ascii_case("who") {
            return Some(None);
        }
        self.pos += 1;
        if !attached_have {
            self.eat("have");
        }
        let run = self.plain_run(&["get", "gets"])?;
        // `who` with nothing behind it is not a sentence.
        self.slice_text(run).map(Some)
    }

    fn parse_letter_clause(
        mut self,
        joiner: Option<Joiner>,
        base_element: Option<String>,
        conditionals: Option<String>,
    ) -> Option<RuleElements> {
        if !self.eat("get") && !self.eat("gets") {
            return None;
        }
        self.eat_article();
        let start = self.pos;

        // Greedy name: try each `letter` keyword from the right until the
        // words after it read as a valid time clause.
        let marks: Vec<usize> = (start..self.words.len())
            .filter(|&i| self.words[i].text.eq_ignore_ascii_case("letter"))
            .collect();
        for &mark in marks.iter().rev() {
            if mark == start {
                continue;
            }
            let name = &self.words[start..mark];
            if !name.iter().all(|w| lexer::is_plain_word(w.text)) {
                continue;
            }
            let mut tail = Cursor { pos: mark + 1, ..self };
            if let Some(clause) = tail.parse_time_clause() {
                let letter_type =
                    name.iter().map(|w| w.text.to_lowercase()).collect::<Vec<_>>().join("_");
                return Some(RuleElements {
                    joiner,
                    base_element,
                    conditionals,
                    letter_type,
                    recurring: clause.recurring,
                    time_metric: clause.time_metric,
                    relative: clause.relative,
                });
            }
        }
        None
    }

    /// `[every] [[N] unit] [after <anchor>]`, then the sentence must end.
    fn parse_time_clause(&mut self) -> Option<TimeClause> {
        let recurring = self.eat("every");

        let time_metric = match self.peek() {
            Some(w) if is_digits(w.text) => {
                self.pos += 1;
                let coefficient: u32 = w.text.parse().ok()?;
                if coefficient == 0 {
                    return None;
                }
                let unit_word = self.bump()?;
                Some(TimeMetric { coefficient, unit: TimeUnit::parse(unit_word.text)? })
            }
            Some(w) => match TimeUnit::parse(w.text) {
                Some(unit) => {
                    self.pos += 1;
                    Some(TimeMetric { coefficient: 1, unit })
                }
                None => None,
            },
            None => None,
        };

        let relative = match self.peek() {
            Some(w) if w.text.eq_ignore_ascii_case("after") => {
                self.pos += 1;
                let first = self.peek()?;
                // The anchor is the raw tail of the sentence, case and
                // spacing intact. Interior sentence punctuation is as
                // unparseable here as anywhere else.
                let raw = &self.body[first.start..];
                if raw.contains(['.', '!']) {
                    return None;
                }
                self.pos = self.words.len();
                Some(Relative { action: RelativeAction::After, time_item: raw.to_string() })
            }
            _ => None,
        };

        if !self.at_end() {
            return None;
        }
        Some(TimeClause { recurring, time_metric, relative })
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
