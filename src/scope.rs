//! Abstract eligibility scopes.
//!
//! A [`Scope`] is what the engine hands to an entity store: one entity kind
//! plus a flat conjunction of predicates. There is deliberately no OR, no
//! nesting and no free-form expression tree; every narrowing step appends
//! predicates, so two scopes are equivalent exactly when their predicate
//! lists are equal. Stores interpret the predicates against whatever backs
//! them; [`Scope::to_query`] renders a stable SQL-flavored text for logs,
//! reports and tests.

use chrono::NaiveDateTime;
use std::fmt::{self, Write as _};

/// Comparison operator for a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Like => "LIKE",
        }
    }
}

/// A comparison value. `From` impls cover the types handlers actually pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Time(NaiveDateTime),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Time(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Time(v) => write!(f, "'{}'", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A probe into the letter records of the scoped entity: does (or does not)
/// a matching record exist for the entity at hand?
///
/// Stores interpret this as a correlated existence check: a record counts
/// when its subject is the entity, its letter type is in `letter_types`
/// (any type when `None`) and it was created after `created_after` (any
/// time when `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LetterProbe {
    /// True for NOT EXISTS.
    pub negated: bool,
    pub letter_types: Option<Vec<String>>,
    pub created_after: Option<NaiveDateTime>,
}

/// One conjunct of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Compare an entity field against a value.
    Cmp { field: String, op: CmpOp, value: Value },
    /// Cohort partition: `id % divisor == remainder`.
    IdModulo { divisor: u32, remainder: u32 },
    /// The entity itself came into existence before the given instant.
    CreatedBefore(NaiveDateTime),
    /// Existence probe into the entity's letter records.
    Letters(LetterProbe),
}

/// An entity kind narrowed by a conjunction of predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    kind: String,
    predicates: Vec<Predicate>,
}

impl Scope {
    /// The unnarrowed scope: every entity of `kind`.
    pub fn all(kind: impl Into<String>) -> Self {
        Scope { kind: kind.into(), predicates: Vec::new() }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    fn cmp(mut self, field: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Cmp { field: field.into(), op, value: value.into() });
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Eq, value)
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Ne, value)
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Lt, value)
    }

    pub fn le(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Le, value)
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Gt, value)
    }

    pub fn ge(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Ge, value)
    }

    /// Substring/pattern match, store-defined semantics (`LIKE`).
    pub fn like(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cmp(field, CmpOp::Like, value)
    }

    /// Require the entity to have been created strictly before `instant`.
    pub fn created_before(mut self, instant: NaiveDateTime) -> Self {
        self.predicates.push(Predicate::CreatedBefore(instant));
        self
    }

    pub(crate) fn id_modulo(mut self, divisor: u32, remainder: u32) -> Self {
        self.predicates.push(Predicate::IdModulo { divisor, remainder });
        self
    }

    pub(crate) fn letters(mut self, probe: LetterProbe) -> Self {
        self.predicates.push(Predicate::Letters(probe));
        self
    }

    /// Stable SQL-flavored rendering for logs and reports.
    pub fn to_query(&self) -> String {
        let mut out = self.kind.clone();
        for (idx, predicate) in self.predicates.iter().enumerate() {
            out.push_str(if idx == 0 { " WHERE " } else { " AND " });
            render_predicate(&mut out, &self.kind, predicate);
        }
        out
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

fn render_predicate(out: &mut String, kind: &str, predicate: &Predicate) {
    match predicate {
        Predicate::Cmp { field, op, value } => {
            let _ = write!(out, "{field} {} {value}", op.symbol());
        }
        Predicate::IdModulo { divisor, remainder } => {
            let _ = write!(out, "id % {divisor} = {remainder}");
        }
        Predicate::CreatedBefore(instant) => {
            let _ = write!(out, "created_at < {}", Value::Time(*instant));
        }
        Predicate::Letters(probe) => {
            if probe.negated {
                out.push_str("NOT ");
            }
            let _ = write!(out, "EXISTS (letters[{kind}]");
            let mut clauses: Vec<String> = Vec::new();
            match probe.letter_types.as_deref() {
                Some([single]) => clauses.push(format!("letter_type = {}", Value::from(single.as_str()))),
                Some(types) => {
                    let list: Vec<String> =
                        types.iter().map(|t| Value::from(t.as_str()).to_string()).collect();
                    clauses.push(format!("letter_type IN ({})", list.join(", ")));
                }
                None => {}
            }
            if let Some(after) = probe.created_after {
                clauses.push(format!("created_at > {}", Value::Time(after)));
            }
            if !clauses.is_empty() {
                let _ = write!(out, " WHERE {}", clauses.join(" AND "));
            }
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 2, 10).unwrap().and_hms_opt(4, 30, 0).unwrap()
    }

    #[test]
    fn bare_scope_renders_the_kind() {
        assert_eq!(Scope::all("dragons").to_query(), "dragons");
    }

    #[test]
    fn comparisons_render_in_order() {
        let scope = Scope::all("dragons").eq("color", "red").gt("level", 3).id_modulo(2, 1);
        assert_eq!(scope.to_query(), "dragons WHERE color = 'red' AND level > 3 AND id % 2 = 1");
    }

    #[test]
    fn letter_probes_render_their_clauses() {
        let any_recent = Scope::all("dragons").letters(LetterProbe {
            negated: true,
            letter_types: None,
            created_after: Some(instant()),
        });
        assert_eq!(
            any_recent.to_query(),
            "dragons WHERE NOT EXISTS (letters[dragons] WHERE created_at > '2013-02-10 04:30:00')"
        );

        let chain = Scope::all("dragons").letters(LetterProbe {
            negated: false,
            letter_types: Some(vec!["hello".into(), "food".into()]),
            created_after: None,
        });
        assert_eq!(
            chain.to_query(),
            "dragons WHERE EXISTS (letters[dragons] WHERE letter_type IN ('hello', 'food'))"
        );

        let sent_once = Scope::all("dragons").letters(LetterProbe {
            negated: true,
            letter_types: Some(vec!["welcome".into()]),
            created_after: None,
        });
        assert_eq!(
            sent_once.to_query(),
            "dragons WHERE NOT EXISTS (letters[dragons] WHERE letter_type = 'welcome')"
        );
    }

    #[test]
    fn created_before_and_text_escaping() {
        let scope = Scope::all("orcs").created_before(instant()).like("name", "o'brien%");
        assert_eq!(
            scope.to_query(),
            "orcs WHERE created_at < '2013-02-10 04:30:00' AND name LIKE 'o''brien%'"
        );
    }

    #[test]
    fn equal_construction_means_equal_scopes() {
        let a = Scope::all("dragons").eq("color", "red").created_before(instant());
        let b = Scope::all("dragons").eq("color", "red").created_before(instant());
        assert_eq!(a, b);
        assert_ne!(a, Scope::all("dragons").eq("color", "blue").created_before(instant()));
    }
}
