//! The storage query language predicates are lowered to.

use std::fmt;

use serde_json::Value;

use crate::Uid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn function(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermMatch {
    AllOfTerms,
    AnyOfTerms,
    AllOfText,
    AnyOfText,
}

impl TermMatch {
    pub fn requires_all(self) -> bool {
        matches!(self, TermMatch::AllOfTerms | TermMatch::AllOfText)
    }

    fn function(self) -> &'static str {
        match self {
            TermMatch::AllOfTerms => "allofterms",
            TermMatch::AnyOfTerms => "anyofterms",
            TermMatch::AllOfText => "alloftext",
            TermMatch::AnyOfText => "anyoftext",
        }
    }
}

/// A boolean condition over a single entity. Predicate names are storage names, not GraphQL
/// field names.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    True,
    False,
    Uid(Vec<Uid>),
    Type(String),
    Has(String),
    Compare {
        predicate: String,
        op: CompareOp,
        value: Value,
    },
    In {
        predicate: String,
        values: Vec<Value>,
    },
    Between {
        predicate: String,
        min: Value,
        max: Value,
    },
    Terms {
        predicate: String,
        terms: String,
        mode: TermMatch,
    },
    Regexp {
        predicate: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// At least one entity linked through `predicate` satisfies `filter`.
    Edge {
        predicate: String,
        filter: Box<Predicate>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(predicate: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            predicate: predicate.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// Conjunction with constant folding.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut operands = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(nested) => operands.extend(nested),
                other => operands.push(other),
            }
        }
        match operands.len() {
            0 => Predicate::True,
            1 => operands.remove(0),
            _ => Predicate::And(operands),
        }
    }

    /// Disjunction with constant folding.
    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut operands = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(nested) => operands.extend(nested),
                other => operands.push(other),
            }
        }
        match operands.len() {
            0 => Predicate::False,
            1 => operands.remove(0),
            _ => Predicate::Or(operands),
        }
    }

    pub fn negate(predicate: Predicate) -> Self {
        match predicate {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => f.write_str("true"),
            Predicate::False => f.write_str("false"),
            Predicate::Uid(uids) => {
                f.write_str("uid(")?;
                for (index, uid) in uids.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{uid}")?;
                }
                f.write_str(")")
            }
            Predicate::Type(name) => write!(f, "type({name})"),
            Predicate::Has(predicate) => write!(f, "has({predicate})"),
            Predicate::Compare { predicate, op, value } => write!(f, "{}({predicate}, {value})", op.function()),
            Predicate::In { predicate, values } => write!(f, "eq({predicate}, {})", Value::Array(values.clone())),
            Predicate::Between { predicate, min, max } => write!(f, "between({predicate}, {min}, {max})"),
            Predicate::Terms { predicate, terms, mode } => write!(f, "{}({predicate}, {terms:?})", mode.function()),
            Predicate::Regexp {
                predicate,
                pattern,
                case_insensitive,
            } => write!(
                f,
                "regexp({predicate}, /{pattern}/{})",
                if *case_insensitive { "i" } else { "" }
            ),
            Predicate::Edge { predicate, filter } => write!(f, "{predicate} @filter({filter})"),
            Predicate::And(operands) => write_operands(f, operands, " AND "),
            Predicate::Or(operands) => write_operands(f, operands, " OR "),
            Predicate::Not(operand) => write!(f, "NOT ({operand})"),
        }
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, operands: &[Predicate], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (index, operand) in operands.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{operand}")?;
    }
    f.write_str(")")
}
