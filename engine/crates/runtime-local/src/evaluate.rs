use std::{cmp::Ordering, collections::BTreeMap};

use regex::RegexBuilder;
use runtime::{CompareOp, Entity, Predicate, StoreError, StoreResult, StoredValue, TermMatch, Uid};
use serde_json::Value;

pub(crate) type Graph = BTreeMap<Uid, Entity>;

pub(crate) fn matches(graph: &Graph, entity: &Entity, predicate: &Predicate) -> StoreResult<bool> {
    let matched = match predicate {
        Predicate::True => true,
        Predicate::False => false,
        Predicate::Uid(uids) => uids.contains(&entity.uid),
        Predicate::Type(name) => entity.is_a(name),
        Predicate::Has(predicate) => match entity.values.get(predicate) {
            Some(StoredValue::Scalar(value)) => !value.is_null(),
            Some(StoredValue::Edges(uids)) => !uids.is_empty(),
            None => false,
        },
        Predicate::Compare { predicate, op, value } => scalar_values(entity, predicate)
            .into_iter()
            .any(|candidate| compare(candidate, *op, value)),
        Predicate::In { predicate, values } => scalar_values(entity, predicate)
            .into_iter()
            .any(|candidate| values.iter().any(|value| compare(candidate, CompareOp::Eq, value))),
        Predicate::Between { predicate, min, max } => scalar_values(entity, predicate).into_iter().any(|candidate| {
            compare(candidate, CompareOp::Ge, min) && compare(candidate, CompareOp::Le, max)
        }),
        Predicate::Terms { predicate, terms, mode } => {
            let wanted = tokens(terms);
            scalar_values(entity, predicate).into_iter().any(|candidate| {
                let Some(text) = candidate.as_str() else { return false };
                let present = tokens(text);
                if mode.requires_all() {
                    !wanted.is_empty() && wanted.iter().all(|term| present.contains(term))
                } else {
                    wanted.iter().any(|term| present.contains(term))
                }
            })
        }
        Predicate::Regexp {
            predicate,
            pattern,
            case_insensitive,
        } => {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(*case_insensitive)
                .build()
                .map_err(|err| StoreError::InvalidRegex {
                    pattern: pattern.clone(),
                    message: err.to_string(),
                })?;
            scalar_values(entity, predicate)
                .into_iter()
                .any(|candidate| candidate.as_str().is_some_and(|text| regex.is_match(text)))
        }
        Predicate::Edge { predicate, filter } => {
            for uid in entity.edges(predicate) {
                if let Some(target) = graph.get(uid) {
                    if matches(graph, target, filter)? {
                        return Ok(true);
                    }
                }
            }
            false
        }
        Predicate::And(operands) => {
            for operand in operands {
                if !matches(graph, entity, operand)? {
                    return Ok(false);
                }
            }
            true
        }
        Predicate::Or(operands) => {
            for operand in operands {
                if matches(graph, entity, operand)? {
                    return Ok(true);
                }
            }
            false
        }
        Predicate::Not(operand) => !matches(graph, entity, operand)?,
    };

    Ok(matched)
}

/// Scalar lists match when any of their elements does.
fn scalar_values<'a>(entity: &'a Entity, predicate: &str) -> Vec<&'a Value> {
    match entity.scalar(predicate) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    }
}

fn compare(candidate: &Value, op: CompareOp, value: &Value) -> bool {
    let Some(ordering) = compare_values(candidate, value) else {
        return false;
    };
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

pub(crate) fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (Value::Bool(left), Value::Bool(right)) => Some(left.cmp(right)),
        _ => None,
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
