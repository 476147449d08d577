//! Lowering of generated `TFilter` inputs to storage predicates.

use parser_sdl::{
    model::{ObjectType, Schema},
    registry::{
        names::{
            INPUT_FIELD_AND, INPUT_FIELD_HAS, INPUT_FIELD_ID, INPUT_FIELD_NOT, INPUT_FIELD_OR, INPUT_FIELD_RANGE_MAX,
            INPUT_FIELD_RANGE_MIN,
        },
        search::{FieldFilter, FilterOperator},
    },
};
use runtime::{CompareOp, Predicate, TermMatch, Uid};
use serde_json::Value;

use crate::{Error, Result};

/// `null` filters match everything.
pub(crate) fn lower(schema: &Schema, ty: &ObjectType, filter: &Value) -> Result<Predicate> {
    let object = match filter {
        Value::Null => return Ok(Predicate::True),
        Value::Object(object) => object,
        other => return Err(Error::invalid_filter(&ty.name, format!("expected an object, got {other}"))),
    };

    let mut operands = Vec::with_capacity(object.len());
    for (key, value) in object {
        let operand = match key.as_str() {
            INPUT_FIELD_ID => Predicate::Uid(uids(ty, value)?),
            INPUT_FIELD_HAS => Predicate::and(
                one_or_many(value)
                    .map(|name| has(ty, name))
                    .collect::<Result<Vec<_>>>()?,
            ),
            INPUT_FIELD_AND => Predicate::and(
                one_or_many(value)
                    .map(|nested| lower(schema, ty, nested))
                    .collect::<Result<Vec<_>>>()?,
            ),
            INPUT_FIELD_OR => Predicate::or(
                one_or_many(value)
                    .map(|nested| lower(schema, ty, nested))
                    .collect::<Result<Vec<_>>>()?,
            ),
            INPUT_FIELD_NOT => Predicate::negate(lower(schema, ty, value)?),
            field => lower_field(schema, ty, field, value)?,
        };
        operands.push(operand);
    }

    Ok(Predicate::and(operands))
}

/// Lists and single values are interchangeable in filter inputs.
fn one_or_many(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Null => Box::new(std::iter::empty()),
        other => Box::new(std::iter::once(other)),
    }
}

pub(crate) fn uids(ty: &ObjectType, value: &Value) -> Result<Vec<Uid>> {
    one_or_many(value)
        .map(|id| {
            id.as_str()
                .and_then(|id| id.parse().ok())
                .ok_or_else(|| Error::invalid_filter(&ty.name, format!("{id} is not a valid id")))
        })
        .collect()
}

fn has(ty: &ObjectType, name: &Value) -> Result<Predicate> {
    let field = name
        .as_str()
        .and_then(|name| ty.field(name))
        .filter(|field| !field.is_id() && !field.is_custom())
        .ok_or_else(|| Error::invalid_filter(&ty.name, format!("{name} is not a field of {}", ty.name)))?;

    Ok(Predicate::Has(field.predicate.clone()))
}

fn lower_field(schema: &Schema, ty: &ObjectType, name: &str, value: &Value) -> Result<Predicate> {
    let field = ty
        .field(name)
        .ok_or_else(|| Error::invalid_filter(&ty.name, format!("{name} is not a field of {}", ty.name)))?;

    let filter = FieldFilter::for_field(schema, field)
        .ok_or_else(|| Error::invalid_filter(&ty.name, format!("{}.{name} is not searchable", ty.name)))?;

    if filter.is_boolean() {
        return match value {
            Value::Bool(_) => Ok(Predicate::eq(field.predicate.clone(), value.clone())),
            Value::Null => Ok(Predicate::True),
            other => Err(Error::invalid_filter(&ty.name, format!("{name} expects a Boolean, got {other}"))),
        };
    }

    let Value::Object(operators) = value else {
        return Err(Error::invalid_filter(
            &ty.name,
            format!("{name} expects a {} input", filter.name),
        ));
    };

    let mut operands = Vec::with_capacity(operators.len());
    for (operator, argument) in operators {
        let operator = operator
            .parse::<FilterOperator>()
            .ok()
            .filter(|operator| filter.operators.contains(operator))
            .ok_or_else(|| {
                Error::invalid_filter(&ty.name, format!("{operator} is not supported by {}", filter.name))
            })?;

        operands.push(
            lower_operator(&field.predicate, operator, argument)
                .map_err(|message| Error::invalid_filter(&ty.name, format!("{name}.{operator}: {message}")))?,
        );
    }

    Ok(Predicate::and(operands))
}

fn lower_operator(predicate: &str, operator: FilterOperator, argument: &Value) -> Result<Predicate, String> {
    let compare = |op| Predicate::Compare {
        predicate: predicate.to_string(),
        op,
        value: argument.clone(),
    };
    let terms = |mode| -> Result<Predicate, String> {
        Ok(Predicate::Terms {
            predicate: predicate.to_string(),
            terms: argument.as_str().ok_or("expected a string")?.to_string(),
            mode,
        })
    };

    if argument.is_null() {
        return Err("expected a value".to_string());
    }

    Ok(match operator {
        FilterOperator::Eq => compare(CompareOp::Eq),
        FilterOperator::Le => compare(CompareOp::Le),
        FilterOperator::Lt => compare(CompareOp::Lt),
        FilterOperator::Ge => compare(CompareOp::Ge),
        FilterOperator::Gt => compare(CompareOp::Gt),
        FilterOperator::In => Predicate::In {
            predicate: predicate.to_string(),
            values: one_or_many(argument).cloned().collect(),
        },
        FilterOperator::Between => {
            let bound = |name: &str| {
                argument
                    .get(name)
                    .filter(|value| !value.is_null())
                    .cloned()
                    .ok_or_else(|| format!("missing {name}"))
            };
            Predicate::Between {
                predicate: predicate.to_string(),
                min: bound(INPUT_FIELD_RANGE_MIN)?,
                max: bound(INPUT_FIELD_RANGE_MAX)?,
            }
        }
        FilterOperator::AllOfTerms => terms(TermMatch::AllOfTerms)?,
        FilterOperator::AnyOfTerms => terms(TermMatch::AnyOfTerms)?,
        FilterOperator::AllOfText => terms(TermMatch::AllOfText)?,
        FilterOperator::AnyOfText => terms(TermMatch::AnyOfText)?,
        FilterOperator::Regexp => {
            let (pattern, case_insensitive) = regexp(argument.as_str().ok_or("expected a string")?)?;
            Predicate::Regexp {
                predicate: predicate.to_string(),
                pattern,
                case_insensitive,
            }
        }
    })
}

/// `/pattern/` or `/pattern/i`.
pub(crate) fn regexp(literal: &str) -> Result<(String, bool), String> {
    let invalid = || format!("{literal} is not a /pattern/ or /pattern/i regular expression");

    let body = literal.strip_prefix('/').ok_or_else(invalid)?;
    let end = body.rfind('/').ok_or_else(invalid)?;
    let case_insensitive = match &body[end + 1..] {
        "" => false,
        "i" => true,
        _ => return Err(invalid()),
    };

    Ok((body[..end].to_string(), case_insensitive))
}
