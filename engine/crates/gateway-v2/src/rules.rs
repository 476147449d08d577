//! Evaluation of compiled rule trees against the claims of one request.
//!
//! Leaves are resolved to predicates: RBAC leaves become constants, query leaves have their
//! `$CLAIM` variables substituted and are lowered like any caller filter. A leaf referring to a
//! claim the caller does not have is false.

use async_graphql_value::ConstValue;
use common_types::{
    auth::{AuthRuleNode, RuleTemplate},
    Claims,
};
use parser_sdl::{
    auth::{GraphqlRule, RbacOperator, RbacRule, RuleLeaf, RuleSelection},
    model::{ObjectType, Schema},
};
use regex::RegexBuilder;
use runtime::Predicate;
use serde_json::Value;

use crate::{filter, snapshot::SchemaSnapshot};

const TYPENAME_FIELD: &str = "__typename";

pub(crate) fn lower(snapshot: &SchemaSnapshot, rule: &AuthRuleNode, claims: &Claims) -> Predicate {
    match rule {
        AuthRuleNode::And(children) => Predicate::and(children.iter().map(|child| lower(snapshot, child, claims))),
        AuthRuleNode::Or(children) => Predicate::or(children.iter().map(|child| lower(snapshot, child, claims))),
        AuthRuleNode::Not(child) => Predicate::negate(lower(snapshot, child, claims)),
        AuthRuleNode::Leaf(template) => lower_leaf(snapshot, template, claims),
    }
}

fn lower_leaf(snapshot: &SchemaSnapshot, template: &RuleTemplate, claims: &Claims) -> Predicate {
    let Some(leaf) = snapshot.leaves.get(template.as_str()) else {
        tracing::warn!(rule = %template, "unparsed rule template");
        return Predicate::False;
    };

    match leaf {
        RuleLeaf::Rbac(rule) => {
            if rbac(rule, claims) {
                Predicate::True
            } else {
                Predicate::False
            }
        }
        RuleLeaf::Graphql(rule) => graphql(&snapshot.schema, rule, claims).unwrap_or_else(|reason| {
            tracing::debug!(rule = %template, "rule evaluates to false: {reason}");
            Predicate::False
        }),
    }
}

/// A list claim satisfies the rule when any of its elements does.
fn rbac(rule: &RbacRule, claims: &Claims) -> bool {
    let Some(claim) = claims.get(&rule.claim) else {
        return false;
    };
    let Ok(expected) = rule.value.clone().into_json() else {
        return false;
    };

    let candidates: Vec<&Value> = match claim {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    match rule.operator {
        RbacOperator::Eq => candidates.iter().any(|candidate| **candidate == expected),
        RbacOperator::In => expected
            .as_array()
            .is_some_and(|allowed| candidates.iter().any(|candidate| allowed.contains(*candidate))),
        RbacOperator::Regexp => {
            let Some(regex) = expected
                .as_str()
                .and_then(|literal| filter::regexp(literal).ok())
                .and_then(|(pattern, case_insensitive)| {
                    RegexBuilder::new(&pattern).case_insensitive(case_insensitive).build().ok()
                })
            else {
                return false;
            };
            candidates
                .iter()
                .any(|candidate| candidate.as_str().is_some_and(|text| regex.is_match(text)))
        }
    }
}

fn graphql(schema: &Schema, rule: &GraphqlRule, claims: &Claims) -> Result<Predicate, String> {
    let ty = schema
        .get(&rule.type_name)
        .ok_or_else(|| format!("unknown type {}", rule.type_name))?;

    lower_selection(schema, ty, &rule.selection, claims)
}

/// Rule queries cascade: every selected field must be present, every selected edge must lead to
/// at least one matching entity.
fn lower_selection(
    schema: &Schema,
    ty: &ObjectType,
    selection: &RuleSelection,
    claims: &Claims,
) -> Result<Predicate, String> {
    let mut operands = Vec::with_capacity(selection.children.len() + 1);

    if let Some(raw) = &selection.filter {
        let value = substitute(raw.clone(), claims)?
            .into_json()
            .map_err(|err| err.to_string())?;
        operands.push(filter::lower(schema, ty, &value).map_err(|err| err.to_string())?);
    }

    for child in &selection.children {
        if child.field == TYPENAME_FIELD {
            continue;
        }
        let field = ty
            .field(&child.field)
            .ok_or_else(|| format!("{} is not a field of {}", child.field, ty.name))?;

        if field.is_id() {
            continue;
        }

        operands.push(match schema.get(&field.ty.name) {
            Some(target) => Predicate::Edge {
                predicate: field.predicate.clone(),
                filter: Box::new(lower_selection(schema, target, child, claims)?),
            },
            None => Predicate::Has(field.predicate.clone()),
        });
    }

    Ok(Predicate::and(operands))
}

fn substitute(value: async_graphql_value::Value, claims: &Claims) -> Result<ConstValue, String> {
    value.into_const_with(|name| {
        claims
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| format!("missing claim {name}"))
            .and_then(|claim| ConstValue::from_json(claim).map_err(|err| err.to_string()))
    })
}
