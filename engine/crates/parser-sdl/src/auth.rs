//! Compilation of `@auth` directives into one rule tree per type and operation.

use std::{collections::HashMap, sync::LazyLock};

use async_graphql_parser::{
    parse_query,
    types::{DocumentOperations, Selection, SelectionSet},
    Positioned,
};
use async_graphql_value::{ConstValue, Value};
use common_types::auth::{AuthOperation, AuthRuleNode, CompiledAuthSchema};
use regex::Regex;
use strum::IntoEnumIterator;

use crate::{
    model::{ObjectType, Schema},
    registry::names::MetaNames,
    rules::{auth_directive::AUTH_DIRECTIVE, visitor::RuleError},
};

pub const MAX_RULE_DEPTH: usize = 32;

const TYPENAME_FIELD: &str = "__typename";

static RBAC_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*\{\s*\$(\w+)\s*:\s*\{\s*(eq|in|regexp)\s*:\s*(.+?)\s*\}\s*\}\s*$").unwrap()
});

/// A parsed rule template.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleLeaf {
    /// `{ $ROLE: { eq: "ADMIN" } }`, checked against the claims alone.
    Rbac(RbacRule),
    /// `query($USER: String!) { queryTodo(filter: ...) { id } }`, checked against the data.
    Graphql(GraphqlRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RbacOperator {
    Eq,
    In,
    Regexp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RbacRule {
    pub claim: String,
    pub operator: RbacOperator,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlRule {
    /// The type named by the root `query<Type>` field.
    pub type_name: String,
    pub selection: RuleSelection,
}

/// A field of a rule query. Every nested selection must match at least one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSelection {
    pub field: String,
    pub filter: Option<Value>,
    pub children: Vec<RuleSelection>,
}

impl RuleLeaf {
    pub fn parse(template: &str) -> Result<Self, String> {
        if let Some(captures) = RBAC_RULE.captures(template) {
            let operator = captures[2]
                .parse()
                .map_err(|_| format!("unknown operator {}", &captures[2]))?;
            return Ok(RuleLeaf::Rbac(RbacRule {
                claim: captures[1].to_string(),
                operator,
                value: parse_literal(&captures[3])?,
            }));
        }

        let document = parse_query(template).map_err(|err| format!("unable to parse rule: {err}"))?;
        if !document.fragments.is_empty() {
            return Err("fragments are not supported in rules".to_string());
        }
        let operation = match document.operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(_) => return Err("a rule must contain a single query".to_string()),
        };

        let mut roots = selections(&operation.node.selection_set)?;
        let root = match (roots.pop(), roots.is_empty()) {
            (Some(root), true) => root,
            _ => return Err("a rule must select a single root field".to_string()),
        };
        let type_name = root
            .field
            .strip_prefix("query")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| format!("{} is not a query<Type> field", root.field))?
            .to_string();

        Ok(RuleLeaf::Graphql(GraphqlRule {
            type_name,
            selection: root,
        }))
    }
}

/// `in` values are lists; everything else a single literal.
fn parse_literal(literal: &str) -> Result<ConstValue, String> {
    let document =
        parse_query(format!("{{ rule(value: {literal}) }}")).map_err(|_| format!("{literal} is not a valid value"))?;

    let DocumentOperations::Single(operation) = document.operations else {
        return Err(format!("{literal} is not a valid value"));
    };

    operation
        .node
        .selection_set
        .node
        .items
        .into_iter()
        .find_map(|selection| match selection.node {
            Selection::Field(field) => field.node.get_argument("value").cloned(),
            _ => None,
        })
        .and_then(|value| value.node.into_const())
        .ok_or_else(|| format!("{literal} must be a constant value"))
}

fn selections(set: &Positioned<SelectionSet>) -> Result<Vec<RuleSelection>, String> {
    set.node
        .items
        .iter()
        .map(|selection| match &selection.node {
            Selection::Field(field) => Ok(RuleSelection {
                field: field.node.name.node.to_string(),
                filter: field.node.get_argument("filter").map(|filter| filter.node.clone()),
                children: selections(&field.node.selection_set)?,
            }),
            _ => Err("fragments are not supported in rules".to_string()),
        })
        .collect()
}

fn parse_node(value: &serde_json::Value, depth: usize) -> Result<AuthRuleNode, String> {
    if depth > MAX_RULE_DEPTH {
        return Err(format!("rules cannot be nested more than {MAX_RULE_DEPTH} levels deep"));
    }

    let object = match value.as_object() {
        Some(object) if object.len() == 1 => object,
        _ => return Err("a rule must have exactly one of and, or, not or rule".to_string()),
    };

    let children = |value: &serde_json::Value| -> Result<Vec<AuthRuleNode>, String> {
        value
            .as_array()
            .filter(|rules| !rules.is_empty())
            .ok_or_else(|| "and/or take a non-empty list of rules".to_string())?
            .iter()
            .map(|child| parse_node(child, depth + 1))
            .collect()
    };

    match object.iter().next() {
        Some((key, value)) => match key.as_str() {
            "and" => Ok(AuthRuleNode::And(children(value)?)),
            "or" => Ok(AuthRuleNode::Or(children(value)?)),
            "not" => Ok(AuthRuleNode::Not(Box::new(parse_node(value, depth + 1)?))),
            "rule" => value
                .as_str()
                .map(AuthRuleNode::leaf)
                .ok_or_else(|| "rule must be a string".to_string()),
            other => Err(format!("unknown rule combinator {other}")),
        },
        None => Err("a rule must have exactly one of and, or, not or rule".to_string()),
    }
}

/// Rule queries target the annotated type and may only select its fields.
fn check_leaf(schema: &Schema, ty: &ObjectType, template: &str) -> Result<(), String> {
    let RuleLeaf::Graphql(rule) = RuleLeaf::parse(template)? else {
        return Ok(());
    };

    if rule.type_name != ty.name {
        return Err(format!(
            "the rule query must select {}, not {}",
            MetaNames::query_collection(&ty.name),
            rule.selection.field
        ));
    }

    check_selections(schema, ty, &rule.selection.children)
}

fn check_selections(schema: &Schema, ty: &ObjectType, selections: &[RuleSelection]) -> Result<(), String> {
    for selection in selections.iter().filter(|selection| selection.field != TYPENAME_FIELD) {
        let field = ty
            .field(&selection.field)
            .ok_or_else(|| format!("{} is not a field of {}", selection.field, ty.name))?;

        match schema.get(&field.ty.name) {
            Some(target) => check_selections(schema, target, &selection.children)?,
            None if !selection.children.is_empty() => {
                return Err(format!("{}.{} has no fields to select", ty.name, field.name));
            }
            None => {}
        }
    }
    Ok(())
}

/// Rules of interfaces are and-ed into the rules of their implementers, interface rules first.
pub(crate) fn compile(schema: &Schema) -> Result<CompiledAuthSchema, Vec<RuleError>> {
    let mut errors = Vec::new();
    let mut declared: HashMap<&str, HashMap<AuthOperation, AuthRuleNode>> = HashMap::new();

    for ty in schema.stored_types() {
        let Some((pos, auth)) = ty.auth() else { continue };

        for (operation, raw) in auth.rules() {
            let compiled = parse_node(raw, 1).and_then(|node| {
                for leaf in node.leaves() {
                    check_leaf(schema, ty, leaf.as_str())?;
                }
                Ok(node)
            });

            match compiled {
                Ok(node) => {
                    declared.entry(ty.name.as_str()).or_default().insert(operation, node);
                }
                Err(message) => errors.push(RuleError::at(
                    pos,
                    format!("Type {}: @{AUTH_DIRECTIVE}: failed to validate {operation} rule: {message}", ty.name),
                )),
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut compiled = CompiledAuthSchema::default();
    for ty in schema.stored_types() {
        let lineage: Vec<&str> = schema
            .ancestors(&ty.name)
            .into_iter()
            .rev()
            .map(|ancestor| ancestor.name.as_str())
            .chain(std::iter::once(ty.name.as_str()))
            .collect();

        for operation in AuthOperation::iter() {
            let rules = lineage
                .iter()
                .filter_map(|name| declared.get(name).and_then(|rules| rules.get(&operation)))
                .cloned()
                .collect();

            if let Some(rule) = AuthRuleNode::all(rules) {
                tracing::trace!(type_name = %ty.name, %operation, depth = rule.depth(), "compiled auth rule");
                compiled.insert(ty.name.as_str(), operation, rule);
            }
        }
    }

    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn rbac_leaves() {
        let leaf = RuleLeaf::parse(r#"{ $ROLE: { eq: "ADMIN" } }"#).unwrap();
        assert_eq!(
            leaf,
            RuleLeaf::Rbac(RbacRule {
                claim: "ROLE".to_string(),
                operator: RbacOperator::Eq,
                value: ConstValue::String("ADMIN".to_string()),
            })
        );

        let leaf = RuleLeaf::parse(r#"{ $ROLE: { in: ["ADMIN", "USER"] } }"#).unwrap();
        assert_matches!(leaf, RuleLeaf::Rbac(RbacRule { operator: RbacOperator::In, value: ConstValue::List(values), .. }) if values.len() == 2);
    }

    #[test]
    fn graphql_leaves() {
        let leaf = RuleLeaf::parse(
            r#"query($USER: String!) {
                queryTodo(filter: { owner: { eq: $USER } }) {
                    id
                    project { members(filter: { name: { eq: $USER } }) { name } }
                }
            }"#,
        )
        .unwrap();

        let RuleLeaf::Graphql(rule) = leaf else {
            unreachable!("expected a graphql rule")
        };
        assert_eq!(rule.type_name, "Todo");
        assert_eq!(rule.selection.field, "queryTodo");
        assert!(rule.selection.filter.is_some());
        assert_eq!(rule.selection.children.len(), 2);
        assert_eq!(rule.selection.children[1].children[0].field, "members");
    }

    #[test]
    fn malformed_leaves() {
        assert_eq!(
            RuleLeaf::parse("query { queryTodo { id } queryUser { id } }").unwrap_err(),
            "a rule must select a single root field"
        );
        assert_eq!(
            RuleLeaf::parse("query { getTodo(id: 1) { id } }").unwrap_err(),
            "getTodo is not a query<Type> field"
        );
        assert!(RuleLeaf::parse("{ $ROLE: { eq: } }").is_err());
    }

    #[test]
    fn tree_shapes() {
        let node = parse_node(
            &serde_json::json!({ "and": [{ "rule": "a" }, { "or": [{ "rule": "b" }, { "not": { "rule": "c" } }] }] }),
            1,
        )
        .unwrap();
        assert_eq!(
            node,
            AuthRuleNode::And(vec![
                AuthRuleNode::leaf("a"),
                AuthRuleNode::Or(vec![
                    AuthRuleNode::leaf("b"),
                    AuthRuleNode::Not(Box::new(AuthRuleNode::leaf("c")))
                ]),
            ])
        );

        assert!(parse_node(&serde_json::json!({ "rule": "a", "not": { "rule": "b" } }), 1).is_err());
        assert!(parse_node(&serde_json::json!({ "rule": 1 }), 1).is_err());
        assert!(parse_node(&serde_json::json!({ "and": [] }), 1).is_err());

        let mut deep = serde_json::json!({ "rule": "a" });
        for _ in 0..MAX_RULE_DEPTH {
            deep = serde_json::json!({ "not": deep });
        }
        assert_eq!(
            parse_node(&deep, 1).unwrap_err(),
            format!("rules cannot be nested more than {MAX_RULE_DEPTH} levels deep")
        );
    }
}
