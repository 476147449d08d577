use std::{collections::BTreeMap, fmt};

/// Operations an `@auth` directive can guard.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthOperation {
    Query,
    Add,
    Update,
    Delete,
    Password,
}

/// A leaf of a rule tree. The template is kept exactly as written in the schema, placeholders
/// (`$NAME`) are only resolved against the caller's claims at request time.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RuleTemplate(String);

impl RuleTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        RuleTemplate(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of the claims this template refers to, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.0.as_str();

        while let Some(start) = rest.find('$') {
            let candidate = &rest[start + 1..];
            let end = candidate
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(candidate.len());
            let name = &candidate[..end];
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
            rest = &candidate[end..];
        }

        names
    }
}

impl fmt::Display for RuleTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Boolean tree compiled from an `@auth` argument.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRuleNode {
    And(Vec<AuthRuleNode>),
    Or(Vec<AuthRuleNode>),
    Not(Box<AuthRuleNode>),
    Leaf(RuleTemplate),
}

impl AuthRuleNode {
    pub fn leaf(template: impl Into<String>) -> Self {
        AuthRuleNode::Leaf(RuleTemplate::new(template))
    }

    pub fn depth(&self) -> usize {
        match self {
            AuthRuleNode::And(children) | AuthRuleNode::Or(children) => {
                1 + children.iter().map(AuthRuleNode::depth).max().unwrap_or(0)
            }
            AuthRuleNode::Not(child) => 1 + child.depth(),
            AuthRuleNode::Leaf(_) => 1,
        }
    }

    /// Conjunction of the given rules. A single rule is returned unmodified.
    pub fn all(mut rules: Vec<AuthRuleNode>) -> Option<AuthRuleNode> {
        match rules.len() {
            0 => None,
            1 => rules.pop(),
            _ => Some(AuthRuleNode::And(rules)),
        }
    }

    pub fn leaves(&self) -> Vec<&RuleTemplate> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a RuleTemplate>) {
        match self {
            AuthRuleNode::And(children) | AuthRuleNode::Or(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
            AuthRuleNode::Not(child) => child.collect_leaves(leaves),
            AuthRuleNode::Leaf(template) => leaves.push(template),
        }
    }
}

/// Effective rule for every (type, operation) pair that has one. A missing entry means the
/// operation is unrestricted.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompiledAuthSchema {
    rules: BTreeMap<String, BTreeMap<AuthOperation, AuthRuleNode>>,
}

impl CompiledAuthSchema {
    pub fn insert(&mut self, type_name: impl Into<String>, operation: AuthOperation, rule: AuthRuleNode) {
        self.rules.entry(type_name.into()).or_default().insert(operation, rule);
    }

    pub fn rule(&self, type_name: &str, operation: AuthOperation) -> Option<&AuthRuleNode> {
        self.rules.get(type_name).and_then(|rules| rules.get(&operation))
    }

    pub fn is_restricted(&self, type_name: &str, operation: AuthOperation) -> bool {
        self.rule(type_name, operation).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AuthOperation, &AuthRuleNode)> + '_ {
        self.rules.iter().flat_map(|(type_name, rules)| {
            rules
                .iter()
                .map(move |(operation, rule)| (type_name.as_str(), *operation, rule))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_collected_once() {
        let template = RuleTemplate::new(
            r#"query($USER: String!) { queryTodo(filter: { owner: { eq: $USER }, or: { editor: { eq: $USER } } }) { id } }"#,
        );

        assert_eq!(template.placeholders(), vec!["USER"]);
    }

    #[test]
    fn all_keeps_a_single_rule_unmodified() {
        let rule = AuthRuleNode::leaf("{ $ROLE: { eq: \"ADMIN\" } }");

        assert_eq!(AuthRuleNode::all(vec![rule.clone()]), Some(rule.clone()));
        assert_eq!(AuthRuleNode::all(vec![]), None);
        assert_eq!(
            AuthRuleNode::all(vec![rule.clone(), rule.clone()]),
            Some(AuthRuleNode::And(vec![rule.clone(), rule]))
        );
    }

    #[test]
    fn depth_counts_combinators() {
        let rule = AuthRuleNode::And(vec![
            AuthRuleNode::leaf("a"),
            AuthRuleNode::Or(vec![
                AuthRuleNode::leaf("b"),
                AuthRuleNode::Not(Box::new(AuthRuleNode::leaf("c"))),
            ]),
        ]);

        assert_eq!(rule.depth(), 4);
        assert_eq!(rule.leaves().len(), 3);
    }

    #[test]
    fn absence_means_unrestricted() {
        let mut compiled = CompiledAuthSchema::default();
        compiled.insert("Todo", AuthOperation::Query, AuthRuleNode::leaf("x"));

        assert!(compiled.is_restricted("Todo", AuthOperation::Query));
        assert!(!compiled.is_restricted("Todo", AuthOperation::Delete));
        assert!(!compiled.is_restricted("User", AuthOperation::Query));
    }
}
