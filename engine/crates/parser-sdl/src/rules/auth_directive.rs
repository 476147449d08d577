use common_types::auth::AuthOperation;

use super::{directive::Directive, visitor::RuleError};
use crate::model::Schema;

pub const AUTH_DIRECTIVE: &str = "auth";

/// The raw rule trees of an `@auth` directive. Their shape is checked when compiling them.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthDirective {
    pub query: Option<serde_json::Value>,
    pub add: Option<serde_json::Value>,
    pub update: Option<serde_json::Value>,
    pub delete: Option<serde_json::Value>,
    pub password: Option<serde_json::Value>,
}

impl AuthDirective {
    pub fn rules(&self) -> impl Iterator<Item = (AuthOperation, &serde_json::Value)> + '_ {
        [
            (AuthOperation::Query, &self.query),
            (AuthOperation::Add, &self.add),
            (AuthOperation::Update, &self.update),
            (AuthOperation::Delete, &self.delete),
            (AuthOperation::Password, &self.password),
        ]
        .into_iter()
        .filter_map(|(operation, rule)| rule.as_ref().map(|rule| (operation, rule)))
    }
}

impl Directive for AuthDirective {
    fn definition() -> String {
        format!(
            r"directive @{AUTH_DIRECTIVE}(
	password: AuthRule,
	query: AuthRule,
	add: AuthRule,
	update: AuthRule,
	delete: AuthRule) on OBJECT | INTERFACE"
        )
    }
}

pub(crate) fn validate(schema: &Schema) -> Vec<RuleError> {
    schema
        .types
        .values()
        .filter(|ty| ty.is_remote())
        .filter_map(|ty| {
            ty.auth().map(|(pos, _)| {
                RuleError::at(
                    pos,
                    format!(
                        "Type {}: @{AUTH_DIRECTIVE} is not allowed on @remote types, they are never stored.",
                        ty.name
                    ),
                )
            })
        })
        .collect()
}
