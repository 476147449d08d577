use super::{directive::Directive, visitor::RuleError};
use crate::model::Schema;

pub const SECRET_DIRECTIVE: &str = "secret";

/// A write-only password field. It never appears in the type itself, only in its inputs and in
/// the `check<Type>Password` query.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretDirective {
    pub field: String,
    pub pred: Option<String>,
}

impl Directive for SecretDirective {
    fn definition() -> String {
        format!("directive @{SECRET_DIRECTIVE}(field: String!, pred: String) on OBJECT | INTERFACE")
    }
}

pub(crate) fn validate(schema: &Schema) -> Vec<RuleError> {
    let mut errors = Vec::new();

    for ty in schema.types.values() {
        let Some(secret) = ty.secret() else {
            continue;
        };

        if let Some(existing) = ty.field(&secret.field) {
            errors.push(RuleError::new(
                vec![ty.pos, existing.pos],
                format!(
                    "Type {}: @{SECRET_DIRECTIVE}(field: {}) clashes with the field {}.{}.",
                    ty.name, secret.field, existing.owner, existing.name
                ),
            ));
        }

        if secret.field.is_empty() || !secret.field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.push(RuleError::at(
                ty.pos,
                format!("Type {}: @{SECRET_DIRECTIVE} field name {:?} is not a valid field name.", ty.name, secret.field),
            ));
        }
    }

    errors
}
