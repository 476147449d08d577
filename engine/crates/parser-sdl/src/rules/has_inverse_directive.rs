use super::{directive::Directive, visitor::RuleError};
use crate::model::{FieldClass, Schema};

pub const HAS_INVERSE_DIRECTIVE: &str = "hasInverse";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HasInverseDirective {
    pub field: String,
}

impl Directive for HasInverseDirective {
    fn definition() -> String {
        format!("directive @{HAS_INVERSE_DIRECTIVE}(field: String!) on FIELD_DEFINITION")
    }
}

pub(crate) fn validate(schema: &Schema) -> Vec<RuleError> {
    let mut errors = Vec::new();

    for ty in schema.types.values() {
        for field in ty.fields.iter().filter(|field| field.owner == ty.name) {
            let Some(inverse) = field.has_inverse() else {
                continue;
            };
            let prefix = format!("Type {}; Field {}:", ty.name, field.name);

            if schema.classify(&field.ty) != FieldClass::Object {
                errors.push(RuleError::at(
                    field.pos,
                    format!(
                        "{prefix} Field {} is of type {}, but @{HAS_INVERSE_DIRECTIVE} only applies to fields with object types.",
                        field.name, field.ty.name
                    ),
                ));
                continue;
            }

            let Some(target) = schema.get(&field.ty.name).and_then(|target| target.field(inverse)) else {
                errors.push(RuleError::at(
                    field.pos,
                    format!("{prefix} inverse field {inverse} doesn't exist for type {}.", field.ty.name),
                ));
                continue;
            };

            let links_back = target.ty.name == ty.name
                || schema
                    .ancestors(&ty.name)
                    .iter()
                    .any(|ancestor| ancestor.name == target.ty.name);

            if !links_back {
                errors.push(RuleError::new(
                    vec![field.pos, target.pos],
                    format!(
                        "{prefix} @{HAS_INVERSE_DIRECTIVE} is required to link the fields of same type, but the field {inverse} is of the type {} instead of {}.",
                        target.ty.name, ty.name
                    ),
                ));
            }
        }
    }

    errors
}
