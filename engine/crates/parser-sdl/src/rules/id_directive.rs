use itertools::Itertools;

use super::{directive::Directive, visitor::RuleError};
use crate::{
    model::{FieldClass, Schema},
    registry::search::FieldFilter,
};

pub const ID_DIRECTIVE: &str = "id";

/// Marks an external identifier: values are unique among entities of the type, or among every
/// implementer of the declaring interface with `interface: true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdDirective {
    #[serde(default)]
    pub interface: bool,
}

impl Directive for IdDirective {
    fn definition() -> String {
        format!("directive @{ID_DIRECTIVE}(interface: Boolean) on FIELD_DEFINITION")
    }
}

pub(crate) fn validate(schema: &Schema) -> Vec<RuleError> {
    let mut errors = Vec::new();

    for ty in schema.types.values() {
        let id_fields = ty.fields.iter().filter(|field| field.is_id()).collect_vec();
        if id_fields.len() > 1 && id_fields.iter().any(|field| field.owner == ty.name) {
            errors.push(RuleError::new(
                id_fields.iter().map(|field| field.pos).collect(),
                format!(
                    "Type {}: has more than one field of type ID: {}. A type can have at most one.",
                    ty.name,
                    id_fields.iter().map(|field| &field.name).join(", ")
                ),
            ));
        }

        for field in ty.fields.iter().filter(|field| field.owner == ty.name) {
            if field.is_id() && field.ty.is_list() {
                errors.push(RuleError::at(
                    field.pos,
                    format!("Type {}; Field {}: fields of type ID can't be lists.", ty.name, field.name),
                ));
            }

            if field.is_xid() {
                let class = schema.classify(&field.ty);
                let allowed = matches!(class, FieldClass::String | FieldClass::Int | FieldClass::Int64);
                if !allowed || field.ty.is_list() {
                    errors.push(RuleError::at(
                        field.pos,
                        format!(
                            "Type {}; Field {}: with @{ID_DIRECTIVE} directive must be of type String, Int or Int64, not {}.",
                            ty.name, field.name, field.ty
                        ),
                    ));
                }
            }
        }

        // Fields sharing the same capability would generate the same lookup twice.
        let xids = ty
            .xid_fields()
            .filter(|field| !field.ty.is_list())
            .filter_map(|field| FieldFilter::for_field(schema, field).map(|filter| (field, filter.name)))
            .collect_vec();

        for (index, (field, capability)) in xids.iter().enumerate() {
            let Some((previous, _)) = xids[..index].iter().find(|(_, other)| other == capability) else {
                continue;
            };
            // reported once, on the type declaring one of the two fields
            if field.owner == ty.name || previous.owner == ty.name {
                errors.push(RuleError::new(
                    vec![previous.pos, field.pos],
                    format!(
                        "Type {}: fields {} and {} both carry @{ID_DIRECTIVE} with the same index capability ({capability}). Only one @{ID_DIRECTIVE} field per capability is allowed.",
                        ty.name, previous.name, field.name
                    ),
                ));
            }
        }
    }

    errors
}
