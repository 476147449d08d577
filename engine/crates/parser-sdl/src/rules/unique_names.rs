use std::collections::HashSet;

use async_graphql_parser::{
    types::{ServiceDocument, TypeDefinition, TypeKind, TypeSystemDefinition},
    Positioned,
};

use super::visitor::{Visitor, VisitorContext, MUTATION_TYPE, QUERY_TYPE, SUBSCRIPTION_TYPE};
use crate::{model::SCALARS, registry::builtins};

/// Type names must be unique, and so must field names and enum values within a type. Names
/// used by the root operation types and the built-in definitions are reserved.
pub struct UniqueNamesVisitor;

impl<'a> Visitor<'a> for UniqueNamesVisitor {
    fn enter_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ServiceDocument) {
        let mut seen = HashSet::new();

        for definition in &doc.definitions {
            let TypeSystemDefinition::Type(ty) = definition else {
                continue;
            };
            let name = ty.node.name.node.as_str();

            if !seen.insert(name) {
                ctx.report_error(
                    vec![ty.node.name.pos],
                    format!("Type '{name}' cannot be defined multiple times."),
                );
            }

            if [QUERY_TYPE, MUTATION_TYPE, SUBSCRIPTION_TYPE].contains(&name) {
                ctx.report_error(
                    vec![ty.node.name.pos],
                    format!("{name} is a reserved type name, its fields are generated from the other types."),
                );
            } else if SCALARS.contains(&name) || builtins::is_reserved(name) {
                ctx.report_error(
                    vec![ty.node.name.pos],
                    format!("{name} is a reserved type name, it is part of the built-in definitions."),
                );
            }
        }
    }

    fn enter_type_definition(&mut self, ctx: &mut VisitorContext<'a>, ty: &'a Positioned<TypeDefinition>) {
        let names = match &ty.node.kind {
            TypeKind::Object(object) => object.fields.iter().map(|field| &field.node.name).collect::<Vec<_>>(),
            TypeKind::Interface(interface) => interface.fields.iter().map(|field| &field.node.name).collect(),
            TypeKind::Enum(enum_type) => enum_type.values.iter().map(|value| &value.node.value).collect(),
            _ => return,
        };

        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.node.as_str()) {
                let what = if matches!(ty.node.kind, TypeKind::Enum(_)) {
                    "Enum value"
                } else {
                    "Field"
                };
                ctx.report_error(
                    vec![name.pos],
                    format!("{what} '{}' cannot be defined multiple times.", name.node),
                );
            }
        }
    }
}
