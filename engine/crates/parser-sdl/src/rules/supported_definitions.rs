use async_graphql_parser::{
    types::{DirectiveDefinition, SchemaDefinition, TypeDefinition, TypeKind},
    Positioned,
};

use super::visitor::{Visitor, VisitorContext};

/// Only object, interface and enum definitions can be stored. Everything else in a document is
/// either built in or generated.
pub struct SupportedDefinitionsVisitor;

impl<'a> Visitor<'a> for SupportedDefinitionsVisitor {
    fn enter_schema(&mut self, ctx: &mut VisitorContext<'a>, schema: &'a Positioned<SchemaDefinition>) {
        ctx.report_error(
            vec![schema.pos],
            "Schema definitions are not supported, the root operation types are generated.",
        );
    }

    fn enter_directive_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        definition: &'a Positioned<DirectiveDefinition>,
    ) {
        ctx.report_error(
            vec![definition.pos],
            format!(
                "Directive @{} cannot be declared, only the built-in directives are available.",
                definition.node.name.node
            ),
        );
    }

    fn enter_type_definition(&mut self, ctx: &mut VisitorContext<'a>, ty: &'a Positioned<TypeDefinition>) {
        let name = &ty.node.name.node;

        if ty.node.extend {
            ctx.report_error(
                vec![ty.pos],
                format!("Type extensions are not supported, declare {name} in full instead."),
            );
            return;
        }

        let kind = match &ty.node.kind {
            TypeKind::Object(_) | TypeKind::Interface(_) | TypeKind::Enum(_) => return,
            TypeKind::Scalar => "scalar",
            TypeKind::Union(_) => "union",
            TypeKind::InputObject(_) => "input",
        };

        ctx.report_error(
            vec![ty.pos],
            format!("{name}: {kind} definitions are not supported, only types, interfaces and enums can be declared."),
        );
    }
}
