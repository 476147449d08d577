use async_graphql_parser::{
    types::{BaseType, FieldDefinition, TypeDefinition, TypeKind},
    Positioned,
};

use super::{
    custom_directive::CUSTOM_DIRECTIVE,
    visitor::{Visitor, VisitorContext},
};
use crate::model::SCALARS;

/// Field types must name a built-in scalar or a declared object, interface or enum, wrapped in
/// at most one list.
pub struct TypeReferencesVisitor;

impl<'a> Visitor<'a> for TypeReferencesVisitor {
    fn enter_field(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        field: &'a Positioned<FieldDefinition>,
        parent_type: &'a Positioned<TypeDefinition>,
    ) {
        let type_name = &parent_type.node.name.node;
        let field_name = &field.node.name.node;
        let ty = &field.node.ty;

        let named = match &ty.node.base {
            BaseType::Named(name) => name,
            BaseType::List(item) => match &item.base {
                BaseType::Named(name) => name,
                BaseType::List(_) => {
                    ctx.report_error(
                        vec![ty.pos],
                        format!("Type {type_name}; Field {field_name}: nested lists are not supported."),
                    );
                    return;
                }
            },
        };

        let known = SCALARS.contains(&named.as_str())
            || ctx.types.get(named.as_str()).is_some_and(|target| {
                matches!(
                    target.node.kind,
                    TypeKind::Object(_) | TypeKind::Interface(_) | TypeKind::Enum(_)
                )
            });

        if !known {
            ctx.report_error(
                vec![ty.pos],
                format!("Type {type_name}; Field {field_name}: {named} is not a known type."),
            );
        }

        let is_custom = field
            .node
            .directives
            .iter()
            .any(|directive| directive.node.name.node == CUSTOM_DIRECTIVE);

        if let Some(argument) = field.node.arguments.first().filter(|_| !is_custom) {
            ctx.report_error(
                vec![argument.pos],
                format!(
                    "Type {type_name}; Field {field_name}: arguments are only allowed on @{CUSTOM_DIRECTIVE} fields, arguments of stored fields are generated."
                ),
            );
        }
    }
}
