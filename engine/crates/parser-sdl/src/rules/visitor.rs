mod cons;
mod context;
mod error;
mod nil;
mod r#trait;

use async_graphql_parser::{
    types::{ConstDirective, FieldDefinition, ServiceDocument, TypeDefinition, TypeKind, TypeSystemDefinition},
    Positioned,
};

pub(crate) use self::{
    cons::VisitorCons,
    context::{DirectiveOwner, VisitorContext},
    nil::VisitorNil,
    r#trait::Visitor,
};
pub use error::RuleError;

pub const QUERY_TYPE: &str = "Query";
pub const MUTATION_TYPE: &str = "Mutation";
pub const SUBSCRIPTION_TYPE: &str = "Subscription";

/// What a directive is attached to.
#[derive(Clone, Copy)]
pub(crate) enum DirectiveTarget<'a> {
    Type(&'a Positioned<TypeDefinition>),
    Field(&'a Positioned<TypeDefinition>, &'a Positioned<FieldDefinition>),
    /// Enum values, arguments and input fields. Nothing we know of may be placed there.
    Other,
}

pub(crate) fn visit<'a, V: Visitor<'a>>(v: &mut V, ctx: &mut VisitorContext<'a>, doc: &'a ServiceDocument) {
    v.enter_document(ctx, doc);

    for definition in &doc.definitions {
        match definition {
            TypeSystemDefinition::Type(ty) => {
                v.enter_type_definition(ctx, ty);
                visit_directives(v, ctx, &ty.node.directives, DirectiveTarget::Type(ty));

                match &ty.node.kind {
                    TypeKind::Object(object) => {
                        for field in &object.fields {
                            visit_field(v, ctx, field, ty);
                        }
                    }
                    TypeKind::Interface(interface) => {
                        for field in &interface.fields {
                            visit_field(v, ctx, field, ty);
                        }
                    }
                    TypeKind::Enum(enum_type) => {
                        for value in &enum_type.values {
                            visit_directives(v, ctx, &value.node.directives, DirectiveTarget::Other);
                        }
                    }
                    TypeKind::InputObject(input) => {
                        for field in &input.fields {
                            visit_directives(v, ctx, &field.node.directives, DirectiveTarget::Other);
                        }
                    }
                    TypeKind::Scalar | TypeKind::Union(_) => {}
                }

                v.exit_type_definition(ctx, ty);
            }
            TypeSystemDefinition::Schema(schema) => v.enter_schema(ctx, schema),
            TypeSystemDefinition::Directive(directive) => v.enter_directive_definition(ctx, directive),
        }
    }

    v.exit_document(ctx, doc);
}

fn visit_field<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    field: &'a Positioned<FieldDefinition>,
    parent_type: &'a Positioned<TypeDefinition>,
) {
    v.enter_field(ctx, field, parent_type);

    for argument in &field.node.arguments {
        visit_directives(v, ctx, &argument.node.directives, DirectiveTarget::Other);
    }

    visit_directives(v, ctx, &field.node.directives, DirectiveTarget::Field(parent_type, field));

    v.exit_field(ctx, field, parent_type);
}

fn visit_directives<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    directives: &'a [Positioned<ConstDirective>],
    target: DirectiveTarget<'a>,
) {
    for directive in directives {
        v.enter_directive(ctx, directive, target);
    }
}
