use async_graphql_parser::{
    types::{ConstDirective, DirectiveDefinition, FieldDefinition, SchemaDefinition, ServiceDocument, TypeDefinition},
    Positioned,
};

use super::{DirectiveTarget, Visitor, VisitorContext};

/// Two rules run side by side during a single walk of the document.
pub(crate) struct VisitorCons<A, B>(pub(super) A, pub(super) B);

impl<A, B> VisitorCons<A, B> {
    pub(crate) const fn with<V>(self, visitor: V) -> VisitorCons<V, Self> {
        VisitorCons(visitor, self)
    }
}

impl<'a, A, B> Visitor<'a> for VisitorCons<A, B>
where
    A: Visitor<'a>,
    B: Visitor<'a>,
{
    fn enter_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ServiceDocument) {
        self.0.enter_document(ctx, doc);
        self.1.enter_document(ctx, doc);
    }

    fn exit_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ServiceDocument) {
        self.0.exit_document(ctx, doc);
        self.1.exit_document(ctx, doc);
    }

    fn enter_schema(&mut self, ctx: &mut VisitorContext<'a>, schema: &'a Positioned<SchemaDefinition>) {
        self.0.enter_schema(ctx, schema);
        self.1.enter_schema(ctx, schema);
    }

    fn enter_directive_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        definition: &'a Positioned<DirectiveDefinition>,
    ) {
        self.0.enter_directive_definition(ctx, definition);
        self.1.enter_directive_definition(ctx, definition);
    }

    fn enter_type_definition(&mut self, ctx: &mut VisitorContext<'a>, ty: &'a Positioned<TypeDefinition>) {
        self.0.enter_type_definition(ctx, ty);
        self.1.enter_type_definition(ctx, ty);
    }

    fn exit_type_definition(&mut self, ctx: &mut VisitorContext<'a>, ty: &'a Positioned<TypeDefinition>) {
        self.0.exit_type_definition(ctx, ty);
        self.1.exit_type_definition(ctx, ty);
    }

    fn enter_field(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        field: &'a Positioned<FieldDefinition>,
        parent_type: &'a Positioned<TypeDefinition>,
    ) {
        self.0.enter_field(ctx, field, parent_type);
        self.1.enter_field(ctx, field, parent_type);
    }

    fn exit_field(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        field: &'a Positioned<FieldDefinition>,
        parent_type: &'a Positioned<TypeDefinition>,
    ) {
        self.0.exit_field(ctx, field, parent_type);
        self.1.exit_field(ctx, field, parent_type);
    }

    fn enter_directive(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        directive: &'a Positioned<ConstDirective>,
        target: DirectiveTarget<'a>,
    ) {
        self.0.enter_directive(ctx, directive, target);
        self.1.enter_directive(ctx, directive, target);
    }
}
