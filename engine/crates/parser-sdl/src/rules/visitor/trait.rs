use async_graphql_parser::{
    types::{ConstDirective, DirectiveDefinition, FieldDefinition, SchemaDefinition, ServiceDocument, TypeDefinition},
    Positioned,
};

use super::{DirectiveTarget, VisitorContext};

pub(crate) trait Visitor<'a> {
    fn enter_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ServiceDocument) {}
    fn exit_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ServiceDocument) {}

    fn enter_schema(&mut self, _ctx: &mut VisitorContext<'a>, _schema: &'a Positioned<SchemaDefinition>) {}

    fn enter_directive_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _definition: &'a Positioned<DirectiveDefinition>,
    ) {
    }

    fn enter_type_definition(&mut self, _ctx: &mut VisitorContext<'a>, _ty: &'a Positioned<TypeDefinition>) {}
    fn exit_type_definition(&mut self, _ctx: &mut VisitorContext<'a>, _ty: &'a Positioned<TypeDefinition>) {}

    fn enter_field(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _field: &'a Positioned<FieldDefinition>,
        _parent_type: &'a Positioned<TypeDefinition>,
    ) {
    }
    fn exit_field(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _field: &'a Positioned<FieldDefinition>,
        _parent_type: &'a Positioned<TypeDefinition>,
    ) {
    }

    fn enter_directive(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _directive: &'a Positioned<ConstDirective>,
        _target: DirectiveTarget<'a>,
    ) {
    }
}
