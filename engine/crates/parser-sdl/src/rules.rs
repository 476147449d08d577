pub mod auth_directive;
pub mod custom_directive;
pub mod dgraph_directive;
pub mod directive;
pub mod generate_directive;
pub mod has_inverse_directive;
pub mod id_directive;
mod known_directives;
pub mod operation_directives;
pub mod search_directive;
pub mod secret_directive;
mod supported_definitions;
mod type_references;
mod unique_names;
pub mod visitor;

use self::{
    known_directives::KnownDirectivesVisitor,
    supported_definitions::SupportedDefinitionsVisitor,
    type_references::TypeReferencesVisitor,
    unique_names::UniqueNamesVisitor,
    visitor::{Visitor, VisitorNil},
};

/// Rules checked on the document itself, before the schema model is built.
pub(crate) fn document_rules<'a>() -> impl Visitor<'a> {
    VisitorNil
        .with(UniqueNamesVisitor)
        .with(SupportedDefinitionsVisitor)
        .with(TypeReferencesVisitor)
        .with(KnownDirectivesVisitor::default())
}
