use std::collections::HashMap;

use async_graphql_parser::{
    types::{ServiceDocument, TypeDefinition, TypeSystemDefinition},
    Pos, Positioned,
};

use super::RuleError;
use crate::rules::directive::SchemaDirective;

/// Directives of a type (`field == None`) or of one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DirectiveOwner {
    pub type_name: String,
    pub field: Option<String>,
}

pub(crate) struct VisitorContext<'a> {
    pub(crate) types: HashMap<&'a str, &'a Positioned<TypeDefinition>>,
    pub(crate) errors: Vec<RuleError>,
    pub(crate) directives: HashMap<DirectiveOwner, Vec<Positioned<SchemaDirective>>>,
}

impl<'a> VisitorContext<'a> {
    pub(crate) fn new(document: &'a ServiceDocument) -> Self {
        let mut types = HashMap::new();
        for definition in &document.definitions {
            if let TypeSystemDefinition::Type(ty) = definition {
                types.entry(ty.node.name.node.as_str()).or_insert(ty);
            }
        }

        Self {
            types,
            errors: Vec::new(),
            directives: HashMap::new(),
        }
    }

    pub(crate) fn report_error(&mut self, locations: Vec<Pos>, msg: impl Into<String>) {
        self.errors.push(RuleError::new(locations, msg));
    }

    pub(crate) fn record_directive(
        &mut self,
        type_name: &str,
        field: Option<&str>,
        directive: Positioned<SchemaDirective>,
    ) {
        self.directives
            .entry(DirectiveOwner {
                type_name: type_name.to_string(),
                field: field.map(str::to_string),
            })
            .or_default()
            .push(directive);
    }
}
