use std::collections::HashSet;

use async_graphql_parser::{
    types::{ConstDirective, TypeKind},
    Positioned,
};

use super::{
    directive::{DirectiveLocation, SchemaDirective},
    visitor::{DirectiveTarget, Visitor, VisitorContext},
};

/// Parses every directive into its typed form, checks where it is placed and records it for the
/// schema model.
#[derive(Default)]
pub struct KnownDirectivesVisitor {
    seen: HashSet<(String, Option<String>, String)>,
}

impl<'a> Visitor<'a> for KnownDirectivesVisitor {
    fn enter_directive(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        directive: &'a Positioned<ConstDirective>,
        target: DirectiveTarget<'a>,
    ) {
        let name = directive.node.name.node.as_str();

        let parsed = match SchemaDirective::parse(directive) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => {
                ctx.report_error(vec![directive.pos], format!("Unknown directive @{name}."));
                return;
            }
            Err(err) => {
                ctx.report_error(vec![directive.pos], format!("@{name} error: Unable to parse - {err}"));
                return;
            }
        };

        if matches!(parsed, SchemaDirective::Deprecated(_)) && matches!(target, DirectiveTarget::Other) {
            // enum values and arguments may be deprecated too
            return;
        }

        let (location, type_name, field_name) = match target {
            DirectiveTarget::Type(ty) => {
                let location = match &ty.node.kind {
                    TypeKind::Object(_) => Some(DirectiveLocation::Object),
                    TypeKind::Interface(_) => Some(DirectiveLocation::Interface),
                    TypeKind::Enum(_) => Some(DirectiveLocation::Enum),
                    _ => None,
                };
                (location, ty.node.name.node.as_str(), None)
            }
            DirectiveTarget::Field(ty, field) => (
                Some(DirectiveLocation::FieldDefinition),
                ty.node.name.node.as_str(),
                Some(field.node.name.node.as_str()),
            ),
            DirectiveTarget::Other => (None, "", None),
        };

        let Some(location) = location.filter(|location| parsed.locations().contains(location)) else {
            let message = if parsed.locations().is_empty() {
                format!("@{name} can only be used in operations, not in a schema.")
            } else {
                let allowed = parsed.locations().iter().map(ToString::to_string).collect::<Vec<_>>();
                format!("@{name} is not allowed here, it may only be used on {}.", allowed.join(" | "))
            };
            ctx.report_error(vec![directive.pos], message);
            return;
        };

        if let SchemaDirective::Dgraph(dgraph) = &parsed {
            if dgraph.r#type.is_some() == dgraph.pred.is_some() {
                ctx.report_error(
                    vec![directive.pos],
                    format!("@{name} takes either type (on types) or pred (on fields)."),
                );
                return;
            }
        }

        // Directives are not repeatable.
        let key = (type_name.to_string(), field_name.map(str::to_string), name.to_string());
        if !self.seen.insert(key) {
            ctx.report_error(
                vec![directive.pos],
                format!("@{name} can only be used once on {location}."),
            );
            return;
        }

        ctx.record_directive(type_name, field_name, Positioned::new(parsed, directive.pos));
    }
}
