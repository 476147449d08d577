use async_graphql_parser::{types::ConstDirective, Positioned};

use super::{directive::Directive, directive::SchemaDirective, visitor::RuleError};
use crate::{directive_de::parse_directive, model::Schema};

pub const CUSTOM_DIRECTIVE: &str = "custom";
pub const LAMBDA_DIRECTIVE: &str = "lambda";

/// A field resolved by an external HTTP endpoint or a DQL query instead of storage.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomDirective {
    pub http: Option<CustomHttp>,
    pub dql: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CustomHttp {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<String>,
    pub graphql: Option<String>,
    pub mode: Option<CustomMode>,
    #[serde(default)]
    pub forward_headers: Vec<String>,
    #[serde(default)]
    pub secret_headers: Vec<String>,
    #[serde(default)]
    pub introspection_headers: Vec<String>,
    pub skip_introspection: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CustomMode {
    Batch,
    Single,
}

impl CustomDirective {
    pub(crate) fn parse(directive: &Positioned<ConstDirective>) -> Result<Self, RuleError> {
        let custom: CustomDirective = parse_directive(directive)?;

        match (&custom.http, &custom.dql) {
            (Some(_), None) | (None, Some(_)) => Ok(custom),
            _ => Err(RuleError::at(
                directive.pos,
                "exactly one of http or dql must be given",
            )),
        }
    }
}

impl Directive for CustomDirective {
    fn definition() -> String {
        format!("directive @{CUSTOM_DIRECTIVE}(http: CustomHTTP, dql: String) on FIELD_DEFINITION")
    }
}

pub struct LambdaDirective;

impl Directive for LambdaDirective {
    fn definition() -> String {
        format!("directive @{LAMBDA_DIRECTIVE} on FIELD_DEFINITION")
    }
}

/// Resolved fields have no storage predicate, so storage directives make no sense on them.
pub(crate) fn validate(schema: &Schema) -> Vec<RuleError> {
    let mut errors = Vec::new();

    for ty in schema.types.values() {
        for field in ty.fields.iter().filter(|field| field.owner == ty.name && field.is_custom()) {
            let resolver = if field.custom().is_some() {
                CUSTOM_DIRECTIVE
            } else {
                LAMBDA_DIRECTIVE
            };

            for directive in &field.directives {
                let conflicting = match &directive.node {
                    SchemaDirective::Lambda => field.custom().is_some(),
                    SchemaDirective::Id(_)
                    | SchemaDirective::Search(_)
                    | SchemaDirective::HasInverse(_)
                    | SchemaDirective::Dgraph(_) => true,
                    _ => false,
                };

                if conflicting {
                    errors.push(RuleError::at(
                        directive.pos,
                        format!(
                            "Type {}; Field {}: can't use @{} along with @{resolver}.",
                            ty.name,
                            field.name,
                            directive.node.name()
                        ),
                    ));
                }
            }
        }
    }

    errors
}
