use async_graphql_parser::{types::ConstDirective, Positioned};

use super::{
    auth_directive::{AuthDirective, AUTH_DIRECTIVE},
    custom_directive::{CustomDirective, LambdaDirective, CUSTOM_DIRECTIVE, LAMBDA_DIRECTIVE},
    dgraph_directive::{DgraphDirective, DGRAPH_DIRECTIVE},
    generate_directive::{GenerateDirective, GENERATE_DIRECTIVE},
    has_inverse_directive::{HasInverseDirective, HAS_INVERSE_DIRECTIVE},
    id_directive::{IdDirective, ID_DIRECTIVE},
    operation_directives::{CacheControlDirective, CascadeDirective, CACHE_CONTROL_DIRECTIVE, CASCADE_DIRECTIVE},
    search_directive::{SearchDirective, SEARCH_DIRECTIVE},
    secret_directive::{SecretDirective, SECRET_DIRECTIVE},
    visitor::RuleError,
};
use crate::directive_de::parse_directive;

pub const WITH_SUBSCRIPTION_DIRECTIVE: &str = "withSubscription";
pub const REMOTE_DIRECTIVE: &str = "remote";
pub const DEPRECATED_DIRECTIVE: &str = "deprecated";

pub trait Directive {
    /// The SDL declaration, as published in the extended definitions.
    fn definition() -> String;
}

/// Every directive a schema may use, with its arguments already type-checked.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDirective {
    Id(IdDirective),
    Search(SearchDirective),
    Auth(AuthDirective),
    Custom(CustomDirective),
    Lambda,
    Generate(GenerateDirective),
    Dgraph(DgraphDirective),
    HasInverse(HasInverseDirective),
    Secret(SecretDirective),
    WithSubscription,
    Remote,
    Cascade(CascadeDirective),
    CacheControl(CacheControlDirective),
    Deprecated(DeprecatedDirective),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectiveLocation {
    Object,
    Interface,
    Enum,
    FieldDefinition,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArguments {}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeprecatedDirective {
    pub reason: Option<String>,
}

impl SchemaDirective {
    /// `Ok(None)` for directives nobody declared.
    pub fn parse(directive: &Positioned<ConstDirective>) -> Result<Option<Self>, RuleError> {
        let name = directive.node.name.node.as_str();

        let parsed = match name {
            ID_DIRECTIVE => SchemaDirective::Id(parse_directive(directive)?),
            SEARCH_DIRECTIVE => SchemaDirective::Search(parse_directive(directive)?),
            AUTH_DIRECTIVE => SchemaDirective::Auth(parse_directive(directive)?),
            CUSTOM_DIRECTIVE => SchemaDirective::Custom(CustomDirective::parse(directive)?),
            LAMBDA_DIRECTIVE => {
                parse_directive::<NoArguments>(directive)?;
                SchemaDirective::Lambda
            }
            GENERATE_DIRECTIVE => SchemaDirective::Generate(parse_directive(directive)?),
            DGRAPH_DIRECTIVE => SchemaDirective::Dgraph(parse_directive(directive)?),
            HAS_INVERSE_DIRECTIVE => SchemaDirective::HasInverse(parse_directive(directive)?),
            SECRET_DIRECTIVE => SchemaDirective::Secret(parse_directive(directive)?),
            WITH_SUBSCRIPTION_DIRECTIVE => {
                parse_directive::<NoArguments>(directive)?;
                SchemaDirective::WithSubscription
            }
            REMOTE_DIRECTIVE => {
                parse_directive::<NoArguments>(directive)?;
                SchemaDirective::Remote
            }
            CASCADE_DIRECTIVE => SchemaDirective::Cascade(parse_directive(directive)?),
            CACHE_CONTROL_DIRECTIVE => SchemaDirective::CacheControl(parse_directive(directive)?),
            DEPRECATED_DIRECTIVE => SchemaDirective::Deprecated(parse_directive(directive)?),
            _ => return Ok(None),
        };

        Ok(Some(parsed))
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchemaDirective::Id(_) => ID_DIRECTIVE,
            SchemaDirective::Search(_) => SEARCH_DIRECTIVE,
            SchemaDirective::Auth(_) => AUTH_DIRECTIVE,
            SchemaDirective::Custom(_) => CUSTOM_DIRECTIVE,
            SchemaDirective::Lambda => LAMBDA_DIRECTIVE,
            SchemaDirective::Generate(_) => GENERATE_DIRECTIVE,
            SchemaDirective::Dgraph(_) => DGRAPH_DIRECTIVE,
            SchemaDirective::HasInverse(_) => HAS_INVERSE_DIRECTIVE,
            SchemaDirective::Secret(_) => SECRET_DIRECTIVE,
            SchemaDirective::WithSubscription => WITH_SUBSCRIPTION_DIRECTIVE,
            SchemaDirective::Remote => REMOTE_DIRECTIVE,
            SchemaDirective::Cascade(_) => CASCADE_DIRECTIVE,
            SchemaDirective::CacheControl(_) => CACHE_CONTROL_DIRECTIVE,
            SchemaDirective::Deprecated(_) => DEPRECATED_DIRECTIVE,
        }
    }

    /// Where the directive may appear in a schema document. Operation directives have no
    /// valid location here.
    pub fn locations(&self) -> &'static [DirectiveLocation] {
        use DirectiveLocation::*;

        match self {
            SchemaDirective::Id(_)
            | SchemaDirective::Search(_)
            | SchemaDirective::Custom(_)
            | SchemaDirective::Lambda
            | SchemaDirective::HasInverse(_)
            | SchemaDirective::Deprecated(_) => &[FieldDefinition],
            SchemaDirective::Dgraph(directive) if directive.pred.is_some() => &[FieldDefinition],
            SchemaDirective::Dgraph(_) => &[Object, Interface],
            SchemaDirective::Auth(_)
            | SchemaDirective::Generate(_)
            | SchemaDirective::Secret(_)
            | SchemaDirective::WithSubscription => &[Object, Interface],
            SchemaDirective::Remote => &[Object, Interface, Enum],
            SchemaDirective::Cascade(_) | SchemaDirective::CacheControl(_) => &[],
        }
    }
}

/// Declarations of every directive a schema may use.
pub fn definitions() -> Vec<String> {
    vec![
        HasInverseDirective::definition(),
        SearchDirective::definition(),
        DgraphDirective::definition(),
        IdDirective::definition(),
        format!("directive @{WITH_SUBSCRIPTION_DIRECTIVE} on OBJECT | INTERFACE"),
        SecretDirective::definition(),
        AuthDirective::definition(),
        CustomDirective::definition(),
        format!("directive @{REMOTE_DIRECTIVE} on OBJECT | INTERFACE | ENUM"),
        CascadeDirective::definition(),
        LambdaDirective::definition(),
        CacheControlDirective::definition(),
        GenerateDirective::definition(),
    ]
}
