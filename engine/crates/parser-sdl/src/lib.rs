//! Validation of directive-annotated schemas, `@auth` rule compilation and synthesis of the
//! generated CRUD schema.

use async_graphql_parser::parse_schema;
use common_types::auth::CompiledAuthSchema;

pub mod auth;
mod directive_de;
pub mod model;
pub mod registry;
pub mod rules;
mod validations;


pub use model::Schema;
pub use registry::{GeneratedSchema, RootField, RootFieldKind};
pub use rules::visitor::RuleError;

use rules::visitor::{visit, VisitorContext};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parser(#[from] async_graphql_parser::Error),
    #[error("{0:?}")]
    Validation(Vec<RuleError>),
}

impl Error {
    pub fn validation_errors(self) -> Option<Vec<RuleError>> {
        match self {
            Error::Validation(errors) => Some(errors),
            Error::Parser(_) => None,
        }
    }
}

impl From<Vec<RuleError>> for Error {
    fn from(value: Vec<RuleError>) -> Self {
        Self::Validation(value)
    }
}

/// Everything derived from one schema submission.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub schema: Schema,
    pub auth: CompiledAuthSchema,
    pub generated: GeneratedSchema,
}

/// Validates the schema, compiles its `@auth` rules and generates the CRUD schema. Either
/// everything succeeds or nothing is returned.
pub fn parse(sdl: &str) -> Result<ParseResult, Error> {
    let document = parse_schema(sdl)?;

    let mut ctx = VisitorContext::new(&document);
    visit(&mut rules::document_rules(), &mut ctx, &document);
    if !ctx.errors.is_empty() {
        return Err(ctx.errors.into());
    }

    let schema = Schema::build(&document, &mut ctx)?;

    let errors = validations::post_parsing_validations(&schema);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let auth = auth::compile(&schema)?;
    let generated = registry::generate(&schema);

    tracing::debug!(
        types = schema.types.len(),
        root_fields = generated.root_fields.len(),
        "schema parsed"
    );

    Ok(ParseResult {
        schema,
        auth,
        generated,
    })
}
