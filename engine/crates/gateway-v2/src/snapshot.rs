use std::collections::HashMap;

use common_types::auth::CompiledAuthSchema;
use jwt_verifier::Verifier;
use parser_sdl::{auth::RuleLeaf, model::ObjectType, GeneratedSchema, ParseResult, Schema};
use runtime::Entity;

/// Everything derived from one accepted schema submission. Never modified once published;
/// a new submission replaces it wholesale.
#[derive(Debug)]
pub struct SchemaSnapshot {
    pub version: u64,
    pub schema: Schema,
    pub auth: CompiledAuthSchema,
    pub generated: GeneratedSchema,
    pub(crate) verifier: Option<Verifier>,
    /// Rule templates parsed once, keyed by their source text.
    pub(crate) leaves: HashMap<String, RuleLeaf>,
}

impl SchemaSnapshot {
    pub(crate) fn new(version: u64, parsed: ParseResult, verifier: Option<Verifier>) -> Self {
        let mut leaves = HashMap::new();
        for (_, _, rule) in parsed.auth.iter() {
            for template in rule.leaves() {
                // templates were validated while compiling the schema
                if let Ok(leaf) = RuleLeaf::parse(template.as_str()) {
                    leaves.insert(template.as_str().to_string(), leaf);
                }
            }
        }

        SchemaSnapshot {
            version,
            schema: parsed.schema,
            auth: parsed.auth,
            generated: parsed.generated,
            verifier,
            leaves,
        }
    }

    pub fn sdl(&self) -> &str {
        &self.generated.sdl
    }

    pub(crate) fn object_type(&self, type_name: &str) -> Option<&ObjectType> {
        self.schema.get(type_name)
    }

    /// The concrete schema type an entity was stored as.
    pub(crate) fn type_of(&self, entity: &Entity) -> Option<&ObjectType> {
        self.schema
            .types
            .values()
            .find(|ty| !ty.is_interface() && ty.storage_name() == entity.concrete_type())
    }
}
