use crate::{
    model::Schema,
    rules::{
        auth_directive, custom_directive, has_inverse_directive, id_directive, search_directive, secret_directive,
        visitor::RuleError,
    },
};

/// Checks that need the whole schema model: resolved interface fields and typed directives.
pub fn post_parsing_validations(schema: &Schema) -> Vec<RuleError> {
    let mut errors = vec![];

    errors.extend(id_directive::validate(schema));
    errors.extend(search_directive::validate(schema));
    errors.extend(has_inverse_directive::validate(schema));
    errors.extend(secret_directive::validate(schema));
    errors.extend(custom_directive::validate(schema));
    errors.extend(auth_directive::validate(schema));

    errors
}
