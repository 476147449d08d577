//! Definitions every generated schema carries, whatever the input.

use strum::IntoEnumIterator;

use super::{
    names::{MetaNames, INPUT_FIELD_RANGE_MAX, INPUT_FIELD_RANGE_MIN},
    render::{Block, Definition},
    search::{builtin_definition, FilterKind},
};
use crate::{
    model::{DATETIME_SCALAR, FLOAT_SCALAR, INT64_SCALAR, INT_SCALAR, STRING_SCALAR},
    rules::{
        custom_directive::{CustomMode, HttpMethod},
        directive,
        search_directive::IndexKind,
    },
};

const RANGE_SCALARS: [&str; 5] = [INT_SCALAR, INT64_SCALAR, FLOAT_SCALAR, STRING_SCALAR, DATETIME_SCALAR];

const INPUT_TYPES: [&str; 7] = [
    "DgraphIndex",
    "HTTPMethod",
    "Mode",
    "AuthRule",
    "CustomHTTP",
    "GenerateQueryParams",
    "GenerateMutationParams",
];

/// Names user types may not take.
pub fn is_reserved(name: &str) -> bool {
    INPUT_TYPES.contains(&name)
        || RANGE_SCALARS.iter().any(|scalar| MetaNames::range_input(scalar) == name)
        || FilterKind::builtins().iter().any(|kind| kind.type_name() == name)
}

pub(crate) fn definitions() -> Vec<Definition> {
    let mut definitions = vec![
        Definition::raw(INT64_SCALAR, format!("scalar {INT64_SCALAR}")),
        Definition::raw(DATETIME_SCALAR, format!("scalar {DATETIME_SCALAR}")),
    ];

    for scalar in RANGE_SCALARS {
        let mut range = Block::new("input", MetaNames::range_input(scalar));
        range.field(INPUT_FIELD_RANGE_MIN, &[], format!("{scalar}!"));
        range.field(INPUT_FIELD_RANGE_MAX, &[], format!("{scalar}!"));
        definitions.push(range.finish());
    }

    definitions.push(enum_definition("DgraphIndex", IndexKind::iter()));
    definitions.push(enum_definition("HTTPMethod", HttpMethod::iter()));
    definitions.push(enum_definition("Mode", CustomMode::iter()));

    let mut auth_rule = Block::new("input", "AuthRule");
    auth_rule.field("and", &[], "[AuthRule]");
    auth_rule.field("or", &[], "[AuthRule]");
    auth_rule.field("not", &[], "AuthRule");
    auth_rule.field("rule", &[], "String");
    definitions.push(auth_rule.finish());

    let mut custom_http = Block::new("input", "CustomHTTP");
    for (name, ty) in [
        ("url", "String!"),
        ("method", "HTTPMethod!"),
        ("body", "String"),
        ("graphql", "String"),
        ("mode", "Mode"),
        ("forwardHeaders", "[String!]"),
        ("secretHeaders", "[String!]"),
        ("introspectionHeaders", "[String!]"),
        ("skipIntrospection", "Boolean"),
    ] {
        custom_http.field(name, &[], ty);
    }
    definitions.push(custom_http.finish());

    let mut query_params = Block::new("input", "GenerateQueryParams");
    for name in ["get", "query", "password", "aggregate"] {
        query_params.field(name, &[], "Boolean");
    }
    definitions.push(query_params.finish());

    let mut mutation_params = Block::new("input", "GenerateMutationParams");
    for name in ["add", "update", "delete"] {
        mutation_params.field(name, &[], "Boolean");
    }
    definitions.push(mutation_params.finish());

    for text in directive::definitions() {
        let name = text
            .trim_start_matches("directive ")
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_string();
        definitions.push(Definition::raw(name, text));
    }

    definitions.extend(FilterKind::builtins().iter().map(builtin_definition));

    definitions
}

fn enum_definition<T: std::fmt::Display>(name: &str, values: impl Iterator<Item = T>) -> Definition {
    let mut block = Block::new("enum", name);
    for value in values {
        block.member(value.to_string());
    }
    block.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names() {
        assert!(is_reserved("AuthRule"));
        assert!(is_reserved("DateTimeRange"));
        assert!(is_reserved("StringTermFilter"));
        assert!(!is_reserved("Author"));
    }

    #[test]
    fn definitions_are_valid_sdl() {
        let text = definitions().into_iter().map(|definition| definition.text).collect::<Vec<_>>();
        async_graphql_parser::parse_schema(text.join("\n\n")).unwrap();
    }
}
