//! Deserializes the constant arguments of a directive into its typed form.

use async_graphql_parser::{types::ConstDirective, Positioned};
use serde::de::DeserializeOwned;

use crate::rules::visitor::RuleError;

pub(crate) fn parse_directive<T: DeserializeOwned>(directive: &Positioned<ConstDirective>) -> Result<T, RuleError> {
    let mut arguments = serde_json::Map::new();

    for (name, value) in &directive.node.arguments {
        let value = value
            .node
            .clone()
            .into_json()
            .map_err(|err| RuleError::at(value.pos, err.to_string()))?;
        arguments.insert(name.node.to_string(), value);
    }

    serde_json::from_value(serde_json::Value::Object(arguments)).map_err(|err| {
        // serde_json reports positions inside the intermediate JSON, which mean nothing to the
        // schema author.
        let message = err.to_string();
        let message = message
            .split_once(" at line ")
            .map_or(message.as_str(), |(message, _)| message)
            .to_string();
        RuleError::at(directive.pos, message)
    })
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::types::{TypeKind, TypeSystemDefinition};

    use super::parse_directive;

    #[derive(Debug, serde::Deserialize, PartialEq)]
    #[serde(deny_unknown_fields, rename_all = "camelCase")]
    struct Sample {
        max_age: u32,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn first_field_directive(sdl: &str) -> async_graphql_parser::Positioned<async_graphql_parser::types::ConstDirective> {
        let document = async_graphql_parser::parse_schema(sdl).unwrap();
        let TypeSystemDefinition::Type(ty) = &document.definitions[0] else {
            unreachable!()
        };
        let TypeKind::Object(object) = &ty.node.kind else {
            unreachable!()
        };
        object.fields[0].node.directives[0].clone()
    }

    #[test]
    fn typed_arguments() {
        let directive = first_field_directive(r#"type T { f: String @sample(maxAge: 10, tags: ["a", "b"]) }"#);

        assert_eq!(
            parse_directive::<Sample>(&directive).unwrap(),
            Sample {
                max_age: 10,
                tags: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn unknown_arguments() {
        let directive = first_field_directive("type T { f: String @sample(maxAge: 10, other: 1) }");

        insta::assert_snapshot!(
            parse_directive::<Sample>(&directive).unwrap_err(),
            @"[1:20] unknown field `other`, expected `maxAge` or `tags`"
        );
    }
}
