//! Textual layout of the generated schema.

use std::fmt::Write;

use async_graphql_parser::types::ConstDirective;
use itertools::Itertools;

const BANNER: &str = "#######################";

/// A rendered definition with the name it is sorted by.
#[derive(Debug, Clone)]
pub(crate) struct Definition {
    pub name: String,
    pub text: String,
}

impl Definition {
    pub fn raw(name: impl Into<String>, text: impl Into<String>) -> Self {
        Definition {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// `type`, `interface`, `input` and `enum` definitions: a header and one member per line.
pub(crate) struct Block {
    keyword: &'static str,
    name: String,
    description: Option<String>,
    implements: Vec<String>,
    directives: Vec<String>,
    members: Vec<String>,
}

impl Block {
    pub fn new(keyword: &'static str, name: impl Into<String>) -> Self {
        Block {
            keyword,
            name: name.into(),
            description: None,
            implements: Vec::new(),
            directives: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }

    pub fn implements(mut self, interfaces: &[String]) -> Self {
        self.implements = interfaces.to_vec();
        self
    }

    pub fn directives<'a>(mut self, directives: impl IntoIterator<Item = &'a ConstDirective>) -> Self {
        self.directives = directives.into_iter().map(directive).collect();
        self
    }

    /// Enum values and other bare members.
    pub fn member(&mut self, member: impl Into<String>) {
        self.members.push(member.into());
    }

    pub fn field(&mut self, name: &str, arguments: &[(String, String)], ty: impl std::fmt::Display) {
        self.members.push(field(name, arguments, ty, &[]));
    }

    pub fn described_field(&mut self, description: Option<&str>, field: String) {
        match description {
            Some(description) => self.members.push(format!("\"\"\"\n\t{description}\n\t\"\"\"\n\t{field}")),
            None => self.members.push(field),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn finish(self) -> Definition {
        let mut text = String::new();

        if let Some(description) = &self.description {
            let _ = writeln!(text, "\"\"\"\n{description}\n\"\"\"");
        }

        text.push_str(self.keyword);
        text.push(' ');
        text.push_str(&self.name);
        if !self.implements.is_empty() {
            let _ = write!(text, " implements {}", self.implements.join(" & "));
        }
        for directive in &self.directives {
            text.push(' ');
            text.push_str(directive);
        }
        text.push_str(" {\n");
        for member in &self.members {
            let _ = writeln!(text, "\t{member}");
        }
        text.push('}');

        Definition { name: self.name, text }
    }
}

/// `name(arg: Type, ...): Type @directive`
pub(crate) fn field(
    name: &str,
    arguments: &[(String, String)],
    ty: impl std::fmt::Display,
    directives: &[String],
) -> String {
    let mut text = name.to_string();
    if !arguments.is_empty() {
        let _ = write!(
            text,
            "({})",
            arguments.iter().map(|(name, ty)| format!("{name}: {ty}")).join(", ")
        );
    }
    let _ = write!(text, ": {ty}");
    for directive in directives {
        text.push(' ');
        text.push_str(directive);
    }
    text
}

pub(crate) fn directive(directive: &ConstDirective) -> String {
    if directive.arguments.is_empty() {
        return format!("@{}", directive.name.node);
    }

    format!(
        "@{}({})",
        directive.name.node,
        directive
            .arguments
            .iter()
            .map(|(name, value)| format!("{}: {}", name.node, value.node))
            .join(", ")
    )
}

pub(crate) struct Section {
    pub title: &'static str,
    pub definitions: Vec<Definition>,
    /// Sections mirroring the input keep declaration order.
    pub sorted: bool,
}

impl Section {
    pub fn sorted(title: &'static str, definitions: impl IntoIterator<Item = Definition>) -> Self {
        Section {
            title,
            definitions: definitions.into_iter().collect(),
            sorted: true,
        }
    }

    pub fn in_order(title: &'static str, definitions: impl IntoIterator<Item = Definition>) -> Self {
        Section {
            title,
            definitions: definitions.into_iter().collect(),
            sorted: false,
        }
    }
}

pub(crate) fn render(sections: Vec<Section>) -> String {
    let mut out = String::new();

    for mut section in sections {
        if section.sorted {
            section.definitions.sort_by(|a, b| a.name.cmp(&b.name));
        }

        let _ = write!(out, "{BANNER}\n# {}\n{BANNER}\n\n", section.title);
        for definition in section.definitions {
            out.push_str(&definition.text);
            out.push_str("\n\n");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use async_graphql_parser::{parse_schema, types::TypeSystemDefinition};

    use super::*;

    #[test]
    fn block_layout() {
        let doc = parse_schema(r#"type T @dgraph(type: "Thing") @remote { a: Int }"#).unwrap();
        let TypeSystemDefinition::Type(ty) = &doc.definitions[0] else {
            unreachable!()
        };

        let mut block = Block::new("type", "Thing")
            .description(Some("A thing."))
            .implements(&["Node".to_string(), "Named".to_string()])
            .directives(ty.node.directives.iter().map(|d| &d.node));
        block.field("name", &[], "String!");
        block.field(
            "friends",
            &[("first".to_string(), "Int".to_string()), ("offset".to_string(), "Int".to_string())],
            "[Thing]",
        );

        insta::assert_snapshot!(block.finish().text, @r###"
        """
        A thing.
        """
        type Thing implements Node & Named @dgraph(type: "Thing") @remote {
        	name: String!
        	friends(first: Int, offset: Int): [Thing]
        }
        "###);
    }

    #[test]
    fn sections_sort_their_members() {
        let out = render(vec![
            Section::in_order(
                "Input Schema",
                [Definition::raw("B", "scalar B"), Definition::raw("A", "scalar A")],
            ),
            Section::sorted(
                "Generated Types",
                [Definition::raw("Z", "scalar Z"), Definition::raw("Y", "scalar Y")],
            ),
        ]);

        insta::assert_snapshot!(out, @r###"
        #######################
        # Input Schema
        #######################

        scalar B

        scalar A

        #######################
        # Generated Types
        #######################

        scalar Y

        scalar Z

        "###);
    }
}
