//! Filter inputs derived from `@search` and `@id`.

use std::collections::BTreeSet;

use itertools::Itertools;

use super::{
    names::MetaNames,
    render::{Block, Definition},
};
use crate::{
    model::{Field, FieldClass, Schema, BOOLEAN_SCALAR, STRING_SCALAR},
    rules::search_directive::IndexKind,
};

/// Filter operators, in the order they are listed in generated inputs.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    In,
    Le,
    Lt,
    Ge,
    Gt,
    Between,
    AllOfTerms,
    AnyOfTerms,
    AllOfText,
    AnyOfText,
    Regexp,
}

impl FilterOperator {
    /// Operators whose argument is a search string rather than a field value.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FilterOperator::AllOfTerms
                | FilterOperator::AnyOfTerms
                | FilterOperator::AllOfText
                | FilterOperator::AnyOfText
                | FilterOperator::Regexp
        )
    }
}

/// A single generated filter input.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKind {
    StringHash,
    StringExact,
    StringTerm,
    StringFullText,
    StringRegExp,
    Int,
    Int64,
    Float,
    DateTime,
    EnumHash(String),
    EnumExact(String),
}

impl FilterKind {
    fn for_index(index: IndexKind, class: FieldClass, type_name: &str) -> Option<FilterKind> {
        use IndexKind::*;

        Some(match (class, index) {
            (FieldClass::Enum, Hash) => FilterKind::EnumHash(type_name.to_string()),
            (FieldClass::Enum, Exact) => FilterKind::EnumExact(type_name.to_string()),
            (_, Hash) => FilterKind::StringHash,
            (_, Exact) => FilterKind::StringExact,
            (_, Term) => FilterKind::StringTerm,
            (_, Fulltext) => FilterKind::StringFullText,
            (_, Trigram | Regexp) => FilterKind::StringRegExp,
            (_, IndexKind::Int) => FilterKind::Int,
            (_, IndexKind::Int64) => FilterKind::Int64,
            (_, IndexKind::Float) => FilterKind::Float,
            (_, Year | Month | Day | Hour) => FilterKind::DateTime,
            (_, Bool) => return None,
        })
    }

    pub fn type_name(&self) -> String {
        match self {
            FilterKind::StringHash => "StringHashFilter".to_string(),
            FilterKind::StringExact => "StringExactFilter".to_string(),
            FilterKind::StringTerm => "StringTermFilter".to_string(),
            FilterKind::StringFullText => "StringFullTextFilter".to_string(),
            FilterKind::StringRegExp => "StringRegExpFilter".to_string(),
            FilterKind::Int => "IntFilter".to_string(),
            FilterKind::Int64 => "Int64Filter".to_string(),
            FilterKind::Float => "FloatFilter".to_string(),
            FilterKind::DateTime => "DateTimeFilter".to_string(),
            FilterKind::EnumHash(name) => format!("{name}_hash"),
            FilterKind::EnumExact(name) => format!("{name}_exact"),
        }
    }

    pub fn operators(&self) -> &'static [FilterOperator] {
        use FilterOperator::*;

        match self {
            FilterKind::StringHash | FilterKind::EnumHash(_) => &[Eq, In],
            FilterKind::StringExact
            | FilterKind::Int
            | FilterKind::Int64
            | FilterKind::Float
            | FilterKind::DateTime => &[Eq, In, Le, Lt, Ge, Gt, Between],
            FilterKind::EnumExact(_) => &[Eq, In, Le, Lt, Ge, Gt],
            FilterKind::StringTerm => &[AllOfTerms, AnyOfTerms],
            FilterKind::StringFullText => &[AllOfText, AnyOfText],
            FilterKind::StringRegExp => &[Regexp],
        }
    }

    /// Built-in filters are part of the extended definitions, enum ones are generated.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, FilterKind::EnumHash(_) | FilterKind::EnumExact(_))
    }

    /// Every built-in filter, for the extended definitions.
    pub fn builtins() -> [FilterKind; 9] {
        [
            FilterKind::StringHash,
            FilterKind::StringExact,
            FilterKind::StringTerm,
            FilterKind::StringFullText,
            FilterKind::StringRegExp,
            FilterKind::Int,
            FilterKind::Int64,
            FilterKind::Float,
            FilterKind::DateTime,
        ]
    }

    fn value_type(&self) -> &str {
        match self {
            FilterKind::StringHash
            | FilterKind::StringExact
            | FilterKind::StringTerm
            | FilterKind::StringFullText
            | FilterKind::StringRegExp => STRING_SCALAR,
            FilterKind::Int => "Int",
            FilterKind::Int64 => "Int64",
            FilterKind::Float => "Float",
            FilterKind::DateTime => "DateTime",
            FilterKind::EnumHash(name) | FilterKind::EnumExact(name) => name,
        }
    }
}

/// The filter input of a field: a single filter kind, several merged into one input, or a
/// plain `Boolean` for `bool` indexes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldFilter {
    pub name: String,
    pub kinds: Vec<FilterKind>,
    pub operators: Vec<FilterOperator>,
    /// Argument type of the value operators (`eq`, `in`, ...).
    pub value_type: String,
}

impl FieldFilter {
    /// `None` for fields nothing can filter on.
    pub fn for_field(schema: &Schema, field: &Field) -> Option<FieldFilter> {
        if field.is_custom() {
            return None;
        }

        let class = schema.classify(&field.ty);
        let mut indexes: BTreeSet<IndexKind> = field
            .search_directive()
            .map(|search| search.kinds(class))
            .unwrap_or_default();

        if field.is_xid() && class == FieldClass::String && !indexes.contains(&IndexKind::Exact) {
            indexes.insert(IndexKind::Hash);
        }
        if field.is_xid() && matches!(class, FieldClass::Int | FieldClass::Int64) {
            indexes.extend(IndexKind::default_for(class));
        }

        if indexes.is_empty() {
            return None;
        }

        if indexes.contains(&IndexKind::Bool) {
            return Some(FieldFilter {
                name: BOOLEAN_SCALAR.to_string(),
                kinds: Vec::new(),
                operators: vec![FilterOperator::Eq],
                value_type: BOOLEAN_SCALAR.to_string(),
            });
        }

        let kinds: Vec<FilterKind> = indexes
            .into_iter()
            .filter_map(|index| FilterKind::for_index(index, class, &field.ty.name))
            .unique()
            .sorted_by_key(FilterKind::type_name)
            .collect();

        let operators = kinds
            .iter()
            .flat_map(|kind| kind.operators().iter().copied())
            .unique()
            .sorted()
            .collect();

        let value_type = kinds
            .iter()
            .map(FilterKind::value_type)
            .find(|name| *name != STRING_SCALAR)
            .unwrap_or(STRING_SCALAR)
            .to_string();

        Some(FieldFilter {
            name: kinds.iter().map(FilterKind::type_name).join("_"),
            kinds,
            operators,
            value_type,
        })
    }

    pub fn is_boolean(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Single built-in filters and `Boolean` need no generated input.
    pub fn is_builtin(&self) -> bool {
        self.is_boolean() || matches!(self.kinds.as_slice(), [kind] if kind.is_builtin())
    }

    pub fn definition(&self) -> Definition {
        input_definition(&self.name, &self.operators, &self.value_type)
    }

    /// Argument type of `operator` in this filter.
    pub fn argument_type(&self, operator: FilterOperator) -> String {
        argument_type(operator, &self.value_type)
    }
}

pub(crate) fn builtin_definition(kind: &FilterKind) -> Definition {
    input_definition(&kind.type_name(), kind.operators(), kind.value_type())
}

fn input_definition(name: &str, operators: &[FilterOperator], value_type: &str) -> Definition {
    let mut block = Block::new("input", name);
    for operator in operators {
        block.field(operator.as_ref(), &[], argument_type(*operator, value_type));
    }
    block.finish()
}

fn argument_type(operator: FilterOperator, value_type: &str) -> String {
    match operator {
        FilterOperator::In => format!("[{value_type}]"),
        FilterOperator::Between => MetaNames::range_input(value_type),
        operator if operator.is_textual() => STRING_SCALAR.to_string(),
        _ => value_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::parse;

    fn filter(sdl: &str, type_name: &str, field: &str) -> Option<FieldFilter> {
        let schema = parse(sdl).unwrap().schema;
        let ty = schema.get(type_name).unwrap();
        FieldFilter::for_field(&schema, ty.field(field).unwrap())
    }

    #[test]
    fn id_and_search_merge() {
        let filter = filter(
            indoc! {r#"
                type User {
                    name: String! @id @search(by: [regexp])
                }
            "#},
            "User",
            "name",
        )
        .unwrap();

        assert_eq!(filter.name, "StringHashFilter_StringRegExpFilter");
        assert_eq!(
            filter.operators,
            [FilterOperator::Eq, FilterOperator::In, FilterOperator::Regexp]
        );
        assert!(!filter.is_builtin());
        insta::assert_snapshot!(filter.definition().text, @r###"
        input StringHashFilter_StringRegExpFilter {
        	eq: String
        	in: [String]
        	regexp: String
        }
        "###);
    }

    #[test]
    fn merged_operators_are_the_union() {
        let merged = filter(
            "type Post { title: String @search(by: [exact, term, fulltext]) }",
            "Post",
            "title",
        )
        .unwrap();

        let union: BTreeSet<FilterOperator> = [FilterKind::StringExact, FilterKind::StringTerm, FilterKind::StringFullText]
            .iter()
            .flat_map(|kind| kind.operators().iter().copied())
            .collect();

        assert_eq!(merged.name, "StringExactFilter_StringFullTextFilter_StringTermFilter");
        assert_eq!(merged.operators, union.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn enums_and_booleans() {
        let sdl = indoc! {r"
            enum Status { OPEN CLOSED }
            type Task {
                status: Status @search(by: [exact, regexp])
                done: Boolean @search
                plain: Status @search
            }
        "};

        let status = filter(sdl, "Task", "status").unwrap();
        assert_eq!(status.name, "Status_exact_StringRegExpFilter");
        assert_eq!(status.value_type, "Status");
        assert_eq!(status.argument_type(FilterOperator::In), "[Status]");
        assert_eq!(status.argument_type(FilterOperator::Regexp), "String");

        let done = filter(sdl, "Task", "done").unwrap();
        assert!(done.is_boolean() && done.is_builtin());
        assert_eq!(done.name, "Boolean");

        let plain = filter(sdl, "Task", "plain").unwrap();
        assert_eq!(plain.name, "Status_hash");
        assert!(!plain.is_builtin());
    }

    #[test]
    fn unsearchable_fields() {
        let sdl = "type Note { id: ID! text: String count: Int @id }";

        assert_eq!(filter(sdl, "Note", "id"), None);
        assert_eq!(filter(sdl, "Note", "text"), None);
        assert_eq!(filter(sdl, "Note", "count").unwrap().name, "IntFilter");
    }
}
