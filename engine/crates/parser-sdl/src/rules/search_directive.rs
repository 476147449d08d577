use std::collections::BTreeSet;

use itertools::Itertools;

use super::{directive::Directive, visitor::RuleError};
use crate::model::{FieldClass, Schema};

pub const SEARCH_DIRECTIVE: &str = "search";

/// Index kinds accepted by `@search(by: [...])`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IndexKind {
    Int,
    Int64,
    Float,
    Bool,
    Hash,
    Exact,
    Term,
    Fulltext,
    Trigram,
    Regexp,
    Year,
    Month,
    Day,
    Hour,
}

impl IndexKind {
    pub fn applies_to(self, class: FieldClass) -> bool {
        use IndexKind::*;

        match class {
            FieldClass::String => matches!(self, Hash | Exact | Term | Fulltext | Trigram | Regexp),
            FieldClass::Enum => matches!(self, Hash | Exact | Trigram | Regexp),
            FieldClass::Int => self == Int,
            FieldClass::Int64 => self == Int64,
            FieldClass::Float => self == Float,
            FieldClass::Boolean => self == Bool,
            FieldClass::DateTime => matches!(self, Year | Month | Day | Hour),
            FieldClass::Id | FieldClass::Object | FieldClass::Unknown => false,
        }
    }

    /// The index of a bare `@search`.
    pub fn default_for(class: FieldClass) -> Option<IndexKind> {
        match class {
            FieldClass::String => Some(IndexKind::Term),
            FieldClass::Enum => Some(IndexKind::Hash),
            FieldClass::Int => Some(IndexKind::Int),
            FieldClass::Int64 => Some(IndexKind::Int64),
            FieldClass::Float => Some(IndexKind::Float),
            FieldClass::Boolean => Some(IndexKind::Bool),
            FieldClass::DateTime => Some(IndexKind::Year),
            FieldClass::Id | FieldClass::Object | FieldClass::Unknown => None,
        }
    }

    fn is_datetime_granularity(self) -> bool {
        matches!(self, IndexKind::Year | IndexKind::Month | IndexKind::Day | IndexKind::Hour)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchDirective {
    pub by: Option<Vec<IndexKind>>,
}

impl SearchDirective {
    /// Index kinds for a field of the given class.
    pub fn kinds(&self, class: FieldClass) -> BTreeSet<IndexKind> {
        match &self.by {
            Some(kinds) => kinds.iter().copied().collect(),
            None => IndexKind::default_for(class).into_iter().collect(),
        }
    }
}

impl Directive for SearchDirective {
    fn definition() -> String {
        format!("directive @{SEARCH_DIRECTIVE}(by: [DgraphIndex!]) on FIELD_DEFINITION")
    }
}

pub(crate) fn validate(schema: &Schema) -> Vec<RuleError> {
    let mut errors = Vec::new();

    for ty in schema.types.values() {
        for field in ty.fields.iter().filter(|field| field.owner == ty.name) {
            let (Some(directive), Some(search)) = (field.search(), field.search_directive()) else {
                continue;
            };
            let class = schema.classify(&field.ty);
            let prefix = format!("Type {}; Field {}: has the @{SEARCH_DIRECTIVE} directive but", ty.name, field.name);

            if !class.is_scalar() || class == FieldClass::Id {
                errors.push(RuleError::at(
                    directive.pos,
                    format!("{prefix} fields of type {} can't have the @{SEARCH_DIRECTIVE} directive.", field.ty.name),
                ));
                continue;
            }

            let requested = search.by.clone().unwrap_or_default();
            if let Some(repeated) = requested.iter().duplicates().next() {
                errors.push(RuleError::at(
                    directive.pos,
                    format!("{prefix} the argument {repeated} is repeated."),
                ));
            }

            for kind in &requested {
                if !kind.applies_to(class) {
                    errors.push(RuleError::at(
                        directive.pos,
                        format!(
                            "{prefix} the argument {kind} doesn't apply to field type {}. Search by {kind} applies to fields of type {}.",
                            field.ty.name,
                            applicable_types(*kind),
                        ),
                    ));
                }
            }

            let kinds = search.kinds(class);
            if kinds.contains(&IndexKind::Hash) && kinds.contains(&IndexKind::Exact) {
                errors.push(RuleError::at(
                    directive.pos,
                    format!("{prefix} the arguments 'hash' and 'exact' can't be both set."),
                ));
            }
            if kinds.iter().filter(|kind| kind.is_datetime_granularity()).count() > 1 {
                errors.push(RuleError::at(
                    directive.pos,
                    format!("{prefix} it can't have more than one of year, month, day and hour."),
                ));
            }
        }
    }

    errors
}

fn applicable_types(kind: IndexKind) -> &'static str {
    match kind {
        IndexKind::Int => "Int",
        IndexKind::Int64 => "Int64",
        IndexKind::Float => "Float",
        IndexKind::Bool => "Boolean",
        IndexKind::Hash | IndexKind::Exact | IndexKind::Trigram | IndexKind::Regexp => "String and enums",
        IndexKind::Term | IndexKind::Fulltext => "String",
        IndexKind::Year | IndexKind::Month | IndexKind::Day | IndexKind::Hour => "DateTime",
    }
}
