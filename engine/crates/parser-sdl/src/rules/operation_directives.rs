//! Directives that belong in operations. They are declared so that operations may use them, but a
//! schema document may not.

use super::directive::Directive;

pub const CASCADE_DIRECTIVE: &str = "cascade";
pub const CACHE_CONTROL_DIRECTIVE: &str = "cacheControl";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CascadeDirective {
    pub fields: Option<Vec<String>>,
}

impl Directive for CascadeDirective {
    fn definition() -> String {
        format!("directive @{CASCADE_DIRECTIVE}(fields: [String]) on FIELD")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CacheControlDirective {
    pub max_age: u32,
}

impl Directive for CacheControlDirective {
    fn definition() -> String {
        format!("directive @{CACHE_CONTROL_DIRECTIVE}(maxAge: Int!) on QUERY")
    }
}
