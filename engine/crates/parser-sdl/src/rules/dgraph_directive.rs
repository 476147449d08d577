use super::directive::Directive;

pub const DGRAPH_DIRECTIVE: &str = "dgraph";

/// Maps a type or a field to an explicit storage name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DgraphDirective {
    pub r#type: Option<String>,
    pub pred: Option<String>,
}

impl Directive for DgraphDirective {
    fn definition() -> String {
        format!("directive @{DGRAPH_DIRECTIVE}(type: String, pred: String) on OBJECT | INTERFACE | FIELD_DEFINITION")
    }
}
