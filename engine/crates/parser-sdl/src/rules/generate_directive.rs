use super::directive::Directive;

pub const GENERATE_DIRECTIVE: &str = "generate";

fn enabled() -> bool {
    true
}

/// Toggles for the generated root fields of a type. Everything is generated by default;
/// subscriptions follow `@withSubscription` unless `subscription` is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateDirective {
    #[serde(default)]
    pub query: GenerateQuery,
    #[serde(default)]
    pub mutation: GenerateMutation,
    pub subscription: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateQuery {
    #[serde(default = "enabled")]
    pub get: bool,
    #[serde(default = "enabled")]
    pub query: bool,
    #[serde(default = "enabled")]
    pub password: bool,
    #[serde(default = "enabled")]
    pub aggregate: bool,
}

impl Default for GenerateQuery {
    fn default() -> Self {
        GenerateQuery {
            get: true,
            query: true,
            password: true,
            aggregate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateMutation {
    #[serde(default = "enabled")]
    pub add: bool,
    #[serde(default = "enabled")]
    pub update: bool,
    #[serde(default = "enabled")]
    pub delete: bool,
}

impl Default for GenerateMutation {
    fn default() -> Self {
        GenerateMutation {
            add: true,
            update: true,
            delete: true,
        }
    }
}

impl Directive for GenerateDirective {
    fn definition() -> String {
        format!(
            r"directive @{GENERATE_DIRECTIVE}(
	query: GenerateQueryParams,
	mutation: GenerateMutationParams,
	subscription: Boolean) on OBJECT | INTERFACE"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_toggles_stay_enabled() {
        let generate: GenerateDirective = serde_json::from_value(serde_json::json!({
            "query": { "aggregate": false },
            "mutation": { "delete": false },
        }))
        .unwrap();

        assert!(generate.query.get && generate.query.query && generate.query.password);
        assert!(!generate.query.aggregate);
        assert!(generate.mutation.add && generate.mutation.update);
        assert!(!generate.mutation.delete);
        assert_eq!(generate.subscription, None);
    }
}
