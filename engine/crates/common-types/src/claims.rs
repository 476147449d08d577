use std::collections::BTreeMap;

/// Identity attributes of the caller, extracted from a verified token.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Claims {
    pub authenticated: bool,
    pub namespace: Option<String>,
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    pub fn anonymous() -> Self {
        Claims::default()
    }

    pub fn authenticated(namespace: Option<String>, custom: BTreeMap<String, serde_json::Value>) -> Self {
        Claims {
            authenticated: true,
            namespace,
            custom,
        }
    }

    /// Claim value, `null` being treated as absent.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.custom.get(name).filter(|value| !value.is_null())
    }
}
