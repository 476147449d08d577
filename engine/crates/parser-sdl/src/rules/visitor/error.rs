use std::fmt;

use async_graphql_parser::Pos;
use itertools::Itertools;

/// A schema validation failure, tagged with the positions it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    pub locations: Vec<Pos>,
    pub message: String,
}

impl RuleError {
    pub(crate) fn new(locations: Vec<Pos>, msg: impl Into<String>) -> Self {
        Self {
            locations,
            message: msg.into(),
        }
    }

    pub(crate) fn at(pos: Pos, msg: impl Into<String>) -> Self {
        Self::new(vec![pos], msg)
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.locations.is_empty() {
            let locations = self
                .locations
                .iter()
                .map(|pos| format!("{}:{}", pos.line, pos.column))
                .join(", ");
            write!(f, "[{locations}] ")?;
        }

        f.write_str(&self.message)
    }
}

impl std::error::Error for RuleError {}
