use common_types::auth::AuthOperation;
use gateway_v2_auth_config::ConfigError;
use jwt_verifier::VerificationError;
use runtime::StoreError;

/// Why a schema submission was rejected. The previously published snapshot stays active.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("invalid schema: {}", describe(.0))]
    Schema(#[from] parser_sdl::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unusable token configuration: {0}")]
    Verifier(#[from] VerificationError),
}

fn describe(error: &parser_sdl::Error) -> String {
    match error {
        parser_sdl::Error::Parser(err) => err.to_string(),
        parser_sdl::Error::Validation(errors) => errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no schema has been published")]
    NoSchema,
    #[error("unknown root field {0}")]
    UnknownField(String),
    #[error("invalid argument {argument}: {message}")]
    InvalidArgument { argument: String, message: String },
    #[error("invalid filter for {type_name}: {message}")]
    InvalidFilter { type_name: String, message: String },
    #[error("authorization failed for {operation} on {type_name}")]
    Unauthorized {
        type_name: String,
        operation: AuthOperation,
    },
    #[error("id {value} already exists for field {field} of {type_name}")]
    Conflict {
        type_name: String,
        field: String,
        value: serde_json::Value,
    },
    /// Concurrent writes kept invalidating the unit of work.
    #[error("concurrent writes conflicted with adding a {type_name}")]
    Contended { type_name: String },
    #[error("{type_name} has no entity matching the reference {reference}")]
    DanglingReference {
        type_name: String,
        reference: serde_json::Value,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn invalid_argument(argument: &str, message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument: argument.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_filter(type_name: &str, message: impl Into<String>) -> Self {
        Error::InvalidFilter {
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }

    /// Failures the enforcement policy decides about, as opposed to malformed requests.
    pub(crate) fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized { .. }
                | Error::Conflict { .. }
                | Error::Contended { .. }
                | Error::DanglingReference { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
