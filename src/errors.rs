use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// A directory setting fetched from Harbor that cannot be used as-is.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} is missing")]
    Missing { key: &'static str },

    #[error("{key} is not {expected}: {value}({observed})")]
    WrongType {
        key: &'static str,
        expected: &'static str,
        value: String,
        observed: &'static str,
    },
}

impl ConfigError {
    pub fn wrong_type(key: &'static str, expected: &'static str, value: &Value) -> Self {
        ConfigError::WrongType {
            key,
            expected,
            value: value.to_string(),
            observed: json_type_name(value),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{context} request failed")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context} returned {status} {body}")]
    UnexpectedStatus {
        context: String,
        status: StatusCode,
        body: String,
    },

    #[error("{context} returned an unreadable body")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}")]
    Directory {
        context: String,
        #[source]
        source: ldap3::LdapError,
    },

    #[error("Invalid Harbor URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SyncError {
    pub fn transport(context: &str, source: reqwest::Error) -> Self {
        SyncError::Transport {
            context: context.to_string(),
            source,
        }
    }

    pub fn directory(context: impl Into<String>, source: ldap3::LdapError) -> Self {
        SyncError::Directory {
            context: context.into(),
            source,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
