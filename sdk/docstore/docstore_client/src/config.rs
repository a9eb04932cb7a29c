// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Locating an account from the environment.

use crate::ConnectionString;
use docstore_core::{Error, ErrorKind, Result, Secret};

/// Holds a full connection string (`AccountEndpoint=...;AccountKey=...;`).
pub const CONNECTION_STRING_VAR: &str = "DOCSTORE_CONNECTION_STRING";
/// Holds the account endpoint URL, used with [`KEY_VAR`].
pub const ENDPOINT_VAR: &str = "DOCSTORE_ENDPOINT";
/// Holds the base64 account key, used with [`ENDPOINT_VAR`].
pub const KEY_VAR: &str = "DOCSTORE_KEY";

/// Where to reach an account and how to authenticate to it.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: String,
    pub key: Secret,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, key: impl Into<Secret>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
        }
    }

    /// Reads the configuration from process environment variables.
    ///
    /// [`CONNECTION_STRING_VAR`] wins when set; otherwise both [`ENDPOINT_VAR`] and [`KEY_VAR`]
    /// must be present. Anything missing is an [`ErrorKind::Configuration`] error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::from_env`], with variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(connection_string) = lookup(CONNECTION_STRING_VAR) {
            let parsed: ConnectionString = connection_string.parse()?;
            return Ok(Self {
                endpoint: parsed.account_endpoint,
                key: parsed.account_key,
            });
        }

        match (lookup(ENDPOINT_VAR), lookup(KEY_VAR)) {
            (Some(endpoint), Some(key)) => Ok(Self::new(endpoint, key)),
            (None, _) => Err(missing(ENDPOINT_VAR)),
            (Some(_), None) => Err(missing(KEY_VAR)),
        }
    }
}

impl From<ConnectionString> for ClientConfig {
    fn from(connection_string: ConnectionString) -> Self {
        Self {
            endpoint: connection_string.account_endpoint,
            key: connection_string.account_key,
        }
    }
}

fn missing(name: &str) -> Error {
    Error::message(
        ErrorKind::Configuration,
        format!("set {CONNECTION_STRING_VAR}, or both {ENDPOINT_VAR} and {KEY_VAR} ({name} is missing)"),
    )
}
