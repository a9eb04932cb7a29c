// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use docstore_core::{Error, ErrorKind, Result, Secret};
use std::str::FromStr;

/// The endpoint and key parsed from an account connection string.
///
/// Connection strings are `;`-separated `Name=Value` pairs:
///
/// ```rust
/// use docstore_client::ConnectionString;
///
/// let connection_string: ConnectionString =
///     "AccountEndpoint=https://localhost:8081/;AccountKey=AAAA;".parse().unwrap();
/// assert_eq!(connection_string.account_endpoint, "https://localhost:8081/");
/// assert_eq!(connection_string.account_key.secret(), "AAAA");
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionString {
    pub account_endpoint: String,
    pub account_key: Secret,
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(connection_string: &str) -> Result<Self> {
        if connection_string.trim().is_empty() {
            return Err(Error::message(
                ErrorKind::Configuration,
                "connection string is empty",
            ));
        }

        let mut account_endpoint = None;
        let mut account_key = None;

        for part in connection_string.split(';').map(str::trim) {
            if part.is_empty() {
                continue;
            }
            // Keys are base64 and may end in '=', so only the first '=' separates.
            let (name, value) = part.split_once('=').ok_or_else(|| {
                Error::message(
                    ErrorKind::Configuration,
                    "connection string segments must be 'Name=Value' pairs",
                )
            })?;
            match name.trim() {
                name if name.eq_ignore_ascii_case("AccountEndpoint") => {
                    account_endpoint = Some(value.trim().to_string())
                }
                name if name.eq_ignore_ascii_case("AccountKey") => {
                    account_key = Some(value.trim().to_string())
                }
                _ => {}
            }
        }

        match (account_endpoint, account_key) {
            (Some(account_endpoint), Some(account_key))
                if !account_endpoint.is_empty() && !account_key.is_empty() =>
            {
                Ok(Self {
                    account_endpoint,
                    account_key: Secret::new(account_key),
                })
            }
            _ => Err(Error::message(
                ErrorKind::Configuration,
                "connection string must contain both 'AccountEndpoint' and 'AccountKey'",
            )),
        }
    }
}

impl TryFrom<&Secret> for ConnectionString {
    type Error = Error;

    fn try_from(secret: &Secret) -> Result<Self> {
        secret.secret().parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoint_and_key() {
        let parsed: ConnectionString =
            "AccountEndpoint=https://example.documents.local:443/;AccountKey=a2V5==;"
                .parse()
                .unwrap();
        assert_eq!(
            parsed.account_endpoint,
            "https://example.documents.local:443/"
        );
        assert_eq!(parsed.account_key.secret(), "a2V5==");
    }

    #[test]
    fn names_are_case_insensitive_and_unknown_names_ignored() {
        let parsed: ConnectionString =
            "accountendpoint=https://localhost:8081/; Database=ignored ;ACCOUNTKEY=AAAA"
                .parse()
                .unwrap();
        assert_eq!(parsed.account_endpoint, "https://localhost:8081/");
        assert_eq!(parsed.account_key.secret(), "AAAA");
    }

    #[test]
    fn missing_parts_are_configuration_errors() {
        for input in [
            "",
            "AccountEndpoint=https://localhost:8081/",
            "AccountKey=AAAA",
            "AccountEndpoint=;AccountKey=AAAA",
            "garbage",
        ] {
            let error = input.parse::<ConnectionString>().unwrap_err();
            assert_eq!(error.kind(), &ErrorKind::Configuration, "input: {input}");
        }
    }
}
