// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Master-key request signing.
//!
//! Every request carries an `authorization` header holding an HMAC-SHA256 signature over the
//! verb, resource type, resource link and `x-ms-date`, keyed with the decoded account key.

use base64::{engine::general_purpose::STANDARD, Engine};
use docstore_core::{http::Method, Error, ErrorKind, Result, Secret};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::fmt;
use time::{macros::format_description, OffsetDateTime};

/// An account key, decoded and ready to sign requests.
#[derive(Clone)]
pub struct MasterKeyCredential {
    key: Vec<u8>,
}

impl MasterKeyCredential {
    /// Decodes a base64 account key.
    ///
    /// Fails with [`ErrorKind::Configuration`] if the key is empty or not valid base64.
    pub fn new(key: &Secret) -> Result<Self> {
        let encoded = key.secret().trim();
        if encoded.is_empty() {
            return Err(Error::message(
                ErrorKind::Configuration,
                "account key is empty",
            ));
        }
        let key = STANDARD.decode(encoded).map_err(|error| {
            Error::full(
                ErrorKind::Configuration,
                error,
                "account key is not valid base64",
            )
        })?;
        Ok(Self { key })
    }

    /// Computes the value of the `authorization` header.
    ///
    /// `resource_type` is the lower-case feed segment (`dbs`, `colls`, `docs`) and `date` the
    /// exact value sent in `x-ms-date`.
    pub fn authorization_header(
        &self,
        method: Method,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String> {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n\n",
            method.as_str().to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).map_err(|_| {
            Error::message(ErrorKind::Configuration, "account key rejected by HMAC")
        })?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        let token = format!("type=master&ver=1.0&sig={signature}");
        Ok(utf8_percent_encode(&token, NON_ALPHANUMERIC).to_string())
    }
}

impl fmt::Debug for MasterKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKeyCredential")
    }
}

/// Formats a timestamp the way `x-ms-date` expects it (RFC 1123, always GMT).
pub fn format_date(now: OffsetDateTime) -> Result<String> {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    now.to_offset(time::UtcOffset::UTC)
        .format(format)
        .map_err(|error| {
            Error::full(
                ErrorKind::DataConversion,
                error,
                "failed to format request date",
            )
        })
}
