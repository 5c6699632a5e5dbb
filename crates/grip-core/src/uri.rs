use std::fmt;

use base64::Engine;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::errors::GripError;

const BASE64_PREFIX: &str = "base64:";

/// Signing key for a GRIP control endpoint. Redacted in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ControlKey(Vec<u8>);

impl ControlKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Accepts a raw key or a `base64:`-prefixed encoded one.
    pub fn parse(value: &str) -> Result<Self, GripError> {
        match value.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(Self)
                .map_err(|e| GripError::InvalidKey(e.to_string())),
            None => Ok(Self(value.as_bytes().to_vec())),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ControlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ControlKey([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for ControlKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ControlKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// One GRIP proxy's publish endpoint and credentials.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GripProxy {
    /// Entries without a control URI are ignored by publishers.
    #[serde(default)]
    pub control_uri: Option<String>,
    #[serde(default)]
    pub control_iss: Option<String>,
    #[serde(default)]
    pub key: Option<ControlKey>,
}

/// Parse a GRIP URI such as `https://api.example.com/realm/x?iss=x&key=base64:...`.
///
/// `iss` and `key` are lifted out of the query; other parameters stay on the
/// control URI. A trailing slash on the path is dropped.
pub fn parse_grip_uri(uri: &str) -> Result<GripProxy, GripError> {
    let parsed = Url::parse(uri).map_err(|e| GripError::InvalidUri(format!("{uri}: {e}")))?;

    let mut iss = None;
    let mut key = None;
    let mut rest = url::form_urlencoded::Serializer::new(String::new());
    let mut has_rest = false;
    // Base64 keys contain '+', which form decoding would turn into a space.
    let query = parsed.query().unwrap_or_default().replace('+', "%2B");
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match name.as_ref() {
            "iss" => iss = Some(value.into_owned()),
            "key" => key = Some(ControlKey::parse(&value)?),
            _ => {
                rest.append_pair(&name, &value);
                has_rest = true;
            }
        }
    }

    let path = parsed.path();
    let path = path.strip_suffix('/').unwrap_or(path);
    let mut control_uri = format!("{}://{}{}", parsed.scheme(), parsed.authority(), path);
    if has_rest {
        control_uri.push('?');
        control_uri.push_str(&rest.finish());
    }

    Ok(GripProxy {
        control_uri: Some(control_uri),
        control_iss: iss.filter(|s| !s.is_empty()),
        key: key.filter(|k| !k.as_bytes().is_empty()),
    })
}
