use std::convert::TryFrom;
use std::fmt::{Debug, Formatter, Result as FormatResult};

use base64::{decode as b64decode, encode as b64encode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::envelope::errors::*;

/// Signature value meaning that the sender did not sign the file.
pub const UNSIGNED: &str = "UNSIGNED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FormatVersion {
    /// Unversioned envelopes written before the version tag existed;
    /// decrypted with the fallback heuristics.
    Legacy,
    /// AES-256-CBC with IV prefix, RSA-OAEP(SHA-256) wrapped raw 32 byte key.
    V1,
}

impl FormatVersion {
    pub const CURRENT: FormatVersion = FormatVersion::V1;

    #[inline]
    pub fn is_legacy(self) -> bool {
        self == FormatVersion::Legacy
    }
}

impl Default for FormatVersion {
    // NB: envelopes without a version field predate versioning
    fn default() -> Self {
        FormatVersion::Legacy
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = CryptoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(FormatVersion::Legacy),
            1 => Ok(FormatVersion::V1),
            _ => Err(CryptoError::UnsupportedVersion),
        }
    }
}

impl From<FormatVersion> for u8 {
    fn from(version: FormatVersion) -> u8 {
        match version {
            FormatVersion::Legacy => 0,
            FormatVersion::V1 => 1,
        }
    }
}

fn unsigned() -> String {
    UNSIGNED.to_owned()
}

fn deserialise_bytes<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error> where D: Deserializer<'de> {
    let encoded: String = Deserialize::deserialize(deserializer)?;
    b64decode(encoded.trim()).map_err(de::Error::custom)
}

fn serialise_bytes<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
    serializer.serialize_str(&b64encode(bytes))
}

/*
envelope shape:
ciphertext:  [ iv: [u8;16] | aes-256-cbc blocks ]      legacy: [ aes-256-ecb blocks ]
wrapped_key: base64(rsa-oaep-sha256(session key))      legacy: base64(rsa-oaep-sha1 or rsa-pkcs1(session key or base64(session key)))
signature:   base64(rsa-pkcs1(sha256 digest info of plaintext)) or "UNSIGNED"
*/
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    #[serde(default)]
    pub version: FormatVersion,
    #[serde(deserialize_with = "deserialise_bytes", serialize_with = "serialise_bytes")]
    pub ciphertext: Vec<u8>,
    pub wrapped_key: String,
    #[serde(default = "unsigned")]
    pub signature: String,
}

impl Envelope {
    pub fn new<W, S>(ciphertext: Vec<u8>, wrapped_key: W, signature: S) -> Envelope where W: Into<String>, S: Into<String> {
        Envelope {
            version: FormatVersion::CURRENT,
            ciphertext,
            wrapped_key: wrapped_key.into(),
            signature: signature.into(),
        }
    }

    /// Envelope of previously stored, unversioned artifacts.
    pub fn legacy<W, S>(ciphertext: Vec<u8>, wrapped_key: W, signature: S) -> Envelope where W: Into<String>, S: Into<String> {
        Envelope {
            version: FormatVersion::Legacy,
            ciphertext,
            wrapped_key: wrapped_key.into(),
            signature: signature.into(),
        }
    }

    pub fn is_signed(&self) -> bool {
        let signature = self.signature.trim();
        !signature.is_empty() && signature != UNSIGNED
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Envelope, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Debug for Envelope {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "Envelope(v{}, {} bytes, signed: {})", u8::from(self.version), self.ciphertext.len(), self.is_signed())
    }
}
