use std::fmt::{Display, Formatter, Result as FormatResult};

use base64::decode as b64decode;
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::rsa::Rsa;
use regex::Regex;

use crate::envelope::errors::*;

lazy_static! {
    static ref RE_PEM_ARMOUR: Regex = Regex::new(
        r"-----BEGIN (?P<label>[A-Z0-9 ]+)-----(?P<body>[A-Za-z0-9+/=\s]*)-----END [A-Z0-9 ]+-----"
    ).expect("cannot compile regex");
}

const PEM_HEADER_PREFIX: &str = "-----BEGIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Public,
    Private,
}

impl KeyKind {
    pub fn label(&self) -> &'static str {
        match self {
            KeyKind::Public => "PUBLIC",
            KeyKind::Private => "PRIVATE",
        }
    }
}

impl Display for KeyKind {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "{} KEY", self.label())
    }
}

/// Wraps raw base64 key material in PEM markers; PEM text is returned unchanged.
/// Nothing is validated here, a malformed body only fails when parsed.
pub fn normalize_to_pem(key: &str, kind: KeyKind) -> String {
    if key.trim_start().starts_with(PEM_HEADER_PREFIX) {
        return key.to_owned();
    }
    format!("-----BEGIN {kind}-----\n{body}\n-----END {kind}-----", kind = kind, body = key.trim())
}

#[inline]
pub fn bytes_to_hex<T>(bytes: T) -> String where T: AsRef<[u8]> {
    hex::encode(bytes)
}

pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, HexDecodeError> {
    hex::decode(hex.trim()).or(Err(HexDecodeError))
}

// base64 body of the first PEM block, decoded to DER
fn armour_to_der(pem: &str) -> Option<Vec<u8>> {
    let captures = RE_PEM_ARMOUR.captures(pem)?;
    let body: String = captures["body"].chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    b64decode(&body)
        .map_err(|e| debug!("PEM body of {} is not base64: {}", &captures["label"], e))
        .ok()
}

fn ensure_rsa<T>(key: PKey<T>) -> Result<PKey<T>, CryptoError> {
    if key.id() == Id::RSA {
        Ok(key)
    } else {
        error!("Key is not an RSA key");
        Err(CryptoError::InvalidKeyMaterial)
    }
}

/// Accepts SubjectPublicKeyInfo or PKCS#1 public keys, as PEM or raw base64.
pub fn parse_public_key(key: &str) -> Result<PKey<Public>, CryptoError> {
    let pem = normalize_to_pem(key, KeyKind::Public);
    if let Ok(public_key) = PKey::public_key_from_pem(pem.as_bytes()) {
        return ensure_rsa(public_key);
    }
    let der = armour_to_der(&pem).ok_or(CryptoError::InvalidKeyMaterial)?;
    let public_key = PKey::public_key_from_der(&der)
        .or_else(|_| Rsa::public_key_from_der_pkcs1(&der).and_then(PKey::from_rsa))
        .map_err(|e| {
            error!("Cannot parse public key: {}", e);
            CryptoError::InvalidKeyMaterial
        })?;
    ensure_rsa(public_key)
}

/// Accepts PKCS#8 or PKCS#1 private keys, as PEM or raw base64.
pub fn parse_private_key(key: &str) -> Result<PKey<Private>, CryptoError> {
    let pem = normalize_to_pem(key, KeyKind::Private);
    // NB: empty passphrase so that encrypted keys fail instead of prompting on a tty
    if let Ok(private_key) = PKey::private_key_from_pem_passphrase(pem.as_bytes(), b"") {
        return ensure_rsa(private_key);
    }
    let der = armour_to_der(&pem).ok_or(CryptoError::InvalidKeyMaterial)?;
    let private_key = PKey::private_key_from_der(&der)
        .map_err(|e| {
            error!("Cannot parse private key: {}", e);
            CryptoError::InvalidKeyMaterial
        })?;
    ensure_rsa(private_key)
}
