use std::convert::TryInto;

use base64::{decode as b64decode, encode as b64encode};
use openssl::encrypt::{Decrypter, Encrypter};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPrivate, HasPublic, PKeyRef};
use openssl::rsa::Padding;

use crate::envelope::errors::*;
use crate::envelope::format::FormatVersion;
use crate::envelope::key_codec::{parse_private_key, parse_public_key};
use crate::envelope::symmetric::{SessionKey, SESSION_KEY_LEN};

// length of base64 text of a session key, wrapped by mistake by one historical encoder
const DOUBLE_ENCODED_LEN: usize = 44;
// two marker bytes, eight padding bytes and the separator
const PKCS1_MIN_PADDING_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapScheme {
    OaepSha256,
    // node-forge default for RSA-OAEP
    OaepSha1,
    Pkcs1,
}

impl WrapScheme {
    pub fn padding(&self) -> Padding {
        match self {
            WrapScheme::OaepSha256 | WrapScheme::OaepSha1 => Padding::PKCS1_OAEP,
            WrapScheme::Pkcs1 => Padding::PKCS1,
        }
    }

    fn digest(&self) -> Option<MessageDigest> {
        match self {
            WrapScheme::OaepSha256 => Some(MessageDigest::sha256()),
            WrapScheme::OaepSha1 => Some(MessageDigest::sha1()),
            WrapScheme::Pkcs1 => None,
        }
    }
}

// tried in order for unversioned envelopes
const LEGACY_SCHEMES: [WrapScheme; 3] = [WrapScheme::OaepSha256, WrapScheme::OaepSha1, WrapScheme::Pkcs1];

fn rsa_encrypt<T>(key: &PKeyRef<T>, scheme: WrapScheme, plain_text: &[u8]) -> Result<Vec<u8>, ErrorStack> where T: HasPublic {
    let mut encrypter = Encrypter::new(key)?;
    encrypter.set_rsa_padding(scheme.padding())?;
    if let Some(digest) = scheme.digest() {
        encrypter.set_rsa_oaep_md(digest)?;
        encrypter.set_rsa_mgf1_md(digest)?;
    }
    let mut cipher_text: Vec<u8> = vec![0; encrypter.encrypt_len(plain_text)?];
    let len = encrypter.encrypt(plain_text, &mut cipher_text)?;
    cipher_text.truncate(len);
    Ok(cipher_text)
}

fn rsa_decrypt<T>(key: &PKeyRef<T>, scheme: WrapScheme, cipher_text: &[u8]) -> Result<Vec<u8>, ErrorStack> where T: HasPrivate {
    let mut decrypter = Decrypter::new(key)?;
    decrypter.set_rsa_padding(scheme.padding())?;
    if let Some(digest) = scheme.digest() {
        decrypter.set_rsa_oaep_md(digest)?;
        decrypter.set_rsa_mgf1_md(digest)?;
    }
    let mut plain_text: Vec<u8> = vec![0; decrypter.decrypt_len(cipher_text)?];
    let len = decrypter.decrypt(cipher_text, &mut plain_text)?;
    plain_text.truncate(len);
    Ok(plain_text)
}

// EME-PKCS1-v1_5: 0x00 | 0x02 | at least 8 nonzero bytes | 0x00 | message
fn strip_pkcs1_padding(block: &[u8]) -> Option<&[u8]> {
    if block.len() < PKCS1_MIN_PADDING_LEN || block[0] != 0x00 || block[1] != 0x02 {
        return None;
    }
    let separator = block[2..].iter().position(|&byte| byte == 0x00)?;
    if separator < 8 {
        return None;
    }
    Some(&block[2 + separator + 1..])
}

// NB: raw RSA, openssl 3.2+ implicit rejection hides PKCS1 padding failures
fn rsa_decrypt_pkcs1<T>(key: &PKeyRef<T>, cipher_text: &[u8]) -> Result<Vec<u8>, String> where T: HasPrivate {
    let rsa = key.rsa().map_err(|e| e.to_string())?;
    let mut block: Vec<u8> = vec![0; rsa.size() as usize];
    let len = rsa.private_decrypt(cipher_text, &mut block, Padding::NONE)
        .map_err(|e| e.to_string())?;
    block.truncate(len);
    strip_pkcs1_padding(&block)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| "invalid PKCS1 padding".to_owned())
}

fn legacy_decrypt<T>(key: &PKeyRef<T>, scheme: WrapScheme, cipher_text: &[u8]) -> Result<Vec<u8>, String> where T: HasPrivate {
    match scheme {
        WrapScheme::Pkcs1 => rsa_decrypt_pkcs1(key, cipher_text),
        _ => rsa_decrypt(key, scheme, cipher_text).map_err(|e| e.to_string()),
    }
}

fn session_key_from(bytes: &[u8]) -> Result<SessionKey, CryptoError> {
    bytes.try_into().map_err(|_| {
        error!("Unwrapped session key is {} bytes", bytes.len());
        CryptoError::InvalidSessionKey
    })
}

fn correct_double_encoding(plain_text: &[u8]) -> Result<SessionKey, CryptoError> {
    if plain_text.len() == DOUBLE_ENCODED_LEN {
        match b64decode(plain_text) {
            Ok(ref decoded) if decoded.len() == SESSION_KEY_LEN => {
                warn!("Unwrapped session key is base64 text, decoding");
                return session_key_from(decoded);
            },
            _ => debug!("{} byte session key is not base64 text", DOUBLE_ENCODED_LEN),
        }
    }
    session_key_from(plain_text)
}

pub fn wrap_key_with<T>(key: &[u8], recipient_public_key: &PKeyRef<T>) -> Result<String, CryptoError> where T: HasPublic {
    if key.len() != SESSION_KEY_LEN {
        return Err(CryptoError::InvalidKeyLength);
    }
    rsa_encrypt(recipient_public_key, WrapScheme::OaepSha256, key)
        .map(|cipher_text| b64encode(&cipher_text))
        .map_err(|e| {
            error!("Key wrap error: {}", e);
            CryptoError::EncryptionFailed
        })
}

/// RSA-OAEP(SHA-256) encrypts the raw session key; returns base64 text.
pub fn wrap_key(key: &[u8], recipient_public_key: &str) -> Result<String, CryptoError> {
    let recipient_public_key = parse_public_key(recipient_public_key)?;
    wrap_key_with(key, &recipient_public_key)
}

pub fn unwrap_key_with<T>(version: FormatVersion, wrapped: &str, recipient_private_key: &PKeyRef<T>) -> Result<SessionKey, CryptoError> where T: HasPrivate {
    let cipher_text = b64decode(wrapped.trim())
        .map_err(|e| {
            error!("Wrapped key is not base64: {}", e);
            CryptoError::KeyWrapFailed
        })?;
    match version {
        FormatVersion::V1 => {
            let plain_text = rsa_decrypt(recipient_private_key, WrapScheme::OaepSha256, &cipher_text)
                .map_err(|e| {
                    error!("Key unwrap error: {}", e);
                    CryptoError::KeyWrapFailed
                })?;
            session_key_from(&plain_text)
        },
        FormatVersion::Legacy => {
            let plain_text = LEGACY_SCHEMES.iter()
                .find_map(|&scheme| match legacy_decrypt(recipient_private_key, scheme, &cipher_text) {
                    Ok(plain_text) => {
                        if scheme != WrapScheme::OaepSha256 {
                            warn!("Session key unwrapped with legacy scheme {:?}", scheme);
                        }
                        Some(plain_text)
                    },
                    Err(e) => {
                        debug!("Key unwrap with {:?} failed: {}", scheme, e);
                        None
                    },
                })
                .ok_or_else(|| {
                    error!("All key unwrap attempts failed");
                    CryptoError::KeyWrapFailed
                })?;
            correct_double_encoding(&plain_text)
        },
    }
}

/// Unwraps a session key of unknown vintage: RSA-OAEP(SHA-256), RSA-OAEP(SHA-1), then RSAES-PKCS1-v1_5,
/// accepting base64 text of the key in place of the key itself.
pub fn unwrap_key(wrapped: &str, recipient_private_key: &str) -> Result<SessionKey, CryptoError> {
    let recipient_private_key = parse_private_key(recipient_private_key)?;
    unwrap_key_with(FormatVersion::Legacy, wrapped, &recipient_private_key)
}
