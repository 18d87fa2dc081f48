use openssl::symm::{decrypt, encrypt, Cipher};
use ring::rand::{SecureRandom, SystemRandom};

use crate::envelope::errors::*;
use crate::envelope::format::FormatVersion;

// length of key material for AES-256
pub const SESSION_KEY_LEN: usize = 32;
// length of AES-CBC initialisation vector prepended to cipher text
pub const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

// shortest modern blob: iv and one padded block
pub const MIN_CHAINED_LEN: usize = IV_LEN + BLOCK_LEN;

pub type SessionKey = [u8; SESSION_KEY_LEN];

pub fn generate_session_key() -> SessionKey {
    let mut session_key = [0u8; SESSION_KEY_LEN];
    SystemRandom::new().fill(&mut session_key).expect("unable to generate session key");
    session_key
}

#[inline]
fn check_key(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() == SESSION_KEY_LEN {
        Ok(())
    } else {
        error!("Session key is {} bytes", key.len());
        Err(CryptoError::InvalidKeyLength)
    }
}

/// Encrypts with AES-256-CBC under a fresh IV; returns `iv | cipher text`.
pub fn encrypt_payload(payload: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_key(key)?;
    let mut iv = [0u8; IV_LEN];
    SystemRandom::new().fill(&mut iv).expect("cannot generate iv");
    let cipher_text = encrypt(Cipher::aes_256_cbc(), key, Some(&iv), payload)
        .map_err(|e| {
            error!("Encryption error: {}", e);
            CryptoError::EncryptionFailed
        })?;
    let mut data = Vec::with_capacity(IV_LEN + cipher_text.len());
    data.extend_from_slice(&iv);
    data.extend_from_slice(&cipher_text);
    Ok(data)
}

fn decrypt_chained(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let (iv, cipher_text) = data.split_at(IV_LEN);
    decrypt(Cipher::aes_256_cbc(), key, Some(iv), cipher_text)
        .map_err(|e| {
            debug!("CBC decryption error: {}", e);
            CryptoError::DecryptionFailed
        })
}

fn decrypt_unchained(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    decrypt(Cipher::aes_256_ecb(), key, None, data)
        .map_err(|e| {
            debug!("ECB decryption error: {}", e);
            CryptoError::DecryptionFailed
        })
}

/// Decrypts a blob of unknown vintage: `iv | cbc blocks` first, then the whole blob as ECB blocks
/// written by the protocol version that had no IV.
pub fn decrypt_payload(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_key(key)?;
    if data.is_empty() {
        return Err(CryptoError::EmptyPayload);
    }
    if data.len() >= MIN_CHAINED_LEN {
        match decrypt_chained(data, key) {
            Ok(plain_text) => return Ok(plain_text),
            Err(_) => warn!("CBC decryption failed, trying legacy ECB"),
        }
    } else {
        warn!("Payload of {} bytes is too short for an IV, trying legacy ECB", data.len());
    }
    decrypt_unchained(data, key)
        .map(|plain_text| {
            info!("Decrypted legacy ECB payload");
            plain_text
        })
        .map_err(|e| {
            error!("All payload decryption attempts failed");
            e
        })
}

/// Decrypts `iv | cbc blocks` only.
pub fn decrypt_payload_chained(data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    check_key(key)?;
    if data.is_empty() {
        return Err(CryptoError::EmptyPayload);
    }
    if data.len() < MIN_CHAINED_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    decrypt_chained(data, key)
}

pub fn decrypt_payload_for(version: FormatVersion, data: &[u8], key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    match version {
        FormatVersion::Legacy => decrypt_payload(data, key),
        FormatVersion::V1 => decrypt_payload_chained(data, key),
    }
}
