use std::fmt::{Debug, Display, Formatter, Result as FormatResult};

use base64::{decode as b64decode, encode as b64encode};
use openssl::memcmp;
use openssl::pkey::{HasPrivate, HasPublic, PKeyRef};
use openssl::rsa::Padding;
use ring::digest::{digest, SHA256, SHA256_OUTPUT_LEN};

use crate::envelope::errors::*;
use crate::envelope::key_codec::{bytes_to_hex, parse_private_key, parse_public_key};

pub const DIGEST_LEN: usize = SHA256_OUTPUT_LEN;

// DER encoded DigestInfo header for SHA-256, as in RSASSA-PKCS1-v1_5
const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01,
    0x65, 0x03, 0x04, 0x02, 0x01, 0x05, 0x00, 0x04, 0x20,
];

/// SHA-256 of the original plain text, which is what gets signed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    fn digest_info(&self) -> Vec<u8> {
        let mut digest_info = Vec::with_capacity(SHA256_DIGEST_INFO.len() + DIGEST_LEN);
        digest_info.extend_from_slice(&SHA256_DIGEST_INFO);
        digest_info.extend_from_slice(&self.0);
        digest_info
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for Digest {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "Digest({})", self.to_hex())
    }
}

pub fn content_digest(plain_text: &[u8]) -> Digest {
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(digest(&SHA256, plain_text).as_ref());
    Digest(bytes)
}

pub fn sign_digest<T>(digest: &Digest, sender_private_key: &PKeyRef<T>) -> Result<String, CryptoError> where T: HasPrivate {
    let rsa = sender_private_key.rsa().or(Err(CryptoError::InvalidKeyMaterial))?;
    let mut signature: Vec<u8> = vec![0; rsa.size() as usize];
    let len = rsa.private_encrypt(&digest.digest_info(), &mut signature, Padding::PKCS1)
        .map_err(|e| {
            error!("Signing error: {}", e);
            CryptoError::InvalidKeyMaterial
        })?;
    signature.truncate(len);
    Ok(b64encode(&signature))
}

/// `Ok(false)` is a mismatch; errors are reserved for signatures that cannot be read at all.
pub fn verify_digest<T>(digest: &Digest, signature: &str, sender_public_key: &PKeyRef<T>) -> Result<bool, CryptoError> where T: HasPublic {
    let signature = b64decode(signature.trim())
        .map_err(|e| {
            error!("Signature is not base64: {}", e);
            CryptoError::SignatureParseError
        })?;
    let rsa = sender_public_key.rsa().or(Err(CryptoError::InvalidKeyMaterial))?;
    let len = rsa.size() as usize;
    if signature.len() != len {
        error!("Signature is {} bytes, expected {}", signature.len(), len);
        return Err(CryptoError::SignatureParseError);
    }
    let mut recovered: Vec<u8> = vec![0; len];
    let recovered_len = match rsa.public_decrypt(&signature, &mut recovered, Padding::PKCS1) {
        Ok(recovered_len) => recovered_len,
        Err(e) => {
            warn!("Signature does not match content digest {}: {}", digest, e);
            return Ok(false);
        },
    };
    recovered.truncate(recovered_len);
    let expected = digest.digest_info();
    let matches = recovered.len() == expected.len() && memcmp::eq(&recovered, &expected);
    if !matches {
        warn!("Signature does not match content digest {}", digest);
    }
    Ok(matches)
}

/// Signs the SHA-256 digest of `plain_text` with RSASSA-PKCS1-v1_5; returns base64 text.
pub fn sign_plaintext(plain_text: &[u8], sender_private_key: &str) -> Result<String, CryptoError> {
    let sender_private_key = parse_private_key(sender_private_key)?;
    let digest = content_digest(plain_text);
    debug!("Signing content digest {}", digest);
    sign_digest(&digest, &sender_private_key)
}

pub fn verify_signature(plain_text: &[u8], signature: &str, sender_public_key: &str) -> Result<bool, CryptoError> {
    let sender_public_key = parse_public_key(sender_public_key)?;
    let digest = content_digest(plain_text);
    debug!("Verifying content digest {}", digest);
    verify_digest(&digest, signature, &sender_public_key)
}


#[cfg(test)]
mod tests {
    use super::*;
    use openssl::hash::MessageDigest;
    use openssl::pkey::PKey;
    use openssl::sign::{Signer, Verifier};
    use crate::test_keys::{SENDER, STRANGER};

    #[test]
    fn content_digests() {
        let digest = content_digest(b"hello world");
        assert_eq!(digest.to_hex(), "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
        assert_eq!(digest.as_ref().len(), DIGEST_LEN);
        assert_eq!(content_digest(b"").to_hex(), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn round_trip() {
        let payloads: [&[u8]; 3] = [b"", b"hello world", &[0xa5; 4096]];
        for &payload in payloads.iter() {
            let signature = sign_plaintext(payload, &SENDER.private_pem()).unwrap();
            assert_eq!(b64decode(&signature).unwrap().len(), 256);
            assert_eq!(verify_signature(payload, &signature, &SENDER.public_pem()), Ok(true));
            assert_eq!(verify_signature(payload, &signature, &SENDER.public_base64()), Ok(true));
        }
    }

    #[test]
    fn deterministic() {
        let signature1 = sign_plaintext(b"same content", &SENDER.private_pem()).unwrap();
        let signature2 = sign_plaintext(b"same content", &SENDER.private_base64()).unwrap();
        assert_eq!(signature1, signature2);
    }

    #[test]
    fn mismatch() {
        let signature = sign_plaintext(b"hello world", &SENDER.private_pem()).unwrap();
        assert_eq!(verify_signature(b"hello world!", &signature, &SENDER.public_pem()), Ok(false));
        assert_eq!(verify_signature(b"hello world", &signature, &STRANGER.public_pem()), Ok(false));

        let mut tampered = b64decode(&signature).unwrap();
        tampered[100] ^= 0x80;
        assert_eq!(verify_signature(b"hello world", &b64encode(&tampered), &SENDER.public_pem()), Ok(false));
    }

    #[test]
    fn malformed() {
        assert_eq!(verify_signature(b"data", "not base64!", &SENDER.public_pem()), Err(CryptoError::SignatureParseError));
        assert_eq!(verify_signature(b"data", "c2hvcnQ=", &SENDER.public_pem()), Err(CryptoError::SignatureParseError));
        let signature = sign_plaintext(b"data", &SENDER.private_pem()).unwrap();
        assert_eq!(verify_signature(b"data", &signature, "bm90IGEga2V5"), Err(CryptoError::InvalidKeyMaterial));
        assert_eq!(sign_plaintext(b"data", "bm90IGEga2V5"), Err(CryptoError::InvalidKeyMaterial));
    }

    #[test]
    fn interoperates_with_openssl_signatures() {
        let private_key = PKey::from_rsa(SENDER.rsa.clone()).unwrap();
        let mut signer = Signer::new(MessageDigest::sha256(), &private_key).unwrap();
        signer.update(b"signed elsewhere").unwrap();
        let signature = b64encode(&signer.sign_to_vec().unwrap());
        assert_eq!(verify_signature(b"signed elsewhere", &signature, &SENDER.public_pem()), Ok(true));

        let signature = sign_plaintext(b"signed here", &SENDER.private_pem()).unwrap();
        let mut verifier = Verifier::new(MessageDigest::sha256(), &private_key).unwrap();
        verifier.update(b"signed here").unwrap();
        assert!(verifier.verify(&b64decode(&signature).unwrap()).unwrap());
    }
}
