use std::fmt::{Debug, Display, Formatter, Result as FormatResult};

use openssl::pkey::{PKey, Private, Public};

use crate::envelope::errors::*;
use crate::envelope::format::Envelope;
use crate::envelope::key_codec::{parse_private_key, parse_public_key};
use crate::envelope::key_wrap::unwrap_key_with;
use crate::envelope::signature::{content_digest, verify_digest, Digest};
use crate::envelope::symmetric::decrypt_payload_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authenticity {
    Verified,
    /// envelope carries no signature
    Unverified,
    /// signature does not match the decrypted content
    VerificationFailed,
    /// no sender key to check against
    NotChecked,
}

impl Authenticity {
    pub fn as_str(&self) -> &str {
        match self {
            Authenticity::Verified => "verified",
            Authenticity::Unverified => "unverified",
            Authenticity::VerificationFailed => "verification failed",
            Authenticity::NotChecked => "not checked",
        }
    }

    #[inline]
    pub fn is_verified(&self) -> bool {
        *self == Authenticity::Verified
    }
}

impl Display for Authenticity {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "{}", self.as_str())
    }
}

/// Recovered plain text; callers decide whether unauthenticated content is acceptable.
pub struct DecryptedFile {
    pub plaintext: Vec<u8>,
    pub digest: Digest,
    pub authenticity: Authenticity,
}

impl DecryptedFile {
    /// Plain text, unless a signature was checked and did not match.
    pub fn reject_mismatch(self) -> Result<Vec<u8>, CryptoError> {
        match self.authenticity {
            Authenticity::VerificationFailed => Err(CryptoError::VerificationMismatch),
            _ => Ok(self.plaintext),
        }
    }
}

impl Debug for DecryptedFile {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "DecryptedFile({} bytes, {}, {})", self.plaintext.len(), self.digest, self.authenticity)
    }
}

pub struct EnvelopeDecryptor {
    recipient_private_key: PKey<Private>,
    sender_public_key: Option<PKey<Public>>,
}

impl EnvelopeDecryptor {
    pub fn new(recipient_private_key: PKey<Private>, sender_public_key: Option<PKey<Public>>) -> EnvelopeDecryptor {
        EnvelopeDecryptor { recipient_private_key, sender_public_key }
    }

    pub fn try_new(recipient_private_key: &str, sender_public_key: Option<&str>) -> Result<EnvelopeDecryptor, CryptoError> {
        let recipient_private_key = parse_private_key(recipient_private_key)?;
        let sender_public_key = sender_public_key.map(parse_public_key).transpose()?;
        Ok(EnvelopeDecryptor::new(recipient_private_key, sender_public_key))
    }

    pub fn decrypt(&self, envelope: &Envelope) -> Result<DecryptedFile, CryptoError> {
        debug!("Opening {:?}", envelope);
        if envelope.version.is_legacy() {
            info!("Envelope is unversioned, legacy formats will be accepted");
        }
        let session_key = unwrap_key_with(envelope.version, &envelope.wrapped_key, &self.recipient_private_key)?;
        let plaintext = decrypt_payload_for(envelope.version, &envelope.ciphertext, &session_key)?;
        let digest = content_digest(&plaintext);
        let authenticity = match &self.sender_public_key {
            None => Authenticity::NotChecked,
            Some(_) if !envelope.is_signed() => {
                warn!("File is not signed, its sender cannot be authenticated");
                Authenticity::Unverified
            },
            Some(sender_public_key) => {
                debug!("Verifying content digest {}", digest);
                if verify_digest(&digest, &envelope.signature, sender_public_key)? {
                    info!("Signature verified");
                    Authenticity::Verified
                } else {
                    warn!("SIGNATURE MISMATCH: file content cannot be authenticated");
                    Authenticity::VerificationFailed
                }
            },
        };
        Ok(DecryptedFile { plaintext, digest, authenticity })
    }
}

impl Debug for EnvelopeDecryptor {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "EnvelopeDecryptor(verifies: {})", self.sender_public_key.is_some())
    }
}

pub fn decrypt_envelope(envelope: &Envelope, recipient_private_key: &str, sender_public_key: Option<&str>) -> Result<DecryptedFile, CryptoError> {
    EnvelopeDecryptor::try_new(recipient_private_key, sender_public_key)?
        .decrypt(envelope)
}
