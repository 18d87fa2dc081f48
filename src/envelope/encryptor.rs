use std::fmt::{Debug, Formatter, Result as FormatResult};

use openssl::pkey::{PKey, Private, Public};

use crate::envelope::errors::*;
use crate::envelope::format::{Envelope, UNSIGNED};
use crate::envelope::key_codec::{parse_private_key, parse_public_key};
use crate::envelope::key_wrap::wrap_key_with;
use crate::envelope::signature::{content_digest, sign_digest};
use crate::envelope::symmetric::{encrypt_payload, generate_session_key};

/// Seals files for one recipient, optionally signed by one sender.
/// Holds parsed keys only, so a single instance can be shared between threads.
pub struct EnvelopeEncryptor {
    recipient_public_key: PKey<Public>,
    sender_private_key: Option<PKey<Private>>,
}

impl EnvelopeEncryptor {
    pub fn new(recipient_public_key: PKey<Public>, sender_private_key: Option<PKey<Private>>) -> EnvelopeEncryptor {
        EnvelopeEncryptor { recipient_public_key, sender_private_key }
    }

    pub fn try_new(recipient_public_key: &str, sender_private_key: Option<&str>) -> Result<EnvelopeEncryptor, CryptoError> {
        let recipient_public_key = parse_public_key(recipient_public_key)?;
        let sender_private_key = sender_private_key.map(parse_private_key).transpose()?;
        Ok(EnvelopeEncryptor::new(recipient_public_key, sender_private_key))
    }

    #[inline]
    pub fn signs(&self) -> bool {
        self.sender_private_key.is_some()
    }

    pub fn encrypt(&self, file_bytes: &[u8]) -> Result<Envelope, CryptoError> {
        let session_key = generate_session_key();
        let ciphertext = encrypt_payload(file_bytes, &session_key)?;
        let wrapped_key = wrap_key_with(&session_key, &self.recipient_public_key)?;
        // NB: signs the plain text so that verification does not depend on the cipher format
        let signature = match &self.sender_private_key {
            Some(sender_private_key) => {
                let digest = content_digest(file_bytes);
                debug!("Signing content digest {}", digest);
                sign_digest(&digest, sender_private_key)?
            },
            None => UNSIGNED.to_owned(),
        };
        let envelope = Envelope::new(ciphertext, wrapped_key, signature);
        debug!("Sealed {:?}", envelope);
        Ok(envelope)
    }
}

impl Debug for EnvelopeEncryptor {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(f, "EnvelopeEncryptor(signs: {})", self.signs())
    }
}

pub fn encrypt_envelope(file_bytes: &[u8], recipient_public_key: &str, sender_private_key: &str) -> Result<Envelope, CryptoError> {
    EnvelopeEncryptor::try_new(recipient_public_key, Some(sender_private_key))?
        .encrypt(file_bytes)
}

pub fn encrypt_envelope_unsigned(file_bytes: &[u8], recipient_public_key: &str) -> Result<Envelope, CryptoError> {
    EnvelopeEncryptor::try_new(recipient_public_key, None)?
        .encrypt(file_bytes)
}


#[cfg(test)]
mod tests {
    use super::*;
    use base64::decode as b64decode;
    use crate::envelope::format::FormatVersion;
    use crate::envelope::signature::verify_signature;
    use crate::envelope::symmetric::IV_LEN;
    use crate::test_keys::{RECIPIENT, SENDER};

    #[test]
    fn shape() {
        let envelope = encrypt_envelope(b"hello world", &RECIPIENT.public_pem(), &SENDER.private_pem()).unwrap();
        assert_eq!(envelope.version, FormatVersion::V1);
        assert_eq!(envelope.ciphertext.len(), IV_LEN + 16);
        assert_eq!(b64decode(&envelope.wrapped_key).unwrap().len(), 256);
        assert!(envelope.is_signed());
        assert_eq!(verify_signature(b"hello world", &envelope.signature, &SENDER.public_pem()), Ok(true));
    }

    #[test]
    fn unsigned() {
        let envelope = encrypt_envelope_unsigned(b"hello world", &RECIPIENT.public_base64()).unwrap();
        assert_eq!(envelope.signature, UNSIGNED);
        assert!(!envelope.is_signed());
    }

    #[test]
    fn fresh_session_keys() {
        let encryptor = EnvelopeEncryptor::try_new(&RECIPIENT.public_pem(), None).unwrap();
        assert!(!encryptor.signs());
        let envelope1 = encryptor.encrypt(b"same file").unwrap();
        let envelope2 = encryptor.encrypt(b"same file").unwrap();
        assert_ne!(envelope1.ciphertext, envelope2.ciphertext);
        assert_ne!(envelope1.wrapped_key, envelope2.wrapped_key);
    }

    #[test]
    fn invalid_keys() {
        assert_eq!(
            encrypt_envelope(b"data", "bm90IGEga2V5", &SENDER.private_pem()).err(),
            Some(CryptoError::InvalidKeyMaterial),
        );
        assert_eq!(
            encrypt_envelope(b"data", &RECIPIENT.public_pem(), "bm90IGEga2V5").err(),
            Some(CryptoError::InvalidKeyMaterial),
        );
        assert_eq!(format!("{:?}", EnvelopeEncryptor::try_new(&RECIPIENT.public_pem(), Some(&SENDER.private_pem())).unwrap()), "EnvelopeEncryptor(signs: true)");
    }
}
