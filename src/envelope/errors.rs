define_error!(CryptoError;
    InvalidKeyMaterial="key material cannot be parsed as an RSA key",
    InvalidKeyLength="symmetric key must be 32 bytes",
    InvalidSessionKey="unwrapped session key is not a 32 byte key",
    EmptyPayload="encrypted payload is empty",
    EncryptionFailed="cannot encrypt",
    DecryptionFailed="cannot decrypt payload: wrong key or corrupted file",
    KeyWrapFailed="cannot unwrap session key: wrong private key or corrupted key",
    SignatureParseError="signature or key material is malformed",
    VerificationMismatch="signature does not match content",
    UnsupportedVersion="envelope format version unsupported"
);

define_error!(HexDecodeError = "invalid hex text");

impl CryptoError {
    /// Structural errors are caused by malformed inputs rather than by a wrong key or damaged content.
    pub fn is_structural(&self) -> bool {
        match self {
            CryptoError::InvalidKeyMaterial
            | CryptoError::InvalidKeyLength
            | CryptoError::SignatureParseError
            | CryptoError::UnsupportedVersion => true,
            _ => false,
        }
    }
}
