pub mod errors;
mod key_codec;
mod symmetric;
mod key_wrap;
mod signature;
mod format;
mod encryptor;
mod decryptor;

pub use key_codec::{KeyKind, normalize_to_pem, bytes_to_hex, hex_to_bytes, parse_public_key, parse_private_key};
pub use symmetric::{SessionKey, SESSION_KEY_LEN, generate_session_key, encrypt_payload, decrypt_payload, decrypt_payload_chained, decrypt_payload_for};
pub use key_wrap::{WrapScheme, wrap_key, wrap_key_with, unwrap_key, unwrap_key_with};
pub use signature::{Digest, DIGEST_LEN, content_digest, sign_digest, verify_digest, sign_plaintext, verify_signature};
pub use format::{Envelope, FormatVersion, UNSIGNED};
pub use encryptor::{EnvelopeEncryptor, encrypt_envelope, encrypt_envelope_unsigned};
pub use decryptor::{Authenticity, DecryptedFile, EnvelopeDecryptor, decrypt_envelope};

/*
sealed file:
[ iv: [u8;16] | AES-256-CBC cipher text, PKCS#7 padded ]   key: random [u8;32] per file
wrapped key: base64( RSA-OAEP(SHA-256, MGF1 SHA-256)( key ) )
signature: base64( RSASSA-PKCS1-v1_5 SHA-256( plain text ) ) or "UNSIGNED"

unversioned (legacy) artifacts may instead carry:
- AES-256-ECB cipher text with no iv
- key wrapped with OAEP SHA-1 or PKCS#1 v1.5
- the 44 character base64 text of the key wrapped in place of the raw key
*/
