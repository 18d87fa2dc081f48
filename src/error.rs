use std::error::Error;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::Error as IoError;

use serde_json::Error as JsonError;

use crate::envelope::errors::{CryptoError, HexDecodeError};

#[derive(Debug)]
pub enum SealError {
    Io(IoError),
    Json(JsonError),
    Crypto(CryptoError),
    Hex(HexDecodeError),
    /// content was decrypted but did not pass the authenticity policy
    Unauthenticated(String),
}

impl SealError {
    /// Process exit code for the command line tool
    pub fn exit_code(&self) -> i32 {
        match self {
            SealError::Io(_) => 2,
            SealError::Json(_) | SealError::Hex(_) => 3,
            SealError::Crypto(err) if err.is_structural() => 3,
            SealError::Crypto(_) => 4,
            SealError::Unauthenticated(_) => 5,
        }
    }
}

impl Error for SealError {}

impl Display for SealError {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        match self {
            SealError::Io(err) => write!(f, "IO error {}", err),
            SealError::Json(err) => write!(f, "Envelope format error {}", err),
            SealError::Crypto(err) => write!(f, "Crypto error {}", err),
            SealError::Hex(err) => write!(f, "Hex error {}", err),
            SealError::Unauthenticated(reason) => write!(f, "Unauthenticated file: {}", reason),
        }
    }
}

impl From<IoError> for SealError {
    fn from(err: IoError) -> SealError {
        SealError::Io(err)
    }
}

impl From<JsonError> for SealError {
    fn from(err: JsonError) -> SealError {
        SealError::Json(err)
    }
}

impl From<CryptoError> for SealError {
    fn from(err: CryptoError) -> SealError {
        SealError::Crypto(err)
    }
}

impl From<HexDecodeError> for SealError {
    fn from(err: HexDecodeError) -> SealError {
        SealError::Hex(err)
    }
}
