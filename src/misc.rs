use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufReader, BufWriter, Error as IoError, ErrorKind as IoErrorKind, Read, Write};
use std::path::Path;

use crate::envelope::{Authenticity, Envelope, EnvelopeDecryptor, EnvelopeEncryptor};
use crate::error::SealError;

pub fn read_file<T>(path: T) -> Result<Vec<u8>, IoError> where T: AsRef<Path> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(IoError::new(IoErrorKind::NotFound, format!("{} is not a file", path.display())));
    }
    let file = File::open(path)?;
    let mut contents = Vec::with_capacity(usize::try_from(file.metadata()?.len()).unwrap_or(0));
    BufReader::new(file).read_to_end(&mut contents)?;
    Ok(contents)
}

pub fn write_file<T>(path: T, contents: &[u8]) -> Result<(), IoError> where T: AsRef<Path> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(contents)?;
    writer.flush()
}

pub fn read_text_file<T>(path: T) -> Result<String, IoError> where T: AsRef<Path> {
    let contents = read_file(path)?;
    String::from_utf8(contents)
        .map_err(|_| IoError::new(IoErrorKind::InvalidData, "file is not text"))
}

/// Key files hold PEM text or bare base64; either is accepted by the key parsers.
#[inline]
pub fn read_key_file<T>(path: T) -> Result<String, IoError> where T: AsRef<Path> {
    read_text_file(path)
}

pub fn load_envelope<T>(path: T) -> Result<Envelope, SealError> where T: AsRef<Path> {
    let contents = read_file(path)?;
    Ok(serde_json::from_slice(&contents)?)
}

pub fn save_envelope<T>(path: T, envelope: &Envelope) -> Result<(), SealError> where T: AsRef<Path> {
    let json = envelope.to_json()?;
    write_file(path, json.as_bytes())?;
    Ok(())
}

pub fn seal_file<I, O>(input: I, output: O, encryptor: &EnvelopeEncryptor) -> Result<Envelope, SealError> where I: AsRef<Path>, O: AsRef<Path> {
    let file_bytes = read_file(input)?;
    let envelope = encryptor.encrypt(&file_bytes)?;
    save_envelope(output, &envelope)?;
    info!("Sealed {} bytes", file_bytes.len());
    Ok(envelope)
}

/// Nothing is written unless the recovered file passes the authenticity policy.
pub fn open_file<I, O>(input: I, output: O, decryptor: &EnvelopeDecryptor, allow_unverified: bool) -> Result<Authenticity, SealError> where I: AsRef<Path>, O: AsRef<Path> {
    let envelope = load_envelope(input)?;
    let file = decryptor.decrypt(&envelope)?;
    let authenticity = file.authenticity;
    match authenticity {
        Authenticity::Verified => (),
        Authenticity::VerificationFailed => {
            error!("Refusing to write file whose signature does not match");
            return Err(SealError::Unauthenticated(authenticity.to_string()));
        },
        Authenticity::Unverified | Authenticity::NotChecked if allow_unverified => {
            warn!("WRITING UNAUTHENTICATED FILE: sender {}", authenticity);
        },
        Authenticity::Unverified | Authenticity::NotChecked => {
            error!("Refusing to write file whose sender is {}", authenticity);
            return Err(SealError::Unauthenticated(authenticity.to_string()));
        },
    }
    write_file(output, &file.plaintext)?;
    info!("Opened {} bytes", file.plaintext.len());
    Ok(authenticity)
}
