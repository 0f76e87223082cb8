//! Format detection and the end-to-end decode/encode paths.
//!
//! Everything on disk funnels through here: the first four bytes pick the
//! container format, encrypted payloads are unwrapped and re-dispatched
//! (an encrypted file usually holds a binary unit stream, not plaintext),
//! and binary streams are decoded and rendered so the caller only ever sees
//! unit text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bsii;
use crate::crypto;
use crate::signature::Signature;
use crate::text;

#[derive(Debug, Error)]
pub enum SiiError {
    #[error("file too short to carry a format signature")]
    MissingSignature,
    #[error("unknown format signature 0x{0:08x}")]
    UnknownFormat(u32),
    #[error("3nK-packed files are not supported")]
    Unsupported3nk,
    #[error("plaintext unit file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
    #[error(transparent)]
    Decode(#[from] bsii::DecodeError),
    #[error(transparent)]
    Parse(#[from] text::ParseError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Identify the container format of raw file data.
pub fn detect(data: &[u8]) -> Result<Signature, SiiError> {
    match Signature::peek(data) {
        None => Err(SiiError::MissingSignature),
        Some((raw, None)) => Err(SiiError::UnknownFormat(raw)),
        Some((_, Some(sig))) => Ok(sig),
    }
}

/// Reduce any supported container to unit text.
pub fn decode_to_text(data: &[u8]) -> Result<String, SiiError> {
    match detect(data)? {
        // Plaintext must survive a decode/write cycle byte-for-byte, so a
        // stray invalid byte is an error rather than a lossy substitution.
        Signature::Plain => Ok(String::from_utf8(data.to_vec())?),
        Signature::Encrypted => {
            let plaintext = crypto::decrypt(data)?;
            decode_to_text(&plaintext)
        }
        Signature::Binary => {
            let file = bsii::decode(data)?;
            Ok(bsii::render::serialize(&file))
        }
        Signature::ThreeNk => Err(SiiError::Unsupported3nk),
    }
}

/// Decode raw data all the way to a parsed [`text::Document`].
pub fn read_document(data: &[u8]) -> Result<text::Document, SiiError> {
    let unit_text = decode_to_text(data)?;
    Ok(text::parse(&unit_text)?)
}

/// Serialize a document, optionally wrapping it in the encrypted container.
pub fn write_document(doc: &text::Document, encrypt: bool) -> Result<Vec<u8>, SiiError> {
    let unit_text = text::write(doc);
    if encrypt {
        Ok(crypto::encrypt(unit_text.as_bytes())?)
    } else {
        Ok(unit_text.into_bytes())
    }
}

pub fn load_file(path: &Path) -> Result<text::Document, SiiError> {
    let data = fs::read(path)?;
    read_document(&data)
}

/// Sibling path used to keep the previous version of an overwritten file.
fn backup_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{stem}_backup.{}", ext.to_string_lossy())),
        None => path.with_file_name(format!("{stem}_backup")),
    }
}

/// Write a document to disk.  An existing file is first copied to a
/// `_backup` sibling so an edit can always be undone.
pub fn save_file(path: &Path, doc: &text::Document, encrypt: bool) -> Result<(), SiiError> {
    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    let bytes = write_document(doc, encrypt)?;
    fs::write(path, bytes)?;
    Ok(())
}
