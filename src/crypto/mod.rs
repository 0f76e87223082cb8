//! AES-256-CBC + zlib codec for the encrypted SII envelope.
//!
//! Envelope layout: [ signature (4 B) | HMAC placeholder (32 B) | IV (16 B) |
//! ciphertext size (4 B LE) | ciphertext ].  The HMAC slot is carried but
//! never verified, matching the upstream tool.  Decryption is AES-256-CBC
//! with a fixed key, PKCS7 unpadding, then zlib inflation of the result;
//! encryption is the exact inverse with a fresh random IV.

use std::io::{self, Read, Write};

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::signature::SIG_ENCRYPTED;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes.
pub const AES_BLOCK: usize = 16;
/// Envelope header: signature + HMAC placeholder + IV + size field.
pub const HEADER_LEN: usize = 4 + 32 + 16 + 4;

/// Fixed AES-256 key shared by every save container.
const SII_KEY: [u8; 32] = [
    0x2a, 0x5f, 0xcb, 0x17, 0x91, 0xd2, 0x2f, 0xb6,
    0x02, 0x45, 0xb3, 0xd8, 0x36, 0x9e, 0xd0, 0xb2,
    0xc2, 0x73, 0x71, 0x56, 0x3f, 0xbf, 0x1f, 0x3c,
    0x9e, 0xdf, 0x6b, 0x11, 0x82, 0x5a, 0x5d, 0x0a,
];

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("corrupt zlib stream: {0}")]
    Inflate(io::Error),
    #[error("zlib deflate failed: {0}")]
    Deflate(io::Error),
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("envelope truncated: {0} bytes is shorter than the {HEADER_LEN}-byte header")]
    TruncatedHeader(usize),
    #[error("signature 0x{0:08x} is not an encrypted envelope")]
    NotAnEnvelope(u32),
    #[error("ciphertext length {0} is not a multiple of the AES block size")]
    MisalignedCiphertext(usize),
    #[error("invalid PKCS7 padding")]
    InvalidPadding,
    #[error("cipher rejected key or IV")]
    BadKeyOrIv,
    #[error(transparent)]
    Compression(#[from] CompressionError),
}

/// Decrypt an encrypted SII envelope down to its inner container bytes
/// (which carry their own signature: plaintext or binary).
pub fn decrypt(container: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if container.len() < HEADER_LEN {
        return Err(CryptoError::TruncatedHeader(container.len()));
    }

    let mut cur = io::Cursor::new(container);
    let signature = cur.read_u32::<LittleEndian>().expect("length checked");
    if signature != SIG_ENCRYPTED {
        return Err(CryptoError::NotAnEnvelope(signature));
    }
    let mut hmac = [0u8; 32];
    cur.read_exact(&mut hmac).expect("length checked");
    let mut iv = [0u8; 16];
    cur.read_exact(&mut iv).expect("length checked");
    // Declared ciphertext size; informational only, like the HMAC slot.
    let _data_size = cur.read_u32::<LittleEndian>().expect("length checked");

    let ciphertext = &container[HEADER_LEN..];
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK != 0 {
        return Err(CryptoError::MisalignedCiphertext(ciphertext.len()));
    }

    let cipher = Aes256CbcDec::new_from_slices(&SII_KEY, &iv)
        .map_err(|_| CryptoError::BadKeyOrIv)?;
    let compressed = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::InvalidPadding)?;

    Ok(inflate(&compressed)?)
}

/// Encrypt inner container bytes into a full envelope: deflate, PKCS7-pad,
/// AES-256-CBC under a fresh random IV, and prepend the header.
pub fn encrypt(plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let compressed = deflate(plaintext)?;

    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut iv);

    let cipher = Aes256CbcEnc::new_from_slices(&SII_KEY, &iv)
        .map_err(|_| CryptoError::BadKeyOrIv)?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(&compressed);

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.write_u32::<LittleEndian>(SIG_ENCRYPTED).expect("vec write");
    out.extend_from_slice(&[0u8; 32]); // HMAC placeholder, always zero
    out.extend_from_slice(&iv);
    out.write_u32::<LittleEndian>(ciphertext.len() as u32).expect("vec write");
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(CompressionError::Inflate)?;
    Ok(out)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(CompressionError::Deflate)?;
    encoder.finish().map_err(CompressionError::Deflate)
}
