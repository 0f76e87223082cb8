//! Container signatures.
//!
//! Every SII container starts with a little-endian u32 signature.  The outer
//! signature decides whether the payload is an encrypted envelope; after
//! decryption the inner signature selects plaintext, binary BSII, or the
//! unsupported 3nK variant.  The constants must match the upstream tool
//! bit-for-bit for interop.

/// Plaintext SII text (`SiiN`).
pub const SIG_PLAIN: u32 = 0x4E69_6953;
/// AES-256-CBC + zlib encrypted envelope (`ScsC`).
pub const SIG_ENCRYPTED: u32 = 0x4373_6353;
/// Compact binary BSII form (`BSII`).
pub const SIG_BINARY: u32 = 0x4949_5342;
/// The undocumented 3nK variant (`3nK\x01`): detected, never decoded.
pub const SIG_3NK: u32 = 0x014B_6E33;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Plain,
    Encrypted,
    Binary,
    ThreeNk,
}

impl Signature {
    /// Peek the leading u32 of `data`.  Returns the raw value alongside the
    /// recognised signature so callers can report unknown ones.
    pub fn peek(data: &[u8]) -> Option<(u32, Option<Signature>)> {
        let raw = u32::from_le_bytes(data.get(..4)?.try_into().ok()?);
        Some((raw, Signature::from_raw(raw)))
    }

    pub fn from_raw(raw: u32) -> Option<Signature> {
        match raw {
            SIG_PLAIN => Some(Signature::Plain),
            SIG_ENCRYPTED => Some(Signature::Encrypted),
            SIG_BINARY => Some(Signature::Binary),
            SIG_3NK => Some(Signature::ThreeNk),
            _ => None,
        }
    }
}
