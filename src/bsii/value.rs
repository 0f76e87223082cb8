//! Decoded field values: a closed union over every concrete shape the binary
//! format can produce, plus the string-packing and id codecs.

use std::collections::HashMap;
use std::fmt;

use super::reader::ByteReader;
use super::DecodeError;

/// Alphabet for packed base-38 tokens.  Index 0 of the encoding is the stop
/// marker; indices 1..=37 map into this table.
pub const TOKEN_ALPHABET: &[u8; 37] = b"0123456789abcdefghijklmnopqrstuvwxyz_";

/// Unpack a base-38 token.  `decode_token(0)` is the empty string.
pub fn decode_token(mut value: u64) -> String {
    let mut out = Vec::new();
    while value != 0 {
        let idx = (value % 38) as usize;
        value /= 38;
        if (1..=37).contains(&idx) {
            out.push(TOKEN_ALPHABET[idx - 1]);
        }
    }
    out.reverse();
    String::from_utf8(out).expect("alphabet is ascii")
}

/// Pack an alphabet-restricted string back into its base-38 form.
/// Inverse of [`decode_token`]; `None` for any byte outside
/// [`TOKEN_ALPHABET`].
pub fn encode_token(s: &str) -> Option<u64> {
    let mut value = 0u64;
    for b in s.bytes() {
        let idx = TOKEN_ALPHABET.iter().position(|&c| c == b)?;
        value = value * 38 + (idx as u64 + 1);
    }
    Some(value)
}

/// Block identity: a dotted name, an anonymous positional address, or the
/// explicit null id (part count 0 on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockId {
    Null,
    Named(Vec<String>),
    Nameless(u64),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Null => f.write_str("null"),
            BlockId::Named(parts) => f.write_str(&parts.join(".")),
            BlockId::Nameless(addr) => write!(
                f,
                "_nameless.{:x}.{:x}.{:x}.{:x}",
                (addr >> 48) & 0xFFFF,
                (addr >> 32) & 0xFFFF,
                (addr >> 16) & 0xFFFF,
                addr & 0xFFFF,
            ),
        }
    }
}

impl BlockId {
    /// Read an id: 1-byte part count, then either an 8-byte address
    /// (count 0xFF), nothing (count 0, the null id), or `count` packed
    /// tokens.
    pub(super) fn decode(r: &mut ByteReader) -> Result<BlockId, DecodeError> {
        let part_count = r.u8()?;
        match part_count {
            0xFF => Ok(BlockId::Nameless(r.u64()?)),
            0 => Ok(BlockId::Null),
            n => {
                let mut parts = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    parts.push(decode_token(r.u64()?));
                }
                Ok(BlockId::Named(parts))
            }
        }
    }

    pub(super) fn skip(r: &mut ByteReader) -> Result<(), DecodeError> {
        let part_count = r.u8()?;
        match part_count {
            0xFF => r.skip(8),
            n => r.skip(n as usize * 8),
        }
    }
}

/// One decoded element.  Placement vectors keep their version-dependent
/// width; the 7-float form has no bias scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Placement7([f32; 7]),
    Placement8([f32; 8]),
    IVec3([i32; 3]),
    Text(String),
    Token(String),
    Ordinal(String),
    Id(BlockId),
}

/// A field slot is either one scalar or a count-prefixed array of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Array(Vec<Scalar>),
}

/// Element kind shared by the scalar and array field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elem {
    Bool,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Vec2,
    Vec3,
    Vec4,
    Placement,
    IVec3,
    Text,
    Token,
    Ordinal,
    Id,
}

fn placement_uses_seven_floats(version: u32) -> bool {
    version <= 1
}

fn decode_placement(r: &mut ByteReader, version: u32) -> Result<Scalar, DecodeError> {
    if placement_uses_seven_floats(version) {
        let mut v = [0f32; 7];
        for slot in &mut v {
            *slot = r.f32()?;
        }
        return Ok(Scalar::Placement7(v));
    }

    let mut v = [0f32; 8];
    for slot in &mut v {
        *slot = r.f32()?;
    }
    // The 4th component doubles as a bias carrier: its integer value holds
    // two signed 12-bit offsets (minus 2048, shifted left 9) for the X and Z
    // position components.
    let bias = v[3] as i64;
    v[0] += ((((bias) & 0xFFF) - 2048) << 9) as f32;
    v[2] += ((((bias >> 12) & 0xFFF) - 2048) << 9) as f32;
    Ok(Scalar::Placement8(v))
}

pub(super) fn decode_elem(
    r: &mut ByteReader,
    elem: Elem,
    version: u32,
    ordinal_table: &HashMap<u32, String>,
) -> Result<Scalar, DecodeError> {
    Ok(match elem {
        Elem::Bool => Scalar::Bool(r.bool()?),
        Elem::Int16 => Scalar::Int16(r.i16()?),
        Elem::UInt16 => Scalar::UInt16(r.u16()?),
        Elem::Int32 => Scalar::Int32(r.i32()?),
        Elem::UInt32 => Scalar::UInt32(r.u32()?),
        Elem::Int64 => Scalar::Int64(r.i64()?),
        Elem::UInt64 => Scalar::UInt64(r.u64()?),
        Elem::Single => Scalar::Single(r.f32()?),
        Elem::Vec2 => Scalar::Vec2([r.f32()?, r.f32()?]),
        Elem::Vec3 => Scalar::Vec3([r.f32()?, r.f32()?, r.f32()?]),
        Elem::Vec4 => Scalar::Vec4([r.f32()?, r.f32()?, r.f32()?, r.f32()?]),
        Elem::Placement => decode_placement(r, version)?,
        Elem::IVec3 => Scalar::IVec3([r.i32()?, r.i32()?, r.i32()?]),
        Elem::Text => Scalar::Text(r.utf8()?),
        Elem::Token => Scalar::Token(decode_token(r.u64()?)),
        Elem::Ordinal => {
            // A missing table entry is not fatal; the slot simply reads as
            // an empty string.
            let index = r.u32()?;
            Scalar::Ordinal(ordinal_table.get(&index).cloned().unwrap_or_default())
        }
        Elem::Id => Scalar::Id(BlockId::decode(r)?),
    })
}

pub(super) fn skip_elem(r: &mut ByteReader, elem: Elem, version: u32) -> Result<(), DecodeError> {
    match elem {
        Elem::Bool => r.skip(1),
        Elem::Int16 | Elem::UInt16 => r.skip(2),
        Elem::Int32 | Elem::UInt32 | Elem::Single | Elem::Ordinal => r.skip(4),
        Elem::Int64 | Elem::UInt64 | Elem::Token => r.skip(8),
        Elem::Vec2 => r.skip(8),
        Elem::Vec3 | Elem::IVec3 => r.skip(12),
        Elem::Vec4 => r.skip(16),
        Elem::Placement => r.skip(if placement_uses_seven_floats(version) { 28 } else { 32 }),
        Elem::Text => {
            let len = r.u32()? as usize;
            r.skip(len)
        }
        Elem::Id => BlockId::skip(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_zero_is_empty() {
        assert_eq!(decode_token(0), "");
    }

    #[test]
    fn token_roundtrip() {
        for s in ["economy", "my_truck_0", "z", "0", "_"] {
            assert_eq!(decode_token(encode_token(s).unwrap()), s);
        }
    }

    #[test]
    fn out_of_alphabet_token_is_rejected() {
        assert_eq!(encode_token("Truck"), None);
        assert_eq!(encode_token("a b"), None);
        assert_eq!(encode_token(""), Some(0));
    }

    #[test]
    fn nameless_id_renders_four_hex_groups() {
        let id = BlockId::Nameless(0x0001_0002_0003_0004);
        assert_eq!(id.to_string(), "_nameless.1.2.3.4");
        let id = BlockId::Nameless(0xA1B2_0000_00C3_9E10);
        assert_eq!(id.to_string(), "_nameless.a1b2.0.c3.9e10");
    }

    #[test]
    fn null_id_renders_null() {
        assert_eq!(BlockId::Null.to_string(), "null");
    }

    #[test]
    fn placement_bias_applied_for_version_two() {
        // Bias value 2048 | (2048 << 12) means zero offset on both axes.
        let mut bytes = Vec::new();
        let floats = [1.0f32, 2.0, 3.0, (2048 + (2048 << 12)) as f32, 5.0, 6.0, 7.0, 8.0];
        for f in floats {
            bytes.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        let mut r = ByteReader::new(&bytes);
        match decode_elem(&mut r, Elem::Placement, 2, &HashMap::new()).unwrap() {
            Scalar::Placement8(v) => {
                assert_eq!(v[0], 1.0);
                assert_eq!(v[2], 3.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn placement_version_one_reads_seven_floats() {
        let mut bytes = Vec::new();
        for f in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0] {
            bytes.extend_from_slice(&f.to_bits().to_le_bytes());
        }
        let mut r = ByteReader::new(&bytes);
        match decode_elem(&mut r, Elem::Placement, 1, &HashMap::new()).unwrap() {
            Scalar::Placement7(v) => assert_eq!(v, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(r.is_eof());
    }
}
