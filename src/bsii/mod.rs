//! Schema-driven binary unit decoder.
//!
//! A binary unit file is a header (signature + format version) followed by a
//! flat stream of tagged chunks.  Tag `0` introduces a structure definition:
//! a numeric structure id, a unit class name, and an ordered field list.
//! Any other tag is an instance of the structure previously defined under
//! that id, stored as a block id followed by one value per field in
//! definition order.  Instances carry no length prefix, so nothing in the
//! stream can be decoded without the definitions that precede it.
//!
//! Decoding is two-pass.  The first pass walks the stream collecting
//! definitions, skipping over instance bodies it already knows how to size,
//! and stops silently at the first thing it cannot handle.  The second pass
//! decodes for real, registering any definitions the first pass did not
//! reach; an instance whose structure id is still unknown at that point is
//! unrecoverable and aborts the decode.

use std::collections::HashMap;

use thiserror::Error;

mod reader;
pub mod render;
mod value;

use reader::ByteReader;
pub use value::{decode_token, encode_token, BlockId, Elem, FieldValue, Scalar};

/// Highest understood format version.
pub const VERSION_MAX: u32 = 3;

/// ── errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset} while reading {expected}")]
    Truncated { offset: usize, expected: &'static str },
    #[error("unsupported format version {0} (expected 0..={VERSION_MAX})")]
    UnsupportedVersion(u32),
    #[error("unsupported field type 0x{tag:02x} at offset {offset}")]
    UnsupportedFieldType { tag: u32, offset: usize },
    #[error("instance references structure {structure_id} with no definition (offset {offset})")]
    UnresolvedStructure { structure_id: u32, offset: usize },
}

/// ── field types ─────────────────────────────────────────────────────────

/// Wire-level field type.  Scalar and array forms are distinct tags but
/// share an element codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub tag: u32,
    pub elem: Elem,
    pub is_array: bool,
}

impl FieldType {
    pub fn from_tag(tag: u32) -> Option<FieldType> {
        let (elem, is_array) = match tag {
            0x01 => (Elem::Text, false),
            0x02 => (Elem::Text, true),
            0x03 => (Elem::Token, false),
            0x04 => (Elem::Token, true),
            0x05 => (Elem::Single, false),
            0x06 => (Elem::Single, true),
            0x07 => (Elem::Vec2, false),
            0x08 => (Elem::Vec2, true),
            0x09 => (Elem::Vec3, false),
            0x0A => (Elem::Vec3, true),
            0x11 => (Elem::IVec3, false),
            0x12 => (Elem::IVec3, true),
            0x17 => (Elem::Vec4, false),
            0x18 => (Elem::Vec4, true),
            0x19 => (Elem::Placement, false),
            0x1A => (Elem::Placement, true),
            0x25 => (Elem::Int32, false),
            0x26 => (Elem::Int32, true),
            0x27 | 0x2F => (Elem::UInt32, false),
            0x28 => (Elem::UInt32, true),
            0x29 => (Elem::Int16, false),
            0x2A => (Elem::Int16, true),
            0x2B => (Elem::UInt16, false),
            0x2C => (Elem::UInt16, true),
            0x31 => (Elem::Int64, false),
            0x32 => (Elem::Int64, true),
            0x33 => (Elem::UInt64, false),
            0x34 => (Elem::UInt64, true),
            0x35 => (Elem::Bool, false),
            0x36 => (Elem::Bool, true),
            0x37 => (Elem::Ordinal, false),
            0x39 | 0x3B | 0x3D => (Elem::Id, false),
            0x3A | 0x3C | 0x3E => (Elem::Id, true),
            _ => return None,
        };
        Some(FieldType { tag, elem, is_array })
    }
}

/// ── structure model ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub id: u32,
    pub name: String,
    pub fields: Vec<FieldSpec>,
    /// Value table for ordinal fields, read inline with the first ordinal
    /// field of the definition.
    pub ordinal_table: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub struct_id: u32,
    pub id: BlockId,
    /// One value per definition field, in definition order.
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BsiiFile {
    pub version: u32,
    pub defs: HashMap<u32, StructDef>,
    pub instances: Vec<Instance>,
}

/// ── decoding ────────────────────────────────────────────────────────────

/// Decode a complete binary unit file, header included.
pub fn decode(data: &[u8]) -> Result<BsiiFile, DecodeError> {
    let mut header = ByteReader::new(data);
    let _signature = header.u32()?;
    let version = header.u32()?;
    if version > VERSION_MAX {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let body_start = header.pos();

    let mut pass1 = ByteReader::new(data);
    pass1.skip(body_start)?;
    let mut defs = collect_definitions(&mut pass1, version);

    let mut r = ByteReader::new(data);
    r.skip(body_start)?;
    let mut instances = Vec::new();
    while !r.is_eof() {
        let tag_offset = r.pos();
        let tag = r.u32()?;
        if tag == 0 {
            if let Some(def) = read_definition(&mut r)? {
                defs.entry(def.id).or_insert(def);
            }
        } else {
            let def = defs
                .get(&tag)
                .ok_or(DecodeError::UnresolvedStructure { structure_id: tag, offset: tag_offset })?;
            instances.push(decode_instance(&mut r, def, version)?);
        }
    }

    Ok(BsiiFile { version, defs, instances })
}

/// First pass: gather every definition reachable without errors.  Stops at
/// the first undecodable chunk; whatever was collected so far still lets the
/// second pass resolve instances that precede their definitions elsewhere in
/// the stream.
fn collect_definitions(r: &mut ByteReader, version: u32) -> HashMap<u32, StructDef> {
    let mut defs: HashMap<u32, StructDef> = HashMap::new();
    while !r.is_eof() {
        let tag = match r.u32() {
            Ok(tag) => tag,
            Err(_) => break,
        };
        if tag == 0 {
            match read_definition(r) {
                Ok(Some(def)) => {
                    defs.entry(def.id).or_insert(def);
                }
                Ok(None) => {}
                Err(_) => break,
            }
        } else {
            let Some(def) = defs.get(&tag) else { break };
            if skip_instance(r, def, version).is_err() {
                break;
            }
        }
    }
    defs
}

/// Read one structure definition body (the tag has already been consumed).
/// Returns `None` for a definition whose validity byte is false; such
/// definitions carry no body at all.
fn read_definition(r: &mut ByteReader) -> Result<Option<StructDef>, DecodeError> {
    if !r.bool()? {
        return Ok(None);
    }
    let id = r.u32()?;
    let name = r.utf8()?;
    let mut fields = Vec::new();
    let mut ordinal_table: Option<HashMap<u32, String>> = None;
    loop {
        let tag_offset = r.pos();
        let tag = r.u32()?;
        if tag == 0 {
            break;
        }
        let field_name = r.utf8()?;
        let ty = FieldType::from_tag(tag)
            .ok_or(DecodeError::UnsupportedFieldType { tag, offset: tag_offset })?;
        if ty.elem == Elem::Ordinal && !ty.is_array {
            let table = read_ordinal_table(r)?;
            if ordinal_table.is_none() {
                ordinal_table = Some(table);
            }
        }
        fields.push(FieldSpec { name: field_name, ty });
    }
    Ok(Some(StructDef {
        id,
        name,
        fields,
        ordinal_table: ordinal_table.unwrap_or_default(),
    }))
}

/// The ordinal value table sits inline in the definition: a count, then
/// (index, string) pairs.
fn read_ordinal_table(r: &mut ByteReader) -> Result<HashMap<u32, String>, DecodeError> {
    let count = r.u32()?;
    // The count is untrusted; cap the preallocation so a corrupt definition
    // fails on its first short read instead of aborting on a huge reserve.
    let mut table = HashMap::with_capacity(count.min(4096) as usize);
    for _ in 0..count {
        let index = r.u32()?;
        let text = r.utf8()?;
        table.insert(index, text);
    }
    Ok(table)
}

fn decode_instance(
    r: &mut ByteReader,
    def: &StructDef,
    version: u32,
) -> Result<Instance, DecodeError> {
    let id = BlockId::decode(r)?;
    let mut values = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
        values.push(decode_value(r, field.ty, version, &def.ordinal_table)?);
    }
    Ok(Instance { struct_id: def.id, id, values })
}

fn decode_value(
    r: &mut ByteReader,
    ty: FieldType,
    version: u32,
    ordinal_table: &HashMap<u32, String>,
) -> Result<FieldValue, DecodeError> {
    if !ty.is_array {
        return Ok(FieldValue::Scalar(value::decode_elem(r, ty.elem, version, ordinal_table)?));
    }
    let count = r.u32()?;
    let mut items = Vec::with_capacity(count.min(4096) as usize);
    for _ in 0..count {
        items.push(value::decode_elem(r, ty.elem, version, ordinal_table)?);
    }
    Ok(FieldValue::Array(items))
}

fn skip_instance(r: &mut ByteReader, def: &StructDef, version: u32) -> Result<(), DecodeError> {
    BlockId::skip(r)?;
    for field in &def.fields {
        if field.ty.is_array {
            let count = r.u32()?;
            for _ in 0..count {
                value::skip_elem(r, field.ty.elem, version)?;
            }
        } else {
            value::skip_elem(r, field.ty.elem, version)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SIG_BINARY;

    fn push_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn push_str(buf: &mut Vec<u8>, s: &str) {
        push_u32(buf, s.len() as u32);
        buf.extend_from_slice(s.as_bytes());
    }

    fn header(version: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        push_u32(&mut buf, SIG_BINARY);
        push_u32(&mut buf, version);
        buf
    }

    /// Definition of structure 1 "economy" with one u32 field "game_time".
    fn economy_def(buf: &mut Vec<u8>) {
        push_u32(buf, 0);
        buf.push(1);
        push_u32(buf, 1);
        push_str(buf, "economy");
        push_u32(buf, 0x27);
        push_str(buf, "game_time");
        push_u32(buf, 0);
    }

    fn economy_instance(buf: &mut Vec<u8>, game_time: u32) {
        push_u32(&mut *buf, 1);
        buf.push(1);
        buf.extend_from_slice(&encode_token("economy").unwrap().to_le_bytes());
        push_u32(buf, game_time);
    }

    #[test]
    fn decodes_definition_then_instance() {
        let mut buf = header(2);
        economy_def(&mut buf);
        economy_instance(&mut buf, 100);

        let file = decode(&buf).unwrap();
        assert_eq!(file.version, 2);
        assert_eq!(file.defs[&1].name, "economy");
        assert_eq!(file.instances.len(), 1);
        assert_eq!(file.instances[0].id, BlockId::Named(vec!["economy".into()]));
        assert_eq!(
            file.instances[0].values[0],
            FieldValue::Scalar(Scalar::UInt32(100))
        );
    }

    #[test]
    fn instance_before_definition_is_fatal() {
        let mut buf = header(2);
        economy_instance(&mut buf, 100);
        economy_def(&mut buf);

        // Pass 1 cannot skip an instance of unknown size, so the definition
        // behind it stays unreachable and pass 2 must report it.
        let err = decode(&buf).unwrap_err();
        assert_eq!(err, DecodeError::UnresolvedStructure { structure_id: 1, offset: 8 });
    }

    #[test]
    fn duplicate_definition_keeps_first() {
        let mut buf = header(2);
        economy_def(&mut buf);
        // Second definition reuses id 1 with a different name.
        push_u32(&mut buf, 0);
        buf.push(1);
        push_u32(&mut buf, 1);
        push_str(&mut buf, "imposter");
        push_u32(&mut buf, 0);
        economy_instance(&mut buf, 7);

        let file = decode(&buf).unwrap();
        assert_eq!(file.defs[&1].name, "economy");
        assert_eq!(file.instances[0].values.len(), 1);
    }

    #[test]
    fn invalid_definition_has_no_body() {
        let mut buf = header(2);
        push_u32(&mut buf, 0);
        buf.push(0); // validity false: nothing follows for this chunk
        economy_def(&mut buf);
        economy_instance(&mut buf, 42);

        let file = decode(&buf).unwrap();
        assert_eq!(file.instances.len(), 1);
    }

    #[test]
    fn rejects_future_version() {
        let buf = header(4);
        assert_eq!(decode(&buf).unwrap_err(), DecodeError::UnsupportedVersion(4));
    }

    #[test]
    fn unknown_field_type_is_fatal() {
        let mut buf = header(2);
        push_u32(&mut buf, 0);
        buf.push(1);
        push_u32(&mut buf, 1);
        push_str(&mut buf, "mystery");
        push_u32(&mut buf, 0x7F);
        push_str(&mut buf, "weird");
        push_u32(&mut buf, 0);

        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFieldType { tag: 0x7F, .. }));
    }

    #[test]
    fn absurd_ordinal_table_count_fails_cleanly() {
        let mut buf = header(2);
        push_u32(&mut buf, 0);
        buf.push(1);
        push_u32(&mut buf, 5);
        push_str(&mut buf, "job");
        push_u32(&mut buf, 0x37);
        push_str(&mut buf, "state");
        // Claimed table size far beyond the bytes that follow.
        push_u32(&mut buf, u32::MAX);

        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "got: {err:?}");
    }

    #[test]
    fn ordinal_table_and_missing_index() {
        let mut buf = header(2);
        push_u32(&mut buf, 0);
        buf.push(1);
        push_u32(&mut buf, 5);
        push_str(&mut buf, "job");
        push_u32(&mut buf, 0x37);
        push_str(&mut buf, "state");
        // Two-entry ordinal table.
        push_u32(&mut buf, 2);
        push_u32(&mut buf, 0);
        push_str(&mut buf, "idle");
        push_u32(&mut buf, 1);
        push_str(&mut buf, "driving");
        push_u32(&mut buf, 0);
        // Instance with an index outside the table.
        push_u32(&mut buf, 5);
        buf.push(1);
        buf.extend_from_slice(&encode_token("job").unwrap().to_le_bytes());
        push_u32(&mut buf, 9);

        let file = decode(&buf).unwrap();
        assert_eq!(
            file.instances[0].values[0],
            FieldValue::Scalar(Scalar::Ordinal(String::new()))
        );
    }
}
