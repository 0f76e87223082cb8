//! Rendering of decoded binary units into the plaintext unit syntax.
//!
//! Output shape mirrors what the game itself writes: a `SiiNunit` header,
//! one block per instance with single-space indented `key: value` lines,
//! arrays as a count line followed by indexed element lines.

use super::{BsiiFile, FieldValue, Scalar};

/// Floats whose value survives an exact integer conversion are written as
/// plain decimals; everything else is written as the raw bit pattern in
/// `&hex8` form so no precision is lost.
pub fn format_single(v: f32) -> String {
    if v.fract() == 0.0 && v.abs() < 1e7 && !(v == 0.0 && v.is_sign_negative()) {
        format!("{}", v as i64)
    } else {
        format!("&{:08x}", v.to_bits())
    }
}

/// Inverse of [`format_single`].  Accepts both the `&hex8` bit-pattern form
/// and plain decimal notation.
pub fn parse_single(s: &str) -> Option<f32> {
    if let Some(hex) = s.strip_prefix('&') {
        let bits = u32::from_str_radix(hex, 16).ok()?;
        return Some(f32::from_bits(bits));
    }
    s.parse::<f32>().ok()
}

fn is_limited_alphabet(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Strings quote themselves unless they would read back unambiguously bare:
/// plain integers and identifier-like strings need no quotes, the empty
/// string must render as a visible `""`.
fn format_string(s: &str) -> String {
    if s.is_empty() {
        return "\"\"".to_string();
    }
    if s.parse::<i32>().is_ok() || is_limited_alphabet(s) {
        return s.to_string();
    }
    format!("\"{s}\"")
}

/// Render one scalar.  `scalar_pos` is true for plain field slots and false
/// inside arrays; sentinel max values mean "unset" and render as `nil` only
/// in scalar slots, array elements always render raw.
fn format_scalar(v: &Scalar, scalar_pos: bool) -> String {
    match v {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int16(n) if scalar_pos && *n == i16::MAX => "nil".to_string(),
        Scalar::Int16(n) => n.to_string(),
        Scalar::UInt16(n) if scalar_pos && *n == u16::MAX => "nil".to_string(),
        Scalar::UInt16(n) => n.to_string(),
        Scalar::Int32(n) => n.to_string(),
        Scalar::UInt32(n) if scalar_pos && *n == u32::MAX => "nil".to_string(),
        Scalar::UInt32(n) => n.to_string(),
        Scalar::Int64(n) => n.to_string(),
        Scalar::UInt64(n) => n.to_string(),
        Scalar::Single(f) => format_single(*f),
        Scalar::Vec2([a, b]) => format!("({}, {})", format_single(*a), format_single(*b)),
        Scalar::Vec3([a, b, c]) => format!(
            "({}, {}, {})",
            format_single(*a),
            format_single(*b),
            format_single(*c)
        ),
        Scalar::Vec4([a, b, c, d]) => format!(
            "({}; {}, {}, {})",
            format_single(*a),
            format_single(*b),
            format_single(*c),
            format_single(*d)
        ),
        Scalar::IVec3([a, b, c]) => format!("({a}, {b}, {c})"),
        Scalar::Placement7([a, b, c, d, e, f, g]) => format!(
            "({}, {}, {}) ({}; {}, {}, {})",
            format_single(*a),
            format_single(*b),
            format_single(*c),
            format_single(*d),
            format_single(*e),
            format_single(*f),
            format_single(*g)
        ),
        // The 4th component is the bias carrier, already folded into the
        // position during decode, so it does not appear in the output.
        Scalar::Placement8([a, b, c, _, e, f, g, h]) => format!(
            "({}, {}, {}) ({}; {}, {}, {})",
            format_single(*a),
            format_single(*b),
            format_single(*c),
            format_single(*e),
            format_single(*f),
            format_single(*g),
            format_single(*h)
        ),
        Scalar::Text(s) => format_string(s),
        // Tokens are alphabet-restricted by construction and go out bare;
        // an empty scalar token still needs a visible placeholder.
        Scalar::Token(s) if scalar_pos && s.is_empty() => "\"\"".to_string(),
        Scalar::Token(s) => s.clone(),
        // Ordinal values pass through verbatim, unresolved indexes included.
        Scalar::Ordinal(s) => s.clone(),
        Scalar::Id(id) => id.to_string(),
    }
}

/// Serialize a decoded file into unit text.
pub fn serialize(file: &BsiiFile) -> String {
    let mut out = String::from("SiiNunit\n{\n");
    for inst in &file.instances {
        let Some(def) = file.defs.get(&inst.struct_id) else {
            continue;
        };
        let id = inst.id.to_string();
        // Blocks with no class name or no usable id cannot be expressed in
        // the text syntax and are dropped.
        if def.name.is_empty() || id.is_empty() {
            continue;
        }
        out.push_str(&def.name);
        out.push_str(" : ");
        out.push_str(&id);
        out.push_str(" {\n");
        for (field, value) in def.fields.iter().zip(&inst.values) {
            match value {
                FieldValue::Scalar(v) => {
                    out.push_str(&format!(" {}: {}\n", field.name, format_scalar(v, true)));
                }
                FieldValue::Array(items) => {
                    out.push_str(&format!(" {}: {}\n", field.name, items.len()));
                    for (i, item) in items.iter().enumerate() {
                        out.push_str(&format!(
                            " {}[{}]: {}\n",
                            field.name,
                            i,
                            format_scalar(item, false)
                        ));
                    }
                }
            }
        }
        out.push_str("}\n\n");
    }
    out.push('}');
    out
}
