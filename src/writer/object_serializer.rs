//! PDF object serialization.
//!
//! Serializes [`lopdf::Object`] values to their byte representation according
//! to PDF specification ISO 32000-1:2008. Objects parsed from an earlier
//! revision are written back through the same code path when a new revision
//! replaces them.

use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};

/// Serializer for PDF objects.
///
/// Dictionary entries are written in their stored order, which for
/// [`lopdf::Dictionary`] is insertion order, so output is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Whether to use compact formatting (minimal whitespace)
    compact: bool,
}

impl ObjectSerializer {
    /// Create a new object serializer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: ObjectId, obj: &Object) -> Vec<u8> {
        wrap_indirect(id, &self.serialize(obj))
    }

    fn write_object(&self, w: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => w.extend_from_slice(b"null"),
            Object::Boolean(b) => w.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => w.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => write_real(w, *r),
            Object::String(s, format) => write_string(w, s, *format),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => self.write_array(w, arr),
            Object::Dictionary(dict) => self.write_dictionary(w, dict),
            Object::Stream(stream) => self.write_stream(w, stream),
            Object::Reference((id, gen)) => {
                w.extend_from_slice(format!("{} {} R", id, gen).as_bytes())
            },
        }
    }

    fn write_array(&self, w: &mut Vec<u8>, arr: &[Object]) {
        w.push(b'[');
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                w.push(b' ');
            }
            self.write_object(w, obj);
        }
        w.push(b']');
    }

    fn write_dictionary(&self, w: &mut Vec<u8>, dict: &Dictionary) {
        w.extend_from_slice(b"<<");
        for (key, value) in dict.iter() {
            if self.compact {
                w.push(b' ');
            } else {
                w.extend_from_slice(b"\n  ");
            }
            write_name(w, key);
            w.push(b' ');
            self.write_object(w, value);
        }
        if self.compact {
            w.push(b' ');
        } else if !dict.is_empty() {
            w.push(b'\n');
        }
        w.extend_from_slice(b">>");
    }

    fn write_stream(&self, w: &mut Vec<u8>, stream: &Stream) {
        // Length always reflects the bytes actually written
        let mut dict = stream.dict.clone();
        dict.set("Length", Object::Integer(stream.content.len() as i64));

        self.write_dictionary(w, &dict);
        w.extend_from_slice(b"\nstream\n");
        w.extend_from_slice(&stream.content);
        w.extend_from_slice(b"\nendstream");
    }
}

/// Wrap an already serialized body as an indirect object.
pub fn wrap_indirect(id: ObjectId, body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + 32);
    buf.extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
    buf.extend_from_slice(body);
    buf.extend_from_slice(b"\nendobj\n");
    buf
}

/// Format a real number with at most five decimals and no trailing zeros.
pub fn format_real(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{:.5}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn write_real(w: &mut Vec<u8>, value: f32) {
    w.extend_from_slice(format_real(value).as_bytes());
}

/// Write a PDF string.
///
/// Printable data uses literal syntax `(...)` with escaping. Binary data, and
/// strings that were hex in the source, use hex syntax `<...>`.
fn write_string(w: &mut Vec<u8>, data: &[u8], format: StringFormat) {
    let is_printable = data
        .iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

    if is_printable && format == StringFormat::Literal {
        w.extend_from_slice(&escape_literal(data));
    } else {
        w.extend_from_slice(hex_string(data).as_bytes());
    }
}

/// Escape bytes as a literal string including the parentheses.
pub fn escape_literal(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    out.push(b'(');
    for &byte in data {
        match byte {
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x20..=0x7E => out.push(byte),
            _ => out.extend_from_slice(format!("\\{:03o}", byte).as_bytes()),
        }
    }
    out.push(b')');
    out
}

/// Encode bytes as a hex string including the angle brackets.
pub fn hex_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + 2);
    out.push('<');
    for b in data {
        out.push_str(&format!("{:02X}", b));
    }
    out.push('>');
    out
}

/// Write a PDF name.
///
/// Names start with `/` and escape delimiters, whitespace and non-ASCII bytes
/// with `#xx`.
fn write_name(w: &mut Vec<u8>, name: &[u8]) {
    w.push(b'/');
    for &byte in name {
        match byte {
            b'!'
            | b'"'
            | b'$'..=b'&'
            | b'\''
            | b'*'..=b'.'
            | b'0'..=b'9'
            | b';'
            | b'='
            | b'?'
            | b'@'
            | b'A'..=b'Z'
            | b'^'..=b'z'
            | b'|'
            | b'~' => w.push(byte),
            _ => w.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
        }
    }
}
