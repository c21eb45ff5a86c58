//! Primitive and varint codec contract (§4.1): exact on-disk bytes for
//! integers, floats, booleans, and length-prefixed strings, plus the
//! varint encoding shared by the chunk wire format (§4.4).

use crate::byte_buf::ByteBuf;
use snafu::Snafu;

/// Errors produced while decoding a malformed or truncated byte stream.
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
pub enum CodecError {
    #[snafu(display("not enough bytes remaining to decode this value"))]
    Truncated,
    #[snafu(display("varint exceeds its maximum encoded width"))]
    Overflow,
    #[snafu(display("chunk header magic number did not match"))]
    BadMagic,
    #[snafu(display("chunk header schema hash did not match the aggregation's current schema"))]
    SchemaHashMismatch,
}

pub type Result<T> = std::result::Result<T, CodecError>;

fn require(buf: &ByteBuf, len: usize) -> Result<()> {
    if buf.readable() < len {
        Err(CodecError::Truncated)
    } else {
        Ok(())
    }
}

// -- fixed-width primitives, big-endian -------------------------------------

pub fn put_bool(buf: &mut ByteBuf, v: bool) {
    buf.put(&[v as u8]);
}

pub fn get_bool(buf: &mut ByteBuf) -> Result<bool> {
    require(buf, 1)?;
    Ok(buf.get(1)[0] != 0)
}

pub fn put_i16(buf: &mut ByteBuf, v: i16) {
    buf.put(&v.to_be_bytes());
}

pub fn get_i16(buf: &mut ByteBuf) -> Result<i16> {
    require(buf, 2)?;
    let bytes = buf.get(2);
    Ok(i16::from_be_bytes(bytes.try_into().unwrap()))
}

pub fn put_i32(buf: &mut ByteBuf, v: i32) {
    buf.put(&v.to_be_bytes());
}

pub fn get_i32(buf: &mut ByteBuf) -> Result<i32> {
    require(buf, 4)?;
    let bytes = buf.get(4);
    Ok(i32::from_be_bytes(bytes.try_into().unwrap()))
}

pub fn put_u32(buf: &mut ByteBuf, v: u32) {
    buf.put(&v.to_be_bytes());
}

pub fn get_u32(buf: &mut ByteBuf) -> Result<u32> {
    require(buf, 4)?;
    let bytes = buf.get(4);
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}

pub fn put_i64(buf: &mut ByteBuf, v: i64) {
    buf.put(&v.to_be_bytes());
}

pub fn get_i64(buf: &mut ByteBuf) -> Result<i64> {
    require(buf, 8)?;
    let bytes = buf.get(8);
    Ok(i64::from_be_bytes(bytes.try_into().unwrap()))
}

pub fn put_u64(buf: &mut ByteBuf, v: u64) {
    buf.put(&v.to_be_bytes());
}

pub fn get_u64(buf: &mut ByteBuf) -> Result<u64> {
    require(buf, 8)?;
    let bytes = buf.get(8);
    Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
}

pub fn put_f32(buf: &mut ByteBuf, v: f32) {
    put_i32(buf, v.to_bits() as i32);
}

pub fn get_f32(buf: &mut ByteBuf) -> Result<f32> {
    Ok(f32::from_bits(get_i32(buf)? as u32))
}

pub fn put_f64(buf: &mut ByteBuf, v: f64) {
    put_i64(buf, v.to_bits() as i64);
}

pub fn get_f64(buf: &mut ByteBuf) -> Result<f64> {
    Ok(f64::from_bits(get_i64(buf)? as u64))
}

// -- varint, 7-bit little-endian continuation -------------------------------

/// Maximum encoded width of a `varint32`.
pub const VARINT32_MAX_BYTES: usize = 5;
/// Maximum encoded width of a `varint64`.
pub const VARINT64_MAX_BYTES: usize = 10;

pub fn put_varint32(buf: &mut ByteBuf, v: u32) {
    put_varint64(buf, v as u64);
}

pub fn get_varint32(buf: &mut ByteBuf) -> Result<u32> {
    let v = get_varint_impl(buf, VARINT32_MAX_BYTES)?;
    if v > u32::MAX as u64 {
        return Err(CodecError::Overflow);
    }
    Ok(v as u32)
}

pub fn put_varint64(buf: &mut ByteBuf, mut v: u64) {
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        buf.put(&[byte]);
        if v == 0 {
            break;
        }
    }
}

pub fn get_varint64(buf: &mut ByteBuf) -> Result<u64> {
    get_varint_impl(buf, VARINT64_MAX_BYTES)
}

fn get_varint_impl(buf: &mut ByteBuf, max_bytes: usize) -> Result<u64> {
    let mut result: u64 = 0;
    for i in 0..max_bytes {
        require(buf, 1)?;
        let byte = buf.get(1)[0];
        result |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(CodecError::Overflow)
}

// -- length-prefixed strings -------------------------------------------------

/// Write `s` as `varint(len)` followed by its UTF-8 bytes.
pub fn put_utf8(buf: &mut ByteBuf, s: &str) {
    put_varint32(buf, s.len() as u32);
    buf.put(s.as_bytes());
}

/// Read a `varint(len)`-prefixed UTF-8 string.
pub fn get_utf8(buf: &mut ByteBuf) -> Result<String> {
    let len = get_varint32(buf)? as usize;
    require(buf, len)?;
    let bytes = buf.get(len);
    String::from_utf8(bytes).map_err(|_| CodecError::Truncated)
}

/// Write `s` as `varint(len)` followed by its ISO-8859-1 (Latin-1) bytes.
/// Non-Latin-1 code points are replaced with `?`, matching a lossy
/// single-byte transcoding.
pub fn put_iso_8859_1(buf: &mut ByteBuf, s: &str) {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect();
    put_varint32(buf, bytes.len() as u32);
    buf.put(&bytes);
}

/// Read a `varint(len)`-prefixed ISO-8859-1 string.
pub fn get_iso_8859_1(buf: &mut ByteBuf) -> Result<String> {
    let len = get_varint32(buf)? as usize;
    require(buf, len)?;
    let bytes = buf.get(len);
    Ok(bytes.into_iter().map(|b| b as char).collect())
}

/// Nullable string: `len + 1` is written so that a leading `0` marks null.
pub fn put_nullable_utf8(buf: &mut ByteBuf, s: Option<&str>) {
    match s {
        None => put_varint32(buf, 0),
        Some(s) => {
            put_varint32(buf, s.len() as u32 + 1);
            buf.put(s.as_bytes());
        }
    }
}

/// Read a nullable, `len+1`-prefixed UTF-8 string.
pub fn get_nullable_utf8(buf: &mut ByteBuf) -> Result<Option<String>> {
    let marker = get_varint32(buf)?;
    if marker == 0 {
        return Ok(None);
    }
    let len = (marker - 1) as usize;
    require(buf, len)?;
    let bytes = buf.get(len);
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| CodecError::Truncated)
}
