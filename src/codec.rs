//! Binary Codec Primitives
//!
//! Little-endian read/write helpers shared by the resource records and the
//! pak archive index. Blobs and strings are `u32` length-prefixed.
//!
//! Decoding is defensive: length prefixes are bounded so a truncated or
//! corrupted archive fails with a decode error instead of attempting a
//! multi-gigabyte allocation.

use std::io::{Read, Write};

use glam::{Mat3, Mat4};

use crate::error::{EngineError, Result};

/// Upper bound for any single length-prefixed blob (256 MiB).
const MAX_BLOB_LEN: u32 = 256 * 1024 * 1024;

// ============================================================================
// Primitive writes
// ============================================================================

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    w.write_all(&[v])?;
    Ok(())
}

pub fn write_u16<W: Write>(w: &mut W, v: u16) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_i64<W: Write>(w: &mut W, v: i64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_f32<W: Write>(w: &mut W, v: f32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ============================================================================
// Primitive reads
// ============================================================================

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub fn read_f32<R: Read>(r: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

// ============================================================================
// Blobs and strings
// ============================================================================

pub fn write_bytes<W: Write>(w: &mut W, data: &[u8]) -> Result<()> {
    // Writer enforces the same bound as the reader; anything larger would
    // produce an archive that can never be read back (and lengths past
    // u32::MAX would silently truncate).
    if data.len() as u64 > u64::from(MAX_BLOB_LEN) {
        return Err(EngineError::Decode(format!(
            "blob length {} exceeds the {MAX_BLOB_LEN} byte limit",
            data.len()
        )));
    }
    write_u32(w, data.len() as u32)?;
    w.write_all(data)?;
    Ok(())
}

pub fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = read_u32(r)?;
    if len > MAX_BLOB_LEN {
        return Err(EngineError::Decode(format!(
            "blob length {len} exceeds the {MAX_BLOB_LEN} byte limit"
        )));
    }
    let mut data = vec![0u8; len as usize];
    r.read_exact(&mut data)?;
    Ok(data)
}

pub fn write_str<W: Write>(w: &mut W, s: &str) -> Result<()> {
    write_bytes(w, s.as_bytes())
}

pub fn read_str<R: Read>(r: &mut R) -> Result<String> {
    let bytes = read_bytes(r)?;
    String::from_utf8(bytes).map_err(|e| EngineError::Decode(format!("invalid UTF-8 string: {e}")))
}

// ============================================================================
// Math types
// ============================================================================

pub fn write_mat3<W: Write>(w: &mut W, m: &Mat3) -> Result<()> {
    for v in m.to_cols_array() {
        write_f32(w, v)?;
    }
    Ok(())
}

pub fn read_mat3<R: Read>(r: &mut R) -> Result<Mat3> {
    let mut cols = [0f32; 9];
    for v in &mut cols {
        *v = read_f32(r)?;
    }
    Ok(Mat3::from_cols_array(&cols))
}

pub fn write_mat4<W: Write>(w: &mut W, m: &Mat4) -> Result<()> {
    for v in m.to_cols_array() {
        write_f32(w, v)?;
    }
    Ok(())
}

pub fn read_mat4<R: Read>(r: &mut R) -> Result<Mat4> {
    let mut cols = [0f32; 16];
    for v in &mut cols {
        *v = read_f32(r)?;
    }
    Ok(Mat4::from_cols_array(&cols))
}

// ============================================================================
// Size helpers (for offset precomputation)
// ============================================================================

/// Encoded size of a length-prefixed blob.
#[inline]
#[must_use]
pub fn bytes_size(len: usize) -> u64 {
    4 + len as u64
}

/// Encoded size of a length-prefixed string.
#[inline]
#[must_use]
pub fn str_size(s: &str) -> u64 {
    bytes_size(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn primitives_round_trip() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 7).unwrap();
        write_u16(&mut buf, 0xBEEF).unwrap();
        write_u32(&mut buf, 0xDEAD_BEEF).unwrap();
        write_i64(&mut buf, -42).unwrap();
        write_f32(&mut buf, 1.5).unwrap();

        let mut r = Cursor::new(buf);
        assert_eq!(read_u8(&mut r).unwrap(), 7);
        assert_eq!(read_u16(&mut r).unwrap(), 0xBEEF);
        assert_eq!(read_u32(&mut r).unwrap(), 0xDEAD_BEEF);
        assert_eq!(read_i64(&mut r).unwrap(), -42);
        assert!((read_f32(&mut r).unwrap() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn strings_round_trip_and_report_size() {
        let mut buf = Vec::new();
        write_str(&mut buf, "models/cube.geom").unwrap();
        assert_eq!(buf.len() as u64, str_size("models/cube.geom"));
        let mut r = Cursor::new(buf);
        assert_eq!(read_str(&mut r).unwrap(), "models/cube.geom");
    }

    #[test]
    fn oversized_blob_write_is_rejected() {
        let data = vec![0u8; MAX_BLOB_LEN as usize + 1];
        let mut buf = Vec::new();
        assert!(matches!(
            write_bytes(&mut buf, &data),
            Err(EngineError::Decode(_))
        ));
        // Nothing was written, not even the length prefix.
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_blob_length_is_rejected() {
        let mut buf = Vec::new();
        write_u32(&mut buf, u32::MAX).unwrap();
        let mut r = Cursor::new(buf);
        assert!(matches!(read_bytes(&mut r), Err(EngineError::Decode(_))));
    }

    #[test]
    fn mat4_round_trip() {
        let m = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let mut buf = Vec::new();
        write_mat4(&mut buf, &m).unwrap();
        assert_eq!(buf.len(), 64);
        let mut r = Cursor::new(buf);
        assert_eq!(read_mat4(&mut r).unwrap(), m);
    }
}
