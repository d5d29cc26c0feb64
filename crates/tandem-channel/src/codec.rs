//! Little-endian payload encoding for plugin frames.
//!
//! All integers and floats are little-endian. Strings and vector lists
//! are prefixed with a `u32` element count. Producers write into a
//! `Vec<u8>`; consumers read from a `&[u8]` and call [`ensure_consumed`]
//! to reject trailing garbage.

use std::io::{Read, Write};

use tandem_core::ChannelError;

fn malformed(e: std::io::Error) -> ChannelError {
    ChannelError::Malformed {
        detail: e.to_string(),
    }
}

fn count(len: usize) -> Result<u32, ChannelError> {
    u32::try_from(len).map_err(|_| ChannelError::Malformed {
        detail: format!("length {len} does not fit a u32 prefix"),
    })
}

// ── Writers ─────────────────────────────────────────────────────

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ChannelError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ChannelError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a little-endian f32.
pub fn write_f32_le(w: &mut dyn Write, v: f32) -> Result<(), ChannelError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), ChannelError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a length-prefixed UTF-8 string.
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), ChannelError> {
    write_u32_le(w, count(s.len())?)?;
    w.write_all(s.as_bytes()).map_err(malformed)
}

/// Write three f64 components.
pub fn write_vec3_f64(w: &mut dyn Write, v: [f64; 3]) -> Result<(), ChannelError> {
    v.iter().try_for_each(|&c| write_f64_le(w, c))
}

/// Write a count-prefixed list of f32 triples.
pub fn write_vec3_list(w: &mut dyn Write, items: &[[f32; 3]]) -> Result<(), ChannelError> {
    write_u32_le(w, count(items.len())?)?;
    for item in items {
        for &c in item {
            write_f32_le(w, c)?;
        }
    }
    Ok(())
}

/// Write a count-prefixed list of u32 triples.
pub fn write_triangle_list(w: &mut dyn Write, items: &[[u32; 3]]) -> Result<(), ChannelError> {
    write_u32_le(w, count(items.len())?)?;
    for item in items {
        for &c in item {
            write_u32_le(w, c)?;
        }
    }
    Ok(())
}

// ── Readers ─────────────────────────────────────────────────────

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ChannelError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ChannelError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f32.
pub fn read_f32_le(r: &mut dyn Read) -> Result<f32, ChannelError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(f32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, ChannelError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, ChannelError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = Vec::new();
    (&mut *r).take(len as u64).read_to_end(&mut buf).map_err(malformed)?;
    if buf.len() != len {
        return Err(ChannelError::Malformed {
            detail: format!("string truncated: expected {len} bytes, got {}", buf.len()),
        });
    }
    String::from_utf8(buf).map_err(|e| ChannelError::Malformed {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

/// Read three f64 components.
pub fn read_vec3_f64(r: &mut dyn Read) -> Result<[f64; 3], ChannelError> {
    Ok([read_f64_le(r)?, read_f64_le(r)?, read_f64_le(r)?])
}

/// Read a count-prefixed list of f32 triples.
pub fn read_vec3_list(r: &mut dyn Read) -> Result<Vec<[f32; 3]>, ChannelError> {
    let n = read_u32_le(r)?;
    // Capacity is not trusted from the wire; a bogus count fails on read.
    let mut out = Vec::new();
    for _ in 0..n {
        out.push([read_f32_le(r)?, read_f32_le(r)?, read_f32_le(r)?]);
    }
    Ok(out)
}

/// Read a count-prefixed list of u32 triples.
pub fn read_triangle_list(r: &mut dyn Read) -> Result<Vec<[u32; 3]>, ChannelError> {
    let n = read_u32_le(r)?;
    let mut out = Vec::new();
    for _ in 0..n {
        out.push([read_u32_le(r)?, read_u32_le(r)?, read_u32_le(r)?]);
    }
    Ok(out)
}

/// Fail if bytes are left over after decoding a payload.
pub fn ensure_consumed(rest: &[u8]) -> Result<(), ChannelError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(ChannelError::Malformed {
            detail: format!("{} trailing bytes after payload", rest.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mixed_payload_decodes_in_order() {
        let mut buf = Vec::new();
        write_u64_le(&mut buf, 42).unwrap();
        write_length_prefixed_str(&mut buf, "rbc").unwrap();
        write_vec3_f64(&mut buf, [1.0, -2.0, 0.5]).unwrap();
        write_vec3_list(&mut buf, &[[0.0, 1.0, 2.0]]).unwrap();

        let mut r: &[u8] = &buf;
        assert_eq!(read_u64_le(&mut r).unwrap(), 42);
        assert_eq!(read_length_prefixed_str(&mut r).unwrap(), "rbc");
        assert_eq!(read_vec3_f64(&mut r).unwrap(), [1.0, -2.0, 0.5]);
        assert_eq!(read_vec3_list(&mut r).unwrap(), vec![[0.0, 1.0, 2.0]]);
        ensure_consumed(r).unwrap();
    }

    #[test]
    fn truncated_input_is_malformed() {
        let mut buf = Vec::new();
        write_vec3_list(&mut buf, &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        buf.truncate(buf.len() - 1);
        let mut r: &[u8] = &buf;
        assert!(matches!(
            read_vec3_list(&mut r),
            Err(ChannelError::Malformed { .. })
        ));
    }

    #[test]
    fn bogus_string_length_is_malformed() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, u32::MAX).unwrap();
        buf.extend_from_slice(b"abc");
        let mut r: &[u8] = &buf;
        assert!(matches!(
            read_length_prefixed_str(&mut r),
            Err(ChannelError::Malformed { .. })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        assert!(ensure_consumed(&[0u8]).is_err());
        assert!(ensure_consumed(&[]).is_ok());
    }

    proptest! {
        #[test]
        fn triangle_lists_survive_encoding(tris in proptest::collection::vec(any::<[u32; 3]>(), 0..32)) {
            let mut buf = Vec::new();
            write_triangle_list(&mut buf, &tris).unwrap();
            let mut r: &[u8] = &buf;
            prop_assert_eq!(read_triangle_list(&mut r).unwrap(), tris);
            prop_assert!(r.is_empty());
        }
    }
}
