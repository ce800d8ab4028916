//! Binary read/write primitives for persisted records (§6 of the wire
//! format this engine defines).
//!
//! All scalars are host-endian, native width (`i32`, `f32`, `u8`). Strings
//! are length-prefixed by an `i32` count of code units: narrow strings are
//! raw UTF-8 bytes (one byte per unit), wide strings are UTF-16 code units
//! (the `wchar_t` width the original implementation's host platform used).
//! Containers (`Vec`, maps) are length-prefixed then elements in iteration
//! order.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::{Read as IoRead, Write as IoWrite};

/// Reads the primitives of the wire format from any `std::io::Read`.
pub struct Reader<'a, R: IoRead> {
    inner: &'a mut R,
}

impl<'a, R: IoRead> Reader<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        Self { inner }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(i32::from_ne_bytes(buf))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(f32::from_ne_bytes(buf))
    }

    /// Narrow string: `i32` byte count then raw UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::invalid_vector_size("negative string length"))?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| Error::invalid_vector_size(format!("invalid utf-8 string: {e}")))
    }

    /// Wide string: `i32` code-unit count then raw UTF-16 units.
    pub fn read_wstring(&mut self) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len)
            .map_err(|_| Error::invalid_vector_size("negative wstring length"))?;
        let mut units = Vec::with_capacity(len);
        for _ in 0..len {
            let mut buf = [0u8; 2];
            self.inner.read_exact(&mut buf)?;
            units.push(u16::from_ne_bytes(buf));
        }
        String::from_utf16(&units)
            .map_err(|e| Error::invalid_vector_size(format!("invalid utf-16 wstring: {e}")))
    }

    pub fn read_vec_u8(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_vec_i32(&mut self) -> Result<Vec<i32>> {
        let len = self.read_len()?;
        (0..len).map(|_| self.read_i32()).collect()
    }

    pub fn read_vec_f32(&mut self) -> Result<Vec<f32>> {
        let len = self.read_len()?;
        (0..len).map(|_| self.read_f32()).collect()
    }

    pub fn read_vec_wstring(&mut self) -> Result<Vec<String>> {
        let len = self.read_len()?;
        (0..len).map(|_| self.read_wstring()).collect()
    }

    pub fn read_map_wstring_i32(&mut self) -> Result<HashMap<String, i32>> {
        let len = self.read_len()?;
        let mut map = HashMap::with_capacity(len);
        for _ in 0..len {
            let key = self.read_wstring()?;
            let value = self.read_i32()?;
            map.insert(key, value);
        }
        Ok(map)
    }

    pub fn read_map_i32_wstring(&mut self) -> Result<HashMap<i32, String>> {
        let len = self.read_len()?;
        let mut map = HashMap::with_capacity(len);
        for _ in 0..len {
            let key = self.read_i32()?;
            let value = self.read_wstring()?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| Error::invalid_vector_size("negative container length"))
    }
}

/// Writes the primitives of the wire format to any `std::io::Write`.
pub struct Writer<'a, W: IoWrite> {
    inner: &'a mut W,
}

impl<'a, W: IoWrite> Writer<'a, W> {
    pub fn new(inner: &'a mut W) -> Self {
        Self { inner }
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_all(&value.to_ne_bytes())?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_all(&value.to_ne_bytes())?;
        Ok(())
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.write_i32(i32::try_from(bytes.len()).unwrap_or(i32::MAX))?;
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_wstring(&mut self, value: &str) -> Result<()> {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_i32(i32::try_from(units.len()).unwrap_or(i32::MAX))?;
        for unit in units {
            self.inner.write_all(&unit.to_ne_bytes())?;
        }
        Ok(())
    }

    pub fn write_vec_u8(&mut self, value: &[u8]) -> Result<()> {
        self.write_i32(i32::try_from(value.len()).unwrap_or(i32::MAX))?;
        self.inner.write_all(value)?;
        Ok(())
    }

    pub fn write_vec_i32(&mut self, value: &[i32]) -> Result<()> {
        self.write_i32(i32::try_from(value.len()).unwrap_or(i32::MAX))?;
        for v in value {
            self.write_i32(*v)?;
        }
        Ok(())
    }

    pub fn write_vec_f32(&mut self, value: &[f32]) -> Result<()> {
        self.write_i32(i32::try_from(value.len()).unwrap_or(i32::MAX))?;
        for v in value {
            self.write_f32(*v)?;
        }
        Ok(())
    }

    pub fn write_vec_wstring(&mut self, value: &[String]) -> Result<()> {
        self.write_i32(i32::try_from(value.len()).unwrap_or(i32::MAX))?;
        for v in value {
            self.write_wstring(v)?;
        }
        Ok(())
    }

    pub fn write_map_wstring_i32(&mut self, value: &HashMap<String, i32>) -> Result<()> {
        self.write_i32(i32::try_from(value.len()).unwrap_or(i32::MAX))?;
        for (k, v) in value {
            self.write_wstring(k)?;
            self.write_i32(*v)?;
        }
        Ok(())
    }

    pub fn write_map_i32_wstring(&mut self, value: &HashMap<i32, String>) -> Result<()> {
        self.write_i32(i32::try_from(value.len()).unwrap_or(i32::MAX))?;
        for (k, v) in value {
            self.write_i32(*k)?;
            self.write_wstring(v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scalar_round_trip() {
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            w.write_bool(true).unwrap();
            w.write_u8(42).unwrap();
            w.write_i32(-17).unwrap();
            w.write_f32(3.5).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        assert_eq!(r.read_bool().unwrap(), true);
        assert_eq!(r.read_u8().unwrap(), 42);
        assert_eq!(r.read_i32().unwrap(), -17);
        assert_eq!(r.read_f32().unwrap(), 3.5);
    }

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            w.write_string("hello").unwrap();
            w.write_wstring("wide \u{00e9}").unwrap();
        }
        let mut cursor = Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        assert_eq!(r.read_string().unwrap(), "hello");
        assert_eq!(r.read_wstring().unwrap(), "wide \u{00e9}");
    }

    #[test]
    fn container_round_trip() {
        let mut buf = Vec::new();
        let mut map = HashMap::new();
        map.insert("red".to_string(), 1i32);
        map.insert("blue".to_string(), 2i32);
        {
            let mut w = Writer::new(&mut buf);
            w.write_vec_f32(&[1.0, 2.0, 3.0]).unwrap();
            w.write_vec_i32(&[4, 5]).unwrap();
            w.write_vec_u8(&[9, 8, 7]).unwrap();
            w.write_map_wstring_i32(&map).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        assert_eq!(r.read_vec_f32().unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(r.read_vec_i32().unwrap(), vec![4, 5]);
        assert_eq!(r.read_vec_u8().unwrap(), vec![9, 8, 7]);
        assert_eq!(r.read_map_wstring_i32().unwrap(), map);
    }
}
