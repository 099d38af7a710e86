//! Little-endian fixed-width readers and writers for template and save files.

use crate::error::{Result, TectonicsError};
use std::io::{ErrorKind, Read, Write};

/// Upper bound on capacity reserved up front from a count read out of a file.
pub const MAX_RESERVED: usize = 1 << 16;

/// Capacity to reserve for `count` items read from a file. Larger lists grow as they are read.
pub fn reserve_for(count: usize) -> usize {
    count.min(MAX_RESERVED)
}

pub struct BinaryReader<R> {
    inner: R,
}

impl<R: Read> BinaryReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => TectonicsError::Truncated { context },
            _ => TectonicsError::Io(e),
        })?;
        Ok(buf)
    }

    pub fn read_i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(context)?))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array(context)?))
    }

    pub fn read_f32(&mut self, context: &'static str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(context)?))
    }

    pub fn read_f64(&mut self, context: &'static str) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array(context)?))
    }

    pub fn read_bool(&mut self, context: &'static str) -> Result<bool> {
        match self.read_i32(context)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(TectonicsError::Format(format!(
                "expected 0 or 1 for {context}, got {other}"
            ))),
        }
    }

    /// Reads a non-negative count.
    pub fn read_count(&mut self, context: &'static str) -> Result<usize> {
        let value = self.read_i32(context)?;
        usize::try_from(value)
            .map_err(|_| TectonicsError::Format(format!("negative count {value} for {context}")))
    }

    /// Reads an index that must be below `bound`.
    pub fn read_index(&mut self, bound: usize, context: &'static str) -> Result<usize> {
        let value = self.read_i32(context)?;
        match usize::try_from(value) {
            Ok(index) if index < bound => Ok(index),
            _ => Err(TectonicsError::Format(format!(
                "index {value} out of range 0..{bound} for {context}"
            ))),
        }
    }

    /// Reads an index where -1 stands for "absent".
    pub fn read_optional_index(&mut self, bound: usize, context: &'static str) -> Result<Option<usize>> {
        let value = self.read_i32(context)?;
        if value == -1 {
            return Ok(None);
        }
        match usize::try_from(value) {
            Ok(index) if index < bound => Ok(Some(index)),
            _ => Err(TectonicsError::Format(format!(
                "index {value} out of range 0..{bound} for {context}"
            ))),
        }
    }
}

pub struct BinaryWriter<W> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.inner.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_i32(i32::from(value))
    }

    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let value = i32::try_from(count)
            .map_err(|_| TectonicsError::Format(format!("count {count} does not fit in i32")))?;
        self.write_i32(value)
    }

    pub fn write_optional_index(&mut self, index: Option<usize>) -> Result<()> {
        match index {
            Some(i) => self.write_count(i),
            None => self.write_i32(-1),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn truncated_read_is_reported() {
        let mut reader = BinaryReader::new(Cursor::new(vec![1u8, 0]));
        match reader.read_i32("header") {
            Err(TectonicsError::Truncated { context }) => assert_eq!(context, "header"),
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_index_is_a_format_error() {
        let mut bytes = Vec::new();
        let mut writer = BinaryWriter::new(&mut bytes);
        writer.write_i32(5).unwrap();
        writer.write_i32(-1).unwrap();
        let mut reader = BinaryReader::new(Cursor::new(bytes));
        assert!(matches!(reader.read_index(5, "vertex"), Err(TectonicsError::Format(_))));
        assert_eq!(reader.read_optional_index(5, "neighbor").unwrap(), None);
    }

    #[test]
    fn reservations_from_file_counts_are_capped() {
        assert_eq!(reserve_for(12), 12);
        assert_eq!(reserve_for(i32::MAX as usize), MAX_RESERVED);
    }
}
