use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("could not stat {path}: {source}")]
    NotFound { path: PathBuf, source: io::Error },

    #[error("could not allocate {size} bytes to cache {path}")]
    Allocation { path: PathBuf, size: u64 },

    #[error("could not cache file {path} of size {expected} (read {read} bytes)")]
    ReadTruncated {
        path: PathBuf,
        expected: u64,
        read: usize,
    },

    #[error("I/O error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// A file held entirely in memory with a single read cursor.
///
/// Reads are bounds checked and fail with `UnexpectedEof` without moving the
/// cursor. `seek` and `skip` past the end are silently ignored.
#[derive(Debug, Clone)]
pub struct ByteSource {
    data: Vec<u8>,
    pos: usize,
}

impl ByteSource {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        let path = path.as_ref();

        let stated_size = fs::metadata(path)
            .map_err(|source| FileError::NotFound {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let mut file = File::open(path).map_err(|source| FileError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(stated_size as usize)
            .map_err(|_| FileError::Allocation {
                path: path.to_path_buf(),
                size: stated_size,
            })?;

        file.read_to_end(&mut data).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if (data.len() as u64) < stated_size {
            return Err(FileError::ReadTruncated {
                path: path.to_path_buf(),
                expected: stated_size,
                read: data.len(),
            });
        }

        Ok(Self::from_bytes(data))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        ByteSource { data, pos: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Moves the cursor to `pos`. Positions past the end are ignored.
    pub fn seek(&mut self, pos: usize) {
        if pos > self.data.len() {
            return;
        }
        self.pos = pos;
    }

    /// Advances the cursor by `n` unless that would pass the end.
    pub fn skip(&mut self, n: usize) {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => self.pos = end,
            _ => {}
        }
    }

    fn ensure(&self, n: usize, what: &str) -> io::Result<()> {
        if self.remaining() < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Not enough bytes for {} at offset {} (buffer length: {})",
                    what,
                    self.pos,
                    self.data.len()
                ),
            ));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.ensure(1, "u8")?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        self.ensure(2, "u16")?;
        let low = self.data[self.pos] as u16;
        let high = self.data[self.pos + 1] as u16;
        self.pos += 2;
        Ok((high << 8) | low)
    }

    /// Low 16-bit half first, then the high half.
    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.ensure(4, "u32")?;
        let low = self.read_u16_le()? as u32;
        let high = self.read_u16_le()? as u32;
        Ok((high << 16) | low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_u16_boundary_values_round_trip() {
        for value in [0x0000u16, 0xFFFF, 0x00FF, 0xFF00] {
            let mut source = ByteSource::from_bytes(value.to_le_bytes().to_vec());
            assert_eq!(source.read_u16_le().unwrap(), value);
            assert_eq!(source.tell(), 2);
        }
    }

    #[test]
    fn test_u32_boundary_values_round_trip() {
        for value in [0u32, 0x0000_FFFF, 0x00FF_00FF, 0xFF00_FF00, 0xFFFF_FFFF] {
            let mut source = ByteSource::from_bytes(value.to_le_bytes().to_vec());
            assert_eq!(source.read_u32_le().unwrap(), value);
            assert_eq!(source.tell(), 4);
        }
    }

    #[test]
    fn test_reads_advance_cursor() {
        let mut source = ByteSource::from_bytes(vec![0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(source.read_u8().unwrap(), 0x01);
        assert_eq!(source.read_u16_le().unwrap(), 0x1234);
        assert_eq!(source.read_u32_le().unwrap(), 0x1234_5678);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_fails_without_moving() {
        let mut source = ByteSource::from_bytes(vec![0xAA, 0xBB, 0xCC]);
        source.seek(2);

        let err = source.read_u16_le().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(source.tell(), 2);

        source.seek(0);
        assert!(source.read_u32_le().is_err());
        assert_eq!(source.tell(), 0);
    }

    #[test]
    fn test_seek_past_size_is_noop() {
        let mut source = ByteSource::from_bytes(vec![0; 8]);
        source.seek(5);
        source.seek(9);
        assert_eq!(source.tell(), 5);

        // Exactly the end is allowed.
        source.seek(8);
        assert_eq!(source.tell(), 8);
    }

    #[test]
    fn test_skip_past_size_is_noop() {
        let mut source = ByteSource::from_bytes(vec![0; 8]);
        source.skip(6);
        source.skip(3);
        assert_eq!(source.tell(), 6);

        source.skip(usize::MAX);
        assert_eq!(source.tell(), 6);

        source.skip(2);
        assert_eq!(source.tell(), 8);
    }

    #[test]
    fn test_load_reads_whole_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();

        let source = ByteSource::load(file.path()).unwrap();
        assert_eq!(source.len(), 5);
        assert_eq!(source.tell(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ByteSource::load(dir.path().join("Tibia.spr")).unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }
}
