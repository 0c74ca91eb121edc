//! Tibia.spr sprite atlas
//!
//! Layout (little-endian):
//! - 4 byte signature
//! - sprite count (u16)
//! - offset table, one u32 per sprite, id 1 first
//! - per sprite: 3 reserved bytes, pixel data size (u16), then runs of
//!   (transparent count u16, colorized count u16, colorized count * RGB)

use std::{io, path::Path};

use log::info;
use thiserror::Error;

use crate::{
    byte_source::{ByteSource, FileError},
    graphics::bitmap::{Bitmap, SPRITE_DATA_SIZE, SPRITE_SIZE},
};

const SIGNATURE_LEN: usize = 4;
const OFFSET_ENTRY_LEN: usize = 4;
// Unused prefix in front of each sprite record
const SPRITE_RESERVED_LEN: usize = 3;

const TRANSPARENT: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("sprite {id}: stream ran past the end of the atlas: {source}")]
    Truncated { id: u16, source: io::Error },
}

/// Result of a decode that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteOutcome {
    /// The bitmap has been fully written.
    Drawn,
    /// Id 0 or a zero offset: nothing to draw, bitmap untouched.
    Absent,
}

/// Sprite count and the location of the offset table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteIndex {
    sprite_count: u16,
    table_base: usize,
}

impl SpriteIndex {
    pub fn open(source: &mut ByteSource) -> io::Result<Self> {
        // Skipping a missing signature is a no-op and would read it as the count.
        if source.len() < SIGNATURE_LEN + 2 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "sprite atlas header is truncated",
            ));
        }

        source.seek(0);
        source.skip(SIGNATURE_LEN);
        let sprite_count = source.read_u16_le()?;

        Ok(SpriteIndex {
            sprite_count,
            table_base: source.tell(),
        })
    }

    pub fn sprite_count(&self) -> u16 {
        self.sprite_count
    }

    pub fn contains(&self, id: u16) -> bool {
        id >= 1 && id <= self.sprite_count
    }

    /// Reads the offset stored for `id`. Ids outside `[1, sprite_count]` are
    /// not rejected here, callers range check with [`SpriteIndex::contains`].
    pub fn offset_table_entry(&self, source: &mut ByteSource, id: u16) -> io::Result<u32> {
        let slot = (id as usize).saturating_sub(1);
        source.seek(self.table_base + slot * OFFSET_ENTRY_LEN);
        source.read_u32_le()
    }
}

pub struct SpriteDecoder {
    source: ByteSource,
    index: SpriteIndex,
}

impl SpriteDecoder {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FileError> {
        let path = path.as_ref();
        let source = ByteSource::load(path)?;
        let decoder = Self::new(source).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            "Total sprites found in {}: {}",
            path.display(),
            decoder.index.sprite_count()
        );
        Ok(decoder)
    }

    pub fn new(mut source: ByteSource) -> io::Result<Self> {
        let index = SpriteIndex::open(&mut source)?;
        Ok(SpriteDecoder { source, index })
    }

    pub fn index(&self) -> &SpriteIndex {
        &self.index
    }

    /// Decodes sprite `id` into `bitmap`.
    ///
    /// Run payloads are not checked against the sprite's own region; only a
    /// read past the end of the whole atlas fails.
    pub fn decode(&mut self, id: u16, bitmap: &mut Bitmap) -> Result<SpriteOutcome, SpriteError> {
        if id == 0 {
            return Ok(SpriteOutcome::Absent);
        }

        let truncated = |source| SpriteError::Truncated { id, source };

        let address = self
            .index
            .offset_table_entry(&mut self.source, id)
            .map_err(truncated)?;
        if address == 0 {
            return Ok(SpriteOutcome::Absent);
        }

        self.source
            .seek(address as usize + SPRITE_RESERVED_LEN);
        let pixel_data_size = self.source.read_u16_le().map_err(truncated)? as usize;

        let mut cursor = RasterCursor::default();
        let mut read = 0usize;

        while read < pixel_data_size && !cursor.is_full() {
            let transparent = self.source.read_u16_le().map_err(truncated)?;
            let colorized = self.source.read_u16_le().map_err(truncated)?;

            for _ in 0..transparent {
                if cursor.is_full() {
                    break;
                }
                cursor.emit(bitmap, TRANSPARENT);
            }

            for _ in 0..colorized {
                if cursor.is_full() {
                    break;
                }
                let red = self.source.read_u8().map_err(truncated)?;
                let green = self.source.read_u8().map_err(truncated)?;
                let blue = self.source.read_u8().map_err(truncated)?;
                cursor.emit(bitmap, [red, green, blue, 0xFF]);
            }

            // Transparent runs carry no payload beyond the two counts.
            read += 4 + 3 * colorized as usize;
        }

        while !cursor.is_full() {
            cursor.emit(bitmap, TRANSPARENT);
        }

        Ok(SpriteOutcome::Drawn)
    }
}

/// Write position inside one sprite cell
#[derive(Debug, Default)]
struct RasterCursor {
    x: u32,
    y: u32,
    write_pos: usize,
}

impl RasterCursor {
    fn is_full(&self) -> bool {
        self.write_pos >= SPRITE_DATA_SIZE
    }

    fn emit(&mut self, bitmap: &mut Bitmap, rgba: [u8; 4]) {
        bitmap.put_pixel(self.x, self.y, rgba);

        if self.x < SPRITE_SIZE - 1 {
            self.x += 1;
        } else {
            self.x = 0;
            self.y += 1;
        }

        self.write_pos += 4;
    }
}
