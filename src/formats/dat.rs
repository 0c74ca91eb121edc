use std::{io, path::Path};

use log::{debug, info};
use thiserror::Error;

use crate::byte_source::{ByteSource, FileError};

const ATTR_LAST: u8 = 0xFF;
const FIRST_ITEM_ID: u16 = 100;
const FIRST_OTHER_ID: u16 = 1;

#[derive(Debug, Error)]
pub enum DatError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("dat header is truncated: {0}")]
    Header(io::Error),

    #[error("{category:?} {id}: record is truncated: {source}")]
    Truncated {
        category: ThingCategory,
        id: u16,
        source: io::Error,
    },

    #[error("{category:?} {id}: unknown attribute 0x{attr:02x}")]
    UnknownAttribute {
        category: ThingCategory,
        id: u16,
        attr: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThingCategory {
    Item = 0,
    Creature = 1,
    Effect = 2,
    Missile = 3,
}

impl ThingCategory {
    /// File order of the categories in the header and body
    pub const ALL: [ThingCategory; 4] = [
        ThingCategory::Item,
        ThingCategory::Creature,
        ThingCategory::Effect,
        ThingCategory::Missile,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            ThingCategory::Item => "Items",
            ThingCategory::Creature => "Creatures",
            ThingCategory::Effect => "Effects",
            ThingCategory::Missile => "Missiles",
        }
    }

    fn first_id(self) -> u16 {
        match self {
            ThingCategory::Item => FIRST_ITEM_ID,
            _ => FIRST_OTHER_ID,
        }
    }
}

/// Payload size in bytes following each attribute byte (8.60 layout; older
/// clients number everything from 8 upwards one lower)
fn attribute_payload_len(attr: u8) -> Option<usize> {
    match attr {
        // Ground speed, writable/writable once length, elevation,
        // minimap colour, lens help, cloth slot
        0 | 8 | 9 | 25 | 28 | 29 | 32 => Some(2),
        // Light (intensity, colour), displacement (x, y)
        21 | 24 => Some(4),
        1..=7 | 10..=20 | 22 | 23 | 26 | 27 | 30 | 31 => Some(0),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThingType {
    pub id: u16,
    pub category: ThingCategory,
    pub sprite_ids: Vec<u16>,
}

impl ThingType {
    fn parse(source: &mut ByteSource, id: u16, category: ThingCategory) -> Result<Self, DatError> {
        let truncated = |source| DatError::Truncated {
            category,
            id,
            source,
        };

        loop {
            let attr = source.read_u8().map_err(truncated)?;
            if attr == ATTR_LAST {
                break;
            }

            let payload = attribute_payload_len(attr)
                .ok_or(DatError::UnknownAttribute { category, id, attr })?;
            for _ in 0..payload {
                source.read_u8().map_err(truncated)?;
            }
        }

        let width = source.read_u8().map_err(truncated)?;
        let height = source.read_u8().map_err(truncated)?;
        if width > 1 || height > 1 {
            // Exact size, only needed for drawing
            source.read_u8().map_err(truncated)?;
        }
        let layers = source.read_u8().map_err(truncated)?;
        let pattern_x = source.read_u8().map_err(truncated)?;
        let pattern_y = source.read_u8().map_err(truncated)?;
        let pattern_z = source.read_u8().map_err(truncated)?;
        let phases = source.read_u8().map_err(truncated)?;

        let sprite_count = [width, height, layers, pattern_x, pattern_y, pattern_z, phases]
            .iter()
            .fold(1usize, |acc, &n| acc.saturating_mul(n as usize));

        // The count comes from the file; never reserve more than it can hold.
        let mut sprite_ids = Vec::with_capacity(sprite_count.min(source.remaining() / 2));
        for _ in 0..sprite_count {
            sprite_ids.push(source.read_u16_le().map_err(truncated)?);
        }

        Ok(ThingType {
            id,
            category,
            sprite_ids,
        })
    }
}

/// All things of a Tibia.dat file, in file order
#[derive(Debug)]
pub struct ThingList {
    pub content_revision: u16,
    /// Highest id per category, in [`ThingCategory::ALL`] order
    pub counts: [u16; 4],
    pub things: Vec<ThingType>,
}

impl ThingList {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatError> {
        let source = ByteSource::load(path)?;
        Self::parse(source)
    }

    pub fn parse(mut source: ByteSource) -> Result<Self, DatError> {
        let signature = source.read_u32_le().map_err(DatError::Header)?;
        let content_revision = signature as u16;

        let mut counts = [0u16; 4];
        for count in counts.iter_mut() {
            *count = source.read_u16_le().map_err(DatError::Header)?;
        }

        info!(
            "DatVer: {} Items: {} Creatures: {} Effects: {} Missiles: {} -- Total: {}",
            content_revision,
            counts[0],
            counts[1],
            counts[2],
            counts[3],
            counts.iter().map(|&c| c as u32).sum::<u32>()
        );

        let mut things = Vec::new();
        for category in ThingCategory::ALL {
            let last_id = counts[category as usize];
            for id in category.first_id()..=last_id {
                things.push(ThingType::parse(&mut source, id, category)?);
            }
            debug!("Parsed {:?} things up to id {}", category, last_id);
        }

        Ok(ThingList {
            content_revision,
            counts,
            things,
        })
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }
}
