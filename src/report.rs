use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::formats::dat::ThingCategory;

pub const MAX_CORRUPT_IDS: usize = 1 << 13;
const IDS_PER_LINE: usize = 5;

/// Counters for one extraction run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub entities_total: usize,
    pub entities_processed: usize,
    pub entities_corrupt: usize,
    pub sprites_saved: usize,
    pub sprites_absent: usize,
    pub encode_failures: usize,
    pub corrupt_ids: Vec<CorruptEntry>,
}

impl RunSummary {
    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorruptEntry {
    pub id: u16,
    pub category: &'static str,
}

/// Entities whose sprites could not be decoded, bounded by [`MAX_CORRUPT_IDS`]
#[derive(Debug)]
pub struct CorruptReport {
    entries: Vec<CorruptEntry>,
    capacity: usize,
}

impl Default for CorruptReport {
    fn default() -> Self {
        Self::with_capacity(MAX_CORRUPT_IDS)
    }
}

impl CorruptReport {
    pub fn with_capacity(capacity: usize) -> Self {
        CorruptReport {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Returns `false` when the list is already full and nothing was recorded.
    #[must_use]
    pub fn record(&mut self, id: u16, category: ThingCategory) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push(CorruptEntry {
            id,
            category: category.dir_name(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CorruptEntry] {
        &self.entries
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Corrupt item ids:")?;
        writeln!(out, "A\tB\tC\tD\tE")?;
        for line in self.entries.chunks(IDS_PER_LINE) {
            for entry in line {
                write!(out, "{}\t", entry.id)?;
            }
            if line.len() == IDS_PER_LINE {
                writeln!(out)?;
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()
    }
}
