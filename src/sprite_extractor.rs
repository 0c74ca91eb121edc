use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    formats::{
        dat::{ThingCategory, ThingType},
        spr::{SpriteDecoder, SpriteOutcome},
    },
    graphics::{bitmap::Bitmap, png::ImageEncoder},
    progress::Progress,
    report::{CorruptReport, RunSummary, MAX_CORRUPT_IDS},
};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("more than {limit} corrupt entities; the input does not look like a sprite atlas for this dat")]
    CorruptLimitExceeded { limit: usize },
}

/// How one entity's sprite list fared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityOutcome {
    Done,
    Corrupt,
}

/// Decodes every sprite referenced by a thing list and hands each bitmap to
/// an encoder. Output paths are `<out>/<Category>/<thing id>_s<n>.png`.
pub struct SpriteExtractor<E: ImageEncoder> {
    decoder: SpriteDecoder,
    encoder: E,
    corrupt_limit: usize,
    progress_file: Option<PathBuf>,
}

impl<E: ImageEncoder> SpriteExtractor<E> {
    pub fn new(decoder: SpriteDecoder, encoder: E) -> Self {
        SpriteExtractor {
            decoder,
            encoder,
            corrupt_limit: MAX_CORRUPT_IDS,
            progress_file: None,
        }
    }

    pub fn with_progress_file(mut self, path: Option<PathBuf>) -> Self {
        self.progress_file = path;
        self
    }

    pub fn with_corrupt_limit(mut self, limit: usize) -> Self {
        self.corrupt_limit = limit;
        self
    }

    pub fn run(
        &mut self,
        things: &[ThingType],
        output_dir: &Path,
    ) -> Result<(RunSummary, CorruptReport), ExtractError> {
        for dir in std::iter::once(output_dir.to_path_buf()).chain(
            ThingCategory::ALL
                .iter()
                .map(|category| output_dir.join(category.dir_name())),
        ) {
            if !dir.exists() {
                info!("Creating directory {}", dir.display());
            }
            fs::create_dir_all(&dir).map_err(|source| ExtractError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }

        info!(
            "Now dumping sprites into {} (This may take some time)...",
            output_dir.display()
        );

        let mut summary = RunSummary {
            entities_total: things.len(),
            ..Default::default()
        };
        let mut corrupt = CorruptReport::with_capacity(self.corrupt_limit);
        let mut progress = Progress::new(things.len(), self.progress_file.clone());

        for thing in things {
            let category_dir = output_dir.join(thing.category.dir_name());

            if self.process_thing(thing, &category_dir, &mut summary) == EntityOutcome::Corrupt {
                if !corrupt.record(thing.id, thing.category) {
                    return Err(ExtractError::CorruptLimitExceeded {
                        limit: self.corrupt_limit,
                    });
                }
                summary.entities_corrupt += 1;
            }

            summary.entities_processed += 1;
            progress.advance();
        }
        progress.finish();

        summary.corrupt_ids = corrupt.entries().to_vec();
        Ok((summary, corrupt))
    }

    fn process_thing(
        &mut self,
        thing: &ThingType,
        category_dir: &Path,
        summary: &mut RunSummary,
    ) -> EntityOutcome {
        let mut drawn = 0;

        for (seq, &sprite_id) in thing.sprite_ids.iter().enumerate() {
            if sprite_id != 0 && !self.decoder.index().contains(sprite_id) {
                warn!(
                    "{:?} {}: sprite id {} is outside the atlas (count {})",
                    thing.category,
                    thing.id,
                    sprite_id,
                    self.decoder.index().sprite_count()
                );
                return EntityOutcome::Corrupt;
            }

            let mut bitmap = Bitmap::sprite();
            match self.decoder.decode(sprite_id, &mut bitmap) {
                Ok(SpriteOutcome::Absent) => {
                    summary.sprites_absent += 1;
                }
                Ok(SpriteOutcome::Drawn) => {
                    drawn += 1;
                    let path = category_dir.join(format!("{}_s{}.png", thing.id, seq));
                    match self.encoder.encode(&bitmap, &path) {
                        Ok(()) => summary.sprites_saved += 1,
                        Err(e) => {
                            warn!("{:?} {}: {}", thing.category, thing.id, e);
                            summary.encode_failures += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("{:?} {}: {}", thing.category, thing.id, e);
                    return EntityOutcome::Corrupt;
                }
            }
        }

        if drawn == 0 && !thing.sprite_ids.is_empty() {
            debug!(
                "{:?} {}: none of its {} sprites has data",
                thing.category,
                thing.id,
                thing.sprite_ids.len()
            );
            return EntityOutcome::Corrupt;
        }

        EntityOutcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{byte_source::ByteSource, graphics::png::EncodeError};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingEncoder {
        written: RefCell<Vec<(PathBuf, [u8; 4])>>,
    }

    impl ImageEncoder for RecordingEncoder {
        fn encode(&self, bitmap: &Bitmap, path: &Path) -> Result<(), EncodeError> {
            self.written
                .borrow_mut()
                .push((path.to_path_buf(), bitmap.pixel(0, 0)));
            Ok(())
        }
    }

    struct FailingEncoder;

    impl ImageEncoder for FailingEncoder {
        fn encode(&self, bitmap: &Bitmap, _path: &Path) -> Result<(), EncodeError> {
            Err(EncodeError::InvalidBuffer {
                width: bitmap.width(),
                height: bitmap.height(),
            })
        }
    }

    /// Atlas with four sprites:
    /// 1 is red at (0, 0), 2 has no data, 3 is fully transparent,
    /// 4 claims more colour data than the file holds.
    fn atlas() -> SpriteDecoder {
        let mut data = b"SPR1".to_vec();
        data.extend_from_slice(&4u16.to_le_bytes());
        let table = data.len();
        data.resize(table + 16, 0);

        let put = |data: &mut Vec<u8>, slot: usize, record: &[u8]| {
            let address = data.len() as u32;
            data[table + slot * 4..table + slot * 4 + 4].copy_from_slice(&address.to_le_bytes());
            data.extend_from_slice(record);
        };

        put(&mut data, 0, &[0, 0, 0, 7, 0, 0, 0, 1, 0, 0xFF, 0, 0]);
        put(&mut data, 2, &[0, 0, 0, 4, 0, 0, 4, 0, 0]);
        put(&mut data, 3, &[0, 0, 0, 10, 0, 0, 0, 50, 0, 1, 2]);

        SpriteDecoder::new(ByteSource::from_bytes(data)).unwrap()
    }

    fn thing(category: ThingCategory, id: u16, sprite_ids: &[u16]) -> ThingType {
        ThingType {
            id,
            category,
            sprite_ids: sprite_ids.to_vec(),
        }
    }

    #[test]
    fn test_paths_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let things = vec![
            thing(ThingCategory::Item, 100, &[1, 0, 3]),
            thing(ThingCategory::Creature, 1, &[2, 1]),
        ];

        let mut extractor = SpriteExtractor::new(atlas(), RecordingEncoder::default());
        let (summary, corrupt) = extractor.run(&things, dir.path()).unwrap();

        let written = extractor.encoder.written.borrow();
        let paths: Vec<_> = written.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("Items").join("100_s0.png"),
                dir.path().join("Items").join("100_s2.png"),
                dir.path().join("Creatures").join("1_s1.png"),
            ]
        );
        assert_eq!(written[0].1, [0xFF, 0, 0, 0xFF]);
        assert_eq!(written[1].1, [0, 0, 0, 0]);

        assert_eq!(summary.sprites_saved, 3);
        assert_eq!(summary.sprites_absent, 2);
        assert_eq!(summary.entities_processed, 2);
        assert!(corrupt.is_empty());

        for category in ThingCategory::ALL {
            assert!(dir.path().join(category.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_truncated_sprite_marks_entity_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let things = vec![
            thing(ThingCategory::Item, 100, &[1, 4, 1]),
            thing(ThingCategory::Item, 101, &[3]),
        ];

        let mut extractor = SpriteExtractor::new(atlas(), RecordingEncoder::default());
        let (summary, corrupt) = extractor.run(&things, dir.path()).unwrap();

        // The first sprite was already written; the rest of 100 is dropped.
        assert_eq!(extractor.encoder.written.borrow().len(), 2);
        assert_eq!(summary.entities_corrupt, 1);
        assert_eq!(summary.entities_processed, 2);
        assert_eq!(corrupt.entries()[0].id, 100);
        assert_eq!(summary.corrupt_ids, corrupt.entries().to_vec());
    }

    #[test]
    fn test_out_of_range_and_empty_entities_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let things = vec![
            thing(ThingCategory::Effect, 1, &[9]),
            thing(ThingCategory::Missile, 1, &[0, 2]),
            thing(ThingCategory::Missile, 2, &[1]),
        ];

        let mut extractor = SpriteExtractor::new(atlas(), RecordingEncoder::default());
        let (summary, corrupt) = extractor.run(&things, dir.path()).unwrap();

        let ids: Vec<_> = corrupt.entries().iter().map(|e| (e.category, e.id)).collect();
        assert_eq!(ids, vec![("Effects", 1), ("Missiles", 1)]);
        assert_eq!(summary.sprites_saved, 1);
    }

    #[test]
    fn test_corrupt_limit_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let things = vec![
            thing(ThingCategory::Item, 100, &[0]),
            thing(ThingCategory::Item, 101, &[0]),
        ];

        let mut extractor =
            SpriteExtractor::new(atlas(), RecordingEncoder::default()).with_corrupt_limit(1);
        let err = extractor.run(&things, dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::CorruptLimitExceeded { limit: 1 }));
    }

    #[test]
    fn test_encode_failure_continues_batch() {
        let dir = tempfile::tempdir().unwrap();
        let things = vec![
            thing(ThingCategory::Item, 100, &[1, 3]),
            thing(ThingCategory::Item, 101, &[1]),
        ];

        let mut extractor = SpriteExtractor::new(atlas(), FailingEncoder);
        let (summary, corrupt) = extractor.run(&things, dir.path()).unwrap();

        assert_eq!(summary.encode_failures, 3);
        assert_eq!(summary.sprites_saved, 0);
        assert_eq!(summary.entities_processed, 2);
        assert!(corrupt.is_empty());
    }
}
