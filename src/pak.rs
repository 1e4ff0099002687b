//! Pak Archives
//!
//! A pak is a single binary file bundling the serialized payloads of many
//! resources behind a hash-indexed offset table, so individual records can
//! be loaded with one seek and one read.
//!
//! # On-disk layout (little-endian)
//!
//! ```text
//! [u32 entry_count]
//! entry_count × [u32 path_hash] [u8 kind] [u32 pak_hash] [i64 offset]
//! entry_count × <resource record bytes>
//! ```
//!
//! Offsets are absolute file offsets. The kind byte makes archives
//! self-describing: the loader verifies it against the kind the caller
//! requested instead of trusting context.
//!
//! Loaded paks keep their file handle resident; record reads seek on the
//! open reader. Unloading a pak destroys whatever indexed entries are still
//! resident in the store (the [`Context`](crate::Context) drives that part).

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::codec;
use crate::error::{EngineError, Result};
use crate::hash::PathHash;
use crate::resources::{ResourceData, ResourceKind};
use crate::store::ResourceStore;

new_key_type! {
    /// Handle to a loaded pak archive.
    pub struct PakHandle;
}

/// Byte size of one index entry: path hash + kind + pak hash + offset.
const INDEX_ENTRY_SIZE: u64 = 4 + 1 + 4 + 8;

/// Index record locating one resource inside a loaded pak.
#[derive(Debug, Clone, Copy)]
pub struct PakEntry {
    /// Hash of the owning pak's path.
    pub pak: PathHash,
    /// Resource kind stored at the offset.
    pub kind: ResourceKind,
    /// Absolute byte offset of the record.
    pub offset: u64,
}

struct PakArchive {
    path: String,
    hash: PathHash,
    reader: BufReader<File>,
    /// Hashes this pak indexed at load time, for unload teardown.
    entries: Vec<PathHash>,
}

/// The set of currently loaded pak archives plus the merged entry index.
pub struct PakSystem {
    capacity: usize,
    paks: SlotMap<PakHandle, PakArchive>,
    by_path: FxHashMap<PathHash, PakHandle>,
    entries: FxHashMap<PathHash, PakEntry>,
}

impl PakSystem {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            paks: SlotMap::with_key(),
            by_path: FxHashMap::default(),
            entries: FxHashMap::default(),
        }
    }

    /// Number of loaded paks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paks.is_empty()
    }

    /// Whether any loaded pak indexes this hash.
    #[must_use]
    pub fn contains(&self, hash: PathHash) -> bool {
        self.entries.contains_key(&hash)
    }

    /// Writes every payload-bearing live store entry into a new pak file,
    /// replacing any existing file at `path`. Returns the entry count.
    pub fn write_pak(path: &str, store: &ResourceStore) -> Result<usize> {
        let pak_hash = PathHash::of(path);
        let records: Vec<(PathHash, &ResourceData)> = store
            .iter()
            .filter_map(|(hash, _, entry)| {
                if entry.data.is_none() {
                    log::warn!(
                        "create_pak: skipping \"{}\", entry has no payload",
                        entry.path
                    );
                }
                entry.data.as_ref().map(|data| (hash, data))
            })
            .collect();

        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        codec::write_u32(&mut w, records.len() as u32)?;
        let mut offset = 4 + records.len() as u64 * INDEX_ENTRY_SIZE;
        for (hash, data) in &records {
            codec::write_u32(&mut w, hash.0)?;
            codec::write_u8(&mut w, data.kind().tag())?;
            codec::write_u32(&mut w, pak_hash.0)?;
            codec::write_i64(&mut w, offset as i64)?;
            offset += data.encoded_size();
        }
        for (_, data) in &records {
            data.encode(&mut w)?;
        }
        w.flush()?;

        log::debug!("create_pak: wrote {} entries to \"{path}\"", records.len());
        Ok(records.len())
    }

    /// Opens a pak and merges its index into the entry table. The file
    /// handle stays resident until [`unload`](Self::unload).
    pub fn load(&mut self, path: &str) -> Result<usize> {
        let hash = PathHash::of(path);
        if self.by_path.contains_key(&hash) {
            return Err(EngineError::PakAlreadyLoaded {
                path: path.to_owned(),
            });
        }
        if self.paks.len() >= self.capacity {
            return Err(EngineError::CapacityExhausted {
                kind: "pak",
                capacity: self.capacity,
            });
        }

        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let count = codec::read_u32(&mut reader)?;

        // Parse and validate the whole index before touching shared state,
        // so a malformed entry mid-index leaves the merged table untouched.
        let mut parsed = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let path_hash = PathHash(codec::read_u32(&mut reader)?);
            let kind = ResourceKind::from_tag(codec::read_u8(&mut reader)?).map_err(|e| {
                EngineError::MalformedPak {
                    path: path.to_owned(),
                    reason: e.to_string(),
                }
            })?;
            let pak_hash = PathHash(codec::read_u32(&mut reader)?);
            let offset = codec::read_i64(&mut reader)?;
            if pak_hash != hash {
                log::warn!(
                    "load_pak: entry {path_hash} in \"{path}\" names foreign pak {pak_hash}"
                );
            }
            if offset < 0 {
                return Err(EngineError::MalformedPak {
                    path: path.to_owned(),
                    reason: format!("negative offset {offset} for entry {path_hash}"),
                });
            }
            parsed.push((
                path_hash,
                PakEntry {
                    pak: hash,
                    kind,
                    offset: offset as u64,
                },
            ));
        }

        let mut indexed = Vec::with_capacity(parsed.len());
        for (path_hash, entry) in parsed {
            if self.entries.contains_key(&path_hash) {
                log::warn!(
                    "load_pak: {path_hash} already indexed by another pak, keeping the first"
                );
                continue;
            }
            self.entries.insert(path_hash, entry);
            indexed.push(path_hash);
        }

        let added = indexed.len();
        let handle = self.paks.insert(PakArchive {
            path: path.to_owned(),
            hash,
            reader,
            entries: indexed,
        });
        self.by_path.insert(hash, handle);
        log::debug!("load_pak: \"{path}\" indexed {added} entries");
        Ok(added)
    }

    /// Removes a pak's index records and closes its file. Returns the entry
    /// hashes so the caller can destroy whatever is still resident.
    pub fn unload(&mut self, path: &str) -> Result<Vec<PathHash>> {
        let hash = PathHash::of(path);
        let Some(handle) = self.by_path.remove(&hash) else {
            return Err(EngineError::PakNotLoaded {
                path: path.to_owned(),
            });
        };
        let Some(archive) = self.paks.remove(handle) else {
            return Err(EngineError::PakNotLoaded {
                path: path.to_owned(),
            });
        };
        for entry_hash in &archive.entries {
            // Only drop index records this pak owns; a later pak may have
            // shadowed nothing since duplicates are skipped at load.
            if self
                .entries
                .get(entry_hash)
                .is_some_and(|e| e.pak == archive.hash)
            {
                self.entries.remove(entry_hash);
            }
        }
        log::debug!(
            "unload_pak: \"{}\" released {} entries",
            archive.path,
            archive.entries.len()
        );
        Ok(archive.entries)
        // archive.reader drops here, closing the file.
    }

    /// Reads and decodes the record for `hash`, if any loaded pak indexes
    /// it. Verifies the stored kind byte against the requested kind.
    pub fn read_entry(
        &mut self,
        request_path: &str,
        hash: PathHash,
        expected: ResourceKind,
    ) -> Result<Option<ResourceData>> {
        let Some(entry) = self.entries.get(&hash).copied() else {
            return Ok(None);
        };
        if entry.kind != expected {
            return Err(EngineError::ResourceTypeMismatch {
                path: request_path.to_owned(),
                expected,
                actual: entry.kind,
            });
        }
        let Some(&handle) = self.by_path.get(&entry.pak) else {
            return Err(EngineError::Decode(format!(
                "pak index entry {hash} names an unloaded pak"
            )));
        };
        let Some(archive) = self.paks.get_mut(handle) else {
            return Err(EngineError::Decode(format!(
                "pak index entry {hash} names an unloaded pak"
            )));
        };
        archive.reader.seek(SeekFrom::Start(entry.offset))?;
        let data =
            ResourceData::decode(entry.kind, &mut archive.reader).map_err(|e| match e {
                EngineError::Io(io) => EngineError::MalformedPak {
                    path: archive.path.clone(),
                    reason: io.to_string(),
                },
                other => other,
            })?;
        Ok(Some(data))
    }

    /// Paths of every loaded pak. Shutdown teardown iterates this.
    #[must_use]
    pub fn loaded_paths(&self) -> Vec<String> {
        self.paks.values().map(|a| a.path.clone()).collect()
    }
}
