//! Pack processor (read side)
//!
//! Turns a fetched pack byte stream into stored loose objects in three
//! phases: header/trailer checks, sequential object parsing keyed by
//! starting offset, then iterative delta resolution sweeps. A trailing
//! checksum mismatch is logged and tolerated; a sweep that makes no
//! progress means missing or circular delta bases and is fatal.

use crate::areas::database::Database;
use crate::artifacts::objects::object::object_hash;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::pack_file::inflate_counting;
use crate::artifacts::pack::{
    delta, read_entry_header, PackObjectType, PACK_HEADER_SIZE, PACK_SIGNATURE,
    PACK_TRAILER_SIZE,
};
use crate::artifacts::objects::object_id::sha1_hex;
use crate::artifacts::protocol::sideband;
use crate::errors::GitError;
use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use log::{debug, warn};
use std::collections::HashMap;

/// One pack record while the pack is being processed
#[derive(Debug)]
struct PackedObject {
    offset: u64,
    /// Resolved payload (immediately for non-deltas)
    payload: Option<Bytes>,
    object_type: Option<ObjectType>,
    oid: Option<ObjectId>,
    /// Backward displacement target for offset-deltas
    base_offset: Option<u64>,
    /// Base identity for ref-deltas
    base_oid: Option<ObjectId>,
    delta_payload: Option<Bytes>,
}

impl PackedObject {
    fn is_resolved(&self) -> bool {
        self.payload.is_some()
    }
}

/// Summary of a processed pack
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub object_count: usize,
    pub delta_count: usize,
}

pub struct PackProcessor<'db> {
    database: &'db Database,
}

impl<'db> PackProcessor<'db> {
    pub fn new(database: &'db Database) -> Self {
        PackProcessor { database }
    }

    /// Process a transport response or bare pack stream and store every
    /// contained object loose.
    pub fn process(&self, stream: &[u8]) -> Result<PackSummary> {
        let pack = if stream.starts_with(PACK_SIGNATURE) {
            stream.to_vec()
        } else {
            sideband::extract_pack_data(stream)?
        };

        if pack.len() < PACK_HEADER_SIZE + PACK_TRAILER_SIZE {
            return Err(GitError::InvalidPackHeader.into());
        }

        self.verify_trailer(&pack);
        let object_count = self.parse_header(&pack)?;
        debug!("processing pack with {object_count} objects");

        let mut objects = self.parse_objects(&pack, object_count)?;
        let delta_count = objects.iter().filter(|o| !o.is_resolved()).count();
        self.resolve_deltas(&mut objects)?;

        for object in &objects {
            let object_type = object.object_type.expect("resolved object has a type");
            let payload = object.payload.as_ref().expect("resolved object has bytes");
            self.database.store_raw(object_type, payload)?;
        }

        Ok(PackSummary {
            object_count: objects.len(),
            delta_count,
        })
    }

    /// Phase A: the trailing SHA-1 covers all preceding bytes. Side-band
    /// reassembled transfers occasionally present a stream that inflates
    /// correctly but is not bit-identical, so a mismatch only warns.
    fn verify_trailer(&self, pack: &[u8]) {
        let body_len = pack.len() - PACK_TRAILER_SIZE;
        let declared = &pack[body_len..];
        let actual = sha1_hex(&pack[..body_len]);

        let declared_hex: String = declared.iter().map(|b| format!("{b:02x}")).collect();
        if declared_hex != actual {
            warn!("pack checksum mismatch: declared {declared_hex}, computed {actual}");
        }
    }

    fn parse_header(&self, pack: &[u8]) -> Result<u32> {
        if &pack[0..4] != PACK_SIGNATURE {
            return Err(GitError::InvalidPackHeader.into());
        }
        let version = BigEndian::read_u32(&pack[4..8]);
        if version != 2 && version != 3 {
            return Err(GitError::UnsupportedPackVersion(version).into());
        }
        Ok(BigEndian::read_u32(&pack[8..12]))
    }

    /// Phase B: walk the records sequentially, caching each by its
    /// starting offset so offset-deltas can find their base.
    fn parse_objects(&self, pack: &[u8], object_count: u32) -> Result<Vec<PackedObject>> {
        let body = &pack[..pack.len() - PACK_TRAILER_SIZE];
        let mut objects = Vec::with_capacity(object_count as usize);
        let mut offset = PACK_HEADER_SIZE;

        for ordinal in 0..object_count {
            if offset >= body.len() {
                return Err(anyhow!(GitError::InvalidPackHeader)
                    .context(format!("pack truncated before object {ordinal}")));
            }

            let record_offset = offset as u64;
            let (pack_type, declared_size, body_offset) = read_entry_header(body, offset)?;

            let mut object = PackedObject {
                offset: record_offset,
                payload: None,
                object_type: None,
                oid: None,
                base_offset: None,
                base_oid: None,
                delta_payload: None,
            };

            let data_offset = match pack_type {
                PackObjectType::OfsDelta => {
                    let mut cursor = body_offset;
                    let displacement = delta::read_negative_offset(body, &mut cursor)?;
                    object.base_offset = Some(
                        record_offset
                            .checked_sub(displacement)
                            .ok_or(GitError::MissingOrCircularDelta)?,
                    );
                    cursor
                }
                PackObjectType::RefDelta => {
                    let raw = body
                        .get(body_offset..body_offset + 20)
                        .ok_or(GitError::InvalidPackHeader)?;
                    object.base_oid = Some(ObjectId::from_raw(raw)?);
                    body_offset + 20
                }
                _ => body_offset,
            };

            let (payload, consumed) = inflate_counting(body, data_offset, declared_size)?;
            offset = data_offset + consumed;

            if pack_type.is_delta() {
                object.delta_payload = Some(Bytes::from(payload));
            } else {
                let object_type = pack_type.as_object_type().expect("plain pack type");
                object.oid = Some(object_hash(object_type, &payload));
                object.object_type = Some(object_type);
                object.payload = Some(Bytes::from(payload));
            }

            objects.push(object);
        }

        Ok(objects)
    }

    /// Phase C: sweep deltas until all are resolved; a sweep with no
    /// progress means a missing or circular base.
    fn resolve_deltas(&self, objects: &mut [PackedObject]) -> Result<()> {
        let by_offset: HashMap<u64, usize> = objects
            .iter()
            .enumerate()
            .map(|(index, object)| (object.offset, index))
            .collect();

        loop {
            let pending: Vec<usize> = objects
                .iter()
                .enumerate()
                .filter(|(_, object)| !object.is_resolved())
                .map(|(index, _)| index)
                .collect();
            if pending.is_empty() {
                return Ok(());
            }

            let mut progressed = false;
            for index in pending {
                if let Some(resolved) = self.try_resolve(index, objects, &by_offset)? {
                    let object = &mut objects[index];
                    object.object_type = Some(resolved.0);
                    object.oid = Some(object_hash(resolved.0, &resolved.1));
                    object.payload = Some(Bytes::from(resolved.1));
                    progressed = true;
                }
            }

            if !progressed {
                return Err(GitError::MissingOrCircularDelta.into());
            }
        }
    }

    /// Resolve one delta if its base is available: a resolved in-pack
    /// object for offset-deltas, or that plus the local store for
    /// ref-deltas.
    fn try_resolve(
        &self,
        index: usize,
        objects: &[PackedObject],
        by_offset: &HashMap<u64, usize>,
    ) -> Result<Option<(ObjectType, Vec<u8>)>> {
        let object = &objects[index];
        let delta_payload = object
            .delta_payload
            .as_ref()
            .expect("unresolved object carries delta payload");

        let base: Option<(ObjectType, Bytes)> = if let Some(base_offset) = object.base_offset {
            let base_index = by_offset
                .get(&base_offset)
                .copied()
                .ok_or(GitError::MissingOrCircularDelta)?;
            let base_object = &objects[base_index];
            base_object.payload.as_ref().map(|payload| {
                (
                    base_object.object_type.expect("resolved base has a type"),
                    payload.clone(),
                )
            })
        } else if let Some(base_oid) = &object.base_oid {
            if let Some(base_index) = objects
                .iter()
                .position(|candidate| candidate.oid.as_ref() == Some(base_oid))
            {
                let base_object = &objects[base_index];
                base_object.payload.as_ref().map(|payload| {
                    (
                        base_object.object_type.expect("resolved base has a type"),
                        payload.clone(),
                    )
                })
            } else {
                // thin packs may reference bases the local store already has
                match self.database.load_raw(base_oid) {
                    Ok((object_type, payload)) => Some((object_type, payload)),
                    Err(_) => None,
                }
            }
        } else {
            return Err(GitError::MissingOrCircularDelta.into());
        };

        match base {
            Some((base_type, base_payload)) => {
                let payload = delta::apply(&base_payload, delta_payload)?;
                Ok(Some((base_type, payload)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::blob::Blob;
    use crate::artifacts::objects::object::Object;
    use crate::artifacts::pack::writer;
    use crate::artifacts::pack::write_entry_header;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use sha1::{Digest, Sha1};
    use std::io::Write;
    use tempfile::TempDir;

    fn database() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        (dir, database)
    }

    fn deflate(payload: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    fn finish_pack(mut pack: Vec<u8>) -> Vec<u8> {
        let mut hasher = Sha1::new();
        hasher.update(&pack);
        let digest = hasher.finalize();
        pack.extend_from_slice(&digest);
        pack
    }

    /// Build a pack of plain (non-delta) records from compressed bodies
    fn bare_pack(records: &[(PackObjectType, Vec<u8>)]) -> Vec<u8> {
        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&(records.len() as u32).to_be_bytes());
        for (pack_type, body) in records {
            let mut decoder = flate2::read::ZlibDecoder::new(body.as_slice());
            let mut payload = Vec::new();
            std::io::Read::read_to_end(&mut decoder, &mut payload).unwrap();

            pack.extend_from_slice(&write_entry_header(*pack_type, payload.len() as u64));
            pack.extend_from_slice(body);
        }
        finish_pack(pack)
    }

    #[test]
    fn round_trips_a_writer_pack() {
        let (_dir, source_db) = database();
        let blob_a = Blob::from_slice(b"alpha");
        let blob_b = Blob::from_slice(b"beta content that is a bit longer");
        let oid_a = source_db.store(&blob_a).unwrap();
        let oid_b = source_db.store(&blob_b).unwrap();

        let pack =
            writer::write_pack(&source_db, &[oid_a.clone(), oid_b.clone()]).unwrap();

        let (_dir2, target_db) = database();
        let summary = PackProcessor::new(&target_db).process(&pack).unwrap();
        assert_eq!(summary.object_count, 2);
        assert_eq!(summary.delta_count, 0);

        assert_eq!(
            target_db.load_raw(&oid_a).unwrap().1.as_ref(),
            b"alpha".as_slice()
        );
        assert_eq!(target_db.load_blob(&oid_b).unwrap(), blob_b);
    }

    #[test]
    fn resolves_ref_delta_against_in_pack_base() {
        let base_payload = b"the quick brown fox jumps over the lazy dog".to_vec();
        let base_oid = crate::artifacts::objects::object::object_hash(
            ObjectType::Blob,
            &base_payload,
        );

        // delta: copy the whole base
        let mut delta_payload = Vec::new();
        delta_payload.push(base_payload.len() as u8);
        delta_payload.push(base_payload.len() as u8);
        delta_payload.extend_from_slice(&[0x80 | 0x01 | 0x10, 0, base_payload.len() as u8]);

        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&write_entry_header(
            PackObjectType::Blob,
            base_payload.len() as u64,
        ));
        pack.extend_from_slice(&deflate(&base_payload));
        pack.extend_from_slice(&write_entry_header(
            PackObjectType::RefDelta,
            delta_payload.len() as u64,
        ));
        pack.extend_from_slice(&base_oid.to_raw());
        pack.extend_from_slice(&deflate(&delta_payload));
        let pack = finish_pack(pack);

        let (_dir, db) = database();
        let summary = PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(summary.object_count, 2);
        assert_eq!(summary.delta_count, 1);

        // the delta result equals the base, so both records share one oid
        assert_eq!(db.load_raw(&base_oid).unwrap().1, base_payload);
    }

    #[test]
    fn resolves_offset_delta() {
        let base_payload = b"offset delta base payload".to_vec();

        let mut delta_payload = Vec::new();
        delta_payload.push(base_payload.len() as u8);
        delta_payload.push(base_payload.len() as u8);
        delta_payload.extend_from_slice(&[0x80 | 0x01 | 0x10, 0, base_payload.len() as u8]);

        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&2u32.to_be_bytes());

        let base_record_offset = pack.len() as u64;
        pack.extend_from_slice(&write_entry_header(
            PackObjectType::Blob,
            base_payload.len() as u64,
        ));
        pack.extend_from_slice(&deflate(&base_payload));

        let delta_record_offset = pack.len() as u64;
        pack.extend_from_slice(&write_entry_header(
            PackObjectType::OfsDelta,
            delta_payload.len() as u64,
        ));
        let displacement = delta_record_offset - base_record_offset;
        assert!(displacement < 128, "single varint byte in this fixture");
        pack.push(displacement as u8);
        pack.extend_from_slice(&deflate(&delta_payload));
        let pack = finish_pack(pack);

        let (_dir, db) = database();
        let summary = PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(summary.object_count, 2);
        assert_eq!(summary.delta_count, 1);
    }

    #[test]
    fn ref_delta_against_local_store_resolves() {
        let (_dir, db) = database();
        let base = Blob::from_slice(b"already present locally");
        let base_oid = db.store(&base).unwrap();
        let base_payload = base.content().to_vec();

        let mut delta_payload = Vec::new();
        delta_payload.push(base_payload.len() as u8);
        delta_payload.push(base_payload.len() as u8);
        delta_payload.extend_from_slice(&[0x80 | 0x01 | 0x10, 0, base_payload.len() as u8]);

        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&1u32.to_be_bytes());
        pack.extend_from_slice(&write_entry_header(
            PackObjectType::RefDelta,
            delta_payload.len() as u64,
        ));
        pack.extend_from_slice(&base_oid.to_raw());
        pack.extend_from_slice(&deflate(&delta_payload));
        let pack = finish_pack(pack);

        let summary = PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(summary.delta_count, 1);
    }

    #[test]
    fn missing_ref_delta_base_fails() {
        let ghost = ObjectId::try_parse("c".repeat(40)).unwrap();
        let delta_payload = vec![1, 1, 1, b'x'];

        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&1u32.to_be_bytes());
        pack.extend_from_slice(&write_entry_header(
            PackObjectType::RefDelta,
            delta_payload.len() as u64,
        ));
        pack.extend_from_slice(&ghost.to_raw());
        pack.extend_from_slice(&deflate(&delta_payload));
        let pack = finish_pack(pack);

        let (_dir, db) = database();
        let err = PackProcessor::new(&db).process(&pack).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn bad_trailer_is_tolerated() {
        let (_dir, source_db) = database();
        let oid = source_db.store(&Blob::from_slice(b"tolerant")).unwrap();
        let mut pack = writer::write_pack(&source_db, &[oid.clone()]).unwrap();
        let last = pack.len() - 1;
        pack[last] ^= 0xff;

        let (_dir2, db) = database();
        PackProcessor::new(&db).process(&pack).unwrap();
        assert!(db.contains(&oid));
    }

    #[test]
    fn rejects_bad_signature_and_version() {
        let (_dir, db) = database();
        let processor = PackProcessor::new(&db);

        let bogus = finish_pack(b"JUNK\x00\x00\x00\x02\x00\x00\x00\x00".to_vec());
        assert!(processor.process(&bogus).is_err());

        let mut wrong_version = Vec::new();
        wrong_version.extend_from_slice(PACK_SIGNATURE);
        wrong_version.extend_from_slice(&9u32.to_be_bytes());
        wrong_version.extend_from_slice(&0u32.to_be_bytes());
        let wrong_version = finish_pack(wrong_version);
        assert!(processor.process(&wrong_version).is_err());
    }

    #[test]
    fn accepts_empty_pack() {
        let (_dir, db) = database();
        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&2u32.to_be_bytes());
        pack.extend_from_slice(&0u32.to_be_bytes());
        let pack = finish_pack(pack);

        let summary = PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(summary, PackSummary::default());
    }

    #[test]
    fn plain_helper_pack_is_processed() {
        let payload = b"plain record".to_vec();
        let pack = bare_pack(&[(PackObjectType::Blob, deflate(&payload))]);

        let (_dir, db) = database();
        let summary = PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(summary.object_count, 1);

        let oid = crate::artifacts::objects::object::object_hash(ObjectType::Blob, &payload);
        let loaded = db.load(&oid).unwrap();
        match loaded {
            crate::artifacts::objects::object::ObjectKind::Blob(blob) => {
                assert_eq!(blob.content().as_ref(), payload.as_slice());
            }
            other => panic!("expected blob, got {:?}", other.object_type()),
        }
    }

    #[test]
    fn full_history_round_trips_through_a_pack() {
        use crate::artifacts::objects::commit::{Commit, Signature};
        use crate::artifacts::objects::entry_mode::EntryMode;
        use crate::artifacts::objects::tree::{Tree, TreeEntry};
        use crate::artifacts::pack::writer::select_for_push;
        use chrono::{FixedOffset, TimeZone};

        let (_dir, source_db) = database();
        let blob_oid = source_db.store(&Blob::from_slice(b"tracked content")).unwrap();
        let tree = Tree::from_entries(vec![TreeEntry::new(
            EntryMode::Regular,
            "file.txt".to_string(),
            blob_oid.clone(),
        )]);
        let tree_oid = source_db.store(&tree).unwrap();

        let offset = FixedOffset::east_opt(0).unwrap();
        let signature = Signature::new_with_timestamp(
            "P".to_string(),
            "p@x".to_string(),
            offset.timestamp_opt(1_700_000_000, 0).single().unwrap(),
        );
        let commit = Commit::new(
            tree_oid.clone(),
            vec![],
            signature.clone(),
            signature,
            "packed".to_string(),
        );
        let commit_oid = source_db.store(&commit).unwrap();

        let objects = select_for_push(&source_db, &commit_oid, None).unwrap();
        let pack = writer::write_pack(&source_db, &objects).unwrap();

        let (_dir2, db) = database();
        let summary = PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(summary.object_count, 3);

        let loaded = db.load_commit(&commit_oid).unwrap();
        assert_eq!(loaded, commit);
        assert_eq!(db.load_tree(&tree_oid).unwrap(), tree);
        assert_eq!(
            db.load_blob(&blob_oid).unwrap().content().as_ref(),
            b"tracked content"
        );
    }

    #[test]
    fn processor_result_objects_load_via_object_trait() {
        let (_dir, source_db) = database();
        let blob = Blob::from_slice(b"exercise the Object trait path");
        let oid = blob.object_id().unwrap();
        source_db.store(&blob).unwrap();

        let pack = writer::write_pack(&source_db, &[oid.clone()]).unwrap();
        let (_dir2, db) = database();
        PackProcessor::new(&db).process(&pack).unwrap();
        assert_eq!(db.load_blob(&oid).unwrap(), blob);
    }
}
