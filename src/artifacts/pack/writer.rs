//! Pack writer (send side)
//!
//! Emits `PACK`, version 2, the object count, one undeltified record per
//! object (varint header + zlib payload), and the trailing SHA-1. Object
//! selection walks history from the tip being published, stopping at
//! anything the remote already has.

use crate::areas::database::Database;
use crate::artifacts::history::merge_base;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::pack::{write_entry_header, PackObjectType, PACK_SIGNATURE};
use anyhow::{Context, Result};
use byteorder::{BigEndian, WriteBytesExt};
use sha1::{Digest, Sha1};
use std::collections::{HashSet, VecDeque};
use std::io::Write;

/// Serialize the given objects into an in-memory pack
pub fn write_pack(database: &Database, objects: &[ObjectId]) -> Result<Vec<u8>> {
    let mut pack = Vec::new();
    pack.write_all(PACK_SIGNATURE)?;
    pack.write_u32::<BigEndian>(2)?;
    pack.write_u32::<BigEndian>(objects.len() as u32)?;

    for oid in objects {
        let (object_type, payload) = database
            .load_raw(oid)
            .with_context(|| format!("unable to pack {oid}"))?;

        pack.extend_from_slice(&write_entry_header(
            PackObjectType::from_object_type(object_type),
            payload.len() as u64,
        ));

        let mut encoder =
            flate2::write::ZlibEncoder::new(&mut pack, flate2::Compression::default());
        encoder.write_all(&payload)?;
        encoder.finish()?;
    }

    let mut hasher = Sha1::new();
    hasher.update(&pack);
    let digest = hasher.finalize();
    pack.extend_from_slice(&digest);

    Ok(pack)
}

/// Choose the objects a push must transmit: every commit reachable from
/// `local_tip` that the remote lacks, plus each one's tree, subtrees and
/// blobs. The remote's ancestor closure seeds the visited set so shared
/// history is never resent.
pub fn select_for_push(
    database: &Database,
    local_tip: &ObjectId,
    remote_tip: Option<&ObjectId>,
) -> Result<Vec<ObjectId>> {
    let mut visited: HashSet<ObjectId> = HashSet::new();
    if let Some(remote_tip) = remote_tip {
        visited.extend(merge_base::ancestors(database, remote_tip));
    }

    let mut selected = Vec::new();
    let mut queue = VecDeque::from([local_tip.clone()]);

    while let Some(current) = queue.pop_front() {
        if visited.contains(&current) {
            continue;
        }
        visited.insert(current.clone());

        let Ok(commit) = database.load_commit(&current) else {
            continue;
        };
        selected.push(current.clone());

        if visited.insert(commit.tree().clone()) {
            selected.push(commit.tree().clone());
            collect_tree_objects(database, commit.tree(), &mut selected, &mut visited)?;
        }

        for parent in commit.parents() {
            if !visited.contains(parent) {
                queue.push_back(parent.clone());
            }
        }
    }

    Ok(selected)
}

fn collect_tree_objects(
    database: &Database,
    tree_oid: &ObjectId,
    selected: &mut Vec<ObjectId>,
    visited: &mut HashSet<ObjectId>,
) -> Result<()> {
    let (object_type, payload) = database.load_raw(tree_oid)?;
    if object_type != ObjectType::Tree {
        return Ok(());
    }
    let tree = Tree::deserialize(&payload)?;

    for entry in tree.entries() {
        if !visited.insert(entry.oid.clone()) {
            continue;
        }
        selected.push(entry.oid.clone());

        if entry.mode.is_tree() {
            collect_tree_objects(database, &entry.oid, selected, visited)?;
        }
    }

    Ok(())
}
