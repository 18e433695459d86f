//! Core object traits
//!
//! Every storable object serializes to `<type> <size>\0<payload>` and is
//! identified by the SHA-1 of that encoding. Objects are modeled as a sum
//! type (`ObjectKind`) with one parser per variant.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::GitError;
use anyhow::Result;
use bytes::Bytes;
use std::path::PathBuf;

/// Serialization to the canonical on-disk encoding (header included)
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Deserialization from an object payload (header already stripped)
pub trait Unpackable {
    fn deserialize(payload: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Common object operations
pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// The object's payload without the `<type> <size>\0` header
    fn payload(&self) -> Result<Bytes>;

    /// SHA-1 identity of the canonical encoding
    fn object_id(&self) -> Result<ObjectId> {
        Ok(ObjectId::from_bytes(&self.serialize()?))
    }

    /// Location under the objects directory
    fn object_path(&self) -> Result<PathBuf> {
        Ok(self.object_id()?.to_path())
    }
}

/// Parsed object of any kind
///
/// Tags are accepted by the discriminator and carried as raw payload; the
/// client never produces annotated tags itself.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Bytes),
}

impl ObjectKind {
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectKind::Blob(_) => ObjectType::Blob,
            ObjectKind::Tree(_) => ObjectType::Tree,
            ObjectKind::Commit(_) => ObjectType::Commit,
            ObjectKind::Tag(_) => ObjectType::Tag,
        }
    }

    /// Parse a payload of the given type
    pub fn parse(object_type: ObjectType, payload: &[u8]) -> Result<Self> {
        match object_type {
            ObjectType::Blob => Ok(ObjectKind::Blob(Blob::deserialize(payload)?)),
            ObjectType::Tree => Ok(ObjectKind::Tree(Tree::deserialize(payload)?)),
            ObjectType::Commit => Ok(ObjectKind::Commit(Commit::deserialize(payload)?)),
            ObjectType::Tag => Ok(ObjectKind::Tag(Bytes::copy_from_slice(payload))),
        }
    }

    pub fn into_commit(self) -> Result<Commit, GitError> {
        match self {
            ObjectKind::Commit(commit) => Ok(commit),
            _ => Err(GitError::InvalidCommit),
        }
    }

    pub fn into_tree(self) -> Result<Tree, GitError> {
        match self {
            ObjectKind::Tree(tree) => Ok(tree),
            _ => Err(GitError::InvalidTree),
        }
    }

    pub fn into_blob(self) -> Result<Blob, GitError> {
        match self {
            ObjectKind::Blob(blob) => Ok(blob),
            _ => Err(GitError::InvalidBlob),
        }
    }
}

/// Render the canonical header for a payload
pub fn object_header(object_type: ObjectType, payload_len: usize) -> Vec<u8> {
    format!("{} {}\0", object_type.as_str(), payload_len).into_bytes()
}

/// Identity an object of `object_type` with `payload` would receive
pub fn object_hash(object_type: ObjectType, payload: &[u8]) -> ObjectId {
    let mut bytes = object_header(object_type, payload.len());
    bytes.extend_from_slice(payload);
    ObjectId::from_bytes(&bytes)
}

/// Split a decompressed loose object into its type and payload,
/// validating that the declared length matches the actual payload.
pub fn split_header(data: &[u8]) -> Result<(ObjectType, &[u8])> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or(GitError::InvalidObjectFormat)?;
    let header = std::str::from_utf8(&data[..nul]).map_err(|_| GitError::InvalidObjectFormat)?;
    let (type_str, size_str) = header
        .split_once(' ')
        .ok_or(GitError::InvalidObjectFormat)?;

    let object_type = ObjectType::try_from(type_str)?;
    let declared: usize = size_str
        .parse()
        .map_err(|_| GitError::InvalidObjectFormat)?;

    let payload = &data[nul + 1..];
    if payload.len() != declared {
        return Err(GitError::InvalidObjectFormat.into());
    }

    Ok((object_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn header_hash_matches_manual_sha1() {
        let oid = object_hash(ObjectType::Blob, b"Hello World");
        assert_eq!(oid.as_ref(), "5e1c309dae7f45e0f39b1bf3ac3cd9db12e7d689");
    }

    #[test]
    fn split_header_validates_size() {
        let (object_type, payload) = split_header(b"blob 5\0hello").unwrap();
        assert_eq!(object_type, ObjectType::Blob);
        assert_eq!(payload, b"hello");

        assert!(split_header(b"blob 6\0hello").is_err());
        assert!(split_header(b"blob hello").is_err());
        assert!(split_header(b"sock 5\0hello").is_err());
    }
}
