use crate::artifacts::objects::object::{object_header, Object, Packable, Unpackable};
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use derive_new::new;

/// Opaque file content
#[derive(Debug, Clone, Default, PartialEq, Eq, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn from_slice(content: &[u8]) -> Self {
        Blob {
            content: Bytes::copy_from_slice(content),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Packable for Blob {
    fn serialize(&self) -> Result<Bytes> {
        let mut bytes = object_header(ObjectType::Blob, self.content.len());
        bytes.extend_from_slice(&self.content);
        Ok(Bytes::from(bytes))
    }
}

impl Unpackable for Blob {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        Ok(Blob {
            content: Bytes::copy_from_slice(payload),
        })
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn payload(&self) -> Result<Bytes> {
        Ok(self.content.clone())
    }
}
