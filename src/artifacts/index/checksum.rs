use crate::artifacts::index::CHECKSUM_SIZE;
use crate::errors::GitError;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Reader/writer that keeps a running SHA-1 of everything that passes
/// through it, so the trailing index checksum can be produced or verified.
#[derive(Debug)]
pub struct Checksum<T> {
    inner: T,
    digest: Sha1,
}

impl<T> Checksum<T> {
    pub fn new(inner: T) -> Self {
        Checksum {
            inner,
            digest: Sha1::new(),
        }
    }
}

impl<T: Read> Checksum<T> {
    pub fn read(&mut self, size: usize) -> Result<Bytes> {
        let mut buffer = vec![0; size];
        self.inner
            .read_exact(&mut buffer)
            .map_err(|_| anyhow!(GitError::IndexInvalid))?;
        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    /// Compare the running digest against the stored trailing checksum
    pub fn verify(&mut self) -> Result<()> {
        let mut stored = [0u8; CHECKSUM_SIZE];
        self.inner
            .read_exact(&mut stored)
            .map_err(|_| anyhow!(GitError::IndexInvalid))?;

        let actual = self.digest.clone().finalize();
        if stored != actual.as_slice() {
            return Err(anyhow!(GitError::IndexInvalid).context("index checksum mismatch"));
        }
        Ok(())
    }
}

impl<T: Write> Checksum<T> {
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    pub fn write_checksum(&mut self) -> Result<()> {
        let checksum = self.digest.clone().finalize();
        self.inner.write_all(checksum.as_slice())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_then_read_verifies() {
        let mut buffer = Vec::new();
        {
            let mut writer = Checksum::new(&mut buffer);
            writer.write(b"DIRC").unwrap();
            writer.write(b"payload").unwrap();
            writer.write_checksum().unwrap();
        }

        let mut reader = Checksum::new(Cursor::new(&buffer));
        assert_eq!(&reader.read(4).unwrap()[..], b"DIRC");
        assert_eq!(&reader.read(7).unwrap()[..], b"payload");
        reader.verify().unwrap();
    }

    #[test]
    fn corrupted_byte_fails_verification() {
        let mut buffer = Vec::new();
        {
            let mut writer = Checksum::new(&mut buffer);
            writer.write(b"payload").unwrap();
            writer.write_checksum().unwrap();
        }
        buffer[0] ^= 0xff;

        let mut reader = Checksum::new(Cursor::new(&buffer));
        reader.read(7).unwrap();
        assert!(reader.verify().is_err());
    }
}
