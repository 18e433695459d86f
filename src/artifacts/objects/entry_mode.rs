use crate::errors::GitError;

/// File modes a tree or index entry may carry
#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    #[default]
    Regular,
    Executable,
    Symlink,
    Directory,
}

impl EntryMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Directory => 0o040000,
        }
    }

    /// Octal rendering used inside tree objects (no leading zero)
    pub fn as_octal(&self) -> String {
        format!("{:o}", self.as_u32())
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, EntryMode::Regular | EntryMode::Executable)
    }

    pub fn from_octal_str(mode: &str) -> Result<Self, GitError> {
        let raw = u32::from_str_radix(mode, 8)
            .map_err(|_| GitError::InvalidTree)?;
        Self::try_from(raw)
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = GitError;

    fn try_from(mode: u32) -> Result<Self, Self::Error> {
        match mode {
            0o100644 => Ok(EntryMode::Regular),
            0o100755 => Ok(EntryMode::Executable),
            0o120000 => Ok(EntryMode::Symlink),
            0o040000 => Ok(EntryMode::Directory),
            _ => Err(GitError::InvalidTree),
        }
    }
}
