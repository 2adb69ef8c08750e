use crate::error::{Error, Result};

pub const TRANSITION_SIZE: usize = 256;

/// Color transition table, remapping palette indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    name: String,
    table: [u8; TRANSITION_SIZE],
}

impl Transition {
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let table = bytes.try_into().map_err(|_| Error::InvalidTransition {
            name: name.to_string(),
            len: bytes.len(),
        })?;

        Ok(Self {
            name: name.to_string(),
            table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map(&self, index: u8) -> u8 {
        self.table[index as usize]
    }
}
