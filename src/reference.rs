use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::Result;
use crate::upload::ImageFile;

/// Hands out short-lived string handles to in-memory image data.
pub trait ReferenceProvider {
    fn create(&mut self, file: ImageFile) -> Result<String>;

    /// Releasing an unknown or already released reference is a no-op.
    fn release(&mut self, reference: &str);
}

/// Object references for hosts without a browser: the bytes stay in this
/// store and the reference resolves back to them until released.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, ImageFile>,
    created: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, reference: &str) -> Option<&ImageFile> {
        self.entries.get(reference)
    }

    /// Number of references created and not yet released.
    pub fn live(&self) -> usize {
        self.entries.len()
    }
}

impl ReferenceProvider for MemoryStore {
    fn create(&mut self, file: ImageFile) -> Result<String> {
        self.created += 1;

        let digest = Sha256::digest(&file.bytes);
        // Counter keeps two uploads of the same bytes distinct
        let reference = format!("blob:snapqr/{}-{}", hex::encode(&digest[..8]), self.created);

        self.entries.insert(reference.clone(), file);
        Ok(reference)
    }

    fn release(&mut self, reference: &str) {
        if self.entries.remove(reference).is_some() {
            tracing::debug!(reference, "released object reference");
        }
    }
}
