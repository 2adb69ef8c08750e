use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::{palette::Palette, transition::Transition};
use crate::{
    bundle_fs::FS,
    error::{Error, Result},
    properties::PropertyRegistry,
};

/// Palettes and color transitions, loaded from the archive once per name and shared
#[derive(Clone)]
pub struct AssetCache {
    fs: FS,
    registry: Arc<PropertyRegistry>,
    palettes: Arc<DashMap<String, Arc<Palette>>>,
    transitions: Arc<DashMap<String, Arc<Transition>>>,
}

impl AssetCache {
    pub fn new(fs: FS, registry: Arc<PropertyRegistry>) -> Self {
        Self {
            fs,
            registry,
            palettes: Arc::new(DashMap::new()),
            transitions: Arc::new(DashMap::new()),
        }
    }

    pub fn palette(&self, name: &str) -> Result<Arc<Palette>> {
        let key = name.to_ascii_lowercase();
        if let Some(palette) = self.palettes.get(&key) {
            return Ok(Arc::clone(&*palette));
        }

        let path = self
            .registry
            .palette_path(&key)
            .ok_or_else(|| Error::InvalidPalette {
                name: name.to_string(),
                reason: "not listed in [palettes]".to_string(),
            })?;
        debug!("Loading palette {} from {}", key, path);

        let palette = Arc::new(Palette::from_bytes(&key, &self.fs.read(path)?)?);
        // A concurrent load of the same name may have won, keep whichever landed first
        Ok(Arc::clone(&*self.palettes.entry(key).or_insert(palette)))
    }

    pub fn transition(&self, name: &str) -> Result<Arc<Transition>> {
        let key = name.to_ascii_lowercase();
        if let Some(transition) = self.transitions.get(&key) {
            return Ok(Arc::clone(&*transition));
        }

        let path = self
            .registry
            .transition_path(&key)
            .ok_or_else(|| Error::MissingProperties(format!("transitions/{key}")))?;
        debug!("Loading transition {} from {}", key, path);

        let transition = Arc::new(Transition::from_bytes(&key, &self.fs.read(path)?)?);
        Ok(Arc::clone(&*self.transitions.entry(key).or_insert(transition)))
    }

    pub fn loaded_palettes(&self) -> usize {
        self.palettes.len()
    }
}
