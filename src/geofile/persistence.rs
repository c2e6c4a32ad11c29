use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    error::{AoiError, Result},
    store::feature::{prepare_rings, Feature, FeatureDraft},
};

use super::geojson::{from_geojson_str, to_geojson_string};

/// Durable storage addressed by key, holding UTF-8 text.
pub trait KeyValueSlot {
    /// Returns `None` when nothing was ever written under `key`.
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> io::Result<()>;
}

/// Stores every key as a `<key>.geojson` file inside a directory.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.geojson", key))
    }
}

impl KeyValueSlot for FileSlot {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }
}

/// Loads and saves the feature collection as a GeoJSON document under a single key.
///
/// Failures never reach the caller of `load` and `save`: a store that cannot be read starts empty,
/// a store that cannot be written stays authoritative in memory.
pub struct PersistenceAdapter {
    slot: Box<dyn KeyValueSlot>,
    key: String,
    last_saved: Option<String>,
}

impl PersistenceAdapter {
    pub fn new(slot: Box<dyn KeyValueSlot>, key: &str) -> Self {
        Self {
            slot,
            key: key.to_string(),
            last_saved: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored drafts. Every draft is checked for valid geometry so that a payload is
    /// either restored completely or not at all.
    pub fn try_load(&self) -> Result<Vec<FeatureDraft>> {
        let contents = match self.slot.read(&self.key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return Ok(Vec::new()),
            Err(err) => return Err(AoiError::PersistenceReadFailed(err.to_string())),
        };
        let mut drafts = from_geojson_str(&contents)
            .map_err(|err| AoiError::PersistenceReadFailed(err.to_string()))?;
        for draft in drafts.iter_mut() {
            draft.rings = prepare_rings(draft.kind, std::mem::take(&mut draft.rings))
                .map_err(|err| AoiError::PersistenceReadFailed(err.to_string()))?;
        }
        Ok(drafts)
    }

    pub fn load(&self) -> Vec<FeatureDraft> {
        match self.try_load() {
            Ok(drafts) => {
                log::debug!("Loaded {} features from '{}'", drafts.len(), self.key);
                drafts
            }
            Err(err) => {
                log::error!("{}, starting with no features", err);
                Vec::new()
            }
        }
    }

    /// Write the features unless the encoded document equals the last one written.
    pub fn try_save(&mut self, features: &[Feature]) -> Result<()> {
        let contents = to_geojson_string(features)
            .map_err(|err| AoiError::PersistenceWriteFailed(err.to_string()))?;
        if self.last_saved.as_ref() == Some(&contents) {
            return Ok(());
        }
        self.slot
            .write(&self.key, &contents)
            .map_err(|err| AoiError::PersistenceWriteFailed(err.to_string()))?;
        self.last_saved = Some(contents);
        Ok(())
    }

    pub fn save(&mut self, features: &[Feature]) {
        if let Err(err) = self.try_save(features) {
            log::error!("{}, changes are kept in memory only", err);
        }
    }
}

/// In-memory slot whose clones share the same contents.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemorySlot {
    values: std::rc::Rc<std::cell::RefCell<std::collections::HashMap<String, String>>>,
    pub writes: std::rc::Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl KeyValueSlot for MemorySlot {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Slot that refuses every write, like a browser storage over its quota.
#[cfg(test)]
pub struct FullSlot;

#[cfg(test)]
impl KeyValueSlot for FullSlot {
    fn read(&self, _key: &str) -> io::Result<Option<String>> {
        Ok(None)
    }

    fn write(&mut self, _key: &str, _value: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "quota exceeded"))
    }
}
