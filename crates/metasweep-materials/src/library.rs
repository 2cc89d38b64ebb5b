//! Named material lookup.
//!
//! Layer stacks refer to materials by name. Material tables are usually
//! named like `SiO2.txt`, so lookups ignore a trailing `.txt` and compare
//! case-sensitively on the stem: `SiO2`, `SiO2.txt` and a user file
//! `Materials_data/SiO2.txt` all resolve to the same entry (user files win).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::dispersion::{ConstantMaterial, SellmeierMaterial};
use crate::provider::{MaterialError, MaterialProvider};
use crate::tabulated::TabulatedMaterial;

/// A set of materials addressable by name.
#[derive(Clone, Default)]
pub struct MaterialLibrary {
    materials: BTreeMap<String, Arc<dyn MaterialProvider>>,
}

impl std::fmt::Debug for MaterialLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialLibrary")
            .field("materials", &self.materials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MaterialLibrary {
    /// An empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// `air`, `SiO2` (Sellmeier) and `Si` (tabulated).
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        lib.insert("air", Arc::new(ConstantMaterial::air()));
        lib.insert("SiO2", Arc::new(SellmeierMaterial::fused_silica()));
        lib.insert("Si", Arc::new(TabulatedMaterial::silicon()));
        lib
    }

    /// Built-ins plus every `*.txt` table in `dir`.
    pub fn with_directory(dir: &Path) -> Result<Self, MaterialError> {
        let mut lib = Self::builtin();
        lib.load_directory(dir)?;
        Ok(lib)
    }

    /// Add every `*.txt` table in `dir`, replacing same-named entries.
    /// Returns the number of files loaded.
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize, MaterialError> {
        let entries = std::fs::read_dir(dir).map_err(|source| MaterialError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        paths.sort();

        for path in &paths {
            let material = TabulatedMaterial::from_file(path)?;
            debug!("Loaded material table {}", path.display());
            self.insert(material.name().to_string(), Arc::new(material));
        }
        info!("Loaded {} material table(s) from {}", paths.len(), dir.display());
        Ok(paths.len())
    }

    pub fn insert(&mut self, name: impl AsRef<str>, material: Arc<dyn MaterialProvider>) {
        self.materials.insert(normalise(name.as_ref()).to_string(), material);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn MaterialProvider>, MaterialError> {
        self.materials
            .get(normalise(name))
            .cloned()
            .ok_or_else(|| MaterialError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(normalise(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

fn normalise(name: &str) -> &str {
    let name = name.trim();
    name.strip_suffix(".txt").unwrap_or(name)
}
