//! Sinks for finished classes
//!
//! Both the rewriter driver and the support class injector hand their results
//! to an [`OutputInterface`]. Class names are internal names without the
//! `.class` suffix, e.g. `architectury_inject_demo_0123/PlatformMethods`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::CLASS_FILE_SUFFIX;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("output does not accept new classes")]
    ReadOnly,
    #[error("class {0} was already added")]
    Duplicate(String),
    #[error("invalid class name '{0}'")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait OutputInterface {
    /// Store one class under its internal name
    fn add_class(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), OutputError>;

    /// Whether `add_class` may be called for classes that were not part of the input
    fn can_add_classes(&self) -> bool {
        true
    }
}

/// In-memory output keyed by internal name
#[derive(Debug, Default)]
pub struct MemoryOutput {
    classes: BTreeMap<String, Vec<u8>>,
    read_only: bool,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output that rejects every class
    pub fn read_only() -> Self {
        Self { classes: BTreeMap::new(), read_only: true }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.classes.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn into_classes(self) -> BTreeMap<String, Vec<u8>> {
        self.classes
    }
}

impl OutputInterface for MemoryOutput {
    fn add_class(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), OutputError> {
        if self.read_only {
            return Err(OutputError::ReadOnly);
        }
        if self.classes.contains_key(name) {
            return Err(OutputError::Duplicate(name.to_string()));
        }
        self.classes.insert(name.to_string(), bytes);
        Ok(())
    }

    fn can_add_classes(&self) -> bool {
        !self.read_only
    }
}

/// Writes `<root>/<name>.class`, creating package directories as needed.
/// Existing files are overwritten so a build can be rerun into the same directory.
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    root: PathBuf,
}

impl DirectoryOutput {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, OutputError> {
        let valid = !name.is_empty()
            && !name.starts_with('/')
            && !name.contains('\\')
            && name.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if !valid {
            return Err(OutputError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{}{}", name, CLASS_FILE_SUFFIX)))
    }
}

impl OutputInterface for DirectoryOutput {
    fn add_class(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), OutputError> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}
