use std::path::{Path, PathBuf};

use h5shard_config::CONFIG;

use crate::{
    array::H5Array,
    error::{H5Result, H5ShardError},
    keys::{components, join_key, key_exists},
    protocol::IndexedDataset,
};

#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// Group whose children become the item keys when `keys` is not given.
    pub root_key: String,
    /// Explicit, fully-qualified item keys. Each must exist in the file.
    pub keys: Option<Vec<String>>,
    /// Keep one read-only handle open for the lifetime of the dataset instead
    /// of opening the file on every access.
    pub keep_file_open: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            root_key: CONFIG.root_key.clone(),
            keys: None,
            keep_file_open: false,
        }
    }
}

impl DatasetOptions {
    pub fn with_root_key(mut self, root_key: impl Into<String>) -> Self {
        self.root_key = root_key.into();
        self
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn keep_file_open(mut self, keep_file_open: bool) -> Self {
        self.keep_file_open = keep_file_open;
        self
    }
}

/// How the dataset gets at its file.
enum FileAccess {
    /// Owned for the lifetime of the dataset, released when it is dropped.
    Persistent(hdf5::File),
    /// A fresh read-only handle per access, released when the access ends.
    PerAccess,
}

/// Randomly indexable view over the arrays stored under a fixed, ordered list
/// of keys in an HDF5 file. Keys may be external links into other files.
pub struct H5Dataset {
    path: PathBuf,
    keys: Vec<String>,
    access: FileAccess,
}

impl H5Dataset {
    pub fn open<P: AsRef<Path>>(path: P) -> H5Result<Self> {
        Self::with_options(path, DatasetOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: DatasetOptions) -> H5Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = hdf5::File::open(&path)?;

        let keys = match options.keys {
            Some(keys) => {
                for key in &keys {
                    // The root group is not an array entry.
                    if components(key)?.is_empty() || !key_exists(&file, key)? {
                        return Err(H5ShardError::KeyNotFound {
                            key: key.clone(),
                            path,
                        });
                    }
                }
                keys
            }
            None => discover_keys(&file, &path, &options.root_key)?,
        };

        tracing::debug!(
            "Opened hdf5 dataset {} with {} keys (keep_file_open: {})",
            path.display(),
            keys.len(),
            options.keep_file_open
        );

        let access = if options.keep_file_open {
            FileAccess::Persistent(file)
        } else {
            drop(file);
            FileAccess::PerAccess
        };

        Ok(Self { path, keys, access })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn keeps_file_open(&self) -> bool {
        matches!(self.access, FileAccess::Persistent(_))
    }

    pub fn key(&self, index: usize) -> H5Result<&str> {
        self.keys
            .get(index)
            .map(String::as_str)
            .ok_or(H5ShardError::IndexOutOfRange {
                index,
                len: self.keys.len(),
            })
    }

    fn with_file<R>(&self, read: impl FnOnce(&hdf5::File) -> H5Result<R>) -> H5Result<R> {
        match &self.access {
            FileAccess::Persistent(file) => read(file),
            FileAccess::PerAccess => {
                // Dropped on every exit path, closing the handle.
                let file = hdf5::File::open(&self.path)?;
                read(&file)
            }
        }
    }
}

impl IndexedDataset for H5Dataset {
    type Item = H5Array;

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn get(&self, index: usize) -> H5Result<H5Array> {
        let key = self.key(index)?;
        tracing::trace!("Reading {} from {}", key, self.path.display());
        self.with_file(|file| {
            let dataset = file.dataset(key)?;
            H5Array::read(&dataset)
        })
    }
}

/// Children of `root_key`, sorted by name so the index order does not depend
/// on the link ordering of the file.
fn discover_keys(file: &hdf5::File, path: &Path, root_key: &str) -> H5Result<Vec<String>> {
    if !key_exists(file, root_key)? {
        return Err(H5ShardError::KeyNotFound {
            key: root_key.to_string(),
            path: path.to_path_buf(),
        });
    }

    let mut names = file.group(root_key)?.member_names()?;
    names.sort();

    Ok(names
        .into_iter()
        .map(|name| join_key(root_key, &name))
        .collect())
}
