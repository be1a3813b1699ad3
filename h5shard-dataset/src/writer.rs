use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use h5shard_config::CONFIG;

use crate::{
    array::{H5Array, IntoH5Array},
    error::{H5Result, H5ShardError},
    keys::{ensure_group, join_key, link_exists, split_key},
};

#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Key of the array inside every shard, and the group holding the
    /// external links in the aggregate file.
    pub root_key: String,
    /// One name per sample, used for the shard file stem and the link name.
    /// Positional indices are used when absent.
    pub identifiers: Option<Vec<String>>,
    /// Directory for the shard files. Derived from the aggregate file path
    /// when absent.
    pub parts_dir: Option<PathBuf>,
    pub shard_extension: String,
    pub parts_suffix: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            root_key: CONFIG.root_key.clone(),
            identifiers: None,
            parts_dir: None,
            shard_extension: CONFIG.shard_extension.clone(),
            parts_suffix: CONFIG.parts_suffix.clone(),
        }
    }
}

impl WriterOptions {
    pub fn with_root_key(mut self, root_key: impl Into<String>) -> Self {
        self.root_key = root_key.into();
        self
    }

    pub fn with_identifiers<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifiers = Some(identifiers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_parts_dir(mut self, parts_dir: impl Into<PathBuf>) -> Self {
        self.parts_dir = Some(parts_dir.into());
        self
    }

    pub fn with_shard_extension(mut self, extension: impl Into<String>) -> Self {
        self.shard_extension = extension.into();
        self
    }
}

/// Files touched by a call to [`convert_arrays_to_sharded_h5`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub dataset_path: PathBuf,
    pub root_key: String,
    pub parts_dir: PathBuf,
    /// Shard files in sample order.
    pub shard_paths: Vec<PathBuf>,
}

/// Write every sample to its own shard file and link all shards from the
/// aggregate file at `dataset_path`.
///
/// Shards end up at `{parts_dir}/{identifier}.{ext}` with the array stored
/// under `root_key`. The aggregate file gets one external link per shard at
/// `{root_key}/{identifier}`. Existing arrays and links with the same names
/// are replaced, so re-running with the same identifiers overwrites in place.
///
/// Nothing is rolled back on failure; shards written before the error stay on
/// disk and the call can simply be repeated.
pub fn convert_arrays_to_sharded_h5<I, P>(
    data: I,
    dataset_path: P,
    options: WriterOptions,
) -> H5Result<WriteSummary>
where
    I: IntoIterator,
    I::Item: IntoH5Array,
    P: AsRef<Path>,
{
    let dataset_path = dataset_path.as_ref().to_path_buf();
    let parts_dir = match &options.parts_dir {
        Some(parts_dir) => parts_dir.clone(),
        None => default_parts_dir(&dataset_path, &options.parts_suffix),
    };

    fs::create_dir_all(parent_dir(&dataset_path))?;
    fs::create_dir_all(&parts_dir)?;

    let mut shard_paths = Vec::new();
    for (index, sample) in data.into_iter().enumerate() {
        let identifier = match &options.identifiers {
            Some(identifiers) => identifiers.get(index).cloned().ok_or(
                H5ShardError::MissingIdentifier {
                    index,
                    provided: identifiers.len(),
                },
            )?,
            None => index.to_string(),
        };

        let shard_path = parts_dir.join(format!("{}.{}", identifier, options.shard_extension));
        write_shard(&shard_path, &options.root_key, &sample.into_h5_array()?)?;
        shard_paths.push(shard_path);
    }

    link_shards(&dataset_path, &options.root_key, &shard_paths)?;

    tracing::info!(
        "Wrote {} shards to {} and linked them from {}",
        shard_paths.len(),
        parts_dir.display(),
        dataset_path.display()
    );

    Ok(WriteSummary {
        dataset_path,
        root_key: options.root_key,
        parts_dir,
        shard_paths,
    })
}

impl WriteSummary {
    /// Aggregate keys in sample order.
    ///
    /// Passing these as explicit keys to [`crate::H5Dataset`] keeps index `i`
    /// pointing at sample `i`; discovered keys are sorted by name instead.
    pub fn item_keys(&self) -> Vec<String> {
        self.shard_paths
            .iter()
            .filter_map(|path| path.file_stem())
            .map(|stem| join_key(&self.root_key, &stem.to_string_lossy()))
            .collect()
    }
}

/// `{parent}/{file_name}{suffix}`, e.g. `out/train.hdf5.parts`.
pub fn default_parts_dir(dataset_path: &Path, suffix: &str) -> PathBuf {
    let file_name = dataset_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent_dir(dataset_path).join(format!("{}{}", file_name, suffix))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

fn write_shard(shard_path: &Path, key: &str, array: &H5Array) -> H5Result<()> {
    let file = hdf5::File::append(shard_path)?;
    if link_exists(&file, key)? {
        tracing::debug!(
            "Replacing {} in existing shard {}",
            key,
            shard_path.display()
        );
        file.unlink(key)?;
    }

    let (parents, name) = split_key(key)?;
    let group = ensure_group(&file, &parents.join("/"))?;
    array.write(&group, name)?;

    tracing::debug!(
        "Wrote {} array of shape {:?} to {}",
        array.dtype(),
        array.shape(),
        shard_path.display()
    );
    Ok(())
}

fn link_shards(dataset_path: &Path, root_key: &str, shard_paths: &[PathBuf]) -> H5Result<()> {
    let file = hdf5::File::append(dataset_path)?;
    let root = ensure_group(&file, root_key)?;
    let base_dir = parent_dir(dataset_path);

    for shard_path in shard_paths {
        let stem = shard_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| H5ShardError::InvalidKey(shard_path.display().to_string()))?;

        if root.link_exists(stem) {
            root.unlink(stem)?;
        }

        let target = link_target(base_dir, shard_path)?;
        root.link_external(&target, root_key, stem)?;
        tracing::debug!("Linked {}/{} -> {}:{}", root_key, stem, target, root_key);
    }
    Ok(())
}

/// Path of `shard_path` relative to `base_dir` in POSIX form. HDF5 resolves
/// relative external links against the directory of the linking file, so the
/// output tree stays readable after it is moved.
fn link_target(base_dir: &Path, shard_path: &Path) -> H5Result<String> {
    let base_dir = if base_dir.as_os_str().is_empty() {
        std::env::current_dir()?.canonicalize()?
    } else {
        base_dir.canonicalize()?
    };
    let shard_path = shard_path.canonicalize()?;
    let relative = pathdiff::diff_paths(&shard_path, &base_dir).unwrap_or(shard_path);
    Ok(to_posix(&relative))
}

fn to_posix(path: &Path) -> String {
    let mut posix = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => posix.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => posix.push('/'),
            other => {
                if !posix.is_empty() && !posix.ends_with('/') {
                    posix.push('/');
                }
                posix.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    posix
}
