//! Helpers for path-like HDF5 keys such as `/data/sample_0`.
//!
//! Keys are always resolved relative to the group they are used with; for a
//! file handle that is the root group, so `/data` and `data` are equivalent.

use crate::error::{H5Result, H5ShardError};

/// Join a root key and a child name into a fully-qualified item key.
pub fn join_key(root: &str, child: &str) -> String {
    format!(
        "{}/{}",
        root.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}

/// Split a key into its components. Repeated slashes are collapsed as HDF5
/// does, and the root key (`/` or the empty key) has none.
pub fn components(key: &str) -> H5Result<Vec<&str>> {
    Ok(key.split('/').filter(|part| !part.is_empty()).collect())
}

/// Split a key into its parent components and its final name.
pub fn split_key(key: &str) -> H5Result<(Vec<&str>, &str)> {
    let mut parts = components(key)?;
    match parts.pop() {
        Some(name) => Ok((parts, name)),
        None => Err(H5ShardError::InvalidKey(key.to_string())),
    }
}

/// Check whether `key` resolves to an object below `group`.
///
/// Every link along the path is checked in turn, so a missing intermediate
/// group yields `false` instead of an HDF5 error. The final link must also
/// resolve, which means dangling external links count as absent.
pub fn key_exists(group: &hdf5::Group, key: &str) -> H5Result<bool> {
    let parts = components(key)?;
    if parts.is_empty() {
        return Ok(true);
    }

    let mut prefix = String::new();
    for part in &parts {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        if !group.link_exists(&prefix) {
            return Ok(false);
        }
    }

    Ok(group.dataset(&prefix).is_ok() || group.group(&prefix).is_ok())
}

/// Check only whether the final link of `key` exists, without resolving it.
pub fn link_exists(group: &hdf5::Group, key: &str) -> H5Result<bool> {
    let parts = components(key)?;
    let mut prefix = String::new();
    for part in &parts {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(part);
        if !group.link_exists(&prefix) {
            return Ok(false);
        }
    }
    Ok(!parts.is_empty())
}

/// Open the group at `key`, creating every missing group along the way.
pub fn ensure_group(group: &hdf5::Group, key: &str) -> H5Result<hdf5::Group> {
    let mut current = group.clone();
    for part in components(key)? {
        current = if current.link_exists(part) {
            current.group(part)?
        } else {
            tracing::debug!("Creating group {} under {}", part, current.name());
            current.create_group(part)?
        };
    }
    Ok(current)
}
