//! Path normalization shared by the upsert and lookup paths.

use std::path::Path;

use crate::error::Result;

/// Absolute form of a path, resolved against the current directory.
///
/// Does not require the file to exist, so deletion of entries for
/// vanished files keys on the same string the upsert stored. Symlinks are
/// left unresolved; the absolute lexical form is the collection key.
pub fn absolute_path(path: impl AsRef<Path>) -> Result<String> {
    let absolute = std::path::absolute(path.as_ref())?;
    Ok(absolute.to_string_lossy().into_owned())
}
