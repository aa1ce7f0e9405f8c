//! Artifacts materialized on disk by stages.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What kind of filesystem entry an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A regular file.
    File,
    /// A directory, typically holding per-index outputs.
    Directory,
    /// A symbolic link to another artifact.
    Symlink,
}

/// A file, directory or symbolic link produced by a stage.
///
/// The producing stage exclusively creates the artifact; the orchestrator
/// only inspects it, and downstream stages treat it as read-only input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// The kind of filesystem entry.
    pub kind: ArtifactKind,

    /// Where the artifact lives.
    pub path: PathBuf,

    /// When the artifact was recorded (ISO 8601).
    pub created_at: String,
}

impl Artifact {
    /// Creates a new artifact record.
    #[must_use]
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Creates a file artifact record.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::File, path)
    }

    /// Creates a directory artifact record.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::Directory, path)
    }

    /// Creates a symbolic link artifact record.
    #[must_use]
    pub fn symlink(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::Symlink, path)
    }

    /// Inspects whatever exists at `path` without following a final link.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error, `NotFound` when nothing is there.
    pub fn inspect(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file_type = fs::symlink_metadata(path)?.file_type();
        let kind = if file_type.is_symlink() {
            ArtifactKind::Symlink
        } else if file_type.is_dir() {
            ArtifactKind::Directory
        } else {
            ArtifactKind::File
        };
        Ok(Self::new(kind, path))
    }

    /// Returns true if something exists at the artifact path.
    ///
    /// A dangling symbolic link still counts as existing.
    #[must_use]
    pub fn exists(&self) -> bool {
        fs::symlink_metadata(&self.path).is_ok()
    }

    /// Lists the entries a consumer should iterate, sorted by path.
    ///
    /// Directories (and links to directories) yield their members; anything
    /// else yields the artifact path itself.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the artifact cannot be read.
    pub fn members(&self) -> io::Result<Vec<PathBuf>> {
        list_members(&self.path)
    }

    /// Computes a content fingerprint of the artifact.
    ///
    /// Links are followed. Directory fingerprints cover relative member
    /// names and contents, so two structurally identical trees at different
    /// locations fingerprint the same.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if any member cannot be read.
    pub fn fingerprint(&self) -> io::Result<String> {
        let mut hasher = Sha256::new();
        hash_tree(&mut hasher, &self.path, &self.path, &mut Vec::new())?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Removes the artifact from disk. Missing artifacts are not an error.
    ///
    /// Links are removed without touching their target.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error on failure.
    pub fn remove(&self) -> io::Result<()> {
        let result = match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_dir() => fs::remove_dir_all(&self.path),
            Ok(_) => fs::remove_file(&self.path),
            Err(err) => Err(err),
        };
        match result {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Lists `path`'s members sorted by path, or `path` itself for plain files.
///
/// # Errors
///
/// Returns the underlying IO error if `path` cannot be read.
pub fn list_members(path: &Path) -> io::Result<Vec<PathBuf>> {
    if !fs::metadata(path)?.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut members = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    members.sort();
    Ok(members)
}

/// Formats the per-index file name used between stages.
///
/// ```
/// use photonsim::core::indexed_file_name;
///
/// assert_eq!(indexed_file_name("pmi", 1), "pmi_out_0000001.h5");
/// ```
#[must_use]
pub fn indexed_file_name(prefix: &str, index: usize) -> String {
    format!("{prefix}_out_{index:07}.h5")
}

/// Hashes `path` and everything below it, following links.
///
/// `ancestors` holds the canonical directories currently being walked; a
/// link back into one of them is hashed as a marker instead of re-entered.
fn hash_tree(
    hasher: &mut Sha256,
    root: &Path,
    path: &Path,
    ancestors: &mut Vec<PathBuf>,
) -> io::Result<()> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    if fs::metadata(path)?.is_dir() {
        let canonical = fs::canonicalize(path)?;
        if ancestors.contains(&canonical) {
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(b"\0cycle\0");
            return Ok(());
        }
        ancestors.push(canonical);
        for member in list_members(path)? {
            hash_tree(hasher, root, &member, ancestors)?;
        }
        ancestors.pop();
        return Ok(());
    }
    hasher.update(relative.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(fs::read(path)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_file_name() {
        assert_eq!(indexed_file_name("diffr", 2), "diffr_out_0000002.h5");
        assert_eq!(indexed_file_name("FELsource", 1), "FELsource_out_0000001.h5");
    }

    #[test]
    fn test_inspect_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prop_out.h5");
        fs::write(&file, b"wavefront").unwrap();

        let artifact = Artifact::inspect(&file).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::File);
        assert!(artifact.exists());

        let artifact = Artifact::inspect(dir.path()).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Directory);

        let missing = Artifact::inspect(dir.path().join("absent"));
        assert_eq!(missing.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_inspect_symlink_and_members_follow_link() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("diffr");
        fs::create_dir(&target).unwrap();
        fs::write(target.join(indexed_file_name("diffr", 2)), b"b").unwrap();
        fs::write(target.join(indexed_file_name("diffr", 1)), b"a").unwrap();
        let link = dir.path().join("detector");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let artifact = Artifact::inspect(&link).unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Symlink);

        let names: Vec<_> = artifact
            .members()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["diffr_out_0000001.h5", "diffr_out_0000002.h5"]);

        artifact.remove().unwrap();
        assert!(!artifact.exists());
        assert!(target.join("diffr_out_0000001.h5").exists());
    }

    #[test]
    fn test_members_of_file_is_itself() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("recon.h5");
        fs::write(&file, b"x").unwrap();

        assert_eq!(Artifact::file(&file).members().unwrap(), vec![file]);
    }

    #[test]
    fn test_fingerprint_is_location_independent() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for root in [a.path(), b.path()] {
            fs::write(root.join("pmi_out_0000001.h5"), b"snapshot").unwrap();
        }

        let fa = Artifact::directory(a.path()).fingerprint().unwrap();
        let fb = Artifact::directory(b.path()).fingerprint().unwrap();
        assert_eq!(fa, fb);

        fs::write(b.path().join("pmi_out_0000001.h5"), b"changed").unwrap();
        let fb = Artifact::directory(b.path()).fingerprint().unwrap();
        assert_ne!(fa, fb);
    }

    #[cfg(unix)]
    #[test]
    fn test_fingerprint_stops_at_link_cycles() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        for root in [a.path(), b.path()] {
            let nested = root.join("pmi");
            fs::create_dir(&nested).unwrap();
            fs::write(nested.join("pmi_out_0000001.h5"), b"snapshot").unwrap();
            std::os::unix::fs::symlink(root, nested.join("back")).unwrap();
        }

        let fa = Artifact::directory(a.path()).fingerprint().unwrap();
        let fb = Artifact::directory(b.path()).fingerprint().unwrap();
        assert_eq!(fa, fb);
        assert_eq!(Artifact::directory(a.path()).fingerprint().unwrap(), fa);
    }

    #[test]
    fn test_remove_directory_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pmi");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("pmi_out_0000001.h5"), b"x").unwrap();

        let artifact = Artifact::directory(&out);
        artifact.remove().unwrap();
        assert!(!out.exists());
        artifact.remove().unwrap();
    }
}
