//! The confined directory manager.
//!
//! A [`Sandbox`] owns a home directory and a working position (PWD) inside
//! it, expressed as home-relative path segments. Resolution never touches
//! the filesystem above home: `..` pops a segment and fails the moment the
//! segment stack is empty, which rejects transient excursions like
//! `../other/back` even when the final position would land back inside.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{FsError, FsResult};

/// A per-identity sandboxed directory tree.
#[derive(Debug)]
pub struct Sandbox {
    /// Absolute-ish path of the home boundary (`Root/<identity>`).
    home: PathBuf,
    /// Home-relative PWD segments; empty means home itself.
    pwd: Vec<String>,
}

impl Sandbox {
    /// Open the sandbox for `name` under `root`, creating both directories
    /// if they do not exist yet.
    pub fn create(root: impl AsRef<Path>, name: &str) -> FsResult<Self> {
        let home = root.as_ref().join(name);
        fs::create_dir_all(&home)?;
        Ok(Self { home, pwd: Vec::new() })
    }

    /// The home boundary on disk.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The final segment of the home path (the identity name).
    pub fn name(&self) -> String {
        self.home
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Current home-relative PWD segments.
    pub fn pwd(&self) -> &[String] {
        &self.pwd
    }

    /// Overwrite the PWD (used to restore it after an undo replay).
    pub fn set_pwd(&mut self, segments: Vec<String>) {
        self.pwd = segments;
    }

    /// Reset the PWD to home.
    pub fn reset_pwd(&mut self) {
        self.pwd.clear();
    }

    /// Home-relative PWD rendered as `"a/b/"`, or `""` at home.
    ///
    /// Concatenating this with a PWD-relative name gives the home-relative
    /// form the command log records.
    pub fn current_prefix(&self) -> String {
        if self.pwd.is_empty() {
            String::new()
        } else {
            format!("{}/", self.pwd.join("/"))
        }
    }

    /// Resolve a PWD-relative path to home-relative segments.
    pub fn resolve(&self, path: &str) -> FsResult<Vec<String>> {
        walk(&self.pwd, path)
    }

    /// Whether a PWD-relative path resolves to an existing entry.
    pub fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(segments) => self.disk(&segments).exists(),
            Err(_) => false,
        }
    }

    /// Create every missing directory along `path`.
    ///
    /// Fails with `AlreadyExists` only when nothing had to be created, i.e.
    /// the full path pre-existed.
    pub fn create_dir(&self, path: &str) -> FsResult<()> {
        let segments = self.resolve(path)?;
        let mut cursor = self.home.clone();
        let mut created = false;
        for segment in &segments {
            cursor.push(segment);
            if !cursor.exists() {
                fs::create_dir(&cursor)?;
                created = true;
            }
        }
        if !created {
            return Err(FsError::already_exists(path));
        }
        Ok(())
    }

    /// Recursively remove the subtree at `path`.
    pub fn remove_dir(&self, path: &str) -> FsResult<()> {
        let segments = self.resolve(path)?;
        if segments.is_empty() {
            // Home itself is never removable through the sandbox.
            return Err(FsError::PermissionDenied);
        }
        let target = self.disk(&segments);
        if !target.exists() {
            return Err(FsError::not_found(path));
        }
        remove_tree(&target)?;
        Ok(())
    }

    /// Relocate `src` to `dst`.
    ///
    /// Fails with `AlreadyExists` if `dst` exists; an existing target is
    /// never overwritten or merged, so the inverse move always restores
    /// the original layout.
    pub fn move_dir(&self, src: &str, dst: &str) -> FsResult<()> {
        self.relocate(src, dst)
    }

    /// Relabel `current` to `target` in place.
    ///
    /// Fails with `AlreadyExists` if `target` exists.
    pub fn rename_dir(&self, current: &str, target: &str) -> FsResult<()> {
        self.relocate(current, target)
    }

    fn relocate(&self, from: &str, to: &str) -> FsResult<()> {
        let from_segments = self.resolve(from)?;
        let to_segments = self.resolve(to)?;
        if from_segments.is_empty() {
            return Err(FsError::PermissionDenied);
        }
        let from_disk = self.disk(&from_segments);
        if !from_disk.exists() {
            return Err(FsError::not_found(from));
        }
        let to_disk = self.disk(&to_segments);
        if to_disk.exists() {
            return Err(FsError::already_exists(to));
        }
        if let Some(parent) = to_disk.parent() {
            if !parent.exists() {
                return Err(FsError::not_found(to));
            }
        }
        fs::rename(&from_disk, &to_disk)?;
        Ok(())
    }

    /// Apply `..`/descend semantics to the PWD, honoring the home boundary.
    ///
    /// Each descend segment must name an existing directory.
    pub fn change_dir(&mut self, path: &str) -> FsResult<()> {
        let mut segments = self.pwd.clone();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(FsError::PermissionDenied);
                    }
                }
                name => {
                    segments.push(name.to_string());
                    if !self.disk(&segments).is_dir() {
                        return Err(FsError::not_found(path));
                    }
                }
            }
        }
        self.pwd = segments;
        Ok(())
    }

    /// Immediate child names of the resolved path, in the host's natural
    /// enumeration order. An empty `path` lists the PWD.
    pub fn list(&self, path: &str) -> FsResult<Vec<String>> {
        let segments = self.resolve(path)?;
        let dir = self.disk(&segments);
        if !dir.is_dir() {
            return Err(FsError::not_found(path));
        }
        read_names(&dir)
    }

    /// Immediate child names of home, regardless of the PWD.
    pub fn list_home(&self) -> FsResult<Vec<String>> {
        read_names(&self.home)
    }

    /// Display name for the entry a resolution landed on: the final
    /// segment, or the identity name when the resolution is home itself.
    pub fn display_name(&self, segments: &[String]) -> String {
        segments.last().cloned().unwrap_or_else(|| self.name())
    }

    /// Map home-relative segments onto the disk path.
    fn disk(&self, segments: &[String]) -> PathBuf {
        let mut path = self.home.clone();
        for segment in segments {
            path.push(segment);
        }
        path
    }
}

/// Walk `path` segment by segment from `base`, re-checking the home
/// boundary on every `..`.
fn walk(base: &[String], path: &str) -> FsResult<Vec<String>> {
    let mut segments = base.to_vec();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(FsError::PermissionDenied);
                }
            }
            name => segments.push(name.to_string()),
        }
    }
    Ok(segments)
}

fn read_names(dir: &Path) -> FsResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Remove a subtree, children before directories.
///
/// Post-order over an explicit stack: a directory is pushed back once with
/// its expansion flag set and deleted on the second visit, after all of its
/// children. Depth of the tree never translates into call-stack depth.
pub fn remove_tree(root: &Path) -> io::Result<()> {
    let mut stack = vec![(root.to_path_buf(), false)];
    while let Some((path, expanded)) = stack.pop() {
        if !path.is_dir() {
            fs::remove_file(&path)?;
            continue;
        }
        if expanded {
            fs::remove_dir(&path)?;
            continue;
        }
        stack.push((path.clone(), true));
        for entry in fs::read_dir(&path)? {
            stack.push((entry?.path(), false));
        }
    }
    Ok(())
}
