//! Local mirror of synchronized server directories.
//!
//! A [`Mirror`] owns a sandbox under the client root, keyed by the
//! session letter, and replays incoming [`SyncFrame`]s against it with the
//! same confinement rules the server enforces. Application is tolerant of
//! already-applied state: a `create` for an existing entry and a `remove`
//! for a missing one are no-ops, so a conservative resync never fails
//! halfway.

use std::path::{Path, PathBuf};

use dirsync_fs::{FsError, FsResult, Sandbox, remove_tree};
use dirsync_proto::SyncFrame;

/// The client-side mirror tree for one session.
pub struct Mirror {
    sandbox: Sandbox,
}

impl Mirror {
    /// Open the mirror home `root/<letter>`, creating it if missing.
    pub fn create(root: impl AsRef<Path>, letter: &str) -> FsResult<Self> {
        let sandbox = Sandbox::create(root, letter)?;
        Ok(Self { sandbox })
    }

    /// The mirror home on disk.
    pub fn home(&self) -> &Path {
        self.sandbox.home()
    }

    /// Apply one frame from the server.
    pub fn apply(&mut self, frame: &SyncFrame) -> FsResult<()> {
        match frame {
            SyncFrame::Create(path) => match self.sandbox.create_dir(path) {
                Err(FsError::AlreadyExists(_)) => Ok(()),
                result => result,
            },
            SyncFrame::Enter(name) => {
                // Snapshot streams emit `create` before `enter`, but a
                // frame lost to a resync may not have; create on demand.
                if !self.sandbox.exists(name) {
                    self.sandbox.create_dir(name)?;
                }
                self.sandbox.change_dir(name)
            }
            SyncFrame::Exit => self.sandbox.change_dir(".."),
            SyncFrame::Remove(path) => match self.sandbox.remove_dir(path) {
                Err(FsError::NotFound(_)) => Ok(()),
                result => result,
            },
        }
    }

    /// Delete the mirror home (session teardown).
    pub fn teardown(self) -> std::io::Result<PathBuf> {
        let home = self.sandbox.home().to_path_buf();
        if home.exists() {
            remove_tree(&home)?;
        }
        Ok(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mirror() -> (TempDir, Mirror) {
        let root = TempDir::new().unwrap();
        let mirror = Mirror::create(root.path(), "A").unwrap();
        (root, mirror)
    }

    fn apply_all(mirror: &mut Mirror, frames: &[SyncFrame]) {
        for frame in frames {
            mirror.apply(frame).unwrap();
        }
    }

    #[test]
    fn test_snapshot_stream_builds_tree() {
        let (root, mut mirror) = mirror();
        apply_all(
            &mut mirror,
            &[
                SyncFrame::Create("docs".into()),
                SyncFrame::Enter("docs".into()),
                SyncFrame::Create("a.txt".into()),
                SyncFrame::Create("inner".into()),
                SyncFrame::Enter("inner".into()),
                SyncFrame::Exit,
                SyncFrame::Exit,
            ],
        );
        assert!(root.path().join("A/docs/inner").is_dir());
        // File entries mirror as directory placeholders; only structure
        // is synchronized.
        assert!(root.path().join("A/docs/a.txt").is_dir());
    }

    #[test]
    fn test_live_event_frames_use_home_relative_paths() {
        let (root, mut mirror) = mirror();
        apply_all(
            &mut mirror,
            &[
                SyncFrame::Create("docs".into()),
                SyncFrame::Enter("docs".into()),
                SyncFrame::Exit,
                SyncFrame::Create("docs/fresh".into()),
            ],
        );
        assert!(root.path().join("A/docs/fresh").is_dir());
        mirror.apply(&SyncFrame::Remove("docs/fresh".into())).unwrap();
        assert!(!root.path().join("A/docs/fresh").exists());
    }

    #[test]
    fn test_application_is_idempotent() {
        let (root, mut mirror) = mirror();
        mirror.apply(&SyncFrame::Create("docs".into())).unwrap();
        mirror.apply(&SyncFrame::Create("docs".into())).unwrap();
        mirror.apply(&SyncFrame::Remove("docs".into())).unwrap();
        mirror.apply(&SyncFrame::Remove("docs".into())).unwrap();
        assert!(!root.path().join("A/docs").exists());
    }

    #[test]
    fn test_resync_replaces_subtree() {
        let (root, mut mirror) = mirror();
        apply_all(
            &mut mirror,
            &[
                SyncFrame::Create("docs".into()),
                SyncFrame::Enter("docs".into()),
                SyncFrame::Create("old".into()),
                SyncFrame::Exit,
                // Conservative resync: drop and re-push.
                SyncFrame::Remove("docs".into()),
                SyncFrame::Create("docs".into()),
                SyncFrame::Enter("docs".into()),
                SyncFrame::Create("new".into()),
                SyncFrame::Exit,
            ],
        );
        assert!(!root.path().join("A/docs/old").exists());
        assert!(root.path().join("A/docs/new").is_dir());
    }

    #[test]
    fn test_teardown_removes_home() {
        let (root, mut mirror) = mirror();
        mirror.apply(&SyncFrame::Create("docs".into())).unwrap();
        mirror.teardown().unwrap();
        assert!(!root.path().join("A").exists());
    }
}
