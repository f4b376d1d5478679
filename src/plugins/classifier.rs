//! Executable detection.
//!
//! Whether a plugin file can be run depends on the platform: on Unix it is
//! the permission bits relevant to the current user, on Windows it is the
//! file extension alone. Both live behind [`FileClassifier`] so the catalog
//! and the verifier can be tested with either model on any host.

use std::fs;
use std::path::Path;

/// Extensions that make a file executable on systems without permission bits.
pub const EXECUTABLE_EXTENSIONS: &[&str] = &[".bat", ".cmd", ".com", ".exe", ".ps1"];

/// Verdict for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executability {
    Executable,
    /// Not executable, with the reason shown to the user.
    NotExecutable(String),
}

impl Executability {
    pub fn is_executable(&self) -> bool {
        matches!(self, Executability::Executable)
    }
}

/// Decides whether plugin files are executable.
pub trait FileClassifier: Send + Sync {
    fn classify(&self, path: &Path) -> Executability;

    /// Whether plugin names carry an executable extension that must be
    /// stripped before deriving command parts.
    fn uses_extensions(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Permission bits
// ---------------------------------------------------------------------------

/// The user the permission check is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub uid: u32,
    pub gids: Vec<u32>,
}

impl UserIdentity {
    /// Effective uid, effective gid and supplementary groups of this process.
    #[cfg(unix)]
    pub fn current() -> Self {
        // SAFETY: these calls only read process credentials.
        let uid = unsafe { libc::geteuid() };
        let egid = unsafe { libc::getegid() };

        let mut gids = vec![egid as u32];
        let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
        if count > 0 {
            let mut groups = vec![0 as libc::gid_t; count as usize];
            let written = unsafe { libc::getgroups(count, groups.as_mut_ptr()) };
            if written > 0 {
                groups.truncate(written as usize);
                gids.extend(groups.into_iter().map(|g| g as u32));
            }
        }
        gids.sort_unstable();
        gids.dedup();

        Self {
            uid: uid as u32,
            gids,
        }
    }

    pub fn is_root(&self) -> bool {
        self.uid == 0
    }
}

/// Whether `mode` lets `user` execute a file owned by `owner:group`.
///
/// The owner bit applies if the user owns the file, else the group bit if the
/// user is in the file's group, else the other bit. Root may execute anything.
pub fn mode_allows_exec(mode: u32, owner: u32, group: u32, user: &UserIdentity) -> bool {
    if user.is_root() {
        return true;
    }
    if owner == user.uid {
        mode & 0o100 != 0
    } else if user.gids.contains(&group) {
        mode & 0o010 != 0
    } else {
        mode & 0o001 != 0
    }
}

/// Classifies by Unix permission bits for a given user.
#[derive(Debug, Clone)]
pub struct PermissionClassifier {
    identity: UserIdentity,
}

impl PermissionClassifier {
    pub fn new(identity: UserIdentity) -> Self {
        Self { identity }
    }

    /// Classifier for the user running this process.
    #[cfg(unix)]
    pub fn for_current_user() -> Self {
        Self::new(UserIdentity::current())
    }
}

#[cfg(unix)]
impl FileClassifier for PermissionClassifier {
    fn classify(&self, path: &Path) -> Executability {
        use std::os::unix::fs::MetadataExt;

        // fs::metadata follows symlinks, so a link to an executable counts
        let meta = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => return Executability::NotExecutable(format!("cannot stat: {}", e)),
        };
        if !meta.is_file() {
            return Executability::NotExecutable("not a regular file".to_string());
        }
        if mode_allows_exec(meta.mode(), meta.uid(), meta.gid(), &self.identity) {
            Executability::Executable
        } else {
            Executability::NotExecutable("not executable by current user".to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Extensions
// ---------------------------------------------------------------------------

/// Classifies by file extension.
#[derive(Debug, Clone)]
pub struct ExtensionClassifier {
    extensions: Vec<String>,
}

impl ExtensionClassifier {
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    fn has_executable_extension(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.extensions.iter().any(|e| name.ends_with(e.as_str()))
    }
}

impl Default for ExtensionClassifier {
    fn default() -> Self {
        Self::new(EXECUTABLE_EXTENSIONS)
    }
}

impl FileClassifier for ExtensionClassifier {
    fn classify(&self, path: &Path) -> Executability {
        if self.has_executable_extension(path) {
            Executability::Executable
        } else {
            Executability::NotExecutable(format!(
                "missing executable extension ({})",
                self.extensions.join(", ")
            ))
        }
    }

    fn uses_extensions(&self) -> bool {
        true
    }
}

/// Strip a known executable extension from a file name (case-insensitive).
pub fn strip_executable_extension(name: &str) -> &str {
    let lower = name.to_lowercase();
    for ext in EXECUTABLE_EXTENSIONS {
        if lower.ends_with(ext) && name.len() > ext.len() {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}

/// The classifier matching the host platform.
pub fn platform_classifier() -> Box<dyn FileClassifier> {
    #[cfg(unix)]
    {
        Box::new(PermissionClassifier::for_current_user())
    }
    #[cfg(not(unix))]
    {
        Box::new(ExtensionClassifier::default())
    }
}
