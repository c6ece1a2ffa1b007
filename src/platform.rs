//! Platform collaborators: path helpers and the dynamic library loader.

use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use crate::api::PfnVoidFunction;
use crate::error::{ErrorCode, SkResult};

/// Returns true if `path` is absolute on this platform.
pub fn is_absolute_path(path: &Path) -> bool {
    path.is_absolute()
}

/// Join `relative` onto `base`.
pub fn combine_paths(base: &Path, relative: &Path) -> PathBuf {
    base.join(relative)
}

/// Returns true if `path` names an existing regular file.
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Strip the trailing file name, leaving the containing directory.
///
/// Returns `None` for a bare file name.
pub fn remove_path_stem(path: &Path) -> Option<PathBuf> {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// A loaded shared library.
pub trait LoadedLibrary {
    /// Look up an exported function by name.
    fn symbol(&self, name: &str) -> Option<PfnVoidFunction>;

    /// Path the library was loaded from.
    fn path(&self) -> &Path;
}

/// Opens shared libraries.
pub trait LibraryLoader {
    /// Load the library at `path`.
    fn load(&self, path: &Path) -> SkResult<Box<dyn LoadedLibrary>>;

    /// Returns true if `function` is one of the host's own stand-in entry
    /// points rather than a real implementation.
    fn is_placeholder(&self, _function: PfnVoidFunction) -> bool {
        false
    }
}

/// Loader backed by the operating system's dynamic linker.
#[derive(Debug, Default, Clone)]
pub struct DynamicLoader {
    placeholders: Vec<usize>,
}

impl DynamicLoader {
    /// Create a loader with no known placeholders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `function` as a placeholder when a symbol resolves to it.
    pub fn with_placeholder(mut self, function: PfnVoidFunction) -> Self {
        self.placeholders.push(function as usize);
        self
    }
}

impl LibraryLoader for DynamicLoader {
    fn load(&self, path: &Path) -> SkResult<Box<dyn LoadedLibrary>> {
        // SAFETY: loading a library runs its initializers; manifests only name
        // libraries installed as drivers or layers.
        let library = unsafe { Library::new(path) }.map_err(|e| ErrorCode::LibraryLoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(target: "opensk::bind", path = %path.display(), "loaded library");
        Ok(Box::new(DynamicLibrary {
            library,
            path: path.to_path_buf(),
        }))
    }

    fn is_placeholder(&self, function: PfnVoidFunction) -> bool {
        self.placeholders.contains(&(function as usize))
    }
}

struct DynamicLibrary {
    library: Library,
    path: PathBuf,
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .finish()
    }
}

impl LoadedLibrary for DynamicLibrary {
    fn symbol(&self, name: &str) -> Option<PfnVoidFunction> {
        // SAFETY: the symbol is only ever called through the entry-point
        // signature its exported name promises.
        unsafe { self.library.get::<PfnVoidFunction>(name.as_bytes()) }
            .ok()
            .map(|symbol| *symbol)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_path_stem() {
        assert_eq!(
            remove_path_stem(Path::new("/etc/opensk/drivers.json")),
            Some(PathBuf::from("/etc/opensk"))
        );
        assert_eq!(
            remove_path_stem(Path::new("conf/drivers.json")),
            Some(PathBuf::from("conf"))
        );
        assert_eq!(remove_path_stem(Path::new("drivers.json")), None);
    }

    #[test]
    fn test_combine_paths() {
        let joined = combine_paths(Path::new("/opt/sk"), Path::new("libfoo.so"));
        assert_eq!(joined, PathBuf::from("/opt/sk/libfoo.so"));
        assert!(is_absolute_path(&joined));
        assert!(!is_absolute_path(Path::new("./libfoo.so")));
    }

    #[test]
    fn test_file_exists() {
        let dir = std::env::temp_dir();
        assert!(!file_exists(&dir));
        assert!(!file_exists(&dir.join("opensk-no-such-file.so")));
    }

    #[test]
    fn test_load_missing_library() {
        let result = DynamicLoader::new().load(Path::new("/nonexistent/libnothing.so"));
        assert!(matches!(result, Err(ErrorCode::LibraryLoadFailed { .. })));
    }

    #[test]
    fn test_placeholders() {
        unsafe extern "C" fn stub() {}
        unsafe extern "C" fn other() {
            std::hint::black_box(1u8);
        }
        let loader = DynamicLoader::new().with_placeholder(stub);
        assert!(loader.is_placeholder(stub));
        assert!(!loader.is_placeholder(other));
    }
}
