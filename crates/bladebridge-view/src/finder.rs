//! View finder
//!
//! Maps view names such as `admin.users.index` or `mail::welcome` to source files by trying
//! every view path against every registered extension, in order. Results are memoized until the
//! search space changes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::{
    engines::{BLADE_ENGINE, FILE_ENGINE, PHP_ENGINE},
    error::{Result, ViewError},
    filesystem::Filesystem,
};

/// Separator between a namespace and a view name
pub const HINT_PATH_DELIMITER: &str = "::";

/// Extensions registered by default, highest priority first
pub const DEFAULT_EXTENSIONS: [(&str, &str); 4] = [
    ("blade.php", BLADE_ENGINE),
    ("php", PHP_ENGINE),
    ("css", FILE_ENGINE),
    ("html", FILE_ENGINE),
];

/// Finds view sources on a filesystem
pub struct FileViewFinder {
    files: Rc<dyn Filesystem>,
    paths: Vec<PathBuf>,
    extensions: Vec<(String, String)>,
    hints: HashMap<String, Vec<PathBuf>>,
    views: RefCell<HashMap<String, PathBuf>>,
}

impl FileViewFinder {
    /// Create a finder over `paths` with the default extensions
    pub fn new(files: Rc<dyn Filesystem>, paths: Vec<PathBuf>) -> Self {
        Self {
            files,
            paths,
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|(ext, engine)| (ext.to_string(), engine.to_string()))
                .collect(),
            hints: HashMap::new(),
            views: RefCell::new(HashMap::new()),
        }
    }

    /// Absolute path of the source for `name`
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        if let Some(path) = self.views.borrow().get(name) {
            debug!(view = %name, path = %path.display(), "View cache hit");
            return Ok(path.clone());
        }

        let path = if self.is_existing_path(name) {
            PathBuf::from(name)
        } else if name.contains(HINT_PATH_DELIMITER) {
            self.find_namespaced(name)?
        } else {
            self.find_in_paths(name, &self.paths)?
        };

        debug!(view = %name, path = %path.display(), "Resolved view");
        self.views
            .borrow_mut()
            .insert(name.to_string(), path.clone());
        Ok(path)
    }

    /// Append a view path
    pub fn add_location(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
        self.flush();
    }

    /// Insert a view path ahead of all others
    pub fn prepend_location(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(0, path.into());
        self.flush();
    }

    /// Register `extension` for `engine` at the front of the trial order
    ///
    /// Registering an extension again moves it to the front with the new engine.
    pub fn add_extension(&mut self, extension: &str, engine: impl Into<String>) {
        let extension = normalize_extension(extension);
        self.extensions.retain(|(ext, _)| *ext != extension);
        self.extensions.insert(0, (extension, engine.into()));
        self.flush();
    }

    /// Append hint paths to a namespace
    pub fn add_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.hints
            .entry(namespace.to_string())
            .or_default()
            .extend(hints.into_iter().map(Into::into));
        self.flush();
    }

    /// Insert hint paths ahead of a namespace's existing ones
    pub fn prepend_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let entry = self.hints.entry(namespace.to_string()).or_default();
        let mut merged: Vec<PathBuf> = hints.into_iter().map(Into::into).collect();
        merged.append(entry);
        *entry = merged;
        self.flush();
    }

    /// Replace a namespace's hint paths
    pub fn replace_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.hints.insert(
            namespace.to_string(),
            hints.into_iter().map(Into::into).collect(),
        );
        self.flush();
    }

    /// Forget every resolved view
    pub fn flush(&self) {
        self.views.borrow_mut().clear();
    }

    /// Engine key for `path`, by the longest registered extension it ends with
    pub fn engine_for(&self, path: &Path) -> Option<&str> {
        let file_name = path.file_name()?.to_string_lossy();
        self.extensions
            .iter()
            .filter(|(ext, _)| {
                file_name
                    .strip_suffix(ext.as_str())
                    .is_some_and(|stem| stem.ends_with('.'))
            })
            .max_by_key(|(ext, _)| ext.len())
            .map(|(_, engine)| engine.as_str())
    }

    /// View paths, in search order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Registered `(extension, engine)` pairs, highest priority first
    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    /// Namespace hint paths
    pub fn hints(&self) -> &HashMap<String, Vec<PathBuf>> {
        &self.hints
    }

    fn is_existing_path(&self, name: &str) -> bool {
        let path = Path::new(name);
        path.is_absolute() && self.files.exists(path)
    }

    fn find_namespaced(&self, name: &str) -> Result<PathBuf> {
        let (namespace, view) = parse_namespace_segments(name)?;
        let hints = self
            .hints
            .get(namespace)
            .ok_or_else(|| ViewError::UnknownNamespace(namespace.to_string()))?;

        self.find_in_paths(view, hints).map_err(|e| match e {
            ViewError::NotFound { searched, .. } => ViewError::NotFound {
                name: name.to_string(),
                searched,
            },
            other => other,
        })
    }

    fn find_in_paths(&self, name: &str, paths: &[PathBuf]) -> Result<PathBuf> {
        let relative = relative_view_path(name)?;
        let mut searched = Vec::with_capacity(paths.len() * self.extensions.len());

        for dir in paths {
            for (extension, _) in &self.extensions {
                let candidate = dir.join(format!("{}.{}", relative, extension));
                if self.files.exists(&candidate) {
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(ViewError::NotFound {
            name: name.to_string(),
            searched,
        })
    }
}

impl std::fmt::Debug for FileViewFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileViewFinder")
            .field("paths", &self.paths)
            .field("extensions", &self.extensions)
            .field("hints", &self.hints)
            .finish()
    }
}

/// Split `namespace::view`, rejecting anything else
fn parse_namespace_segments(name: &str) -> Result<(&str, &str)> {
    let segments: Vec<&str> = name.split(HINT_PATH_DELIMITER).collect();
    match segments.as_slice() {
        [namespace, view] if !namespace.is_empty() && !view.is_empty() => Ok((namespace, view)),
        _ => Err(ViewError::InvalidName(name.to_string())),
    }
}

/// `admin.users.index` as `admin/users/index`, refusing anything that could leave a view root
fn relative_view_path(name: &str) -> Result<String> {
    let segments: Vec<&str> = name.split(|c: char| c == '.' || c == '/').collect();
    if segments
        .iter()
        .any(|segment| segment.is_empty() || segment.contains('\\') || segment.contains(':'))
    {
        return Err(ViewError::InvalidName(name.to_string()));
    }
    Ok(segments.join("/"))
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::LocalFilesystem;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn finder(paths: Vec<PathBuf>) -> FileViewFinder {
        FileViewFinder::new(Rc::new(LocalFilesystem::new()), paths)
    }

    #[test]
    fn test_default_extensions() {
        let finder = finder(Vec::new());
        let extensions: Vec<&str> = finder.extensions().iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(extensions, vec!["blade.php", "php", "css", "html"]);
    }

    #[test]
    fn test_dots_become_directories() {
        let dir = TempDir::new().unwrap();
        let view = dir.path().join("admin/users/index.blade.php");
        touch(&view);

        let finder = finder(vec![dir.path().to_path_buf()]);
        assert_eq!(finder.find("admin.users.index").unwrap(), view);
    }

    #[test]
    fn test_extension_priority_within_a_directory() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("page.php"));
        touch(&dir.path().join("page.blade.php"));

        let finder = finder(vec![dir.path().to_path_buf()]);
        assert_eq!(finder.find("page").unwrap(), dir.path().join("page.blade.php"));
    }

    #[test]
    fn test_earlier_directory_wins_over_better_extension() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(&first.path().join("page.html"));
        touch(&second.path().join("page.blade.php"));

        let finder = finder(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(finder.find("page").unwrap(), first.path().join("page.html"));
    }

    #[test]
    fn test_not_found_lists_searched_paths() {
        let dir = TempDir::new().unwrap();
        let finder = finder(vec![dir.path().to_path_buf()]);

        match finder.find("missing").unwrap_err() {
            ViewError::NotFound { name, searched } => {
                assert_eq!(name, "missing");
                assert_eq!(
                    searched,
                    vec![
                        dir.path().join("missing.blade.php"),
                        dir.path().join("missing.php"),
                        dir.path().join("missing.css"),
                        dir.path().join("missing.html"),
                    ]
                );
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_absolute_path_is_returned_directly() {
        let dir = TempDir::new().unwrap();
        let view = dir.path().join("direct.txt");
        touch(&view);

        let finder = finder(Vec::new());
        let name = view.to_string_lossy().to_string();
        assert_eq!(finder.find(&name).unwrap(), view);
    }

    #[test]
    fn test_memo_survives_until_flush() {
        let dir = TempDir::new().unwrap();
        let view = dir.path().join("cached.php");
        touch(&view);

        let finder = finder(vec![dir.path().to_path_buf()]);
        assert_eq!(finder.find("cached").unwrap(), view);

        fs::remove_file(&view).unwrap();
        assert_eq!(finder.find("cached").unwrap(), view);

        finder.flush();
        assert!(finder.find("cached").is_err());
    }

    #[test]
    fn test_locations_invalidate_memo() {
        let late = TempDir::new().unwrap();
        let early = TempDir::new().unwrap();
        touch(&late.path().join("home.php"));
        touch(&early.path().join("home.php"));

        let mut finder = finder(vec![late.path().to_path_buf()]);
        assert_eq!(finder.find("home").unwrap(), late.path().join("home.php"));

        finder.prepend_location(early.path());
        assert_eq!(finder.find("home").unwrap(), early.path().join("home.php"));
        assert_eq!(finder.paths()[0], early.path());

        let extra = TempDir::new().unwrap();
        finder.add_location(extra.path());
        assert_eq!(finder.paths().len(), 3);
    }

    #[test]
    fn test_add_extension_moves_to_front() {
        let mut finder = finder(Vec::new());
        finder.add_extension(".txt", "file");
        finder.add_extension("txt", "blade");

        let txt: Vec<_> = finder
            .extensions()
            .iter()
            .filter(|(ext, _)| ext == "txt")
            .collect();
        assert_eq!(txt.len(), 1);
        assert_eq!(finder.extensions()[0], ("txt".to_string(), "blade".to_string()));
    }

    #[test]
    fn test_multi_part_extension_and_engine_lookup() {
        let dir = TempDir::new().unwrap();
        let view = dir.path().join("hello.tmpl.txt");
        touch(&view);

        let mut finder = finder(vec![dir.path().to_path_buf()]);
        finder.add_extension(".txt", "raw");
        finder.add_extension(".tmpl.txt", "compiled");

        let found = finder.find("hello").unwrap();
        assert_eq!(found, view);
        assert_eq!(finder.engine_for(&found), Some("compiled"));
        assert_eq!(finder.engine_for(Path::new("/x/notes.txt")), Some("raw"));
        assert_eq!(finder.engine_for(Path::new("/x/page.blade.php")), Some("blade"));
        assert_eq!(finder.engine_for(Path::new("/x/page.php")), Some("php"));
        assert_eq!(finder.engine_for(Path::new("/x/image.png")), None);
        assert_eq!(finder.engine_for(Path::new("/x/php")), None);
    }

    #[test]
    fn test_namespaces() {
        let hints = TempDir::new().unwrap();
        let extra = TempDir::new().unwrap();
        touch(&hints.path().join("welcome.blade.php"));
        touch(&extra.path().join("welcome.html"));

        let mut finder = finder(Vec::new());
        finder.add_namespace("mail", [hints.path()]);
        assert_eq!(
            finder.find("mail::welcome").unwrap(),
            hints.path().join("welcome.blade.php")
        );

        finder.prepend_namespace("mail", [extra.path()]);
        assert_eq!(finder.find("mail::welcome").unwrap(), extra.path().join("welcome.html"));
        assert_eq!(finder.hints()["mail"].len(), 2);

        finder.replace_namespace("mail", [hints.path()]);
        assert_eq!(finder.hints()["mail"], vec![hints.path().to_path_buf()]);
    }

    #[test]
    fn test_names_stay_inside_view_paths() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("secret.html");
        touch(&secret);

        let finder = finder(vec![root.path().to_path_buf()]);
        let dotted = outside
            .path()
            .join("secret")
            .to_string_lossy()
            .replace('/', ".");

        assert!(dotted.starts_with('.'));
        assert!(matches!(finder.find(&dotted), Err(ViewError::InvalidName(_))));

        for name in [".tmp.x", "a..b", "trailing.", "a/../b", "..", "/nowhere/view"] {
            assert!(
                matches!(finder.find(name), Err(ViewError::InvalidName(_))),
                "{} should be rejected",
                name
            );
        }

        match finder.find("nested/missing").unwrap_err() {
            ViewError::NotFound { searched, .. } => {
                assert!(searched.iter().all(|path| path.starts_with(root.path())));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_namespace_errors() {
        let finder = finder(Vec::new());
        assert!(matches!(
            finder.find("nope::view"),
            Err(ViewError::UnknownNamespace(ref ns)) if ns == "nope"
        ));
        assert!(matches!(finder.find("::view"), Err(ViewError::InvalidName(_))));
        assert!(matches!(finder.find("a::b::c"), Err(ViewError::InvalidName(_))));
    }
}
