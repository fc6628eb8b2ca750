//! Property-based tests for view lookup
//!
//! **Property: first existing (path, extension) pair wins, deterministically**

use std::fs;
use std::path::Path;
use std::rc::Rc;

use bladebridge_view::{FileViewFinder, LocalFilesystem, ViewError};
use proptest::prelude::*;
use tempfile::TempDir;

const EXTENSIONS: [&str; 4] = ["blade.php", "php", "css", "html"];

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
}

/// Which (directory, extension) pairs hold a copy of the view
fn layout_strategy() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::btree_set((0usize..3, 0usize..EXTENSIONS.len()), 0..6)
        .prop_map(|set| set.into_iter().collect())
}

/// Extension strings, with and without a leading dot
fn extension_strategy() -> impl Strategy<Value = String> {
    ("[.]?", "[a-z]{1,4}").prop_map(|(dot, ext)| format!("{}{}", dot, ext))
}

proptest! {
    /// For any layout, `find` returns the first existing candidate in directory-major order
    #[test]
    fn prop_find_follows_trial_order(layout in layout_strategy()) {
        let dirs: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
        for (dir, ext) in &layout {
            touch(&dirs[*dir].path().join(format!("page.{}", EXTENSIONS[*ext])));
        }

        let finder = FileViewFinder::new(
            Rc::new(LocalFilesystem::new()),
            dirs.iter().map(|d| d.path().to_path_buf()).collect(),
        );

        let expected = layout
            .iter()
            .min()
            .map(|(dir, ext)| dirs[*dir].path().join(format!("page.{}", EXTENSIONS[*ext])));

        match (finder.find("page"), expected) {
            (Ok(found), Some(expected)) => {
                prop_assert_eq!(&found, &expected);
                finder.flush();
                prop_assert_eq!(finder.find("page").unwrap(), found);
            }
            (Err(ViewError::NotFound { searched, .. }), None) => {
                prop_assert_eq!(searched.len(), dirs.len() * EXTENSIONS.len());
            }
            (result, expected) => {
                prop_assert!(false, "unexpected {:?} for {:?}", result, expected);
            }
        }
    }

    /// For any sequence of registrations, each extension appears once and the last one is first
    #[test]
    fn prop_extension_registry_stays_unique(
        registrations in prop::collection::vec((extension_strategy(), "[a-z]{1,6}"), 1..12)
    ) {
        let mut finder = FileViewFinder::new(Rc::new(LocalFilesystem::new()), Vec::new());
        for (ext, engine) in &registrations {
            finder.add_extension(ext, engine.clone());
        }

        let extensions: Vec<&str> = finder.extensions().iter().map(|(e, _)| e.as_str()).collect();
        let mut unique = extensions.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), extensions.len());

        let (last_ext, last_engine) = registrations.last().unwrap();
        prop_assert_eq!(
            &finder.extensions()[0],
            &(last_ext.trim_start_matches('.').to_string(), last_engine.clone())
        );
    }
}
