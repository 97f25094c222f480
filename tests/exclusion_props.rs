use std::collections::HashSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;
use relive::fs::mock::MockFileSystem;
use relive::watch::{filter, unique, ExcludeSet};

const ROOT: &str = "/proj";

// Small alphabet so collisions with the excluded name actually happen.
fn component() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["src", "lib", "vendor", "build", "a.go", "b.rs", "vendored"])
        .prop_map(str::to_string)
}

fn relative_path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(component(), 1..5)
}

proptest! {
    #[test]
    fn unique_is_idempotent_and_keeps_first_occurrences(list in prop::collection::vec(0u8..10, 0..40)) {
        let once = unique(&list);
        prop_assert_eq!(unique(&once), once.clone());

        let distinct: HashSet<u8> = list.iter().copied().collect();
        prop_assert_eq!(once.len(), distinct.len());

        // Each element appears in the order of its first occurrence.
        let mut expected = Vec::new();
        for item in &list {
            if !expected.contains(item) {
                expected.push(*item);
            }
        }
        prop_assert_eq!(once, expected);
    }

    #[test]
    fn bare_name_excludes_exactly_paths_containing_that_component(
        paths in prop::collection::vec(relative_path(), 0..20)
    ) {
        let fs = MockFileSystem::new();
        let exclude = ExcludeSet::build(&fs, Path::new(ROOT), &["vendor".to_string()], false).unwrap();

        let list: Vec<PathBuf> = paths
            .iter()
            .map(|parts| parts.iter().fold(PathBuf::from(ROOT), |acc, p| acc.join(p)))
            .collect();
        let kept = filter(&list, &exclude);

        for (parts, path) in paths.iter().zip(&list) {
            let has_vendor = parts.iter().any(|p| p == "vendor");
            prop_assert_eq!(kept.contains(path), !has_vendor, "path {:?}", path);
        }
        // Filtering never reorders or invents entries.
        let mut expected = list.clone();
        expected.retain(|p| kept.contains(p));
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn filter_is_idempotent(paths in prop::collection::vec(relative_path(), 0..20)) {
        let fs = MockFileSystem::new();
        let user = vec!["build".to_string(), "lib/a.go".to_string()];
        let exclude = ExcludeSet::build(&fs, Path::new(ROOT), &user, true).unwrap();

        let list: Vec<PathBuf> = paths
            .iter()
            .map(|parts| parts.iter().fold(PathBuf::from(ROOT), |acc, p| acc.join(p)))
            .collect();
        let once = filter(&list, &exclude);
        prop_assert_eq!(filter(&once, &exclude), once);
    }
}
