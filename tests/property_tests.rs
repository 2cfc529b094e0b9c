use proptest::prelude::*;
use syncscan::filter::{DirFilterResult, NameFilter, PathFilter, normalize_filter_phrase};

/// One filter entry over a tiny alphabet so that masks and paths collide often.
fn mask_entry() -> impl Strategy<Value = String> {
    ("[ab*?]{1,3}(/[ab*?]{1,3})?", prop_oneof![Just(""), Just("/"), Just(":")])
        .prop_map(|(body, suffix)| format!("{body}{suffix}"))
}

fn phrase() -> impl Strategy<Value = String> {
    prop::collection::vec(mask_entry(), 0..4).prop_map(|entries| entries.join("|"))
}

fn rel_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[ab]{1,2}", 1..4).prop_map(|segments| segments.join("/"))
}

proptest! {
    #[test]
    fn test_normalize_phrase_idempotent(s in "[a-zA-Z0-9/\\\\ |,.*?:\n]{0,24}") {
        let once = normalize_filter_phrase(&s);
        let twice = normalize_filter_phrase(&once.join("|"));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_pruned_folder_hides_children(
        include in phrase(),
        exclude in phrase(),
        parent in rel_path(),
        child in "[ab]{1,2}",
    ) {
        let f = NameFilter::new(&include, &exclude);
        let child_path = format!("{parent}/{child}");
        if f.pass_dir_filter(&parent) == DirFilterResult::PRUNE {
            prop_assert!(!f.pass_file_filter(&child_path));
            prop_assert!(!f.pass_dir_filter(&child_path).pass);
        }
    }

    #[test]
    fn test_excluded_folder_excludes_descendants(
        exclude in phrase(),
        parent in rel_path(),
        rest in rel_path(),
    ) {
        let f = NameFilter::new("*", &exclude);
        let below = format!("{parent}/{rest}");
        if f.pass_dir_filter(&parent) == DirFilterResult::PRUNE {
            prop_assert_eq!(f.pass_dir_filter(&below), DirFilterResult::PRUNE);
            prop_assert!(!f.pass_file_filter(&below));
        }
    }

    #[test]
    fn test_null_filters_agree(path in rel_path()) {
        let name = NameFilter::new("*", "");
        prop_assert!(PathFilter::Null.pass_file_filter(&path));
        prop_assert!(name.pass_file_filter(&path));
        prop_assert_eq!(name.pass_dir_filter(&path), DirFilterResult::PASS);
    }

    #[test]
    fn test_combined_with_null_second_matches_first(
        include in phrase(),
        exclude in phrase(),
        path in rel_path(),
    ) {
        let first = NameFilter::new(&include, &exclude);
        let combined = PathFilter::Combined {
            first: first.clone(),
            second: NameFilter::new("*", ""),
        };
        prop_assert_eq!(combined.pass_file_filter(&path), first.pass_file_filter(&path));
        prop_assert_eq!(combined.pass_dir_filter(&path), first.pass_dir_filter(&path));
    }
}
