//! Hard filter: include/exclude masks over root-relative paths.

pub mod mask;
pub mod name_filter;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use mask::{MaskMatcher, matches_mask, matches_mask_begin};
pub use name_filter::{NameFilter, normalize_filter_phrase, normalize_for_filter};

/// Outcome of checking a folder against a filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirFilterResult {
    /// The folder itself passes.
    pub pass: bool,
    /// Some item below the folder could still pass. False means the whole subtree is pruned.
    pub child_item_might_match: bool,
}

impl DirFilterResult {
    pub const PASS: Self = Self {
        pass: true,
        child_item_might_match: true,
    };
    pub const PRUNE: Self = Self {
        pass: false,
        child_item_might_match: false,
    };
}

/// Predicate over root-relative paths.
///
/// Ordering exists only so filters can be part of map keys: variant first, then the
/// normalized mask sets.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathFilter {
    /// Everything passes.
    Null,
    Name(NameFilter),
    /// Both filters must pass.
    Combined { first: NameFilter, second: NameFilter },
}

/// Filters are shared read-only between the traversal keys and worker threads.
pub type FilterRef = Arc<PathFilter>;

impl PathFilter {
    pub fn pass_file_filter(&self, rel_file_path: &str) -> bool {
        match self {
            PathFilter::Null => true,
            PathFilter::Name(f) => f.pass_file_filter(rel_file_path),
            PathFilter::Combined { first, second } => {
                first.pass_file_filter(rel_file_path) && second.pass_file_filter(rel_file_path)
            }
        }
    }

    pub fn pass_dir_filter(&self, rel_dir_path: &str) -> DirFilterResult {
        match self {
            PathFilter::Null => DirFilterResult::PASS,
            PathFilter::Name(f) => f.pass_dir_filter(rel_dir_path),
            PathFilter::Combined { first, second } => {
                let first_res = first.pass_dir_filter(rel_dir_path);
                if first_res.pass {
                    return second.pass_dir_filter(rel_dir_path);
                }
                if first_res.child_item_might_match {
                    // only the might-match half of the second result is used here
                    let second_res = second.pass_dir_filter(rel_dir_path);
                    return DirFilterResult {
                        pass: false,
                        child_item_might_match: second_res.child_item_might_match,
                    };
                }
                first_res
            }
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            PathFilter::Null => true,
            PathFilter::Name(f) => f.is_null(),
            PathFilter::Combined { first, second } => first.is_null() && second.is_null(),
        }
    }

    /// Copy of this filter that additionally excludes `exclude_phrase`.
    pub fn copy_filter_adding_exclusion(&self, exclude_phrase: &str) -> PathFilter {
        match self {
            PathFilter::Null => PathFilter::Name(NameFilter::new("*", exclude_phrase)),
            PathFilter::Name(f) => {
                let mut f = f.clone();
                f.add_exclusion(exclude_phrase);
                PathFilter::Name(f)
            }
            PathFilter::Combined { first, second } => {
                let mut second = second.clone();
                second.add_exclusion(exclude_phrase);
                PathFilter::Combined {
                    first: first.clone(),
                    second,
                }
            }
        }
    }

    /// Copy of this filter that additionally excludes the folder at `rel_dir_path`,
    /// matched as a literal path.
    pub fn copy_filter_excluding_path(&self, rel_dir_path: &str) -> PathFilter {
        match self {
            PathFilter::Null => {
                let mut f = NameFilter::new("*", "");
                f.add_exclusion_path(rel_dir_path);
                PathFilter::Name(f)
            }
            PathFilter::Name(f) => {
                let mut f = f.clone();
                f.add_exclusion_path(rel_dir_path);
                PathFilter::Name(f)
            }
            PathFilter::Combined { first, second } => {
                let mut second = second.clone();
                second.add_exclusion_path(rel_dir_path);
                PathFilter::Combined {
                    first: first.clone(),
                    second,
                }
            }
        }
    }
}

/// Include/exclude phrases as entered by the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include: String,
    pub exclude: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include: "*".to_string(),
            exclude: String::new(),
        }
    }
}

impl FilterConfig {
    pub fn new(include: impl Into<String>, exclude: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            exclude: exclude.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        NameFilter::is_null_phrase(&self.include, &self.exclude)
    }
}

/// Build the filter for one folder pair from the global and the pair-local phrases.
pub fn construct_filter(global: &FilterConfig, local: &FilterConfig) -> FilterRef {
    let filter = match (global.is_null(), local.is_null()) {
        (true, true) => PathFilter::Null,
        (false, true) => PathFilter::Name(NameFilter::new(&global.include, &global.exclude)),
        (true, false) => PathFilter::Name(NameFilter::new(&local.include, &local.exclude)),
        (false, false) => PathFilter::Combined {
            first: NameFilter::new(&global.include, &global.exclude),
            second: NameFilter::new(&local.include, &local.exclude),
        },
    };
    Arc::new(filter)
}
