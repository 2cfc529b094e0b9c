//! Include/exclude name filter built from user phrases.

use unicode_normalization::UnicodeNormalization;

use super::mask::{MaskMatcher, SEP};
use super::DirFilterResult;

/// Delimiters between entries of a filter phrase.
const PHRASE_DELIMITERS: [char; 3] = ['\n', '|', ','];

/// Case-fold, Unicode-normalize and separator-normalize a path or mask.
pub fn normalize_for_filter(s: &str) -> String {
    s.replace('\\', "/").to_uppercase().nfc().collect()
}

/// Split a phrase into its trimmed, non-empty entries (not yet normalized).
pub fn split_by_delimiter(phrase: &str) -> Vec<&str> {
    phrase
        .split(PHRASE_DELIMITERS)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Normalized entries of `phrase`. Idempotent: normalizing the joined output again
/// yields the same entries.
pub fn normalize_filter_phrase(phrase: &str) -> Vec<String> {
    split_by_delimiter(phrase)
        .into_iter()
        .map(normalize_for_filter)
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
struct FilterMasks {
    /// Masks checked against files (file-only and file-or-folder entries).
    file_masks: MaskMatcher,
    /// Masks checked against folders (folder-only and file-or-folder entries).
    folder_masks: MaskMatcher,
}

impl FilterMasks {
    fn from_phrase(phrase: &str) -> Self {
        let mut masks = Self::default();
        masks.add_phrase(phrase);
        masks
    }

    fn add_phrase(&mut self, phrase: &str) {
        for entry in normalize_filter_phrase(phrase) {
            self.add_entry(&entry);
        }
    }

    fn add_entry(&mut self, entry: &str) {
        if let Some(rest) = entry.strip_prefix(SEP) {
            // "/blah" behaves like "blah"
            self.add_entry(rest);
            return;
        }
        self.add_tail(entry);
        if let Some(rest) = entry.strip_prefix("*/") {
            // "*/blah" matches at any depth, including the top level
            self.add_tail(rest);
        }
    }

    fn add_tail(&mut self, phrase: &str) {
        if let Some(file_phrase) = phrase.strip_suffix(':') {
            let file_phrase = file_phrase.trim_end_matches(SEP);
            if !file_phrase.is_empty() {
                self.file_masks.insert(file_phrase);
            }
        } else if let Some(dir_phrase) = phrase
            .strip_suffix("/*")
            .or_else(|| phrase.strip_suffix(SEP))
        {
            if !dir_phrase.is_empty() {
                self.folder_masks.insert(dir_phrase);
            }
        } else if !phrase.is_empty() {
            self.file_masks.insert(phrase);
            self.folder_masks.insert(phrase);
        }
    }
}

/// Filter over relative paths driven by include and exclude phrases.
///
/// Immutable once built except for the `add_exclusion*` methods. Two
/// filters are equal iff their normalized mask sets are identical.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct NameFilter {
    include_masks: FilterMasks,
    exclude_masks: FilterMasks,
}

impl NameFilter {
    pub fn new(include_phrase: &str, exclude_phrase: &str) -> Self {
        Self {
            include_masks: FilterMasks::from_phrase(include_phrase),
            exclude_masks: FilterMasks::from_phrase(exclude_phrase),
        }
    }

    /// Cheap check whether these phrases would build a filter that lets everything pass.
    pub fn is_null_phrase(include_phrase: &str, exclude_phrase: &str) -> bool {
        include_phrase.trim() == "*" && exclude_phrase.trim().is_empty()
    }

    pub fn is_null(&self) -> bool {
        *self == NameFilter::new("*", "")
    }

    /// Append `exclude_phrase` to the exclude masks.
    pub fn add_exclusion(&mut self, exclude_phrase: &str) {
        self.exclude_masks.add_phrase(exclude_phrase);
    }

    /// Exclude the folder at `rel_dir_path` and everything below it. The path is taken
    /// literally: no delimiter splitting, no wildcards, no `:` or `/` suffix rules.
    pub fn add_exclusion_path(&mut self, rel_dir_path: &str) {
        let path_fmt = normalize_for_filter(rel_dir_path);
        let path_fmt = path_fmt.trim_matches(SEP);
        if !path_fmt.is_empty() {
            self.exclude_masks.folder_masks.insert_literal(path_fmt);
        }
    }

    pub fn pass_file_filter(&self, rel_file_path: &str) -> bool {
        let path_fmt = normalize_for_filter(rel_file_path);

        if self.exclude_masks.file_masks.matches(&path_fmt)
            || self.exclude_masks.folder_masks.matches_parent(&path_fmt)
        {
            return false;
        }
        self.include_masks.file_masks.matches(&path_fmt)
            || self.include_masks.folder_masks.matches_parent(&path_fmt)
    }

    /// A folder excluded here is a hard prune: every item below it fails too, whether
    /// or not the caller honors `child_item_might_match`.
    pub fn pass_dir_filter(&self, rel_dir_path: &str) -> DirFilterResult {
        let path_fmt = normalize_for_filter(rel_dir_path);

        if self.exclude_masks.folder_masks.matches(&path_fmt) {
            return DirFilterResult::PRUNE;
        }
        if !self.include_masks.folder_masks.matches(&path_fmt) {
            let file_masks = &self.include_masks.file_masks;
            // a file mask matching the folder itself also matches every file below it
            return DirFilterResult {
                pass: false,
                child_item_might_match: file_masks.matches(&path_fmt)
                    || file_masks.matches_begin(&path_fmt)
                    || self.include_masks.folder_masks.matches_begin(&path_fmt),
            };
        }
        DirFilterResult::PASS
    }
}
