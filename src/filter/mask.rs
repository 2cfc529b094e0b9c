//! Wildcard mask matching and mask sets.
//!
//! Paths and masks reaching this module are already normalized (see
//! [`normalize_for_filter`](super::name_filter::normalize_for_filter)): upper case,
//! NFC, `/` as the only separator.

use std::collections::BTreeSet;
use std::ops::Bound;

/// Separator of normalized relative paths and masks.
pub const SEP: char = '/';

fn first_char(s: &str) -> Option<char> {
    s.chars().next()
}

/// True if `mask` matches `path` or any of its ancestor prefixes (a prefix ending at a `/`).
///
/// `*` matches any run of characters (separators included), `?` matches exactly one
/// non-separator character.
pub fn matches_mask(path: &str, mask: &str) -> bool {
    let mut path = path;
    for (mi, m) in mask.char_indices() {
        match m {
            '?' => match first_char(path) {
                Some(c) if c != SEP => path = &path[c.len_utf8()..],
                _ => return false,
            },
            '*' => {
                let rest = mask[mi..].trim_start_matches('*');
                if rest.is_empty() {
                    return true;
                }
                let mut p = path;
                loop {
                    if matches_mask(p, rest) {
                        return true;
                    }
                    match first_char(p) {
                        Some(c) => p = &p[c.len_utf8()..],
                        None => return false,
                    }
                }
            }
            _ => match first_char(path) {
                Some(c) if c == m => path = &path[c.len_utf8()..],
                _ => return false,
            },
        }
    }
    path.is_empty() || path.starts_with(SEP)
}

/// True if `mask` matches `path` itself or could still match an item nested below it.
pub fn matches_mask_begin(path: &str, mask: &str) -> bool {
    let mut path = path;
    for m in mask.chars() {
        match m {
            '?' => match first_char(path) {
                // '?' never stands for the separator a child path would need here
                None => return false,
                Some(c) if c == SEP => return false,
                Some(c) => path = &path[c.len_utf8()..],
            },
            '*' => return true,
            _ => match first_char(path) {
                Some(c) if c == m => path = &path[c.len_utf8()..],
                Some(_) => return false,
                None => return m == SEP,
            },
        }
    }
    path.is_empty()
}

fn is_wildcard_mask(mask: &str) -> bool {
    mask.contains(['*', '?'])
}

/// Set of normalized masks, split into wildcard masks (linear scan) and literal paths
/// (ancestor-chain lookup).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaskMatcher {
    real_masks: BTreeSet<String>,
    rel_paths: BTreeSet<String>,
}

impl MaskMatcher {
    pub fn insert(&mut self, mask: &str) {
        if is_wildcard_mask(mask) {
            self.real_masks.insert(mask.to_string());
        } else {
            self.rel_paths.insert(mask.to_string());
        }
    }

    /// Insert `path` as a literal path, even if it contains `*` or `?`.
    pub fn insert_literal(&mut self, path: &str) {
        self.rel_paths.insert(path.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.real_masks.is_empty() && self.rel_paths.is_empty()
    }

    /// Full match of `rel_path` or of any of its ancestors.
    pub fn matches(&self, rel_path: &str) -> bool {
        if self
            .real_masks
            .iter()
            .any(|mask| matches_mask(rel_path, mask))
        {
            return true;
        }
        if self.rel_paths.is_empty() {
            return false;
        }
        let mut parent = rel_path;
        loop {
            if self.rel_paths.contains(parent) {
                return true;
            }
            match parent.rfind(SEP) {
                Some(pos) => parent = &parent[..pos],
                None => return false,
            }
        }
    }

    /// Match against the parent folder of `rel_path` only (and its ancestors).
    pub fn matches_parent(&self, rel_path: &str) -> bool {
        match rel_path.rfind(SEP) {
            Some(pos) => self.matches(&rel_path[..pos]),
            None => false,
        }
    }

    /// True if some mask might match `rel_path` or an item below it.
    ///
    /// Literal masks count only when strictly longer than `rel_path`: a literal equal
    /// to `rel_path` does not extend to its children.
    pub fn matches_begin(&self, rel_path: &str) -> bool {
        if self
            .real_masks
            .iter()
            .any(|mask| matches_mask_begin(rel_path, mask))
        {
            return true;
        }
        let prefix = format!("{rel_path}{SEP}");
        self.rel_paths
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|p| p.starts_with(&prefix))
    }
}
