/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Exclude filter (spec.md §6.3): predicate over a replica-relative
//! path. Grounded in the `hasher` crate's own use of `regex::RegexSet`
//! to skip filesystem-internal directories such as `lost+found`
//! (`hasher/src/test.rs`), and in `mount/mod.rs::get_internal_dirs`.

use regex::RegexSet;

/// `excluded(rel_path) -> bool`; `rel_path` has no leading separator.
pub trait ExcludeFilter {
    fn is_excluded(&self, rel_path: &str) -> bool;
}

/// Regex-set backed exclude filter. A path is excluded if any pattern
/// matches it.
pub struct RegexExclude {
    patterns: RegexSet,
}

impl RegexExclude {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn empty() -> Self {
        Self {
            patterns: RegexSet::new::<_, &str>([]).expect("empty pattern set is always valid"),
        }
    }
}

impl ExcludeFilter for RegexExclude {
    fn is_excluded(&self, rel_path: &str) -> bool {
        self.patterns.is_match(rel_path)
    }
}

/// Never excludes anything.
pub struct NoExclude;

impl ExcludeFilter for NoExclude {
    fn is_excluded(&self, _rel_path: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_excludes_nothing() {
        let f = RegexExclude::empty();
        assert!(!f.is_excluded("a/b.txt"));
    }

    #[test]
    fn matches_lost_and_found_at_root() {
        let f = RegexExclude::new([r"^/?lost\+found($|/)"]).unwrap();
        assert!(f.is_excluded("lost+found"));
        assert!(f.is_excluded("lost+found/inner"));
        assert!(!f.is_excluded("found/lost"));
    }

    #[test]
    fn no_exclude_filter_passes_everything() {
        assert!(!NoExclude.is_excluded("anything/at/all"));
    }
}
