/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tiny URI-composition helper shared by the walker and the time-skew
//! probe. Replica roots and VIO paths are plain strings (a remote
//! backend's "uri" need not be a `std::path::Path`), so composition is
//! done by hand rather than via `Path::join`.

/// Joins `root` and `name` with exactly one `/` between them.
pub fn join(root: &str, name: &str) -> String {
    if root.ends_with('/') {
        format!("{root}{name}")
    } else {
        format!("{root}/{name}")
    }
}

/// Strips `root` (plus one separator) as a prefix of `path`, yielding
/// the replica-relative remainder. `None` if `path` is not strictly
/// longer than `root` (spec.md §4.4 validation: "`path` must be
/// strictly longer than `root_uri`").
pub fn strip_root<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    if path.len() <= root.len() {
        return None;
    }
    let prefix = if root.ends_with('/') {
        root.to_owned()
    } else {
        format!("{root}/")
    };
    path.strip_prefix(&prefix)
}
