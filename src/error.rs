/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use thiserror::Error;

/// Status taken on by a failed detector/walker/probe call.
///
/// Mirrors the source's `CSYNC_STATUS_*` codes, minus
/// `CSYNC_STATUS_MEMORY_ERROR` (unrepresentable in safe Rust: allocation
/// failure aborts rather than producing a value to propagate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    #[error("parameter error: {0}")]
    ParamError(String),
    #[error("tree insertion failed: {0}")]
    TreeError(String),
    #[error("opendir failed: {0}")]
    OpendirError(String),
    #[error("readdir failed: {0}")]
    ReaddirError(String),
    #[error("visitor reported failure: {0}")]
    UpdateError(String),
    #[error("invariant breach: {0}")]
    Unsuccessful(String),
    #[error("error: {0}")]
    Error(String),
}

pub type Result<T> = std::result::Result<T, SyncStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_variant_message() {
        let err = SyncStatus::ParamError("path shorter than root".to_owned());
        assert_eq!(err.to_string(), "parameter error: path shorter than root");
    }
}
