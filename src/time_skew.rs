/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Time-skew probe (spec.md §4.3). Composes one zero-byte temporary
//! file path under the local replica root, creates and stats it on
//! both the local and the remote VIO, and returns the absolute mtime
//! difference. Grounded on `original_source/src/csync_time.c`.
//!
//! The source switches a process-wide `ctx->replica` before each VIO
//! call (dynamic scope); this implementation instead takes the two VIO
//! backends as explicit parameters, implementing the REDESIGN FLAG in
//! spec.md §9. Temp-file cleanup on every exit path (including errors)
//! is done with a `Drop` guard in place of the source's `goto out`.

use log::{debug, error};

use crate::error::SyncStatus;
use crate::model::Context;
use crate::uri::join;
use crate::vio::Vio;

const PROBE_FILENAME: &str = "csync_timediff.ctmp";

/// Unlinks the probe temp file on both replicas on drop, regardless of
/// how the probe exits — the idiomatic substitute for the source's
/// unconditional `goto out` cleanup.
struct ProbeCleanup<'a> {
    local_vio: &'a dyn Vio,
    remote_vio: &'a dyn Vio,
    uri: String,
}

impl Drop for ProbeCleanup<'_> {
    fn drop(&mut self) {
        let _ = self.local_vio.unlink(&self.uri);
        let _ = self.remote_vio.unlink(&self.uri);
    }
}

/// Runs the skew probe and returns `|t_local - t_remote|` in seconds.
/// Any VIO create/stat failure is fatal (logged at error level) and
/// yields `SyncStatus::Error`. The caller compares the result against
/// `ctx.tunables.max_time_difference` and refuses the sync if exceeded.
///
/// Per spec.md §4.3 step 1 (and `original_source/src/csync_time.c`,
/// which reuses `luri` for both `csync_vio_creat` calls), the probe
/// file is composed under the *local* root only and that single URI is
/// handed to both the local and the remote VIO — there is no
/// separately-rooted remote URI.
pub fn probe(ctx: &Context, local_vio: &dyn Vio, remote_vio: &dyn Vio) -> Result<i64, SyncStatus> {
    let uri = join(&ctx.local.root_uri, PROBE_FILENAME);
    let _cleanup = ProbeCleanup {
        local_vio,
        remote_vio,
        uri: uri.clone(),
    };

    local_vio.create_empty(&uri).map_err(|e| {
        error!("unable to create temporary file '{uri}': {e}");
        SyncStatus::Error(format!("create '{uri}' failed: {e}"))
    })?;
    let local_stat = local_vio.stat(&uri).map_err(|e| {
        error!("synchronisation is not possible, stat '{uri}' failed: {e}");
        SyncStatus::Error(format!("stat '{uri}' failed: {e}"))
    })?;

    remote_vio.create_empty(&uri).map_err(|e| {
        error!("unable to create temporary file '{uri}': {e}");
        SyncStatus::Error(format!("create '{uri}' failed: {e}"))
    })?;
    let remote_stat = remote_vio.stat(&uri).map_err(|e| {
        error!("synchronisation is not possible, stat '{uri}' failed: {e}");
        SyncStatus::Error(format!("stat '{uri}' failed: {e}"))
    })?;

    let diff = (local_stat.mtime - remote_stat.mtime).abs();
    debug!("time difference: {diff} seconds");
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vio::LocalVio;

    #[test]
    fn unchanged_filesystem_reports_near_zero_skew() {
        let local_dir = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            local_dir.path().to_str().unwrap(),
            remote_dir.path().to_str().unwrap(),
        );
        let vio = LocalVio::new();
        let diff = probe(&ctx, &vio, &vio).unwrap();
        assert!(diff <= 1, "expected near-zero skew, got {diff}");
        assert!(!local_dir.path().join(PROBE_FILENAME).exists());
        assert!(!remote_dir.path().join(PROBE_FILENAME).exists());
    }

    #[test]
    fn probe_cleans_up_temp_files_even_on_success() {
        let local_dir = tempfile::tempdir().unwrap();
        let remote_dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            local_dir.path().to_str().unwrap(),
            remote_dir.path().to_str().unwrap(),
        );
        let vio = LocalVio::new();
        probe(&ctx, &vio, &vio).unwrap();
        let local_entries: Vec<_> = std::fs::read_dir(local_dir.path()).unwrap().collect();
        assert!(local_entries.is_empty());
    }

    #[test]
    fn nonexistent_root_is_a_fatal_error() {
        let ctx = Context::new("/nonexistent/local/root/xyz", "/nonexistent/remote/root/xyz");
        let vio = LocalVio::new();
        let result = probe(&ctx, &vio, &vio);
        assert!(matches!(result, Err(SyncStatus::Error(_))));
    }
}
