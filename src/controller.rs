/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Controller (spec.md §2): owns a `Context` plus its collaborators for
//! one sync pass and drives the walk over both replicas, optionally
//! preceded by the time-skew probe. Grounded on `main.rs::run`'s role
//! as the thin orchestrator that wires the teacher's fuzzing pipeline
//! together, adapted to this crate's update-detection pipeline.

use log::info;

use crate::error::SyncStatus;
use crate::exclude::ExcludeFilter;
use crate::model::{Context, ReplicaKind};
use crate::statedb::StateDatabase;
use crate::time_skew;
use crate::vio::Vio;
use crate::walker::{self, DetectorVisitor};

fn skew_exceeds_limit(diff: i64, max_time_difference: u32) -> bool {
    diff.unsigned_abs() > max_time_difference as u64
}

/// Drives one update-detection pass: an optional time-skew check, then
/// a walk of each replica in turn, each populating its side of `ctx`.
///
/// Owns no state of its own beyond what's passed in — replicas,
/// exclude filter, and state database are all supplied by the caller,
/// the same way `main.rs::run` wires a filesystem, a mount, and a
/// config together rather than constructing them itself.
pub struct Controller<'a> {
    local_vio: &'a dyn Vio,
    remote_vio: &'a dyn Vio,
    exclude: &'a dyn ExcludeFilter,
    statedb: &'a dyn StateDatabase,
}

impl<'a> Controller<'a> {
    pub fn new(
        local_vio: &'a dyn Vio,
        remote_vio: &'a dyn Vio,
        exclude: &'a dyn ExcludeFilter,
        statedb: &'a dyn StateDatabase,
    ) -> Self {
        Self {
            local_vio,
            remote_vio,
            exclude,
            statedb,
        }
    }

    /// Runs the skew probe and refuses the sync (`SyncStatus::Error`) if
    /// the observed skew exceeds `ctx.tunables.max_time_difference`.
    pub fn check_time_skew(&self, ctx: &Context) -> Result<i64, SyncStatus> {
        let diff = time_skew::probe(ctx, self.local_vio, self.remote_vio)?;
        if skew_exceeds_limit(diff, ctx.tunables.max_time_difference) {
            return Err(SyncStatus::Error(format!(
                "clock skew {diff}s exceeds max_time_difference {}s",
                ctx.tunables.max_time_difference
            )));
        }
        Ok(diff)
    }

    /// Walks one replica, populating its tree in `ctx`. `ctx.current` is
    /// set to `kind` for the duration so the detector sees the right
    /// root and the right rename-detection policy (spec.md §4.4: only
    /// the local replica is eligible for rename detection).
    pub fn walk_replica(&self, ctx: &mut Context, kind: ReplicaKind) -> Result<(), SyncStatus> {
        ctx.current = kind;
        let vio = match kind {
            ReplicaKind::Local => self.local_vio,
            ReplicaKind::Remote => self.remote_vio,
        };
        let root = ctx.active().root_uri.clone();
        let depth = ctx.tunables.max_dir_depth;
        let mut visitor = DetectorVisitor {
            statedb: self.statedb,
            sync_symbolic_links: false,
        };
        info!("walking {kind:?} replica at '{root}'");
        walker::walk(ctx, vio, self.exclude, &mut visitor, &root, depth)
    }

    /// Full pass: skew check, then walk both replicas in turn.
    pub fn run(&self, ctx: &mut Context) -> Result<(), SyncStatus> {
        self.check_time_skew(ctx)?;
        self.walk_replica(ctx, ReplicaKind::Local)?;
        self.walk_replica(ctx, ReplicaKind::Remote)?;
        Ok(())
    }
}
