/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Data model shared by the walker, detector, and controller: replicas,
//! the per-sync context, VIO-layer stat records, and the detector's
//! persisted sync-stat records (spec.md §3).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SyncStatus;

/// Which replica a walk/detect call is currently operating against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicaKind {
    Local,
    Remote,
}

/// Bits of a `FileStat` the backing VIO call actually populated.
/// Only `SYMLINK_TARGET` is consulted by this crate today (spec.md §4.5),
/// the rest exist so a `Vio` impl can report partial stats honestly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatFields(u16);

impl StatFields {
    pub const MTIME: StatFields = StatFields(1 << 0);
    pub const SIZE: StatFields = StatFields(1 << 1);
    pub const MODE: StatFields = StatFields(1 << 2);
    pub const UID: StatFields = StatFields(1 << 3);
    pub const GID: StatFields = StatFields(1 << 4);
    pub const INODE: StatFields = StatFields(1 << 5);
    pub const NLINK: StatFields = StatFields(1 << 6);
    pub const SYMLINK_TARGET: StatFields = StatFields(1 << 7);

    pub const NONE: StatFields = StatFields(0);

    pub const fn all_basic() -> StatFields {
        StatFields(
            Self::MTIME.0
                | Self::SIZE.0
                | Self::MODE.0
                | Self::UID.0
                | Self::GID.0
                | Self::INODE.0
                | Self::NLINK.0,
        )
    }

    pub fn with(self, other: StatFields) -> StatFields {
        StatFields(self.0 | other.0)
    }

    pub fn has(self, bit: StatFields) -> bool {
        self.0 & bit.0 == bit.0
    }
}

/// What the VIO backend's `stat` reported the entry to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawFileKind {
    Regular,
    Directory,
    Symlink,
    Block,
    Char,
    Socket,
    Fifo,
    Unknown,
}

/// Per-entry observed state as reported by the VIO layer (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStat {
    pub name: String,
    pub kind: RawFileKind,
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
    pub uid: u32,
    pub gid: u32,
    pub inode: u64,
    pub nlink: u32,
    pub fields: StatFields,
    pub symlink_target: Option<String>,
}

/// Closed type tag for a detector-produced `SyncStat`. Keep this set
/// exactly as enumerated so downstream, unspecified stages stay
/// exhaustive (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncKind {
    File,
    Dir,
    Symlink,
    Special,
}

/// The detector's classification of an entry relative to prior-sync
/// state. Only `None`, `Eval`, `Rename`, `New`, `Ignore` are ever
/// produced by the detector in this crate; `Remove`, `Conflict`, and
/// `Error` are reserved for the downstream reconcile stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    None,
    Eval,
    Rename,
    New,
    Ignore,
    Remove,
    Conflict,
    Error,
}

/// Detector output / persisted prior-sync record (spec.md §3).
///
/// Invariant: `phash == path_hash::hash_path(&path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStat {
    pub path: String,
    pub pathlen: usize,
    pub phash: u64,
    pub inode: u64,
    pub mode: u32,
    pub size: u64,
    pub modtime: i64,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub kind: SyncKind,
    pub instruction: Instruction,
}

/// Ordered associative container keyed by replica-relative path. A
/// `BTreeMap` gives stable, sorted iteration order and O(log n) lookup
/// by path, which is what the reconcile stage needs to realign the two
/// replica trees (spec.md §9) — the idiomatic substitute for the
/// source's `c_rbtree`.
pub type SyncTree = BTreeMap<String, SyncStat>;

/// One sync endpoint: a VIO backend selector, its root, and the tree of
/// detector output collected for the current walk.
#[derive(Debug, Clone)]
pub struct Replica {
    pub kind: ReplicaKind,
    pub root_uri: String,
    pub tree: SyncTree,
}

impl Replica {
    pub fn new(kind: ReplicaKind, root_uri: impl Into<String>) -> Self {
        Self {
            kind,
            root_uri: root_uri.into(),
            tree: SyncTree::new(),
        }
    }
}

/// Tunables parsed from the config file (spec.md §3, §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunables {
    pub max_dir_depth: u32,
    pub max_time_difference: u32,
    pub with_conflict_copies: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_dir_depth: 50,
            max_time_difference: 10,
            with_conflict_copies: false,
        }
    }
}

/// Process-wide synchronization state for one sync invocation
/// (spec.md §3). `current` is the dynamic-scope switch selecting which
/// replica the walker/detector presently operate on; `last_status`
/// records the most recent non-fatal demotion (EACCES swallow, stat
/// failure) for callers that want to inspect it after the fact, but
/// control flow itself runs on `Result<_, SyncStatus>` per the
/// REDESIGN FLAG in spec.md §9, not on this field.
pub struct Context {
    pub local: Replica,
    pub remote: Replica,
    pub current: ReplicaKind,
    pub tunables: Tunables,
    pub last_status: Option<SyncStatus>,
}

impl Context {
    pub fn new(local_root: impl Into<String>, remote_root: impl Into<String>) -> Self {
        Self {
            local: Replica::new(ReplicaKind::Local, local_root),
            remote: Replica::new(ReplicaKind::Remote, remote_root),
            current: ReplicaKind::Local,
            tunables: Tunables::default(),
            last_status: None,
        }
    }

    pub fn active(&self) -> &Replica {
        match self.current {
            ReplicaKind::Local => &self.local,
            ReplicaKind::Remote => &self.remote,
        }
    }

    pub fn active_mut(&mut self) -> &mut Replica {
        match self.current {
            ReplicaKind::Local => &mut self.local,
            ReplicaKind::Remote => &mut self.remote,
        }
    }

    pub fn set_max_dir_depth(&mut self, n: u32) {
        self.tunables.max_dir_depth = n;
    }

    pub fn set_max_timediff(&mut self, n: u32) {
        self.tunables.max_time_difference = n;
    }

    pub fn set_conflict_copies(&mut self, enabled: bool) {
        self.tunables.with_conflict_copies = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tunables_match_spec() {
        let t = Tunables::default();
        assert_eq!(t.max_dir_depth, 50);
        assert_eq!(t.max_time_difference, 10);
        assert!(!t.with_conflict_copies);
    }

    #[test]
    fn active_replica_follows_current() {
        let mut ctx = Context::new("/local", "/remote");
        assert_eq!(ctx.active().root_uri, "/local");
        ctx.current = ReplicaKind::Remote;
        assert_eq!(ctx.active().root_uri, "/remote");
    }

    #[test]
    fn stat_fields_bitset_roundtrips() {
        let f = StatFields::MTIME.with(StatFields::INODE);
        assert!(f.has(StatFields::MTIME));
        assert!(f.has(StatFields::INODE));
        assert!(!f.has(StatFields::SYMLINK_TARGET));
    }
}
