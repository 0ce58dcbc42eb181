/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! State database (spec.md §6.2): prior-sync metadata, consumed
//! read-only during a walk. The real store is an external
//! collaborator; this module defines the trait plus one in-memory
//! reference implementation used by tests and the demonstration CLI,
//! mirroring the teacher's habit of pairing a trait with one
//! in-process implementation (`fuzzing/observer/dash.rs`,
//! `fuzzing/observer/lcov.rs`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::SyncStat;

/// Lookup interface a detector consults. Read-only during a walk;
/// writes are produced by the downstream reconcile stage, not here.
pub trait StateDatabase {
    /// Has this sync been run before? First-sync semantics (everything
    /// `NEW`) apply when this is `false`.
    fn exists(&self) -> bool;

    /// O(1) expected.
    fn by_hash(&self, phash: u64) -> Option<&SyncStat>;

    /// O(log n) acceptable.
    fn by_inode(&self, inode: u64) -> Option<&SyncStat>;
}

/// In-memory reference implementation, indexed by path-hash and by
/// inode. Suitable for tests and for the demonstration CLI; a real
/// deployment wires in a persistent store instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStateDatabase {
    populated: bool,
    by_hash: HashMap<u64, SyncStat>,
    by_inode: HashMap<u64, SyncStat>,
}

impl InMemoryStateDatabase {
    /// An empty database representing "no sync has ever run".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a populated database from a prior walk's tree, as the
    /// reconciler would persist it at the end of a sync.
    pub fn from_records(records: impl IntoIterator<Item = SyncStat>) -> Self {
        let mut db = Self::default();
        for record in records {
            db.insert(record);
        }
        db.populated = true;
        db
    }

    pub fn insert(&mut self, record: SyncStat) {
        self.populated = true;
        self.by_hash.insert(record.phash, record.clone());
        self.by_inode.insert(record.inode, record);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl StateDatabase for InMemoryStateDatabase {
    fn exists(&self) -> bool {
        self.populated
    }

    fn by_hash(&self, phash: u64) -> Option<&SyncStat> {
        self.by_hash.get(&phash)
    }

    fn by_inode(&self, inode: u64) -> Option<&SyncStat> {
        self.by_inode.get(&inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Instruction, SyncKind};

    fn sample(path: &str, phash: u64, inode: u64) -> SyncStat {
        SyncStat {
            path: path.to_owned(),
            pathlen: path.len(),
            phash,
            inode,
            mode: 0o644,
            size: 0,
            modtime: 1000,
            uid: 0,
            gid: 0,
            nlink: 1,
            kind: SyncKind::File,
            instruction: Instruction::New,
        }
    }

    #[test]
    fn empty_db_reports_not_exists() {
        let db = InMemoryStateDatabase::empty();
        assert!(!db.exists());
        assert!(db.by_hash(1).is_none());
    }

    #[test]
    fn lookup_by_hash_and_inode() {
        let db = InMemoryStateDatabase::from_records([sample("a.txt", 42, 7)]);
        assert!(db.exists());
        assert_eq!(db.by_hash(42).unwrap().path, "a.txt");
        assert_eq!(db.by_inode(7).unwrap().path, "a.txt");
        assert!(db.by_hash(99).is_none());
    }

    #[test]
    fn json_roundtrip() {
        let db = InMemoryStateDatabase::from_records([sample("a.txt", 42, 7)]);
        let json = db.to_json().unwrap();
        let back = InMemoryStateDatabase::from_json(&json).unwrap();
        assert_eq!(back.by_hash(42).unwrap().path, "a.txt");
    }
}
