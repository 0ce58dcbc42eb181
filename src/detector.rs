/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Change-detection decision function (spec.md §4.4). Classifies a
//! single entry against the state database and inserts the resulting
//! `SyncStat` into the active replica's tree. Grounded line-for-line on
//! `original_source/src/csync_update.c::_csync_detect_update`.

use log::debug;

use crate::error::SyncStatus;
use crate::model::{Context, FileStat, Instruction, ReplicaKind, SyncKind, SyncStat};
use crate::path_hash::hash_path;
use crate::statedb::StateDatabase;
use crate::uri::strip_root;

/// Classifies `stat` (observed at `abs_path`, under the currently
/// active replica) and inserts a populated `SyncStat` into that
/// replica's tree.
///
/// `abs_path` must be non-empty and strictly longer than the active
/// replica's root (spec.md §4.4 validation); violations return
/// `SyncStatus::ParamError`.
pub fn detect(
    ctx: &mut Context,
    abs_path: &str,
    stat: &FileStat,
    kind: SyncKind,
    statedb: &dyn StateDatabase,
) -> Result<(), SyncStatus> {
    if abs_path.is_empty() {
        return Err(SyncStatus::ParamError("path must not be empty".to_owned()));
    }
    let root = ctx.active().root_uri.clone();
    let rel_path = strip_root(&root, abs_path)
        .ok_or_else(|| {
            SyncStatus::ParamError(format!("path '{abs_path}' not below root '{root}'"))
        })?
        .to_owned();

    let phash = hash_path(&rel_path);
    let instruction = classify(ctx, phash, stat, kind, statedb);

    let sync_stat = SyncStat {
        path: rel_path.clone(),
        pathlen: rel_path.len(),
        phash,
        inode: stat.inode,
        mode: stat.mode,
        size: stat.size,
        modtime: stat.mtime,
        uid: stat.uid,
        gid: stat.gid,
        nlink: stat.nlink,
        kind,
        instruction,
    };

    debug!(
        "file: {}, instruction: {:?}",
        sync_stat.path, sync_stat.instruction
    );
    ctx.active_mut().tree.insert(rel_path, sync_stat);
    Ok(())
}

fn classify(
    ctx: &Context,
    phash: u64,
    stat: &FileStat,
    kind: SyncKind,
    statedb: &dyn StateDatabase,
) -> Instruction {
    // Hardlinks are unsupported: sidestep aliasing under this data model.
    if kind == SyncKind::File && stat.nlink > 1 {
        return Instruction::Ignore;
    }

    // No prior sync at all: first-sync semantics, everything is NEW.
    if !statedb.exists() {
        return Instruction::New;
    }

    if let Some(prior) = statedb.by_hash(phash) {
        if prior.phash == phash {
            return if stat.mtime > prior.modtime {
                Instruction::Eval
            } else {
                Instruction::None
            };
        }
    }

    // Path-hash miss: check for a local rename via stable inode.
    // Remote replicas lack stable inodes, so this is local-only.
    if ctx.current == ReplicaKind::Local {
        if let Some(prior) = statedb.by_inode(stat.inode) {
            if prior.inode == stat.inode {
                return Instruction::Rename;
            }
        }
    }
    Instruction::New
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawFileKind;
    use crate::statedb::InMemoryStateDatabase;

    fn stat(inode: u64, nlink: u32, mtime: i64) -> FileStat {
        FileStat {
            name: "f".to_owned(),
            kind: RawFileKind::Regular,
            mode: 0o644,
            size: 0,
            mtime,
            uid: 0,
            gid: 0,
            inode,
            nlink,
            fields: Default::default(),
            symlink_target: None,
        }
    }

    fn sync_stat(path: &str, phash: u64, inode: u64, modtime: i64) -> SyncStat {
        SyncStat {
            path: path.to_owned(),
            pathlen: path.len(),
            phash,
            inode,
            mode: 0o644,
            size: 0,
            modtime,
            uid: 0,
            gid: 0,
            nlink: 1,
            kind: SyncKind::File,
            instruction: Instruction::None,
        }
    }

    #[test]
    fn rejects_empty_path() {
        let mut ctx = Context::new("/root", "/root");
        let db = InMemoryStateDatabase::empty();
        let err = detect(&mut ctx, "", &stat(1, 1, 0), SyncKind::File, &db).unwrap_err();
        assert!(matches!(err, SyncStatus::ParamError(_)));
    }

    #[test]
    fn rejects_path_not_below_root() {
        let mut ctx = Context::new("/root", "/root");
        let db = InMemoryStateDatabase::empty();
        let err = detect(&mut ctx, "/root", &stat(1, 1, 0), SyncKind::File, &db).unwrap_err();
        assert!(matches!(err, SyncStatus::ParamError(_)));
    }

    #[test]
    fn first_sync_is_new() {
        let mut ctx = Context::new("/root", "/root");
        let db = InMemoryStateDatabase::empty();
        detect(&mut ctx, "/root/a.txt", &stat(1, 1, 100), SyncKind::File, &db).unwrap();
        assert_eq!(
            ctx.local.tree.get("a.txt").unwrap().instruction,
            Instruction::New
        );
    }

    #[test]
    fn hardlinked_file_is_ignored_even_first_sync() {
        let mut ctx = Context::new("/root", "/root");
        let db = InMemoryStateDatabase::empty();
        detect(&mut ctx, "/root/a.txt", &stat(1, 2, 100), SyncKind::File, &db).unwrap();
        assert_eq!(
            ctx.local.tree.get("a.txt").unwrap().instruction,
            Instruction::Ignore
        );
    }

    #[test]
    fn unchanged_mtime_is_none() {
        let mut ctx = Context::new("/root", "/root");
        let phash = hash_path("a.txt");
        let db = InMemoryStateDatabase::from_records([sync_stat("a.txt", phash, 1, 100)]);
        detect(&mut ctx, "/root/a.txt", &stat(1, 1, 100), SyncKind::File, &db).unwrap();
        assert_eq!(
            ctx.local.tree.get("a.txt").unwrap().instruction,
            Instruction::None
        );
    }

    #[test]
    fn newer_mtime_is_eval() {
        let mut ctx = Context::new("/root", "/root");
        let phash = hash_path("a.txt");
        let db = InMemoryStateDatabase::from_records([sync_stat("a.txt", phash, 1, 100)]);
        detect(&mut ctx, "/root/a.txt", &stat(1, 1, 200), SyncKind::File, &db).unwrap();
        assert_eq!(
            ctx.local.tree.get("a.txt").unwrap().instruction,
            Instruction::Eval
        );
    }

    #[test]
    fn local_rename_detected_by_inode() {
        let mut ctx = Context::new("/root", "/root");
        ctx.current = ReplicaKind::Local;
        let old_phash = hash_path("old.txt");
        let db = InMemoryStateDatabase::from_records([sync_stat("old.txt", old_phash, 7, 100)]);
        detect(
            &mut ctx,
            "/root/new.txt",
            &stat(7, 1, 150),
            SyncKind::File,
            &db,
        )
        .unwrap();
        assert_eq!(
            ctx.local.tree.get("new.txt").unwrap().instruction,
            Instruction::Rename
        );
    }

    #[test]
    fn remote_replica_never_renames() {
        let mut ctx = Context::new("/root", "/root");
        ctx.current = ReplicaKind::Remote;
        let old_phash = hash_path("old.txt");
        let db = InMemoryStateDatabase::from_records([sync_stat("old.txt", old_phash, 7, 100)]);
        detect(
            &mut ctx,
            "/root/new.txt",
            &stat(7, 1, 150),
            SyncKind::File,
            &db,
        )
        .unwrap();
        assert_eq!(
            ctx.remote.tree.get("new.txt").unwrap().instruction,
            Instruction::New
        );
    }

    #[test]
    fn phash_invariant_holds() {
        let mut ctx = Context::new("/root", "/root");
        let db = InMemoryStateDatabase::empty();
        detect(
            &mut ctx,
            "/root/d/b.txt",
            &stat(1, 1, 100),
            SyncKind::File,
            &db,
        )
        .unwrap();
        let entry = ctx.local.tree.get("d/b.txt").unwrap();
        assert_eq!(entry.phash, hash_path("d/b.txt"));
        assert!(!entry.path.starts_with('/'));
    }
}
