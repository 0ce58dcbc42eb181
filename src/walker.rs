/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Recursive directory walker (spec.md §4.5): dispatches to a visitor
//! for every entry, applying exclusion filtering, symlink policy, and a
//! depth budget. Grounded on
//! `original_source/src/csync_update.c::csync_ftw`/`_is_in_root`.
//!
//! `opendir`/`readdir`/`closedir` collapse to one eager
//! `Vio::read_dir_names` call (no directory handle outlives this
//! function, so there is nothing left to close explicitly).

use std::io;

use log::{debug, trace};

use crate::error::SyncStatus;
use crate::exclude::ExcludeFilter;
use crate::model::{Context, FileStat, RawFileKind, StatFields};
use crate::uri::{join, strip_root};
use crate::vio::Vio;

/// What the walker decided about one directory entry, before handing
/// it to the visitor. `SLN` (absolute symlink, or a relative symlink
/// whose target escapes the replica root) has no variant here: those
/// entries are silently dropped and never reach a visitor at all,
/// matching spec.md §4.5's "ignored (not reported)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFlag {
    File,
    Dir,
    Symlink,
    Special,
    NotStatable,
}

/// Receives one walked entry per call. Visitor binding (spec.md §4.5):
/// the standard visitor (`DetectorVisitor`) dispatches to the detector
/// for files, special files, and directories always, and for symlinks
/// only when symlink sync is enabled.
pub trait Visitor {
    /// A negative/err return aborts the walk; the error propagates as
    /// the walk's own result. Since this crate returns typed `Result`s
    /// end to end, there is no separate "upgrade OK status to
    /// UPDATE_ERROR" step as in the source — an error here already
    /// carries its own status.
    fn visit(
        &mut self,
        ctx: &mut Context,
        abs_path: &str,
        stat: &FileStat,
        flag: EntryFlag,
    ) -> Result<(), SyncStatus>;
}

/// The standard visitor: classifies and records files, special files,
/// and directories unconditionally, and symlinks only when
/// `sync_symbolic_links` is enabled. Drops `NotStatable` entries.
pub struct DetectorVisitor<'a> {
    pub statedb: &'a dyn crate::statedb::StateDatabase,
    pub sync_symbolic_links: bool,
}

impl Visitor for DetectorVisitor<'_> {
    fn visit(
        &mut self,
        ctx: &mut Context,
        abs_path: &str,
        stat: &FileStat,
        flag: EntryFlag,
    ) -> Result<(), SyncStatus> {
        use crate::model::SyncKind;
        let kind = match flag {
            EntryFlag::File => SyncKind::File,
            EntryFlag::Dir => SyncKind::Dir,
            EntryFlag::Special => SyncKind::Special,
            EntryFlag::Symlink => {
                if !self.sync_symbolic_links {
                    return Ok(());
                }
                SyncKind::Symlink
            }
            EntryFlag::NotStatable => return Ok(()),
        };
        crate::detector::detect(ctx, abs_path, stat, kind, self.statedb)
    }
}

/// Canonicalizes both `candidate_uri` and the active replica's root and
/// checks whether the candidate is equal to, or lexically rooted at,
/// the canonical root (spec.md §4.5's `_is_in_root`). A candidate whose
/// target does not resolve at all (e.g. a dangling relative symlink) is
/// treated as outside the root rather than as a hard error — the
/// source only treats internal failures (allocation, `getcwd`) as
/// errors, not a missing target.
fn is_in_root(ctx: &Context, vio: &dyn Vio, candidate_uri: &str) -> Result<bool, SyncStatus> {
    let root = &ctx.active().root_uri;
    let canonical_root = vio
        .canonicalize(root)
        .map_err(|e| SyncStatus::Error(format!("canonicalize root '{root}' failed: {e}")))?;
    let canonical_candidate = match vio.canonicalize(candidate_uri) {
        Ok(c) => c,
        Err(_) => return Ok(false),
    };
    Ok(canonical_candidate == canonical_root
        || canonical_candidate.starts_with(&join(&canonical_root, "")))
}

/// Resolves the walker flag for one already-stat'd entry. `Ok(None)`
/// means the entry is policy-ignored (`SLN`) and must not reach a
/// visitor.
fn derive_flag(
    ctx: &Context,
    vio: &dyn Vio,
    dir_uri: &str,
    stat: &FileStat,
) -> Result<Option<EntryFlag>, SyncStatus> {
    match stat.kind {
        RawFileKind::Symlink => {
            let target = match (&stat.symlink_target, stat.fields.has(StatFields::SYMLINK_TARGET)) {
                (Some(t), true) => t,
                _ => return Ok(Some(EntryFlag::NotStatable)),
            };
            if vio.is_absolute(target) {
                return Ok(None);
            }
            let link_target_uri = join(dir_uri, target);
            if is_in_root(ctx, vio, &link_target_uri)? {
                Ok(Some(EntryFlag::Symlink))
            } else {
                Ok(None)
            }
        }
        RawFileKind::Directory => Ok(Some(EntryFlag::Dir)),
        RawFileKind::Block | RawFileKind::Char | RawFileKind::Socket | RawFileKind::Fifo => {
            Ok(Some(EntryFlag::Special))
        }
        RawFileKind::Regular | RawFileKind::Unknown => Ok(Some(EntryFlag::File)),
    }
}

/// Recursively walks `uri`, dispatching each entry to `visitor`, down
/// to `depth` levels of subdirectories (`depth == 0` scans `uri` itself
/// without recursing).
pub fn walk(
    ctx: &mut Context,
    vio: &dyn Vio,
    exclude: &dyn ExcludeFilter,
    visitor: &mut dyn Visitor,
    uri: &str,
    depth: u32,
) -> Result<(), SyncStatus> {
    if uri.is_empty() {
        return Err(SyncStatus::ParamError("uri must not be empty".to_owned()));
    }

    let names = match vio.read_dir_names(uri) {
        Ok(names) => names,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!("opendir permission denied for '{uri}', skipping subtree");
            ctx.last_status = Some(SyncStatus::OpendirError(format!(
                "opendir '{uri}' denied: {e}"
            )));
            return Ok(());
        }
        Err(e) => {
            return Err(SyncStatus::OpendirError(format!(
                "opendir '{uri}' failed: {e}"
            )));
        }
    };

    let root = ctx.active().root_uri.clone();

    for name in names {
        if name == "." || name == ".." {
            continue;
        }
        let abs_path = join(uri, &name);

        let rel_path = strip_root(&root, &abs_path)
            .ok_or_else(|| {
                SyncStatus::Unsuccessful(format!(
                    "path '{abs_path}' not below root '{root}'"
                ))
            })?
            .to_owned();

        if exclude.is_excluded(&rel_path) {
            trace!("{rel_path} excluded");
            continue;
        }

        let stat = match vio.stat(&abs_path) {
            Ok(stat) => stat,
            Err(e) => {
                debug!("stat failed for '{abs_path}', treating as not statable");
                ctx.last_status = Some(SyncStatus::Unsuccessful(format!(
                    "stat '{abs_path}' failed: {e}"
                )));
                continue;
            }
        };

        let flag = match derive_flag(ctx, vio, uri, &stat)? {
            Some(flag) => flag,
            None => continue, // SLN: ignored, not reported
        };

        trace!("walk: {abs_path}");
        visitor.visit(ctx, &abs_path, &stat, flag)?;

        if flag == EntryFlag::Dir && depth > 0 {
            walk(ctx, vio, exclude, visitor, &abs_path, depth - 1)?;
        }
    }

    Ok(())
}
