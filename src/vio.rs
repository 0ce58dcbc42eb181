/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Virtual I/O layer (spec.md §6.1): an interface over which directory
//! enumeration, stat, and file creation are invoked, so local and
//! remote backends are interchangeable. `opendir`/`readdir`/`closedir`
//! fold into one `read_dir_names` call and `creat`/`close` fold into
//! one `create_empty` call — Rust's ownership model makes the
//! source's explicit handle lifetimes redundant for every call site in
//! this crate (the handle never outlives the function that opened it).
//!
//! Grounded in `command.rs`'s `CommandInterface` trait: one trait,
//! selection of backend driven by which replica is active, one local
//! implementation shipped here. A remote backend is named out of scope
//! in spec.md §1 and is not implemented.

use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use crate::model::{FileStat, RawFileKind, StatFields};

/// Abstract directory iteration, stat, create, unlink — spec.md §6.1.
pub trait Vio {
    /// Entry names directly under `uri`, in VIO-reported order.
    /// `.` and `..` are not filtered here; the walker does that.
    fn read_dir_names(&self, uri: &str) -> io::Result<Vec<String>>;

    /// Populate a `FileStat` for `uri`. Must not follow symlinks: the
    /// walker needs to see the link itself to apply symlink policy.
    fn stat(&self, uri: &str) -> io::Result<FileStat>;

    /// Create a zero-byte file at `uri`, then close it.
    fn create_empty(&self, uri: &str) -> io::Result<()>;

    /// Remove the file at `uri`.
    fn unlink(&self, uri: &str) -> io::Result<()>;

    /// Is `uri` an absolute path for this backend?
    fn is_absolute(&self, uri: &str) -> bool;

    /// Canonicalize `uri` (resolve `.`/`..`/symlinks) for `_is_in_root`
    /// checks (spec.md §4.5). Does not require the path to exist on
    /// some backends; the local implementation does require it, as the
    /// underlying syscall does.
    fn canonicalize(&self, uri: &str) -> io::Result<String>;
}

/// Reference local POSIX-filesystem backend, built on `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalVio;

impl LocalVio {
    pub fn new() -> Self {
        Self
    }
}

fn classify(meta: &fs::Metadata, symlink_target: &Option<String>) -> (RawFileKind, StatFields) {
    let mut fields = StatFields::all_basic();
    let kind = if meta.file_type().is_symlink() {
        if symlink_target.is_some() {
            fields = fields.with(StatFields::SYMLINK_TARGET);
        }
        RawFileKind::Symlink
    } else if meta.is_dir() {
        RawFileKind::Directory
    } else if meta.is_file() {
        RawFileKind::Regular
    } else {
        use std::os::unix::fs::FileTypeExt;
        let ft = meta.file_type();
        if ft.is_block_device() {
            RawFileKind::Block
        } else if ft.is_char_device() {
            RawFileKind::Char
        } else if ft.is_socket() {
            RawFileKind::Socket
        } else if ft.is_fifo() {
            RawFileKind::Fifo
        } else {
            RawFileKind::Unknown
        }
    };
    (kind, fields)
}

impl Vio for LocalVio {
    fn read_dir_names(&self, uri: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(uri)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn stat(&self, uri: &str) -> io::Result<FileStat> {
        let path = Path::new(uri);
        let meta = fs::symlink_metadata(path)?;
        let symlink_target = if meta.file_type().is_symlink() {
            fs::read_link(path)
                .ok()
                .map(|t| t.to_string_lossy().into_owned())
        } else {
            None
        };
        let (kind, fields) = classify(&meta, &symlink_target);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileStat {
            name,
            kind,
            mode: meta.mode(),
            size: meta.size(),
            mtime: meta.mtime(),
            uid: meta.uid(),
            gid: meta.gid(),
            inode: meta.ino(),
            nlink: meta.nlink() as u32,
            fields,
            symlink_target,
        })
    }

    fn create_empty(&self, uri: &str) -> io::Result<()> {
        let file = fs::File::create(uri)?;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(0o644);
        file.set_permissions(perms)?;
        Ok(())
    }

    fn unlink(&self, uri: &str) -> io::Result<()> {
        fs::remove_file(uri)
    }

    fn is_absolute(&self, uri: &str) -> bool {
        Path::new(uri).is_absolute()
    }

    fn canonicalize(&self, uri: &str) -> io::Result<String> {
        Ok(fs::canonicalize(uri)?.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_a_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hello").unwrap();
        let vio = LocalVio::new();
        let stat = vio.stat(file_path.to_str().unwrap()).unwrap();
        assert_eq!(stat.kind, RawFileKind::Regular);
        assert_eq!(stat.size, 5);
    }

    #[test]
    fn lists_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let vio = LocalVio::new();
        let mut names = vio.read_dir_names(dir.path().to_str().unwrap()).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_owned(), "sub".to_owned()]);
    }

    #[test]
    fn create_empty_then_unlink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.tmp");
        let uri = path.to_str().unwrap();
        let vio = LocalVio::new();
        vio.create_empty(uri).unwrap();
        assert!(path.exists());
        vio.unlink(uri).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn detects_symlink_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let vio = LocalVio::new();
        let stat = vio.stat(link.to_str().unwrap()).unwrap();
        assert_eq!(stat.kind, RawFileKind::Symlink);
        assert!(stat.fields.has(StatFields::SYMLINK_TARGET));
        assert!(stat.symlink_target.is_some());
    }

    #[test]
    fn symlink_target_bit_not_set_when_read_link_failed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        fs::write(&target, b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let meta = fs::symlink_metadata(&link).unwrap();
        // Simulates a `read_link` failure on an otherwise-valid symlink:
        // the bit must follow `symlink_target`, not `meta`'s file type.
        let (kind, fields) = classify(&meta, &None);
        assert_eq!(kind, RawFileKind::Symlink);
        assert!(!fields.has(StatFields::SYMLINK_TARGET));
    }
}
