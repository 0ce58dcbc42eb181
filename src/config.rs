/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Configuration file parser (spec.md §4.2). Line grammar:
//!
//! ```text
//! line       := blanks (comment | assignment | empty)
//! comment    := '#' <any bytes to EOL>
//! assignment := key blanks '=' blanks value
//! ```
//!
//! Grounded on `original_source/client/csync_config.c`. The original's
//! value extractor uses a `strncpy` length computed from the wrong
//! string (an open question flagged in spec.md §9); this implementation
//! does not replicate that bug — the value is precisely the trimmed
//! bytes after the first `=` to end-of-line. The historical
//! misspelling `with_confilct_copies` is kept exactly as the source's
//! own keyword table spells it (see DESIGN.md for the migration
//! decision not to also accept the correct spelling).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::model::Tunables;

const BLANKS: [char; 2] = [' ', '\t'];

/// Shipped default config, installed when the target path doesn't exist.
const DEFAULT_CONFIG: &str = "\
# default configuration\n\
max_depth = 50\n\
max_time_difference = 10\n\
with_confilct_copies = no\n\
";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to install default config at '{path}': {source}")]
    InstallDefault { path: PathBuf, source: io::Error },
}

/// Installs the shipped default config file at a target path. Platform
/// policy (spec.md §9: Windows copies next to the running executable)
/// is a trait impl, not a conditional branch in the parser.
pub trait DefaultConfigSource {
    fn install(&self, target: &Path) -> io::Result<()>;
}

/// Writes the crate's embedded default configuration verbatim.
pub struct EmbeddedDefaultConfigSource;

impl DefaultConfigSource for EmbeddedDefaultConfigSource {
    fn install(&self, target: &Path) -> io::Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, DEFAULT_CONFIG)
    }
}

/// Locates the platform-dependent config file path (spec.md §6.4).
pub trait ConfigLocator {
    fn locate(&self) -> PathBuf;
}

/// `$XDG_CONFIG_HOME/syncdetect/config` or `~/.config/syncdetect/config`.
pub struct UnixConfigLocator;

impl ConfigLocator for UnixConfigLocator {
    fn locate(&self) -> PathBuf {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("syncdetect").join("config")
    }
}

fn trim_blanks(s: &str) -> &str {
    s.trim_matches(|c| BLANKS.contains(&c))
}

fn is_comment(line: &str) -> bool {
    trim_blanks(line).starts_with('#')
}

/// Splits one line into a trimmed `(key, value)` pair, or `None` if the
/// line is blank, a comment, or has no `=` (all tolerated per spec.md
/// §4.2 — never an error).
fn parse_assignment(line: &str) -> Option<(String, String)> {
    let trimmed = trim_blanks(line);
    if trimmed.is_empty() || is_comment(trimmed) {
        return None;
    }
    let eq = trimmed.find('=')?;
    let key = trim_blanks(&trimmed[..eq]);
    let value = trim_blanks(&trimmed[eq + 1..]);
    if key.is_empty() {
        return None;
    }
    Some((key.to_owned(), value.to_owned()))
}

fn apply_assignment(tunables: &mut Tunables, key: &str, value: &str) {
    match key.to_ascii_lowercase().as_str() {
        "max_depth" => {
            if let Ok(v) = value.parse::<i64>() {
                if v > 0 {
                    tunables.max_dir_depth = v as u32;
                }
            }
        }
        "max_time_difference" => {
            if let Ok(v) = value.parse::<i64>() {
                if v >= 0 {
                    tunables.max_time_difference = v as u32;
                }
            }
        }
        "with_confilct_copies" => {
            tunables.with_conflict_copies = value.eq_ignore_ascii_case("yes");
        }
        other => {
            debug!("unsupported config option: {other}");
        }
    }
}

/// Parses config text into `tunables`, mutating only the fields named
/// by recognized, valid assignments. Never fails: malformed lines are
/// tolerated per spec.md §4.2.
pub fn parse_str(tunables: &mut Tunables, content: &str) {
    for line in content.lines() {
        if let Some((key, value)) = parse_assignment(line) {
            apply_assignment(tunables, &key, &value);
        }
    }
}

/// Parses the config file at `path`, installing the shipped default
/// first if it doesn't exist. Failure to install the default is fatal
/// (per spec.md §4.2); failure to open an existing file is not — the
/// tunables are simply left unchanged.
pub fn parse_file(
    path: &Path,
    tunables: &mut Tunables,
    installer: &dyn DefaultConfigSource,
) -> Result<(), ConfigError> {
    if !path.exists() {
        installer
            .install(path)
            .map_err(|source| ConfigError::InstallDefault {
                path: path.to_path_buf(),
                source,
            })?;
    }
    match fs::read_to_string(path) {
        Ok(content) => {
            parse_str(tunables, &content);
            Ok(())
        }
        Err(_) => Ok(()),
    }
}
