/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the config file (installed with defaults if missing).
    /// Defaults to the platform config directory (spec.md §6.4) when
    /// omitted.
    #[arg(long)]
    pub config_path: Option<String>,

    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(Debug, PartialEq, Clone, Subcommand)]
#[clap(rename_all = "kebab_case")]
pub enum Mode {
    /// Walk both replicas and report the detected instructions as JSON
    Walk {
        /// Local replica root
        #[arg(short, long)]
        local_root: String,
        /// Remote replica root
        #[arg(short, long)]
        remote_root: String,
        /// Prior-sync state database, JSON (omit for first-sync semantics)
        #[arg(short, long)]
        state_db: Option<String>,
        /// Regex patterns excluded from both replicas
        #[arg(short, long)]
        exclude: Vec<String>,
    },
    /// Run the clock-skew probe between the two replica roots
    Probe {
        /// Local replica root
        #[arg(short, long)]
        local_root: String,
        /// Remote replica root
        #[arg(short, long)]
        remote_root: String,
    },
    /// Parse (and if missing, install) the config file, printing the
    /// resolved tunables
    ConfigCheck,
}
