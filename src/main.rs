/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use log::{error, info};

use args::Args;
use config::{ConfigLocator, EmbeddedDefaultConfigSource, UnixConfigLocator};
use exclude::{ExcludeFilter, NoExclude, RegexExclude};
use model::{Context, Tunables};
use statedb::InMemoryStateDatabase;
use vio::LocalVio;

mod args;
mod config;
mod controller;
mod detector;
mod error;
mod exclude;
mod model;
mod path_hash;
mod statedb;
mod time_skew;
mod uri;
mod vio;
mod walker;

/// Resolves the config file path: the CLI flag if given, otherwise the
/// platform-dependent default location (spec.md §6.4).
fn config_path(explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(path) => PathBuf::from(path),
        None => UnixConfigLocator.locate(),
    }
}

fn main() {
    let status = run();
    if let Err(ref err) = status {
        error!("{:?}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    log4rs::init_file("log4rs.yml", Default::default()).with_context(|| "failed to init logger")?;
    info!("init logger");

    let config_path = config_path(args.config_path.as_deref());

    match args.mode {
        args::Mode::Walk {
            local_root,
            remote_root,
            state_db,
            exclude,
        } => {
            info!("walk '{local_root}' <-> '{remote_root}'");
            let mut ctx = Context::new(local_root, remote_root);

            let mut tunables = Tunables::default();
            config::parse_file(
                &config_path,
                &mut tunables,
                &EmbeddedDefaultConfigSource,
            )
            .with_context(|| "failed to load config")?;
            ctx.tunables = tunables;

            let vio = LocalVio::new();
            let exclude_filter: Box<dyn ExcludeFilter> = if exclude.is_empty() {
                Box::new(NoExclude)
            } else {
                Box::new(RegexExclude::new(&exclude).with_context(|| "invalid exclude pattern")?)
            };
            let statedb = match state_db {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read state database '{path}'"))?;
                    InMemoryStateDatabase::from_json(&json)
                        .with_context(|| format!("failed to parse state database '{path}'"))?
                }
                None => InMemoryStateDatabase::empty(),
            };

            let controller =
                controller::Controller::new(&vio, &vio, exclude_filter.as_ref(), &statedb);
            controller.run(&mut ctx)?;

            let output = serde_json::json!({
                "local": ctx.local.tree,
                "remote": ctx.remote.tree,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        args::Mode::Probe {
            local_root,
            remote_root,
        } => {
            info!("probe '{local_root}' <-> '{remote_root}'");
            let ctx = Context::new(local_root, remote_root);
            let vio = LocalVio::new();
            let diff = time_skew::probe(&ctx, &vio, &vio)?;
            println!("time difference: {diff}s (max allowed: {}s)", ctx.tunables.max_time_difference);
        }
        args::Mode::ConfigCheck => {
            let mut tunables = Tunables::default();
            config::parse_file(
                &config_path,
                &mut tunables,
                &EmbeddedDefaultConfigSource,
            )
            .with_context(|| "failed to load config")?;
            println!("{}", serde_json::to_string_pretty(&tunables)?);
        }
    }
    Ok(())
}
