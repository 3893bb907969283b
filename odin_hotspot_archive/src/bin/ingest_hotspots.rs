/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{path::PathBuf, process::ExitCode};
use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use odin_hotspot_archive::{load_config, HotspotArchiveConfig, IngestionOrchestrator, SqliteConnector};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "ingest yearly wildfire hotspot archives into the datastore")]
pub struct Args {
    /// RON config file (defaults are used if not set)
    #[arg(short,long)]
    pub config: Option<PathBuf>,

    #[arg(short,long)]
    pub start_year: Option<i32>,

    #[arg(short,long)]
    pub end_year: Option<i32>,

    /// URL of the archive directory listing
    #[arg(short,long)]
    pub base_url: Option<String>,

    /// max number of years processed concurrently
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// write the JSON run report to this file
    #[arg(short,long)]
    pub report: Option<PathBuf>,

    /// exit with status 1 if any year failed
    #[arg(long)]
    pub fail_on_year_error: bool,
}

#[tokio::main]
async fn main ()->ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("ingestion aborted: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run (args: Args)->Result<ExitCode> {
    let config = get_config( &args)?;
    let fail_on_year_error = config.fail_on_year_error;
    let connector = SqliteConnector::from_config( &config.store);

    let orchestrator = IngestionOrchestrator::new( config)?;

    let cancel = orchestrator.cancel_token();
    tokio::spawn( async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing years in progress..");
            cancel.cancel();
        }
    });

    let report = orchestrator.run( &connector).await?;
    report.log_summary();

    if let Some(path) = &args.report {
        report.save_json( path)?;
        info!("run report saved to {path:?}");
    }

    if fail_on_year_error && report.has_failures() {
        Ok( ExitCode::from(1))
    } else {
        Ok( ExitCode::SUCCESS)
    }
}

/// config file (or defaults) < environment < command line
fn get_config (args: &Args)->Result<HotspotArchiveConfig> {
    let mut config: HotspotArchiveConfig = match &args.config {
        Some(path) => load_config( path)?,
        None => HotspotArchiveConfig::default()
    };
    config.apply_env_overrides()?;

    if let Some(y) = args.start_year { config.start_year = y }
    if let Some(y) = args.end_year { config.end_year = y }
    if let Some(url) = &args.base_url { config.base_url = url.clone() }
    if let Some(n) = args.concurrent { config.max_concurrent_years = n }
    if args.fail_on_year_error { config.fail_on_year_error = true }

    Ok(config)
}
