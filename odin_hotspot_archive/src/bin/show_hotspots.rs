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

use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use odin_hotspot_archive::{
    connect_with_retry, load_config, HotspotArchiveConfig, SqliteConnector, StoreHandle,
    query::{count_records, distinct_values, query_hotspots, IntensityBand},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "list stored hotspots of a year with their display class")]
pub struct Args {
    /// RON config file (defaults are used if not set)
    #[arg(short,long)]
    pub config: Option<PathBuf>,

    #[arg(short,long)]
    pub year: i32,

    /// only show hotspots with this selection attribute value (e.g. report date)
    #[arg(short,long)]
    pub select: Option<String>,

    /// list the distinct values of the selection attribute instead of hotspots
    #[arg(short,long)]
    pub distinct: bool,
}

#[tokio::main]
async fn main ()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let mut config: HotspotArchiveConfig = match &args.config {
        Some(path) => load_config( path)?,
        None => HotspotArchiveConfig::default()
    };
    config.apply_env_overrides()?;

    let handle = connect_with_retry( &SqliteConnector::from_config( &config.store), &config.retry).await?;
    let res = show( &handle, &config, &args).await;
    handle.close().await;

    Ok(res?)
}

async fn show (handle: &StoreHandle, config: &HotspotArchiveConfig, args: &Args)->odin_hotspot_archive::Result<()> {
    let base = &config.store.partition_base;
    let fields = &config.query;

    if args.distinct {
        for v in distinct_values( handle, base, args.year, &fields.selection).await? {
            println!("{v}");
        }
        return Ok(())
    }

    let n_total = count_records( handle, base, args.year).await?;
    let markers = query_hotspots( handle, base, args.year, fields, args.select.as_deref()).await?;

    println!("{} of {} hotspots in {}_{}", markers.len(), n_total, base, args.year);
    for m in &markers {
        println!("{:>10.5} {:>11.5}  {:>6.2}  {:?} ({})", m.lat, m.lon, m.intensity, m.band, m.band.color());
    }

    println!("\n{}:", fields.intensity);
    for (band,range) in IntensityBand::legend() {
        println!("  {:<8} {:<7} {}", format!("{band:?}"), band.color(), range);
    }
    Ok(())
}
