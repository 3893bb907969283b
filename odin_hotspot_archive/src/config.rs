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

//! configuration of hotspot archive ingestion runs

use std::{path::{Path,PathBuf}, time::Duration};
use serde::{Deserialize,Serialize};

use crate::{errors::{config_error, Result}, query::QueryFields, store::RetryPolicy, year_filter::YearRange};

pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_START_YEAR: &str = "START_YEAR";
pub const ENV_END_YEAR: &str = "END_YEAR";
pub const ENV_STORE_URI: &str = "STORE_URI";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_COLLECTION_NAME: &str = "COLLECTION_NAME";

/// general archive server / ingestion parameters
#[derive(Clone,Serialize,Deserialize,Debug)]
#[serde(default)]
pub struct HotspotArchiveConfig {
    /// URL of the directory listing that links the yearly archives (e.g. https://cwfis.cfs.nrcan.gc.ca/downloads/hotspots/archive/)
    pub base_url: String,

    /// suffix of archive links in the directory listing
    pub archive_suffix: String,

    /// first year to ingest (inclusive)
    pub start_year: i32,

    /// last year to ingest (inclusive)
    pub end_year: i32,

    pub store: StoreConfig,

    /// how to retry datastore connections
    pub retry: RetryPolicy,

    /// where downloaded archives are kept (one per year)
    pub download_dir: PathBuf,

    /// root of per-year extraction directories
    pub staging_dir: PathBuf,

    /// filename stem of the shapefile components within an archive. "${year}" is expanded
    pub shapefile_stem: String,

    pub http_timeout: Duration,
    pub extract_timeout: Duration,

    /// max time to write one year into the datastore
    pub store_timeout: Duration,

    /// number of years we process concurrently (1 means strictly sequential)
    pub max_concurrent_years: usize,

    /// number of records per insert batch
    pub batch_size: usize,

    /// remove an archive's staging dir once its year is written
    pub cleanup_staging: bool,

    /// should failed years make the process exit with a non-zero status
    pub fail_on_year_error: bool,

    /// attribute names used by the read interface
    pub query: QueryFields,
}

impl Default for HotspotArchiveConfig {
    fn default() -> Self {
        HotspotArchiveConfig {
            base_url: "https://cwfis.cfs.nrcan.gc.ca/downloads/hotspots/archive/".to_string(),
            archive_suffix: ".zip".to_string(),
            start_year: 2020,
            end_year: 2023,
            store: StoreConfig::default(),
            retry: RetryPolicy::default(),
            download_dir: PathBuf::from("downloads"),
            staging_dir: PathBuf::from("extracted_data"),
            shapefile_stem: "${year}_hotspots".to_string(),
            http_timeout: Duration::from_secs(300),
            extract_timeout: Duration::from_secs(120),
            store_timeout: Duration::from_secs(600),
            max_concurrent_years: 1,
            batch_size: 1000,
            cleanup_staging: false,
            fail_on_year_error: false,
            query: QueryFields::default(),
        }
    }
}

impl HotspotArchiveConfig {
    pub fn year_range (&self)->Result<YearRange> {
        YearRange::new( self.start_year, self.end_year)
    }

    /// check settings that would otherwise only fail deep inside a run
    pub fn validate (&self)->Result<()> {
        self.year_range()?;
        crate::writer::check_partition_base( &self.store.partition_base)?;
        if self.base_url.is_empty() { return Err( config_error("no base_url")) }
        if self.max_concurrent_years == 0 { return Err( config_error("max_concurrent_years has to be > 0")) }
        if self.batch_size == 0 { return Err( config_error("batch_size has to be > 0")) }
        if self.retry.max_attempts == 0 { return Err( config_error("retry.max_attempts has to be > 0")) }
        Ok(())
    }

    /// override settings from the process environment. Unparsable numeric values are config errors
    pub fn apply_env_overrides (&mut self)->Result<()> {
        self.apply_overrides( |key| std::env::var(key).ok())
    }

    /// override settings from a generic key lookup (keys are the ENV_.. constants)
    pub fn apply_overrides<F> (&mut self, lookup: F)->Result<()> where F: Fn(&str)->Option<String> {
        if let Some(v) = lookup(ENV_BASE_URL) { self.base_url = v }
        if let Some(v) = lookup(ENV_START_YEAR) { self.start_year = parse_year( ENV_START_YEAR, &v)? }
        if let Some(v) = lookup(ENV_END_YEAR) { self.end_year = parse_year( ENV_END_YEAR, &v)? }
        if let Some(v) = lookup(ENV_STORE_URI) { self.store.uri = v }
        if let Some(v) = lookup(ENV_DB_NAME) { self.store.db_name = v }
        if let Some(v) = lookup(ENV_COLLECTION_NAME) { self.store.partition_base = v }
        Ok(())
    }
}

fn parse_year (key: &str, v: &str)->Result<i32> {
    v.trim().parse::<i32>().map_err(|_| config_error( format!("{key} is not a year: {v:?}")))
}

#[derive(Clone,Serialize,Deserialize,Debug)]
#[serde(default)]
pub struct StoreConfig {
    /// sqlite location, either a directory URI (e.g. "sqlite://data") or a full "*.db" URI
    pub uri: String,

    /// database name, used as filename within a directory `uri`
    pub db_name: String,

    /// year partitions are named "<partition_base>_<year>"
    pub partition_base: String,

    pub max_connections: u32,

    /// also store the parsed point geometry with each record
    pub persist_geometry: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            uri: "sqlite://data".to_string(),
            db_name: "wildfire_db".to_string(),
            partition_base: "hotspots".to_string(),
            max_connections: 4,
            persist_geometry: false,
        }
    }
}

impl StoreConfig {
    /// the sqlx connection URL for this store
    pub fn connection_url (&self)->String {
        if self.uri.ends_with(".db") || self.uri.contains(":memory:") {
            self.uri.clone()
        } else {
            format!("{}/{}.db", self.uri.trim_end_matches('/'), self.db_name)
        }
    }
}

pub fn load_config<T> (path: impl AsRef<Path>)->Result<T> where T: for<'a> Deserialize<'a> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .map_err(|e| config_error( format!("cannot read config {path:?}: {e}")))?;
    Ok( ron::from_str(&s)? )
}
