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

//! sequencing of the per-year ingestion pipeline
//!
//! ```diagram
//!   index ─> filter ─┬─> [download ─> extract ─> validate ─> parse+write]  year i
//!                    ├─> [download ─> extract ─> validate ─> parse+write]  year i+1
//!                    ┆        (at most `max_concurrent_years` at a time)
//! ```
//! Each year fails on its own. Only losing the datastore ends the whole run, in which case all
//! in-flight and queued years are cancelled.

use std::path::PathBuf;
use chrono::Utc;
use futures::{stream, StreamExt};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::HotspotArchiveConfig,
    errors::{op_failed, OdinHotspotError, Result},
    extractor::{extract_archive, remove_staging_dir, ExtractionResult},
    fetcher::{download_archive, http_client},
    report::{IngestionReport, YearOutcome, YearStage, YearState},
    scraper::list_archive_urls,
    shape_reader::ShapeRecordReader,
    store::{connect_with_retry, StoreConnector, StoreHandle},
    writer::{write_partition, WriteOptions},
    year_filter::{filter_archives, ArchiveReference},
};

type StageResult<T> = std::result::Result<T, (YearStage,OdinHotspotError)>;

pub struct IngestionOrchestrator {
    config: HotspotArchiveConfig,
    client: Client,
    cancel: CancellationToken,
}

impl IngestionOrchestrator {
    pub fn new (config: HotspotArchiveConfig)->Result<Self> {
        config.validate()?;
        let client = http_client( config.http_timeout)?;
        Ok( IngestionOrchestrator { config, client, cancel: CancellationToken::new() } )
    }

    pub fn config (&self)->&HotspotArchiveConfig { &self.config }

    /// token that interrupts the run (between stages) when cancelled
    pub fn cancel_token (&self)->CancellationToken { self.cancel.clone() }

    /// get the archive references for the configured year range from the index page
    pub async fn discover (&self)->Result<Vec<ArchiveReference>> {
        let urls = list_archive_urls( &self.client, &self.config.base_url, &self.config.archive_suffix).await?;
        let range = self.config.year_range()?;
        let archives = filter_archives( &urls, &range);
        info!("{} of {} archives within {}..={}", archives.len(), urls.len(), range.start(), range.end());
        Ok(archives)
    }

    /// the complete run: discover archives, connect to the datastore and ingest all years.
    /// The datastore connection is closed on every path once it was acquired
    pub async fn run (&self, connector: &dyn StoreConnector)->Result<IngestionReport> {
        let started = Utc::now();
        let archives = self.discover().await?;

        let handle = connect_with_retry( connector, &self.config.retry).await?;
        let res = self.ingest_archives( &handle, &archives).await;
        handle.close().await;

        Ok( IngestionReport {
            started,
            finished: Utc::now(),
            partition_base: self.config.store.partition_base.clone(),
            years: res?
        })
    }

    /// ingest the given archives using an already acquired datastore handle. Per-year failures are
    /// reported in the outcomes, fatal datastore errors are returned (after cancelling remaining years)
    pub async fn ingest_archives (&self, handle: &StoreHandle, archives: &[ArchiveReference])->Result<Vec<YearOutcome>> {
        let run_token = self.cancel.child_token();
        let mut indexed: Vec<(usize,YearOutcome)> = Vec::with_capacity( archives.len());
        let mut fatal: Option<OdinHotspotError> = None;

        {
            let mut results = stream::iter( archives.iter().enumerate())
                .map( |(i,archive)| {
                    let token = run_token.clone();
                    async move { (i, self.ingest_year( handle, archive, &token).await) }
                })
                .buffer_unordered( self.config.max_concurrent_years.max(1));

            while let Some((i,(outcome,err))) = results.next().await {
                if let Some(e) = err {
                    if fatal.is_none() {
                        error!("fatal datastore error in year {}, cancelling remaining years: {e}", outcome.year);
                        run_token.cancel();
                        fatal = Some(e);
                    }
                }
                indexed.push( (i,outcome));
            }
        }

        if let Some(e) = fatal {
            return Err(e)
        }

        indexed.sort_by_key( |(i,_)| *i);
        Ok( indexed.into_iter().map(|(_,o)| o).collect() )
    }

    /// run the pipeline for one year. The error part of the result is only set for fatal errors
    async fn ingest_year (&self, handle: &StoreHandle, archive: &ArchiveReference, token: &CancellationToken)->(YearOutcome,Option<OdinHotspotError>) {
        let mut outcome = YearOutcome::new(archive);
        let year = archive.year;
        info!( year, "processing {}", archive.url);

        match self.run_stages( handle, archive, token, &mut outcome).await {
            Ok(()) => {
                info!( year, "{} records written", outcome.written);
                (outcome, None)
            }
            Err((stage, OdinHotspotError::Cancelled)) => {
                warn!( year, %stage, "cancelled after {:?}", outcome.reached);
                outcome.cancel();
                (outcome, None)
            }
            Err((stage,e)) => {
                error!( year, %stage, "year failed: {e}");
                outcome.fail( stage, &e);
                if e.is_fatal() { (outcome, Some(e)) } else { (outcome, None) }
            }
        }
    }

    async fn run_stages (&self, handle: &StoreHandle, archive: &ArchiveReference, token: &CancellationToken, outcome: &mut YearOutcome)->StageResult<()> {
        let cfg = &self.config;
        let year = archive.year;

        check_cancelled( token, YearStage::Download)?;
        let zip_path = download_archive( &self.client, archive, &cfg.download_dir).await
            .map_err(|e| (YearStage::Download, e))?;
        outcome.advance( YearState::Downloaded);

        check_cancelled( token, YearStage::Extract)?;
        let extraction = self.extract( zip_path).await
            .map_err(|e| (YearStage::Extract, e))?;
        outcome.advance( YearState::Extracted);

        check_cancelled( token, YearStage::Validate)?;
        let mut reader = ShapeRecordReader::open( &extraction.staging_dir, year, &cfg.shapefile_stem)
            .map_err(|e| (YearStage::Validate, e))?;
        outcome.declared = reader.declared_count();
        outcome.advance( YearState::Validated);

        // from here on we do not interrupt - a year is either committed or not
        check_cancelled( token, YearStage::Parse)?;
        let mut records = reader.records().map_err(|e| (YearStage::Parse, e))?;
        let opts = WriteOptions { batch_size: cfg.batch_size, persist_geometry: cfg.store.persist_geometry };

        let res = tokio::time::timeout( cfg.store_timeout,
            write_partition( handle, &cfg.store.partition_base, year, &mut records, &opts)).await;

        match res {
            Ok(Ok(n)) => {
                if records.produced_count() == records.declared_count() { outcome.advance( YearState::Parsed) }
                outcome.written = n;
                outcome.advance( YearState::Written);
            }
            Ok(Err(e)) => {
                let stage = if matches!( e, OdinHotspotError::ParseError(_)) { YearStage::Parse } else { YearStage::Write };
                return Err( (stage, e))
            }
            Err(_) => return Err( (YearStage::Write, OdinHotspotError::Timeout( cfg.store_timeout)))
        }

        if cfg.cleanup_staging {
            if let Err(e) = remove_staging_dir( &extraction) {
                warn!( year, "failed to remove staging dir {:?}: {e}", extraction.staging_dir);
            }
        }
        Ok(())
    }

    async fn extract (&self, zip_path: PathBuf)->Result<ExtractionResult> {
        let staging_root = self.config.staging_dir.clone();
        let timeout = self.config.extract_timeout;

        let task = tokio::task::spawn_blocking( move || extract_archive( &zip_path, &staging_root));
        match tokio::time::timeout( timeout, task).await {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => Err( op_failed( format!("extraction task failed: {e}"))),
            Err(_) => Err( OdinHotspotError::Timeout(timeout))
        }
    }
}

fn check_cancelled (token: &CancellationToken, next: YearStage)->StageResult<()> {
    if token.is_cancelled() {
        debug!("cancellation requested before {next}");
        Err( (next, OdinHotspotError::Cancelled))
    } else {
        Ok(())
    }
}
