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

//! per-year status records of an ingestion run

use std::{fmt, path::Path};
use chrono::{DateTime,Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{errors::{OdinHotspotError, Result}, year_filter::ArchiveReference};

/// processing state of a single year. Years only become `Written` once their insert is committed
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize)]
pub enum YearState {
    Pending,
    Downloaded,
    Extracted,
    Validated,
    Parsed,
    Written,
    Failed,
    Cancelled,
}

/// the pipeline stage in which a year failed
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize)]
pub enum YearStage {
    Download,
    Extract,
    Validate,
    Parse,
    Write,
}

impl fmt::Display for YearStage {
    fn fmt (&self, f: &mut fmt::Formatter<'_>)->fmt::Result {
        fmt::Debug::fmt( self, f)
    }
}

#[derive(Debug,Clone,Serialize)]
pub struct YearFailure {
    pub stage: YearStage,
    pub reason: String,
}

#[derive(Debug,Clone,Serialize)]
pub struct YearOutcome {
    pub year: i32,
    pub url: String,
    pub filename: String,
    pub state: YearState,
    /// last state reached before a failure or cancellation
    pub reached: YearState,
    /// records announced by the shapefile index
    pub declared: usize,
    /// records committed to the datastore
    pub written: usize,
    pub failure: Option<YearFailure>,
}

impl YearOutcome {
    pub fn new (archive: &ArchiveReference)->Self {
        YearOutcome {
            year: archive.year,
            url: archive.url.to_string(),
            filename: archive.filename.clone(),
            state: YearState::Pending,
            reached: YearState::Pending,
            declared: 0,
            written: 0,
            failure: None
        }
    }

    pub fn advance (&mut self, state: YearState) {
        self.state = state;
        self.reached = state;
    }

    pub fn fail (&mut self, stage: YearStage, e: &OdinHotspotError) {
        self.state = YearState::Failed;
        self.failure = Some( YearFailure { stage, reason: e.to_string() });
    }

    pub fn cancel (&mut self) {
        self.state = YearState::Cancelled;
    }

    pub fn is_written (&self)->bool { self.state == YearState::Written }
    pub fn is_failed (&self)->bool { self.state == YearState::Failed }
}

#[derive(Debug,Clone,Serialize)]
pub struct IngestionReport {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub partition_base: String,
    pub years: Vec<YearOutcome>,
}

impl IngestionReport {
    pub fn n_written (&self)->usize { self.years.iter().filter(|y| y.is_written()).count() }
    pub fn n_failed (&self)->usize { self.years.iter().filter(|y| y.is_failed()).count() }
    pub fn n_records (&self)->usize { self.years.iter().map(|y| y.written).sum() }
    pub fn has_failures (&self)->bool { self.n_failed() > 0 }

    pub fn year (&self, year: i32)->Option<&YearOutcome> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn log_summary (&self) {
        for y in &self.years {
            match &y.failure {
                Some(f) => warn!( year = y.year, stage = %f.stage, "{}: failed after {:?}: {}", y.filename, y.reached, f.reason),
                None => info!( year = y.year, "{}: {:?}, {} records", y.filename, y.state, y.written)
            }
        }
        info!("{} years written ({} records), {} failed, in {} s",
              self.n_written(), self.n_records(), self.n_failed(), (self.finished - self.started).num_seconds());
    }

    pub fn save_json (&self, path: &Path)->Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write( path, json).map_err(OdinHotspotError::from)
    }
}
