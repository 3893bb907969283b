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

//! ingestion of yearly wildfire hotspot archives (zipped point shapefiles) into per-year
//! datastore partitions.
//!
//! A run lists the archive directory page, selects the archives of the configured year range and then
//! processes each year through download, extraction, shapefile validation and a single-transaction
//! write. Years fail individually, datastore loss aborts the run. The [`query`] module provides the
//! read side used for map displays.

mod errors;
pub use errors::*;

pub mod config;
pub use config::{load_config, HotspotArchiveConfig, StoreConfig};

pub mod year_filter;
pub use year_filter::{ArchiveReference, YearRange};

pub mod scraper;
pub mod fetcher;
pub mod extractor;

pub mod shape_reader;
pub use shape_reader::{AttrValue, GeoPoint, HotspotRecord, ShapeRecordReader};

pub mod store;
pub use store::{connect_with_retry, Backoff, RetryPolicy, SqliteConnector, StoreConnector, StoreHandle};

pub mod writer;
pub mod query;

pub mod report;
pub use report::{IngestionReport, YearOutcome, YearStage, YearState};

pub mod orchestrator;
pub use orchestrator::IngestionOrchestrator;
