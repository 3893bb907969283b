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

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OdinHotspotError>;

#[derive(Error,Debug)]
pub enum OdinHotspotError {

    /// the archive index page could not be retrieved
    #[error("fetch error {0}")]
    FetchError(String),

    /// a single archive could not be (completely) downloaded
    #[error("download error {0}")]
    DownloadError(String),

    #[error("extraction error {0}")]
    ExtractionError(String),

    /// lists *all* required shapefile components that were not found
    #[error("missing required shapefile components {0:?}")]
    MissingComponentError(Vec<String>),

    #[error("invalid shapefile component name {0}")]
    InvalidComponentName(String),

    #[error("parse error {0}")]
    ParseError(String),

    /// fatal - we could not get a datastore connection within the retry budget
    #[error("datastore {target} not reachable after {attempts} attempts: {last_error}")]
    ConnectionExhausted { attempts: u32, target: String, last_error: String },

    /// fatal - the datastore went away while we were using it
    #[error("datastore unavailable {0}")]
    StoreUnavailable(String),

    #[error("datastore error {0}")]
    StoreError( #[from] sqlx::Error),

    #[error("config error {0}")]
    ConfigError(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("http error {0}")]
    HttpError( #[from] reqwest::Error),

    #[error("URL error {0}")]
    UrlError( #[from] url::ParseError),

    #[error("JSON error {0}")]
    JsonError( #[from] serde_json::Error),

    #[error("RON error {0}")]
    RonError( #[from] ron::error::SpannedError),

    /// a generic error
    #[error("operation failed {0}")]
    OpFailed(String)
}

impl OdinHotspotError {
    /// errors that terminate the whole ingestion run, not just the year in progress
    pub fn is_fatal (&self)->bool {
        matches!( self, OdinHotspotError::ConnectionExhausted{..} | OdinHotspotError::StoreUnavailable(_))
    }
}

pub fn op_failed (msg: impl ToString)->OdinHotspotError {
    OdinHotspotError::OpFailed(msg.to_string())
}

pub fn config_error (msg: impl ToString)->OdinHotspotError {
    OdinHotspotError::ConfigError(msg.to_string())
}

macro_rules! parse_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinHotspotError::ParseError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use parse_error;

macro_rules! download_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinHotspotError::DownloadError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use download_error;
