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

use std::{collections::BTreeSet, fs::{self,File}, path::{Path,PathBuf}};
use serde::Serialize;
use tracing::{debug, info};
use zip::read::ZipArchive;

use crate::errors::{OdinHotspotError, Result};

/// what we got out of one archive
#[derive(Debug,Clone,Serialize)]
pub struct ExtractionResult {
    pub staging_dir: PathBuf,
    pub files: BTreeSet<String>,
}

/// the extraction directory of an archive, named after the archive file stem (e.g. "2021_hotspots").
/// Archives of the same year never share a staging dir
pub fn staging_dir_for (staging_root: &Path, archive_filename: &str)->PathBuf {
    let stem = Path::new(archive_filename).file_stem().unwrap_or( archive_filename.as_ref());
    staging_root.join( stem)
}

/// unpack `zip_path` into a fresh `<staging_root>/<archive stem>/` directory. Note this is blocking
pub fn extract_archive (zip_path: &Path, staging_root: &Path)->Result<ExtractionResult> {
    let filename = zip_path.file_name().and_then(|f| f.to_str())
        .ok_or_else(|| OdinHotspotError::ExtractionError( format!("{zip_path:?}: not an archive file")))?;

    let staging_dir = staging_dir_for( staging_root, filename);
    if staging_dir.is_dir() {
        debug!("clearing old staging dir {:?}", staging_dir);
        fs::remove_dir_all(&staging_dir)?;
    }
    fs::create_dir_all(&staging_dir)?;

    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| OdinHotspotError::ExtractionError( format!("{zip_path:?}: {e}")))?;

    let files: BTreeSet<String> = archive.file_names()
        .filter( |name| !name.ends_with('/'))
        .map( |name| name.to_string())
        .collect();

    archive.extract(&staging_dir)
        .map_err(|e| OdinHotspotError::ExtractionError( format!("{zip_path:?}: {e}")))?;

    info!("extracted {} files from {:?} into {:?}", files.len(), zip_path, staging_dir);
    Ok( ExtractionResult { staging_dir, files } )
}

/// remove an archive's staging dir once we don't need it anymore
pub fn remove_staging_dir (result: &ExtractionResult)->Result<()> {
    if result.staging_dir.is_dir() {
        fs::remove_dir_all( &result.staging_dir)?;
    }
    Ok(())
}
