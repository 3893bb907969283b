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

use std::{io::Write, path::{Path,PathBuf}, time::Duration};
use reqwest::{Client, StatusCode};
use tracing::info;

use crate::{errors::{download_error, OdinHotspotError, Result}, year_filter::ArchiveReference};

/// the HTTP client we use for index and archive retrieval
pub fn http_client (timeout: Duration)->Result<Client> {
    Ok( Client::builder().timeout(timeout).build()? )
}

/// download one archive into `download_dir`. The file only shows up under its final name once it
/// is complete - partial downloads are removed. There is no retry at this level
pub async fn download_archive (client: &Client, archive: &ArchiveReference, download_dir: &Path)->Result<PathBuf> {
    std::fs::create_dir_all(download_dir).map_err(|e| download_error!("cannot create download dir {:?}: {}", download_dir, e))?;
    let path = download_dir.join( &archive.filename);
    info!("downloading {}..", archive.url);

    let mut response = client.get( archive.url.clone()).send().await
        .map_err(|e| download_error!("{}: {}", archive.url, e))?;

    if response.status() != StatusCode::OK {
        return Err( download_error!("{}: request failed with status {}", archive.url, response.status().as_u16()))
    }
    let expected_len = response.content_length();

    // don't use path yet as that would expose partial downloads
    let mut file = tempfile::NamedTempFile::new_in(download_dir).map_err(|e| download_error!("{}: {}", archive.url, e))?;
    let mut len: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(|e| download_error!("{}: {}", archive.url, e))? {
        len += chunk.len() as u64;
        file.write_all(&chunk).map_err(|e| download_error!("{}: incomplete write: {}", archive.url, e))?;
    }
    file.flush().map_err(|e| download_error!("{}: incomplete write: {}", archive.url, e))?;

    if len == 0 {
        return Err( download_error!("{}: empty archive", archive.url))
    }
    if let Some(expected) = expected_len {
        if expected != len {
            return Err( download_error!("{}: incomplete download ({len} of {expected} bytes)", archive.url))
        }
    }

    file.persist(&path).map_err(|e| download_error!("cannot save {:?}: {}", path, e.error))?;
    info!("{} kB saved to {:?}", len / 1024, path);
    Ok(path)
}
