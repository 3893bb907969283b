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

//! module to retrieve archive URLs from a server directory listing

use std::collections::HashSet;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::errors::{OdinHotspotError, Result};

lazy_static! {
    // we only need link targets, e.g. <a href="2021_hotspots.zip">2021_hotspots.zip</a>
    static ref HREF_RE: Regex = Regex::new( r#"(?i)<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap();
}

/// get all archive URLs linked from the directory listing at `base_url`.
/// An empty listing is not an error
pub async fn list_archive_urls (client: &Client, base_url: &str, suffix: &str)->Result<Vec<Url>> {
    let base = Url::parse(base_url)?;
    info!("retrieving archive index {}", base);

    let response = client.get( base.clone()).send().await
        .map_err(|e| OdinHotspotError::FetchError( format!("{base}: {e}")))?;

    match response.status() {
        StatusCode::OK => {
            let html = response.text().await
                .map_err(|e| OdinHotspotError::FetchError( format!("{base}: {e}")))?;
            let urls = parse_archive_links( &html, &base, suffix);
            info!("found {} archives in {}", urls.len(), base);
            Ok(urls)
        }
        code => Err( OdinHotspotError::FetchError( format!("{base}: request failed with status {}", code.as_u16())))
    }
}

/// extract (absolute) link targets ending in `suffix` from an HTML page, in document order and without duplicates
pub fn parse_archive_links (html: &str, base: &Url, suffix: &str)->Vec<Url> {
    let suffix = suffix.to_ascii_lowercase();
    let mut seen: HashSet<Url> = HashSet::new();
    let mut urls = Vec::new();

    for cap in HREF_RE.captures_iter(html) {
        let Some(href) = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)) else { continue };
        let href = href.as_str().trim();

        match base.join(href) {
            Ok(url) => {
                if url.path().to_ascii_lowercase().ends_with(&suffix) && seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
            Err(e) => debug!("ignoring unresolvable link {href:?}: {e}")
        }
    }

    urls
}
