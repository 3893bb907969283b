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

//! select yearly archives by the year token that prefixes their filename (e.g. `2021_hotspots.zip`)

use serde::{Deserialize,Serialize};
use url::Url;

use crate::errors::{config_error, Result};

const YEAR_SEPARATOR: char = '_';

/// inclusive range of years
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub struct YearRange {
    start: i32,
    end: i32
}

impl YearRange {
    pub fn new (start: i32, end: i32)->Result<Self> {
        if start > end {
            Err( config_error( format!("invalid year range {start}..={end}")))
        } else {
            Ok( YearRange { start, end } )
        }
    }

    pub fn start (&self)->i32 { self.start }
    pub fn end (&self)->i32 { self.end }

    pub fn contains (&self, year: i32)->bool {
        self.start <= year && year <= self.end
    }
}

/// a yearly archive we want to ingest. The `year` is used for both the archive and its partition name
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct ArchiveReference {
    pub url: Url,
    pub year: i32,
    pub filename: String,
}

/// last (non-empty) path segment of a URL
pub fn url_filename (url: &Url)->Option<&str> {
    url.path_segments()
        .and_then( |segs| segs.filter(|s| !s.is_empty()).last())
}

/// the leading numeric token of a filename, or None if there is none
pub fn filename_year (filename: &str)->Option<i32> {
    let token = filename.split(YEAR_SEPARATOR).next()?;
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse::<i32>().ok()
    } else {
        None
    }
}

pub fn archive_year (url: &Url)->Option<i32> {
    url_filename(url).and_then( filename_year)
}

/// turn archive URLs into references for the years within `range`. URLs without a year token are skipped
pub fn filter_archives (urls: &[Url], range: &YearRange)->Vec<ArchiveReference> {
    urls.iter().filter_map( |url| {
        let filename = url_filename(url)?;
        let year = filename_year(filename)?;
        if range.contains(year) {
            Some( ArchiveReference { url: url.clone(), year, filename: filename.to_string() } )
        } else {
            None
        }
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_year() {
        assert_eq!( filename_year("2021_hotspots.zip"), Some(2021));
        assert_eq!( filename_year("1999_x"), Some(1999));
        assert_eq!( filename_year("hotspots_2021.zip"), None);
        assert_eq!( filename_year("_2021.zip"), None);
        assert_eq!( filename_year("2021.zip"), None); // no separator means the token is the whole name
        assert_eq!( filename_year("+2021_hotspots.zip"), None);
    }

    #[test]
    fn test_range() {
        assert!( YearRange::new(2023, 2020).is_err());
        let r = YearRange::new(2020, 2020).unwrap();
        assert!( r.contains(2020));
        assert!( !r.contains(2021));
    }
}
