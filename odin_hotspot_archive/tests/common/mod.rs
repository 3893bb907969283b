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
#![allow(unused)]

//! test fixtures: point shapefiles, zipped archives and a local archive server

use std::{io::Write, net::SocketAddr, path::Path, time::Duration};
use axum::{routing::get, Router};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use odin_hotspot_archive::{HotspotArchiveConfig, RetryPolicy};

/// one test hotspot
#[derive(Debug,Clone)]
pub struct Hotspot {
    pub lon: f64,
    pub lat: f64,
    pub cfb: f64,
    pub rep_date: &'static str, // 10 chars
}

pub fn hotspots_2021 ()->Vec<Hotspot> {
    vec![
        Hotspot { lon: -120.5, lat: 50.25, cfb: 0.5, rep_date: "2021/06/01" },
        Hotspot { lon: -121.0, lat: 51.0, cfb: 2.0, rep_date: "2021/06/01" },
        Hotspot { lon: -119.75, lat: 49.5, cfb: 6.0, rep_date: "2021/06/02" },
    ]
}

/* #region shapefile triple *************************************************************************/

const POINT_TYPE: i32 = 1;
const POINT_RECORD_WORDS: i32 = 10; // shape type + x + y
const SHP_RECORD_BYTES: usize = 8 + 2 * POINT_RECORD_WORDS as usize;

fn main_header (file_words: i32, hs: &[Hotspot])->Vec<u8> {
    let mut buf = Vec::with_capacity(100);
    buf.extend_from_slice( &9994i32.to_be_bytes());
    buf.extend_from_slice( &[0u8; 20]);
    buf.extend_from_slice( &file_words.to_be_bytes());
    buf.extend_from_slice( &1000i32.to_le_bytes());
    buf.extend_from_slice( &POINT_TYPE.to_le_bytes());

    let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for h in hs {
        x0 = x0.min(h.lon); y0 = y0.min(h.lat); x1 = x1.max(h.lon); y1 = y1.max(h.lat);
    }
    if hs.is_empty() { (x0,y0,x1,y1) = (0.0,0.0,0.0,0.0) }
    for v in [x0,y0,x1,y1, 0.0,0.0,0.0,0.0] {
        buf.extend_from_slice( &v.to_le_bytes());
    }
    buf
}

pub fn shp_bytes (hs: &[Hotspot])->Vec<u8> {
    let file_words = (100 + hs.len() * SHP_RECORD_BYTES) as i32 / 2;
    let mut buf = main_header( file_words, hs);

    for (i,h) in hs.iter().enumerate() {
        buf.extend_from_slice( &(i as i32 + 1).to_be_bytes());
        buf.extend_from_slice( &POINT_RECORD_WORDS.to_be_bytes());
        buf.extend_from_slice( &POINT_TYPE.to_le_bytes());
        buf.extend_from_slice( &h.lon.to_le_bytes());
        buf.extend_from_slice( &h.lat.to_le_bytes());
    }
    buf
}

pub fn shx_bytes (hs: &[Hotspot])->Vec<u8> {
    let file_words = (100 + hs.len() * 8) as i32 / 2;
    let mut buf = main_header( file_words, hs);

    for i in 0..hs.len() {
        let offset_words = (100 + i * SHP_RECORD_BYTES) as i32 / 2;
        buf.extend_from_slice( &offset_words.to_be_bytes());
        buf.extend_from_slice( &POINT_RECORD_WORDS.to_be_bytes());
    }
    buf
}

// (name, type, length, decimals)
const DBF_FIELDS: [(&str,u8,u8,u8);4] = [
    ("lat", b'N', 12, 5),
    ("lon", b'N', 12, 5),
    ("cfb", b'N', 10, 4),
    ("rep_date", b'C', 10, 0),
];

/// dBase III attribute table with lat, lon, cfb and rep_date fields
pub fn dbf_bytes (hs: &[Hotspot])->Vec<u8> {
    let header_len = 32 + 32 * DBF_FIELDS.len() + 1;
    let record_len = 1 + DBF_FIELDS.iter().map(|f| f.2 as usize).sum::<usize>();

    let mut buf = Vec::new();
    buf.push(0x03);
    buf.extend_from_slice( &[125, 1, 1]); // last update 2025-01-01
    buf.extend_from_slice( &(hs.len() as u32).to_le_bytes());
    buf.extend_from_slice( &(header_len as u16).to_le_bytes());
    buf.extend_from_slice( &(record_len as u16).to_le_bytes());
    buf.extend_from_slice( &[0u8; 20]);

    for (name,ftype,len,decimals) in DBF_FIELDS {
        let mut fname = [0u8; 11];
        fname[..name.len()].copy_from_slice( name.as_bytes());
        buf.extend_from_slice( &fname);
        buf.push(ftype);
        buf.extend_from_slice( &[0u8; 4]);
        buf.push(len);
        buf.push(decimals);
        buf.extend_from_slice( &[0u8; 14]);
    }
    buf.push(0x0d);

    for h in hs {
        buf.push(b' ');
        buf.extend_from_slice( format!("{:>12.5}", h.lat).as_bytes());
        buf.extend_from_slice( format!("{:>12.5}", h.lon).as_bytes());
        buf.extend_from_slice( format!("{:>10.4}", h.cfb).as_bytes());
        buf.extend_from_slice( format!("{:<10}", h.rep_date).as_bytes());
    }
    buf.push(0x1a);
    buf
}

/// the (filename,content) components of a year's shapefile triple
pub fn shapefile_components (year: i32, hs: &[Hotspot])->Vec<(String,Vec<u8>)> {
    vec![
        (format!("{year}_hotspots.shp"), shp_bytes(hs)),
        (format!("{year}_hotspots.shx"), shx_bytes(hs)),
        (format!("{year}_hotspots.dbf"), dbf_bytes(hs)),
    ]
}

pub fn write_components (dir: &Path, components: &[(String,Vec<u8>)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name,data) in components {
        std::fs::write( dir.join(name), data).unwrap();
    }
}

/* #endregion shapefile triple */

/// zip archive bytes for the given (filename,content) entries
pub fn zip_bytes (entries: &[(String,Vec<u8>)])->Vec<u8> {
    let mut zip = ZipWriter::new( std::io::Cursor::new( Vec::new()));
    let opts = SimpleFileOptions::default().compression_method( CompressionMethod::Stored);

    for (name,data) in entries {
        zip.start_file( name.as_str(), opts).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn year_archive (year: i32, hs: &[Hotspot])->Vec<u8> {
    zip_bytes( &shapefile_components( year, hs))
}

pub fn index_html (filenames: &[&str])->String {
    let mut html = String::from("<html><head><title>Index of /archive</title></head><body>\n<a href=\"../\">Parent Directory</a>\n");
    for f in filenames {
        html.push_str( &format!("<a href=\"{f}\">{f}</a>  2024-01-01 12:00  1.2M\n"));
    }
    html.push_str("</body></html>\n");
    html
}

/// serve an index page at "/archive/" linking all given archives, which are served as "/archive/<name>".
/// Returns the index URL
pub async fn serve_archives (archives: Vec<(String,Vec<u8>)>)->String {
    let names: Vec<&str> = archives.iter().map(|(n,_)| n.as_str()).collect();
    let html = index_html( &names);

    let mut router = Router::new().route( "/archive/", get( move || { let html = html.clone(); async move { axum::response::Html(html) } }));
    for (name,data) in archives {
        router = router.route( &format!("/archive/{name}"), get( move || { let data = data.clone(); async move { data } }));
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn( async move { axum::serve( listener, router).await.unwrap() });

    format!("http://{addr}/archive/")
}

/// a config for runs against a local server and temp dirs
pub fn test_config (base_url: &str, root: &Path, start_year: i32, end_year: i32)->HotspotArchiveConfig {
    let mut config = HotspotArchiveConfig::default();
    config.base_url = base_url.to_string();
    config.start_year = start_year;
    config.end_year = end_year;
    config.download_dir = root.join("downloads");
    config.staging_dir = root.join("extracted_data");
    config.store.uri = sqlite_url(root);
    config.http_timeout = Duration::from_secs(10);
    config.retry = RetryPolicy::constant( 2, Duration::from_millis(10));
    config
}

pub fn sqlite_url (dir: &Path)->String {
    format!("sqlite://{}", dir.join("hotspots.db").display())
}
