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

mod common;

use odin_hotspot_archive::{
    shape_reader::declared_record_count, AttrValue, HotspotRecord, OdinHotspotError, Result, ShapeRecordReader
};

const STEM: &str = "${year}_hotspots";

#[test]
fn test_read_records() {
    let tmp = tempfile::tempdir().unwrap();
    let hs = common::hotspots_2021();
    common::write_components( tmp.path(), &common::shapefile_components( 2021, &hs));

    let mut reader = ShapeRecordReader::open( tmp.path(), 2021, STEM).unwrap();
    assert_eq!( reader.year(), 2021);
    assert_eq!( reader.declared_count(), 3);

    let records: Vec<HotspotRecord> = reader.records().unwrap().collect::<Result<Vec<_>>>().unwrap();
    for r in &records { println!("{r:?}") }
    assert_eq!( records.len(), 3);

    for (r,h) in records.iter().zip( hs.iter()) {
        assert_eq!( r.geometry.lon, h.lon);
        assert_eq!( r.geometry.lat, h.lat);
        assert_eq!( r.attributes.get("cfb").and_then(|v| v.as_f64()), Some(h.cfb));
        assert_eq!( r.attributes.get("lat").and_then(|v| v.as_f64()), Some(h.lat));
        assert_eq!( r.attributes.get("rep_date").and_then(|v| v.as_str()).map(|s| s.trim()), Some(h.rep_date));
    }

    // attributes are ordered by field name
    let keys: Vec<&str> = records[0].attributes.keys().map(|k| k.as_str()).collect();
    assert_eq!( keys, vec!["cfb", "lat", "lon", "rep_date"]);
}

#[test]
fn test_records_only_once() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_components( tmp.path(), &common::shapefile_components( 2021, &common::hotspots_2021()));

    let mut reader = ShapeRecordReader::open( tmp.path(), 2021, STEM).unwrap();
    let n = reader.records().unwrap().count();
    assert_eq!( n, 3);
    assert!( reader.records().is_err());
}

#[test]
fn test_empty_shapefile() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_components( tmp.path(), &common::shapefile_components( 2021, &[]));

    let mut reader = ShapeRecordReader::open( tmp.path(), 2021, STEM).unwrap();
    assert_eq!( reader.declared_count(), 0);
    assert_eq!( reader.records().unwrap().count(), 0);
}

#[test]
fn test_missing_attribute_file() {
    let tmp = tempfile::tempdir().unwrap();
    let components: Vec<(String,Vec<u8>)> = common::shapefile_components( 2021, &common::hotspots_2021()).into_iter()
        .filter( |(name,_)| !name.ends_with(".dbf"))
        .collect();
    common::write_components( tmp.path(), &components);

    match ShapeRecordReader::open( tmp.path(), 2021, STEM) {
        Err(OdinHotspotError::MissingComponentError(missing)) => assert_eq!( missing, vec!["2021_hotspots.dbf".to_string()]),
        Err(e) => panic!("wrong error: {e}"),
        Ok(_) => panic!("opened incomplete shapefile")
    }
}

#[test]
fn test_all_components_reported() {
    let tmp = tempfile::tempdir().unwrap();
    // components of the wrong year
    common::write_components( tmp.path(), &common::shapefile_components( 2021, &common::hotspots_2021()));

    match ShapeRecordReader::open( tmp.path(), 2022, STEM) {
        Err(OdinHotspotError::MissingComponentError(missing)) => {
            assert_eq!( missing.len(), 3);
            assert!( missing.contains( &"2022_hotspots.shx".to_string()));
            assert!( missing.contains( &"2022_hotspots.shp".to_string()));
            assert!( missing.contains( &"2022_hotspots.dbf".to_string()));
        }
        Err(e) => panic!("wrong error: {e}"),
        Ok(_) => panic!("opened non-existing shapefile")
    }
}

#[test]
fn test_invalid_index_header() {
    let tmp = tempfile::tempdir().unwrap();
    let mut shx = common::shx_bytes( &common::hotspots_2021());
    shx[3] = 0; // file code
    let path = tmp.path().join("bad.shx");
    std::fs::write( &path, shx).unwrap();
    assert!( matches!( declared_record_count(&path), Err(OdinHotspotError::ParseError(_))));

    std::fs::write( &path, [0u8; 20]).unwrap();
    assert!( matches!( declared_record_count(&path), Err(OdinHotspotError::ParseError(_))));
}

#[test]
fn test_truncated_geometry() {
    let tmp = tempfile::tempdir().unwrap();
    let hs = common::hotspots_2021();
    let mut components = common::shapefile_components( 2021, &hs);
    // the index declares three records but the geometry file only has two
    components[0].1 = common::shp_bytes( &hs[..2]);
    components[2].1 = common::dbf_bytes( &hs[..2]);
    common::write_components( tmp.path(), &components);

    let mut reader = ShapeRecordReader::open( tmp.path(), 2021, STEM).unwrap();
    assert_eq!( reader.declared_count(), 3);
    let res: Result<Vec<HotspotRecord>> = reader.records().unwrap().collect();
    assert!( matches!( res, Err(OdinHotspotError::ParseError(_))));
}
