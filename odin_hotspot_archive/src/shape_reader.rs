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

//! reading hotspot records from a point shapefile triple (.shx index, .shp geometry, .dbf attributes).
//!
//! All three components have to be present before any of them is parsed. The number of records has
//! to match the count declared by the .shx index. Records are produced lazily, hence a
//! [`HotspotRecords`] sequence can only be iterated once.

use std::{collections::{BTreeMap,HashMap}, fs::File, io::{BufReader,Read}, path::{Path,PathBuf}};
use serde::{Deserialize,Serialize};
use shapefile::{dbase::{Date,FieldValue,Record}, Shape};
use tracing::{debug, info};

use crate::errors::{parse_error, OdinHotspotError, Result};

pub const YEAR_FIELD: &str = "${year}";

const SHX_FILE_CODE: i32 = 9994;
const SHX_HEADER_LEN: u64 = 100;
const SHX_RECORD_LEN: u64 = 8;

/* #region record types *************************************************************************/

/// a scalar attribute value from the attribute table
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_f64 (&self)->Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Text(s) => s.trim().parse().ok(),
            _ => None
        }
    }

    pub fn as_str (&self)->Option<&str> {
        if let AttrValue::Text(s) = self { Some(s.as_str()) } else { None }
    }
}

/// geographic position in decimal degrees
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// shapefile points are (x,y) = (lon,lat)
    pub fn from_lon_lat (lon: f64, lat: f64)->Result<Self> {
        if lon.is_finite() && lat.is_finite() {
            Ok( GeoPoint { lat, lon } )
        } else {
            Err( parse_error!("non-finite point coordinates ({lon},{lat})"))
        }
    }
}

/// one hotspot as stored in the archive. Attributes are ordered by field name
#[derive(Debug,Clone,PartialEq,Serialize)]
pub struct HotspotRecord {
    pub attributes: BTreeMap<String,AttrValue>,
    pub geometry: GeoPoint,
}

/* #endregion record types */

/* #region component naming *********************************************************************/

/// the filenames of a shapefile triple
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct ShapeComponents {
    pub stem: String,
    pub index: String,       // .shx
    pub geometry: String,    // .shp
    pub attributes: String,  // .dbf
}

impl ShapeComponents {
    pub fn all (&self)->[&String;3] {
        [&self.index, &self.geometry, &self.attributes]
    }
}

/// expand the "${year}" field of a component stem template (e.g. "${year}_hotspots")
pub fn expand_stem (template: &str, year: i32)->String {
    template.replace( YEAR_FIELD, &year.to_string())
}

/// get the names of the three required components for a given filename stem
pub fn shape_components (stem: &str)->Result<ShapeComponents> {
    let is_valid = !stem.trim().is_empty()
        && stem.trim() == stem
        && !stem.contains(['/', '\\'])
        && !stem.contains("${")
        && !stem.ends_with('.')
        && stem != "..";

    if is_valid {
        Ok( ShapeComponents {
            stem: stem.to_string(),
            index: format!("{stem}.shx"),
            geometry: format!("{stem}.shp"),
            attributes: format!("{stem}.dbf"),
        })
    } else {
        Err( OdinHotspotError::InvalidComponentName( format!("{stem:?}")))
    }
}

pub fn year_components (template: &str, year: i32)->Result<ShapeComponents> {
    shape_components( &expand_stem( template, year))
}

/// return the names of all components that are not files in `dir`
pub fn missing_components (dir: &Path, components: &ShapeComponents)->Vec<String> {
    components.all().into_iter()
        .filter( |name| !dir.join(name.as_str()).is_file())
        .map( |name| name.to_string())
        .collect()
}

/* #endregion component naming */

/// number of records declared by a .shx index file header
pub fn declared_record_count (shx_path: &Path)->Result<usize> {
    let mut file = File::open(shx_path)?;
    let mut header = [0u8; SHX_HEADER_LEN as usize];
    file.read_exact(&mut header).map_err(|e| parse_error!("{shx_path:?}: truncated index header ({e})"))?;

    let file_code = i32::from_be_bytes( [header[0], header[1], header[2], header[3]]);
    if file_code != SHX_FILE_CODE {
        return Err( parse_error!("{shx_path:?}: not a shapefile index (file code {file_code})"))
    }

    // file length is given in 16bit words, including the header
    let n_words = i32::from_be_bytes( [header[24], header[25], header[26], header[27]]);
    let len = (n_words as i64) * 2;
    if len < SHX_HEADER_LEN as i64 || (len - SHX_HEADER_LEN as i64) % SHX_RECORD_LEN as i64 != 0 {
        return Err( parse_error!("{shx_path:?}: invalid index length {len}"))
    }

    Ok( ((len as u64 - SHX_HEADER_LEN) / SHX_RECORD_LEN) as usize )
}

type ShapeRecordResult = std::result::Result<(Shape,Record), shapefile::Error>;

/// validated reader for the shapefile triple of a given year
pub struct ShapeRecordReader {
    year: i32,
    shp_path: PathBuf,
    declared: usize,
    reader: shapefile::Reader<BufReader<File>,BufReader<File>>,
    consumed: bool,
}

impl ShapeRecordReader {

    /// check that all components for `year` are present in `dir` and open them.
    /// Fails with `MissingComponentError` (listing all missing files) before anything is parsed
    pub fn open (dir: &Path, year: i32, stem_template: &str)->Result<Self> {
        let components = year_components( stem_template, year)?;

        let missing = missing_components( dir, &components);
        if !missing.is_empty() {
            return Err( OdinHotspotError::MissingComponentError(missing))
        }

        let declared = declared_record_count( &dir.join( &components.index))?;
        let shp_path = dir.join( &components.geometry);
        let reader = shapefile::Reader::from_path(&shp_path)
            .map_err(|e| parse_error!("{shp_path:?}: {e}"))?;

        info!("year {year}: {shp_path:?} declares {declared} records");
        Ok( ShapeRecordReader { year, shp_path, declared, reader, consumed: false } )
    }

    pub fn year (&self)->i32 { self.year }

    pub fn declared_count (&self)->usize { self.declared }

    /// the single-pass record sequence. Can only be requested once
    pub fn records (&mut self)->Result<HotspotRecords<'_>> {
        if self.consumed {
            return Err( parse_error!("records of {:?} already consumed", self.shp_path))
        }
        self.consumed = true;

        Ok( HotspotRecords {
            source: self.shp_path.clone(),
            declared: self.declared,
            produced: 0,
            done: false,
            inner: Box::new( self.reader.iter_shapes_and_records()),
        })
    }
}

/// finite, non-restartable sequence of hotspot records. Errors terminate the sequence
pub struct HotspotRecords<'a> {
    source: PathBuf,
    declared: usize,
    produced: usize,
    done: bool,
    inner: Box<dyn Iterator<Item=ShapeRecordResult> + 'a>,
}

impl<'a> HotspotRecords<'a> {
    pub fn declared_count (&self)->usize { self.declared }
    pub fn produced_count (&self)->usize { self.produced }

    fn fail (&mut self, e: OdinHotspotError)->Option<Result<HotspotRecord>> {
        self.done = true;
        Some( Err(e))
    }
}

impl<'a> Iterator for HotspotRecords<'a> {
    type Item = Result<HotspotRecord>;

    fn next (&mut self)->Option<Self::Item> {
        if self.done { return None }

        if self.produced == self.declared {
            self.done = true;
            return match self.inner.next() {
                None => {
                    debug!("{:?}: all {} records read", self.source, self.produced);
                    None
                }
                Some(_) => Some( Err( parse_error!("{:?}: more records than the {} declared", self.source, self.declared)))
            }
        }

        match self.inner.next() {
            Some(Ok((shape,record))) => {
                match to_hotspot_record( shape, record) {
                    Ok(hs) => {
                        self.produced += 1;
                        Some(Ok(hs))
                    }
                    Err(e) => {
                        let e = parse_error!("{:?} record {}: {}", self.source, self.produced, e);
                        self.fail(e)
                    }
                }
            }
            Some(Err(e)) => {
                let e = parse_error!("{:?} record {}: {}", self.source, self.produced, e);
                self.fail(e)
            }
            None => {
                let e = parse_error!("{:?}: only {} of {} declared records", self.source, self.produced, self.declared);
                self.fail(e)
            }
        }
    }
}

fn to_hotspot_record (shape: Shape, record: Record)->Result<HotspotRecord> {
    let geometry = match shape {
        Shape::Point(p) => GeoPoint::from_lon_lat( p.x, p.y)?,
        Shape::PointM(p) => GeoPoint::from_lon_lat( p.x, p.y)?,
        Shape::PointZ(p) => GeoPoint::from_lon_lat( p.x, p.y)?,
        Shape::NullShape => return Err( parse_error!("null geometry")),
        _ => return Err( parse_error!("not a point geometry"))
    };

    let fields: HashMap<String,FieldValue> = HashMap::from(record);
    let attributes: BTreeMap<String,AttrValue> = fields.into_iter()
        .map( |(k,v)| (k, to_attr_value(v)))
        .collect();

    Ok( HotspotRecord { attributes, geometry } )
}

fn to_attr_value (v: FieldValue)->AttrValue {
    match v {
        FieldValue::Character(Some(s)) => AttrValue::Text(s),
        FieldValue::Numeric(Some(x)) => AttrValue::Number(x),
        FieldValue::Float(Some(x)) => AttrValue::Number(x as f64),
        FieldValue::Integer(i) => AttrValue::Number(i as f64),
        FieldValue::Double(x) => AttrValue::Number(x),
        FieldValue::Logical(Some(b)) => AttrValue::Bool(b),
        FieldValue::Currency(x) => AttrValue::Number(x),
        FieldValue::Memo(s) => AttrValue::Text(s),
        FieldValue::Date(Some(d)) => AttrValue::Text( iso_date(&d)),
        FieldValue::DateTime(dt) => {
            let t = dt.time();
            AttrValue::Text( format!("{}T{:02}:{:02}:{:02}", iso_date(&dt.date()), t.hours(), t.minutes(), t.seconds()))
        }
        FieldValue::Character(None) | FieldValue::Numeric(None) | FieldValue::Float(None)
        | FieldValue::Logical(None) | FieldValue::Date(None) => AttrValue::Null,
    }
}

fn iso_date (d: &Date)->String {
    format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())
}
