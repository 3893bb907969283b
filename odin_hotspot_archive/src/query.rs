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

//! read interface for stored hotspots, as used by map displays

use std::collections::BTreeSet;
use serde::{Deserialize,Serialize};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};
use tracing::warn;

use crate::{
    errors::Result,
    shape_reader::AttrValue,
    store::{classify_store_error, StoreHandle},
    writer::{check_partition_base, partition_name}
};

/// attribute names of the values we need for display
#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(default)]
pub struct QueryFields {
    pub lat: String,
    pub lon: String,
    /// crown fraction burned
    pub intensity: String,
    /// what we select by (e.g. report date)
    pub selection: String,
}

impl Default for QueryFields {
    fn default() -> Self {
        QueryFields {
            lat: "lat".to_string(),
            lon: "lon".to_string(),
            intensity: "cfb".to_string(),
            selection: "rep_date".to_string(),
        }
    }
}

/// display class of a hotspot intensity value
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum IntensityBand {
    Low,
    Moderate,
    High,
    Severe,
}

impl IntensityBand {
    pub fn from_intensity (v: f64)->Self {
        if v < 1.0 { IntensityBand::Low }
        else if v < 3.0 { IntensityBand::Moderate }
        else if v < 5.0 { IntensityBand::High }
        else { IntensityBand::Severe }
    }

    pub fn color (&self)->&'static str {
        match self {
            IntensityBand::Low => "green",
            IntensityBand::Moderate => "yellow",
            IntensityBand::High => "orange",
            IntensityBand::Severe => "red",
        }
    }

    pub fn legend ()->[(IntensityBand,&'static str);4] {
        [
            (IntensityBand::Low, "< 1"),
            (IntensityBand::Moderate, "1 - 2.9"),
            (IntensityBand::High, "3 - 4.9"),
            (IntensityBand::Severe, ">= 5"),
        ]
    }
}

#[derive(Debug,Clone,PartialEq,Serialize)]
pub struct HotspotMarker {
    pub lat: f64,
    pub lon: f64,
    pub intensity: f64,
    pub band: IntensityBand,
}

/// hotspots of `year`, optionally restricted to records whose `fields.selection` attribute equals `selector`.
/// The selection is done by the datastore. Records without usable position or intensity are skipped.
/// Markers are in insertion order
pub async fn query_hotspots (handle: &StoreHandle, base: &str, year: i32, fields: &QueryFields, selector: Option<&str>)->Result<Vec<HotspotMarker>> {
    check_partition_base(base)?;
    let name = partition_name( base, year);
    if !partition_exists( handle, &name).await? { return Ok(Vec::new()) }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT attrs -> ");
    qb.push_bind( attr_path(&fields.lat)).push(" AS alat, attrs -> ")
      .push_bind( attr_path(&fields.lon)).push(" AS alon, attrs -> ")
      .push_bind( attr_path(&fields.intensity)).push(" AS aint, lon, lat FROM ")
      .push( format!(r#""{name}""#));

    if let Some(sel) = selector {
        let path = attr_path(&fields.selection);
        qb.push(" WHERE (json_extract(attrs, ").push_bind( path.clone()).push(") = ").push_bind( sel.to_string())
          .push(" OR json_extract(attrs, ").push_bind( path.clone()).push(") = ").push_bind( selector_number(sel));
        if sel == "true" || sel == "false" {
            // booleans are only distinguishable by their JSON type
            qb.push(" OR json_type(attrs, ").push_bind( path).push(") = ").push_bind( sel.to_string());
        }
        qb.push(")");
    }
    qb.push(" ORDER BY id");

    let rows = qb.build().fetch_all( handle.pool()).await.map_err(classify_store_error)?;
    let mut markers = Vec::with_capacity( rows.len());

    for row in rows {
        let lon_col: Option<f64> = row.try_get("lon")?;
        let lat_col: Option<f64> = row.try_get("lat")?;
        let lat = json_column( &row, "alat")?.and_then(|v| v.as_f64()).or(lat_col);
        let lon = json_column( &row, "alon")?.and_then(|v| v.as_f64()).or(lon_col);
        let intensity = json_column( &row, "aint")?.and_then(|v| v.as_f64());

        match (lat,lon,intensity) {
            (Some(lat),Some(lon),Some(intensity)) => {
                markers.push( HotspotMarker { lat, lon, intensity, band: IntensityBand::from_intensity(intensity) })
            }
            _ => warn!("skipping incomplete hotspot record in {name}")
        }
    }

    Ok(markers)
}

/// all values of attribute `field` in a partition (e.g. the available report dates)
pub async fn distinct_values (handle: &StoreHandle, base: &str, year: i32, field: &str)->Result<Vec<String>> {
    check_partition_base(base)?;
    let name = partition_name( base, year);
    if !partition_exists( handle, &name).await? { return Ok(Vec::new()) }

    let path = attr_path(field);
    let rows = sqlx::query( &format!(r#"SELECT DISTINCT attrs -> ? AS v FROM "{name}" WHERE json_type(attrs, ?) <> 'null'"#))
        .bind( path.clone())
        .bind( path)
        .fetch_all( handle.pool()).await.map_err(classify_store_error)?;

    // different JSON texts can denote the same value (e.g. 2021 and 2021.0)
    let mut values: BTreeSet<String> = BTreeSet::new();
    for row in rows {
        if let Some(key) = json_column( &row, "v")?.as_ref().and_then( attr_key) {
            values.insert(key);
        }
    }
    Ok( values.into_iter().collect() )
}

/// number of records stored for `year` (0 if there is no partition yet)
pub async fn count_records (handle: &StoreHandle, base: &str, year: i32)->Result<i64> {
    check_partition_base(base)?;
    let name = partition_name( base, year);

    if !partition_exists( handle, &name).await? { return Ok(0) }

    let row = sqlx::query( &format!(r#"SELECT COUNT(*) AS n FROM "{name}""#))
        .fetch_one( handle.pool()).await.map_err(classify_store_error)?;
    Ok( row.try_get("n")? )
}

pub async fn partition_exists (handle: &StoreHandle, name: &str)->Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(name)
        .fetch_one( handle.pool()).await.map_err(classify_store_error)?;
    let n: i64 = row.try_get("n")?;
    Ok( n > 0 )
}

/// JSON path of a top level attribute
fn attr_path (field: &str)->String {
    format!("$.\"{field}\"")
}

fn selector_number (selector: &str)->Option<f64> {
    selector.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// decode a column that holds the JSON text of an attribute value (NULL if the attribute is missing)
fn json_column (row: &SqliteRow, col: &str)->Result<Option<AttrValue>> {
    let json: Option<String> = row.try_get(col)?;
    match json {
        Some(s) => Ok( Some( serde_json::from_str(&s)?)),
        None => Ok(None)
    }
}

fn attr_key (v: &AttrValue)->Option<String> {
    match v {
        AttrValue::Text(s) => Some(s.clone()),
        AttrValue::Number(x) => Some(x.to_string()),
        AttrValue::Bool(b) => Some(b.to_string()),
        AttrValue::Null => None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_bands() {
        assert_eq!( IntensityBand::from_intensity(0.0), IntensityBand::Low);
        assert_eq!( IntensityBand::from_intensity(0.99), IntensityBand::Low);
        assert_eq!( IntensityBand::from_intensity(1.0), IntensityBand::Moderate);
        assert_eq!( IntensityBand::from_intensity(2.9), IntensityBand::Moderate);
        assert_eq!( IntensityBand::from_intensity(3.0), IntensityBand::High);
        assert_eq!( IntensityBand::from_intensity(4.99), IntensityBand::High);
        assert_eq!( IntensityBand::from_intensity(5.0), IntensityBand::Severe);
        assert_eq!( IntensityBand::from_intensity(100.0).color(), "red");
    }

    #[test]
    fn test_selection_keys() {
        assert_eq!( attr_path("rep_date"), r#"$."rep_date""#);
        assert_eq!( selector_number("2021"), Some(2021.0));
        assert_eq!( selector_number(" 0.5"), Some(0.5));
        assert_eq!( selector_number("2021/06/01"), None);
        assert_eq!( selector_number("NaN"), None);

        assert_eq!( attr_key( &AttrValue::Number(2021.0)).as_deref(), Some("2021"));
        assert_eq!( attr_key( &AttrValue::Bool(true)).as_deref(), Some("true"));
        assert_eq!( attr_key( &AttrValue::Null), None);
    }
}
