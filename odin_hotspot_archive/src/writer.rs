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

//! bulk insert of hotspot records into year partitions (one table per year)

use lazy_static::lazy_static;
use regex::Regex;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info};

use crate::{
    errors::{config_error, Result},
    shape_reader::HotspotRecord,
    store::{classify_store_error, StoreHandle}
};

// keep the number of bound parameters per statement (3 per row) below the sqlite limit
const MAX_ROWS_PER_STATEMENT: usize = 300;

lazy_static! {
    static ref IDENT_RE: Regex = Regex::new( r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug,Clone)]
pub struct WriteOptions {
    pub batch_size: usize,
    pub persist_geometry: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions { batch_size: 1000, persist_geometry: false }
    }
}

/// partition names have to be plain identifiers since they end up in SQL statements
pub fn check_partition_base (base: &str)->Result<()> {
    if IDENT_RE.is_match(base) { Ok(()) } else { Err( config_error( format!("invalid partition base name {base:?}"))) }
}

pub fn partition_name (base: &str, year: i32)->String {
    format!("{base}_{year}")
}

/// insert all records of `year` within a single transaction, which also creates the partition table
/// if it does not exist yet. Records are appended - there is no de-duplication, i.e. writing the same
/// year twice stores every record twice.
/// If the record sequence fails nothing is committed, not even the partition table.
pub async fn write_partition<I> (handle: &StoreHandle, base: &str, year: i32, records: I, opts: &WriteOptions)->Result<usize>
    where I: Iterator<Item=Result<HotspotRecord>>
{
    check_partition_base(base)?;
    let name = partition_name( base, year);
    let rows_per_stmt = opts.batch_size.clamp( 1, MAX_ROWS_PER_STATEMENT);

    // take the write lock up front so that concurrent writers queue on the busy timeout
    let mut tx = handle.pool().begin_with("BEGIN IMMEDIATE").await.map_err(classify_store_error)?;
    create_partition( &mut tx, &name).await?;

    let mut batch: Vec<(String,Option<f64>,Option<f64>)> = Vec::with_capacity(rows_per_stmt);
    let mut n_written = 0;

    for rec in records {
        let rec = rec?;
        let attrs = serde_json::to_string( &rec.attributes)?;
        let (lon,lat) = if opts.persist_geometry { (Some(rec.geometry.lon), Some(rec.geometry.lat)) } else { (None,None) };
        batch.push( (attrs,lon,lat));

        if batch.len() >= rows_per_stmt {
            n_written += insert_batch( &mut tx, &name, &mut batch).await?;
        }
    }
    if !batch.is_empty() {
        n_written += insert_batch( &mut tx, &name, &mut batch).await?;
    }

    tx.commit().await.map_err(classify_store_error)?;
    info!("{n_written} records written to {name}");

    Ok(n_written)
}

async fn create_partition (tx: &mut sqlx::Transaction<'_,Sqlite>, name: &str)->Result<()> {
    let sql = format!(
        r#"CREATE TABLE IF NOT EXISTS "{name}" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            attrs TEXT NOT NULL,
            lon REAL,
            lat REAL
        )"#);
    sqlx::query(&sql).execute( &mut **tx).await.map_err(classify_store_error)?;
    Ok(())
}

async fn insert_batch (tx: &mut sqlx::Transaction<'_,Sqlite>, name: &str, batch: &mut Vec<(String,Option<f64>,Option<f64>)>)->Result<usize> {
    let n = batch.len();
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new( format!(r#"INSERT INTO "{name}" (attrs, lon, lat) "#));
    qb.push_values( batch.drain(..), |mut b, (attrs,lon,lat)| {
        b.push_bind(attrs).push_bind(lon).push_bind(lat);
    });
    qb.build().execute( &mut **tx).await.map_err(classify_store_error)?;

    debug!("inserted batch of {n} into {name}");
    Ok(n)
}
