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

//! datastore connections with bounded retry.
//!
//! Connections are obtained through a [`StoreConnector`] so that the retry logic does not depend on
//! the concrete datastore, and are handed out as an explicit [`StoreHandle`] that has to be closed
//! by whoever acquired it.

use std::{str::FromStr, time::Duration};
use async_trait::async_trait;
use serde::{Deserialize,Serialize};
use sqlx::{sqlite::{SqliteConnectOptions,SqlitePoolOptions}, SqlitePool};
use tracing::{error, info, warn};

use crate::{config::StoreConfig, errors::{OdinHotspotError, Result}};

/// how the delay between connection attempts grows
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub enum Backoff {
    Constant,
    Linear,
    Exponential(f64),
}

#[derive(Debug,Clone,Serialize,Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// total number of connection attempts (not retries)
    pub max_attempts: u32,
    /// base delay between attempts
    pub delay: Duration,
    pub backoff: Backoff,
    /// upper bound for computed delays
    pub max_delay: Duration,
    /// max time a single attempt may take
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(5),
            backoff: Backoff::Constant,
            max_delay: Duration::from_secs(300),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn constant (max_attempts: u32, delay: Duration)->Self {
        RetryPolicy { max_attempts, delay, backoff: Backoff::Constant, ..RetryPolicy::default() }
    }

    /// the delay after the given (1-based) failed attempt
    pub fn delay_after (&self, attempt: u32)->Duration {
        let n = attempt.max(1);
        let delay = match self.backoff {
            Backoff::Constant => self.delay,
            Backoff::Linear => self.delay.saturating_mul(n),
            Backoff::Exponential(factor) => {
                let secs = self.delay.as_secs_f64() * factor.max(1.0).powi( (n - 1) as i32);
                if secs.is_finite() && secs < self.max_delay.as_secs_f64() { Duration::from_secs_f64(secs) } else { self.max_delay }
            }
        };
        delay.min( self.max_delay)
    }
}

/// something that can establish a datastore connection (pool)
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// human readable description of what we connect to (used for logging)
    fn target (&self)->String;

    async fn connect (&self)->Result<SqlitePool>;
}

/// production connector for sqlite datastores
pub struct SqliteConnector {
    url: String,
    max_connections: u32,
}

impl SqliteConnector {
    pub fn new (url: impl ToString, max_connections: u32)->Self {
        SqliteConnector { url: url.to_string(), max_connections: max_connections.max(1) }
    }

    pub fn from_config (config: &StoreConfig)->Self {
        SqliteConnector::new( config.connection_url(), config.max_connections)
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    fn target (&self)->String { self.url.clone() }

    async fn connect (&self)->Result<SqlitePool> {
        let opts = SqliteConnectOptions::from_str( &self.url)?
            .create_if_missing(true)
            .busy_timeout( Duration::from_secs(30));

        // sqlite creates the db file but not its directory
        let parent = opts.get_filename().parent().filter( |dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            if !dir.is_dir() {
                info!("creating datastore directory {:?}", dir);
                std::fs::create_dir_all(dir)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections( self.max_connections)
            .acquire_timeout( Duration::from_secs(30))
            .connect_with(opts).await?;

        // make sure we really have a working connection
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(pool)
    }
}

/// an acquired datastore connection. Has to be released with [`StoreHandle::close`]
#[derive(Debug)]
pub struct StoreHandle {
    pool: SqlitePool,
    target: String,
    closed: bool,
}

impl StoreHandle {
    pub fn new (pool: SqlitePool, target: String)->Self {
        StoreHandle { pool, target, closed: false }
    }

    pub fn pool (&self)->&SqlitePool { &self.pool }

    pub fn target (&self)->&str { &self.target }

    pub async fn close (mut self) {
        self.pool.close().await;
        self.closed = true;
        info!("datastore connection to {} closed", self.target);
    }
}

impl Drop for StoreHandle {
    fn drop (&mut self) {
        if !self.closed {
            warn!("datastore handle for {} dropped without close", self.target);
        }
    }
}

/// try to connect up to `policy.max_attempts` times. Running out of attempts is fatal
pub async fn connect_with_retry (connector: &dyn StoreConnector, policy: &RetryPolicy)->Result<StoreHandle> {
    let target = connector.target();
    let mut last_error = String::from("no connection attempt");

    for attempt in 1..=policy.max_attempts {
        info!("attempt {attempt}: connecting to datastore {target}..");

        let res = match tokio::time::timeout( policy.attempt_timeout, connector.connect()).await {
            Ok(res) => res,
            Err(_) => Err( OdinHotspotError::Timeout( policy.attempt_timeout))
        };

        match res {
            Ok(pool) => {
                info!("connected to datastore {target}");
                return Ok( StoreHandle::new( pool, target))
            }
            Err(e) => {
                error!("attempt {attempt} failed: {e}");
                last_error = e.to_string();

                if attempt < policy.max_attempts {
                    let delay = policy.delay_after(attempt);
                    info!("retrying in {} ms..", delay.as_millis());
                    tokio::time::sleep(delay).await;
                } else {
                    error!("all {} connection attempts failed", policy.max_attempts);
                }
            }
        }
    }

    Err( OdinHotspotError::ConnectionExhausted { attempts: policy.max_attempts, target, last_error } )
}

/// map sqlx errors that indicate we lost the datastore to the (fatal) `StoreUnavailable`
pub fn classify_store_error (e: sqlx::Error)->OdinHotspotError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => OdinHotspotError::StoreUnavailable( e.to_string()),
        other => OdinHotspotError::StoreError(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff() {
        let p = RetryPolicy::constant( 5, Duration::from_secs(5));
        assert_eq!( p.delay_after(1), Duration::from_secs(5));
        assert_eq!( p.delay_after(4), Duration::from_secs(5));

        let p = RetryPolicy { backoff: Backoff::Linear, ..p };
        assert_eq!( p.delay_after(3), Duration::from_secs(15));

        let p = RetryPolicy { backoff: Backoff::Exponential(2.0), max_delay: Duration::from_secs(30), ..p };
        assert_eq!( p.delay_after(1), Duration::from_secs(5));
        assert_eq!( p.delay_after(3), Duration::from_secs(20));
        assert_eq!( p.delay_after(4), Duration::from_secs(30));
    }
}
