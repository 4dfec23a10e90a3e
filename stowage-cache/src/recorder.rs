//! Value cache that keeps track of its own calls.
//!
//! Every [`Recorder::store`] call bumps a counter named after the operation
//! (`Cache.store`), appends its JSON-encoded arguments to
//! `Cache.store:inputs` and the key it returned to `Cache.store:outputs`.
//! [`Recorder::replay`] reads both lists back.
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::{AbstractStore, CacheError};

/// Qualified name `store` calls are counted and recorded under.
pub const STORE_METHOD: &str = "Cache.store";

/// A value accepted by [`Recorder::store`]. Written to the store as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredValue::Str(s) => f.write_str(s),
            StoredValue::Int(n) => write!(f, "{}", n),
            // `{:?}` keeps the fraction (`2.0`), matching the JSON history.
            StoredValue::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// Integers first, then floats, anything else stays text.
impl FromStr for StoredValue {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(StoredValue::Int(n));
        }
        match raw.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(StoredValue::Float(x)),
            _ => Ok(StoredValue::Str(raw.to_string())),
        }
    }
}

impl From<&str> for StoredValue {
    fn from(value: &str) -> Self {
        StoredValue::Str(value.to_string())
    }
}

impl From<String> for StoredValue {
    fn from(value: String) -> Self {
        StoredValue::Str(value)
    }
}

impl From<i64> for StoredValue {
    fn from(value: i64) -> Self {
        StoredValue::Int(value)
    }
}

impl From<f64> for StoredValue {
    fn from(value: f64) -> Self {
        StoredValue::Float(value)
    }
}

fn inputs_key(method: &str) -> String {
    format!("{}:inputs", method)
}

fn outputs_key(method: &str) -> String {
    format!("{}:outputs", method)
}

pub struct Recorder {
    store: AbstractStore,
}

impl Recorder {
    /// Wraps `store` and flushes its current database.
    pub async fn new(store: AbstractStore) -> Result<Self, CacheError> {
        store.flush().await?;
        Ok(Self { store })
    }

    /// Store `data` under a fresh random key and return that key.
    pub async fn store(
        &self,
        data: impl Into<StoredValue>,
    ) -> Result<String, CacheError> {
        let data = data.into();
        self.store.incr(STORE_METHOD).await?;

        let inputs = serde_json::to_string(&[&data])?;
        self.store.rpush(&inputs_key(STORE_METHOD), &inputs).await?;

        let key = Uuid::new_v4().to_string();
        self.store.set(&key, &data.to_string()).await?;
        debug!("Stored value under {}", key);

        self.store.rpush(&outputs_key(STORE_METHOD), &key).await?;
        Ok(key)
    }

    /// Raw value at `key`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.store.get(key).await
    }

    /// Value at `key` passed through `convert`.
    pub async fn get_with<T, F>(
        &self,
        key: &str,
        convert: F,
    ) -> Result<Option<T>, CacheError>
    where
        F: FnOnce(String) -> Result<T, CacheError>,
    {
        self.store.get(key).await?.map(convert).transpose()
    }

    pub async fn get_str(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.get_with(key, Ok).await
    }

    pub async fn get_int(&self, key: &str) -> Result<Option<i64>, CacheError> {
        self.get_with(key, |raw| {
            raw.parse::<i64>().map_err(|e| {
                CacheError::Conversion(format!("{:?} is not an integer: {}", raw, e))
            })
        })
        .await
    }

    /// How many times `method` was called, zero if never.
    pub async fn call_count(&self, method: &str) -> Result<i64, CacheError> {
        self.get_int(method).await.map(|count| count.unwrap_or(0))
    }

    /// Recorded calls of `method`, in call order.
    pub async fn replay(&self, method: &str) -> Result<Replay, CacheError> {
        let inputs = self.store.lrange_all(&inputs_key(method)).await?;
        let outputs = self.store.lrange_all(&outputs_key(method)).await?;

        Ok(Replay {
            method: method.to_string(),
            times: inputs.len(),
            calls: inputs.into_iter().zip(outputs).collect(),
        })
    }
}

/// Call history of one operation.
///
/// Renders as
/// ```text
/// Cache.store was called 2 times:
/// Cache.store(*["foo"]) -> 3f6c...
/// Cache.store(*[42]) -> 9b1a...
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub method: String,
    /// Number of recorded inputs.
    pub times: usize,
    /// (inputs, output) pairs. A call still in flight has an input but no
    /// output and is left out.
    pub calls: Vec<(String, String)>,
}

impl fmt::Display for Replay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} was called {} times:", self.method, self.times)?;
        for (input, output) in &self.calls {
            write!(f, "\n{}(*{}) -> {}", self.method, input, output)?;
        }
        Ok(())
    }
}
