//! Statistics over Nginx access logs stored one request per document
//! (`method`, `path`, `ip`).
use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{self, Document, doc},
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MongoError;

/// Methods reported by [`LogStats`], in display order.
pub const HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpCount {
    /// `None` for requests logged without an address.
    #[serde(rename = "_id")]
    pub ip: Option<String>,
    pub count: i64,
}

pub fn top_ips_pipeline(limit: i64) -> Vec<Document> {
    vec![
        doc! { "$group": { "_id": "$ip", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1 } },
        doc! { "$limit": limit },
    ]
}

/// The `limit` addresses with the most requests, busiest first.
pub async fn top_ips(
    collection: &Collection<Document>,
    limit: i64,
) -> Result<Vec<IpCount>, MongoError> {
    let docs: Vec<Document> = collection
        .aggregate(top_ips_pipeline(limit))
        .await?
        .try_collect()
        .await?;

    docs.into_iter()
        .map(|doc| bson::from_document(doc).map_err(MongoError::from))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStats {
    pub total: u64,
    /// Count per entry of [`HTTP_METHODS`], same order.
    pub methods: Vec<(String, u64)>,
    /// `GET /status` requests.
    pub status_checks: u64,
    pub top_n: i64,
    pub top_ips: Vec<IpCount>,
}

impl LogStats {
    pub async fn collect(
        collection: &Collection<Document>,
        top_n: i64,
    ) -> Result<Self, MongoError> {
        let total = collection.count_documents(doc! {}).await?;

        let mut methods = Vec::with_capacity(HTTP_METHODS.len());
        for method in HTTP_METHODS {
            let count = collection
                .count_documents(doc! { "method": method })
                .await?;
            methods.push((method.to_string(), count));
        }

        let status_checks = collection
            .count_documents(doc! { "method": "GET", "path": "/status" })
            .await?;

        let top_ips = top_ips(collection, top_n).await?;
        tracing::debug!("Collected stats over {} log entries", total);

        Ok(Self {
            total,
            methods,
            status_checks,
            top_n,
            top_ips,
        })
    }
}

impl fmt::Display for LogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} logs", self.total)?;
        writeln!(f, "HTTP Methods:")?;
        for (method, count) in &self.methods {
            writeln!(f, "\t{}: {}", method, count)?;
        }
        writeln!(f, "{} status checks", self.status_checks)?;
        write!(f, "Top {} IPs:", self.top_n)?;
        for entry in &self.top_ips {
            write!(
                f,
                "\n\t{}: {}",
                entry.ip.as_deref().unwrap_or("None"),
                entry.count
            )?;
        }
        Ok(())
    }
}
