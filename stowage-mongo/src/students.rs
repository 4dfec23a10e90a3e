use futures::TryStreamExt;
use mongodb::{
    Collection,
    bson::{self, Bson, Document, doc},
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MongoError;

/// A student with the mean of their topic scores.
///
/// Both fields come back null from the aggregation when the documents lack
/// them, e.g. topics without a `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAverage {
    #[serde(rename = "_id")]
    pub id: Bson,
    pub name: Option<String>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<f64>,
}

/// `name: average`, with `None` standing in for missing values.
impl fmt::Display for StudentAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name.as_deref().unwrap_or("None"))?;
        match self.average_score {
            Some(score) => write!(f, "{}", score),
            None => f.write_str("None"),
        }
    }
}

pub fn top_students_pipeline() -> Vec<Document> {
    vec![
        doc! { "$unwind": "$topics" },
        doc! {
            "$group": {
                "_id": "$_id",
                "name": { "$first": "$name" },
                "averageScore": { "$avg": "$topics.score" },
            }
        },
        doc! { "$sort": { "averageScore": -1 } },
    ]
}

/// All students that have topics, best average score first.
pub async fn top_students(
    collection: &Collection<Document>,
) -> Result<Vec<StudentAverage>, MongoError> {
    let docs: Vec<Document> = collection
        .aggregate(top_students_pipeline())
        .await?
        .try_collect()
        .await?;

    docs.into_iter()
        .map(|doc| bson::from_document(doc).map_err(MongoError::from))
        .collect()
}
