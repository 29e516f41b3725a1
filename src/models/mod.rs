use crate::error::CfError;
use indexmap::IndexMap;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single observed (user, item, rating) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user: String,
    pub item: String,
    pub rating: f64,
}

impl Rating {
    pub fn new(user: impl Into<String>, item: impl Into<String>, rating: f64) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            rating,
        }
    }
}

/// A (user, item) pair to predict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub user: String,
    pub item: String,
}

/// Ratings and the dense indices of the counterparts they were exchanged with.
///
/// Both sequences only grow together, so position `k` always refers to the
/// same observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    ratings: Vec<f64>,
    counterparts: Vec<usize>,
}

impl Observations {
    pub fn push(&mut self, counterpart: usize, rating: f64) {
        self.counterparts.push(counterpart);
        self.ratings.push(rating);
    }

    pub fn ratings(&self) -> &[f64] {
        &self.ratings
    }

    pub fn counterparts(&self) -> &[usize] {
        &self.counterparts
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

/// A latent vector together with the observations needed to train it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainableRecord {
    pub latent: DVector<f64>,
    pub observations: Observations,
}

impl TrainableRecord {
    pub fn new(latent: DVector<f64>) -> Self {
        Self {
            latent,
            observations: Observations::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFactors {
    pub theta: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFactors {
    pub x: Vec<f64>,
}

/// Exported latent state keyed by raw identifier, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub theta: IndexMap<String, UserFactors>,
    pub x: IndexMap<String, ItemFactors>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub users: Vec<String>,
    pub items: Vec<String>,
}

/// Exported latent state keyed by dense index, plus the tables that map the
/// indices back to identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedSnapshot {
    pub theta: IndexMap<String, UserFactors>,
    pub x: IndexMap<String, ItemFactors>,
    pub meta: SnapshotMeta,
}

/// Either snapshot layout, as read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotFile {
    Indexed(IndexedSnapshot),
    Keyed(Snapshot),
}

impl SnapshotFile {
    /// Parses either layout; a top-level `meta` key selects the indexed one so
    /// that field-level errors name the offending field.
    pub fn from_json(json: &str) -> Result<Self, CfError> {
        let malformed = |e: serde_json::Error| CfError::MalformedSnapshot(e.to_string());
        let value: serde_json::Value = serde_json::from_str(json).map_err(malformed)?;
        if value.get("meta").is_some() {
            serde_json::from_value(value)
                .map(SnapshotFile::Indexed)
                .map_err(malformed)
        } else {
            serde_json::from_value(value)
                .map(SnapshotFile::Keyed)
                .map_err(malformed)
        }
    }

    /// Length of the first latent vector in the file, if it has any.
    pub fn dimension(&self) -> Option<usize> {
        let (theta, x) = match self {
            SnapshotFile::Indexed(s) => (s.theta.values().next(), s.x.values().next()),
            SnapshotFile::Keyed(s) => (s.theta.values().next(), s.x.values().next()),
        };
        theta
            .map(|f| f.theta.len())
            .or_else(|| x.map(|f| f.x.len()))
    }
}

impl From<Snapshot> for SnapshotFile {
    fn from(snapshot: Snapshot) -> Self {
        SnapshotFile::Keyed(snapshot)
    }
}

impl From<IndexedSnapshot> for SnapshotFile {
    fn from(snapshot: IndexedSnapshot) -> Self {
        SnapshotFile::Indexed(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictedValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for PredictedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictedValue::Number(value) => write!(f, "{}", value),
            PredictedValue::Text(text) => f.write_str(text),
        }
    }
}

/// One row of a prediction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub user: String,
    pub item: String,
    pub predicted: Option<PredictedValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    User,
    Item,
    Predicted,
}

impl FromStr for SortKey {
    type Err = CfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(SortKey::User),
            "item" => Ok(SortKey::Item),
            "predicted" => Ok(SortKey::Predicted),
            other => Err(CfError::InvalidArgument(format!(
                "unknown sort key `{}`",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl FromStr for SortOrder {
    type Err = CfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desc" => Ok(SortOrder::Desc),
            "asc" => Ok(SortOrder::Asc),
            other => Err(CfError::InvalidArgument(format!(
                "unknown sort order `{}`",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations_stay_parallel() {
        let mut observations = Observations::default();
        observations.push(3, 5.0);
        observations.push(1, 0.0);

        assert_eq!(observations.len(), 2);
        assert_eq!(observations.ratings(), &[5.0, 0.0]);
        assert_eq!(observations.counterparts(), &[3, 1]);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("predicted".parse::<SortKey>().unwrap(), SortKey::Predicted);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
        assert!(matches!(
            "rating".parse::<SortKey>(),
            Err(CfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_snapshot_file_detects_layout() {
        let keyed = r#"{"theta":{"alice":{"theta":[0.5,0.25]}},"x":{"movie":{"x":[1.0,2.0]}}}"#;
        let indexed = r#"{"theta":{"0":{"theta":[0.5,0.25]}},"x":{"0":{"x":[1.0,2.0]}},
            "meta":{"users":["alice"],"items":["movie"]}}"#;

        assert!(matches!(
            serde_json::from_str::<SnapshotFile>(keyed).unwrap(),
            SnapshotFile::Keyed(_)
        ));
        assert!(matches!(
            SnapshotFile::from_json(keyed).unwrap(),
            SnapshotFile::Keyed(_)
        ));
        assert!(matches!(
            SnapshotFile::from_json(indexed).unwrap(),
            SnapshotFile::Indexed(_)
        ));
    }

    #[test]
    fn test_snapshot_errors_name_the_field() {
        match SnapshotFile::from_json(r#"{"theta":{}}"#) {
            Err(CfError::MalformedSnapshot(msg)) => {
                assert!(msg.contains("missing field `x`"), "{}", msg)
            }
            other => panic!("unexpected {:?}", other),
        }

        let bad_meta = r#"{"theta":{},"x":{},"meta":{"items":[]}}"#;
        match SnapshotFile::from_json(bad_meta) {
            Err(CfError::MalformedSnapshot(msg)) => {
                assert!(msg.contains("missing field `users`"), "{}", msg)
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            SnapshotFile::from_json("not json"),
            Err(CfError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_file_dimension() {
        let keyed = r#"{"theta":{"alice":{"theta":[0.5,0.25,0.0]}},"x":{}}"#;
        assert_eq!(SnapshotFile::from_json(keyed).unwrap().dimension(), Some(3));

        let items_only = r#"{"theta":{},"x":{"0":{"x":[1.0]}},"meta":{"users":[],"items":["movie"]}}"#;
        assert_eq!(SnapshotFile::from_json(items_only).unwrap().dimension(), Some(1));

        let empty = r#"{"theta":{},"x":{}}"#;
        assert_eq!(SnapshotFile::from_json(empty).unwrap().dimension(), None);
    }
}
