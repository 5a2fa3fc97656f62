//! Fundamental data types: input records, weight sets, scored rows and tag summaries.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigError, EvalError};

/// Column name that resolves to the composite score of a row.
pub const SCORE_COLUMN: &str = "score";

/// Variant name synthesized for scalar candidates.
pub const SINGLE_VARIANT: &str = "single";

/// Delimiter used when a row's tags are flattened into one string.
pub const TAG_DELIMITER: char = ',';

/// The text(s) under evaluation for one record.
///
/// Numbers and booleans are accepted wherever text is expected and are
/// converted to their display form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Candidate {
    /// A single candidate text, scored as the variant `"single"`.
    Scalar(String),
    /// Named candidate texts, e.g. one per model under comparison. Variants
    /// keep the order in which they appear in the input.
    Named(IndexMap<String, String>),
}

impl<'de> Deserialize<'de> for Candidate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCandidate {
            Scalar(ScalarText),
            Named(IndexMap<String, ScalarText>),
        }

        Ok(match RawCandidate::deserialize(deserializer)? {
            RawCandidate::Scalar(text) => Candidate::Scalar(text.into_string()),
            RawCandidate::Named(map) => Candidate::Named(
                map.into_iter()
                    .map(|(name, text)| (name, text.into_string()))
                    .collect(),
            ),
        })
    }
}

impl Candidate {
    /// Expand into `(variant, text)` pairs in encounter order.
    pub fn variants(&self) -> Vec<(&str, &str)> {
        match self {
            Candidate::Scalar(text) => vec![(SINGLE_VARIANT, text.as_str())],
            Candidate::Named(map) => map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Candidate::Scalar(_) => 1,
            Candidate::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Candidate {
    fn from(text: &str) -> Self {
        Candidate::Scalar(text.to_string())
    }
}

/// One input unit: references, candidate(s) and tag labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(
        default,
        rename = "reference",
        alias = "references",
        deserialize_with = "deserialize_one_or_many"
    )]
    pub references: Vec<String>,
    pub candidate: Candidate,
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub tags: Vec<String>,
}

impl Record {
    pub fn new(id: impl Into<String>, references: Vec<String>, candidate: Candidate) -> Self {
        Self {
            id: id.into(),
            references,
            candidate,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// The record's tags flattened into the delimited form carried by scored rows.
    pub fn tag_string(&self) -> String {
        self.tags.join(&TAG_DELIMITER.to_string())
    }

    /// Check the record invariant: at least one candidate text.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.candidate.is_empty() {
            return Err(EvalError::InvalidRecord {
                id: self.id.clone(),
                reason: "no candidate text".to_string(),
            });
        }
        Ok(())
    }
}

/// A JSON scalar read as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ScalarText {
    fn into_string(self) -> String {
        match self {
            ScalarText::Text(s) => s,
            ScalarText::Int(i) => i.to_string(),
            ScalarText::Float(f) => f.to_string(),
            ScalarText::Bool(b) => b.to_string(),
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(ScalarText::deserialize(deserializer)?.into_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Mapping from metric name to a non-negative weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSet(BTreeMap<String, f64>);

impl WeightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.0.insert(name.into(), weight);
        self
    }

    /// Parse `name=value` pairs, as accepted on the command line.
    pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, ConfigError> {
        let mut weights = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair.split_once('=').ok_or_else(|| ConfigError::Invalid {
                message: format!("weight '{pair}' is not of the form name=value"),
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("weight '{pair}' has an empty metric name"),
                });
            }
            let value: f64 = value.trim().parse().map_err(|e| ConfigError::ParseError {
                message: format!("weight '{pair}': {e}"),
            })?;
            weights.0.insert(name.to_string(), value);
        }
        Ok(weights)
    }

    /// Reject negative or non-finite weights.
    pub fn validate(&self) -> Result<(), EvalError> {
        for (name, &value) in &self.0 {
            if !value.is_finite() || value < 0.0 {
                return Err(EvalError::InvalidWeight {
                    name: name.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Weights divided by their sum; all zero when the sum is zero.
    pub fn normalized(&self) -> BTreeMap<String, f64> {
        let total: f64 = self.0.values().sum();
        self.0
            .iter()
            .map(|(name, &w)| {
                let nw = if total > 0.0 { w / total } else { 0.0 };
                (name.clone(), nw)
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for WeightSet {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<BTreeMap<String, f64>> for WeightSet {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl fmt::Display for WeightSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Output of one (record, candidate variant) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    pub id: String,
    pub variant: String,
    /// Raw value of every requested metric, keyed by metric name.
    pub metrics: BTreeMap<String, f64>,
    /// Weighted composite score.
    pub score: f64,
    /// The record's tags, comma-delimited.
    pub tags: String,
}

impl ScoredRow {
    /// Look up a column: `"score"` is the composite, anything else a metric.
    pub fn value(&self, column: &str) -> Option<f64> {
        if column == SCORE_COLUMN {
            Some(self.score)
        } else {
            self.metrics.get(column).copied()
        }
    }

    /// Non-empty, trimmed tag tokens with duplicates removed.
    pub fn tag_tokens(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for token in self.tags.split(TAG_DELIMITER) {
            let token = token.trim();
            if !token.is_empty() && !out.contains(&token) {
                out.push(token);
            }
        }
        out
    }
}

/// Per-tag aggregate of one column over all rows carrying the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSummary {
    pub tag: String,
    pub mean: f64,
    pub lo: f64,
    pub hi: f64,
    pub n: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_scalar_candidate_from_json() {
        let rec: Record = serde_json::from_str(
            r#"{"id": 1, "reference": "the cat sat", "candidate": "the cat sat", "tags": ["easy"]}"#,
        )
        .unwrap();
        assert_eq!(rec.id, "1");
        assert_eq!(rec.references, vec!["the cat sat".to_string()]);
        assert_eq!(rec.candidate, Candidate::Scalar("the cat sat".into()));
        assert_eq!(rec.tags, vec!["easy".to_string()]);
    }

    #[test]
    fn test_record_named_candidates_and_missing_fields() {
        let rec: Record = serde_json::from_str(
            r#"{"id": "q7", "candidate": {"modelB": "bar", "modelA": "foo"}}"#,
        )
        .unwrap();
        assert!(rec.references.is_empty());
        assert!(rec.tags.is_empty());
        let variants = rec.candidate.variants();
        assert_eq!(variants, vec![("modelB", "bar"), ("modelA", "foo")]);
    }

    #[test]
    fn test_numeric_candidates_become_text() {
        let rec: Record =
            serde_json::from_str(r#"{"id": 4, "reference": "42", "candidate": 42}"#).unwrap();
        assert_eq!(rec.candidate, Candidate::Scalar("42".into()));

        let rec: Record =
            serde_json::from_str(r#"{"id": 5, "candidate": 0.5}"#).unwrap();
        assert_eq!(rec.candidate.variants(), vec![(SINGLE_VARIANT, "0.5")]);

        let rec: Record =
            serde_json::from_str(r#"{"id": 6, "candidate": {"m2": 7, "m1": "seven"}}"#).unwrap();
        assert_eq!(rec.candidate.variants(), vec![("m2", "7"), ("m1", "seven")]);
    }

    #[test]
    fn test_candidate_rejects_nested_lists() {
        let err = serde_json::from_str::<Record>(r#"{"id": 7, "candidate": ["a", "b"]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_record_null_reference_and_references_alias() {
        let rec: Record =
            serde_json::from_str(r#"{"id": 2, "reference": null, "candidate": "x"}"#).unwrap();
        assert!(rec.references.is_empty());

        let rec: Record =
            serde_json::from_str(r#"{"id": 3, "references": ["a", "b"], "candidate": "x"}"#)
                .unwrap();
        assert_eq!(rec.references.len(), 2);
    }

    #[test]
    fn test_scalar_variant_name() {
        let c = Candidate::from("foo");
        assert_eq!(c.variants(), vec![(SINGLE_VARIANT, "foo")]);
    }

    #[test]
    fn test_validate_rejects_empty_named_candidate() {
        let rec = Record::new("r", vec![], Candidate::Named(IndexMap::new()));
        assert!(matches!(
            rec.validate(),
            Err(EvalError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_weight_normalization() {
        let w = WeightSet::new().with("a", 1.0).with("b", 3.0);
        let n = w.normalized();
        assert!((n["a"] - 0.25).abs() < 1e-12);
        assert!((n["b"] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_weights_normalize_to_zero() {
        let w = WeightSet::new().with("a", 0.0).with("b", 0.0);
        assert!(w.normalized().values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_parse_pairs() {
        let w = WeightSet::parse_pairs(&["bleu=0.2", " rouge_l = 0.3"]).unwrap();
        assert_eq!(w.get("bleu"), Some(0.2));
        assert_eq!(w.get("rouge_l"), Some(0.3));
        assert!(WeightSet::parse_pairs(&["bleu"]).is_err());
        assert!(WeightSet::parse_pairs(&["bleu=high"]).is_err());
        assert!(WeightSet::parse_pairs(&["=1"]).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let w = WeightSet::new().with("a", -1.0);
        assert!(matches!(w.validate(), Err(EvalError::InvalidWeight { .. })));
        let w = WeightSet::new().with("a", f64::NAN);
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_tag_tokens_split_trim_dedupe() {
        let row = ScoredRow {
            id: "1".into(),
            variant: "single".into(),
            metrics: BTreeMap::new(),
            score: 0.5,
            tags: " a, b ,, a, ".into(),
        };
        assert_eq!(row.tag_tokens(), vec!["a", "b"]);
        assert_eq!(row.value("score"), Some(0.5));
        assert_eq!(row.value("bleu"), None);
    }
}
