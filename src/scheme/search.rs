//! Fuzzy search over a model's text fields. Scores are approximate-substring
//! edit distances (Sellers) divided by the pattern length, so 0 is an exact
//! occurrence and 1 means nothing in common.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::schema::ModelSchema;
use super::SchemeError;
use crate::config::CONFIG;
use crate::database::DynamicRepository;

type Row = Map<String, Value>;

#[derive(Debug, Clone, Serialize)]
pub struct KeyMatch {
    pub key: String,
    pub value: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub item: Row,
    pub score: f64,
    pub matches: Vec<KeyMatch>,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: String,
    pub keys: Vec<String>,
    pub limit: usize,
    pub threshold: f64,
}

impl SearchOptions {
    /// Read `q`, `keys`, `limit` and `threshold` from the query string
    pub fn from_params(schema: &ModelSchema, params: &HashMap<String, String>) -> Result<Self, SchemeError> {
        let query = params.get("q").map(|q| q.trim().to_string()).unwrap_or_default();
        if query.is_empty() {
            return Err(SchemeError::BadRequest("'q' is required".to_string()));
        }

        let keys: Vec<String> = match params.get("keys").filter(|k| !k.trim().is_empty()) {
            Some(raw) => raw.split(',').map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect(),
            None => schema.searchable_fields().map(|f| f.name.to_string()).collect(),
        };
        if keys.is_empty() {
            return Err(SchemeError::BadRequest(format!("Model '{}' has no searchable fields", schema.name)));
        }
        for key in &keys {
            match schema.field(key) {
                Some(field) if !field.hidden => {}
                _ => return Err(SchemeError::BadRequest(format!("'{}' is not a field of {}", key, schema.name))),
            }
        }

        let limit = match params.get("limit") {
            None => CONFIG.filter.default_limit as usize,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| SchemeError::BadRequest("'limit' must be a positive integer".to_string()))?,
        };

        let threshold = match params.get("threshold") {
            None => CONFIG.scheme.search_threshold,
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=1.0).contains(t))
                .ok_or_else(|| SchemeError::BadRequest("'threshold' must be between 0 and 1".to_string()))?,
        };

        Ok(Self { query, keys, limit, threshold })
    }
}

/// Smallest edit distance between `pattern` and any substring of `text`,
/// divided by the pattern length. Case-insensitive.
pub fn approximate_score(pattern: &str, text: &str) -> f64 {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    if pattern.is_empty() {
        return 0.0;
    }

    // row i holds the best distance for pattern[..i] ending at each text position;
    // row 0 is all zeros so a match may start anywhere
    let mut prev = vec![0usize; text.len() + 1];
    let mut cur = vec![0usize; text.len() + 1];
    for (i, pc) in pattern.iter().enumerate() {
        cur[0] = i + 1;
        for (j, tc) in text.iter().enumerate() {
            let substitution = prev[j] + usize::from(pc != tc);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let best = prev.iter().copied().min().unwrap_or(pattern.len());
    best.min(pattern.len()) as f64 / pattern.len() as f64
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Score every row, keep those within the threshold, best first
pub fn rank(rows: Vec<Row>, options: &SearchOptions) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = rows
        .into_iter()
        .filter_map(|row| {
            let matches: Vec<KeyMatch> = options
                .keys
                .iter()
                .filter_map(|key| {
                    let value = text_of(row.get(key)?)?;
                    let score = approximate_score(&options.query, &value);
                    (score <= options.threshold).then(|| KeyMatch { key: key.clone(), value, score })
                })
                .collect();
            let score = matches.iter().map(|m| m.score).fold(f64::INFINITY, f64::min);
            (!matches.is_empty()).then_some(SearchHit { item: row, score, matches })
        })
        .collect();

    hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(options.limit);
    hits
}

pub async fn fuse_search(repo: &DynamicRepository<'_>, params: &HashMap<String, String>) -> Result<Vec<SearchHit>, SchemeError> {
    let options = SearchOptions::from_params(repo.schema(), params)?;

    let mut filter = repo.filter();
    filter.limit(CONFIG.scheme.search_candidate_limit, None)?;
    let rows = repo.select_filter(&filter).await?;

    tracing::debug!("fuzzy search on {} over {} candidates", repo.schema().name, rows.len());
    Ok(rank(rows, &options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::schema::fixtures::gadget;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_exact_substring_scores_zero() {
        assert_eq!(approximate_score("drill", "Cordless Drill 18V"), 0.0);
        assert_eq!(approximate_score("DRILL", "drill"), 0.0);
    }

    #[test]
    fn test_typos_score_proportionally() {
        assert_eq!(approximate_score("drlil", "Cordless Drill"), 0.2);
        assert_eq!(approximate_score("dril", "Drill"), 0.0);
        assert_eq!(approximate_score("drilx", "Drill"), 0.2);
        assert_eq!(approximate_score("abc", "xyz"), 1.0);
        assert_eq!(approximate_score("abc", ""), 1.0);
    }

    #[test]
    fn test_rank_orders_and_filters() {
        let options = SearchOptions {
            query: "drill".to_string(),
            keys: vec!["name".to_string(), "serial".to_string()],
            limit: 10,
            threshold: 0.4,
        };
        let rows = vec![
            row(json!({"name": "Hammer", "serial": "H-1"})),
            row(json!({"name": "Dril press", "serial": "P-2"})),
            row(json!({"name": "Power drill", "serial": "D-3"})),
        ];
        let hits = rank(rows, &options);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item["name"], "Power drill");
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits[1].score, 0.2);
        assert_eq!(hits[1].matches[0].key, "name");
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let options = SearchOptions { query: "a".into(), keys: vec!["name".into()], limit: 1, threshold: 0.0 };
        let rows = vec![row(json!({"name": "a1"})), row(json!({"name": "a2"}))];
        assert_eq!(rank(rows, &options).len(), 1);
    }

    #[test]
    fn test_options_validation() {
        let schema = gadget();
        let params = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };

        let options = SearchOptions::from_params(&schema, &params(&[("q", "drill")])).unwrap();
        assert_eq!(options.keys, vec!["name", "serial"]);

        assert!(SearchOptions::from_params(&schema, &params(&[])).is_err());
        assert!(SearchOptions::from_params(&schema, &params(&[("q", "x"), ("keys", "pin")])).is_err());
        assert!(SearchOptions::from_params(&schema, &params(&[("q", "x"), ("threshold", "2")])).is_err());
        assert!(SearchOptions::from_params(&schema, &params(&[("q", "x"), ("limit", "0")])).is_err());
    }
}
