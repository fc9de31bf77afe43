use std::collections::{BTreeMap, HashMap};

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::SchemeError;
use crate::config::CONFIG;
use crate::database::DynamicRepository;
use crate::filter::Filter;

type Row = Map<String, Value>;

/// Query keys with a meaning of their own; every other key is an equality filter
const RESERVED: [&str; 3] = ["page", "limit", "order"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self { total, page, limit, pages }
    }
}

#[derive(Debug, Serialize)]
pub struct ListPage {
    pub data: Vec<Row>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub limit: i64,
}

fn positive(params: &HashMap<String, String>, key: &str, default: i64) -> Result<i64, SchemeError> {
    match params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(SchemeError::BadRequest(format!("'{}' must be a positive integer", key))),
        },
    }
}

/// Apply list query parameters to `filter`, returning the effective paging
pub fn apply_params(filter: &mut Filter<'_>, params: &HashMap<String, String>) -> Result<Paging, SchemeError> {
    let page = positive(params, "page", 1)?;
    let requested = positive(params, "limit", CONFIG.filter.default_limit)?;

    let conditions: Map<String, Value> = params
        .iter()
        .filter(|(k, _)| !RESERVED.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    if !conditions.is_empty() {
        filter.where_clause(Value::Object(conditions))?;
    }
    if let Some(order) = params.get("order").filter(|o| !o.trim().is_empty()) {
        filter.order(Value::String(order.clone()))?;
    }

    filter.limit(requested, None)?;
    let limit = filter.applied_limit().unwrap_or(requested);
    filter.limit(limit, Some((page - 1).saturating_mul(limit)))?;

    Ok(Paging { page, limit })
}

pub async fn list(repo: &DynamicRepository<'_>, params: &HashMap<String, String>) -> Result<ListPage, SchemeError> {
    let mut filter = repo.filter();
    let paging = apply_params(&mut filter, params)?;

    let (data, total) = tokio::try_join!(repo.select_filter(&filter), repo.count_filter(&filter))?;
    Ok(ListPage { data, meta: PageMeta::new(total, paging.page, paging.limit) })
}

/// Split a comma separated `models` parameter, dropping blanks and duplicates
pub fn parse_models(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !out.iter().any(|m| m == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// First `limit` records of each model, keyed by model name
pub async fn list_multi(org_id: Uuid, models: &[String], limit: Option<i64>) -> Result<BTreeMap<String, Vec<Row>>, SchemeError> {
    if models.is_empty() {
        return Err(SchemeError::BadRequest("'models' must name at least one model".to_string()));
    }
    let limit = limit.unwrap_or(CONFIG.filter.default_limit);
    if limit < 1 {
        return Err(SchemeError::BadRequest("'limit' must be a positive integer".to_string()));
    }

    // resolve every name before touching the database
    for model in models {
        super::lookup(model)?;
    }

    let lists = try_join_all(models.iter().map(|model| async move {
        let repo = super::open(model, org_id).await?;
        let mut filter = repo.filter();
        filter.limit(limit, None)?;
        let rows = repo.select_filter(&filter).await?;
        Ok::<_, SchemeError>((model.clone(), rows))
    }))
    .await?;

    Ok(lists.into_iter().collect())
}
