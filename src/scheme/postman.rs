use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::schema::ModelSchema;
use super::{registry, SchemeError};
use crate::config::CONFIG;

const SCHEMA_URL: &str = "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostmanOptions {
    pub name: Option<String>,
    #[serde(alias = "base_url")]
    pub base_url: Option<String>,
    pub models: Option<Vec<String>>,
}

fn url(path: &str, query: &[(&str, &str)]) -> Value {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let mut raw = format!("{{{{baseUrl}}}}/{}", segments.join("/"));
    if !query.is_empty() {
        let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        raw = format!("{}?{}", raw, pairs.join("&"));
    }
    json!({
        "raw": raw,
        "host": ["{{baseUrl}}"],
        "path": segments,
        "query": query.iter().map(|(k, v)| json!({"key": k, "value": v})).collect::<Vec<_>>(),
    })
}

fn request(name: &str, method: &str, url: Value, body: Option<Value>) -> Value {
    let mut request = json!({
        "method": method,
        "header": [],
        "url": url,
    });
    if let Some(body) = body {
        request["header"] = json!([{"key": "Content-Type", "value": "application/json"}]);
        request["body"] = json!({
            "mode": "raw",
            "raw": serde_json::to_string_pretty(&body).unwrap_or_default(),
            "options": {"raw": {"language": "json"}},
        });
    }
    json!({"name": name, "request": request})
}

/// Request body with a sample value for every writable field
pub fn sample_body(schema: &ModelSchema, with_key: bool) -> Value {
    let mut body = Map::new();
    if with_key {
        if let Some(pk) = schema.primary_field() {
            body.insert(pk.name.to_string(), pk.kind.sample());
        }
    }
    for field in schema.input_fields() {
        body.insert(field.name.to_string(), field.kind.sample());
    }
    Value::Object(body)
}

fn model_folder(schema: &ModelSchema) -> Value {
    let model = schema.name;
    let base = format!("/scheme/{}", model);
    let mut items = Vec::new();

    if schema.writable && schema.creatable {
        items.push(request(&format!("Create {}", model), "POST", url(&base, &[]), Some(sample_body(schema, false))));
    }
    items.push(request(&format!("Read {}", model), "GET", url(&base, &[("id", "")]), None));
    if schema.writable {
        items.push(request(&format!("Patch {}", model), "PATCH", url(&base, &[]), Some(sample_body(schema, true))));
        items.push(request(&format!("Update {}", model), "PUT", url(&base, &[]), Some(sample_body(schema, true))));
    }
    items.push(request(
        &format!("List {}", model),
        "GET",
        url(&format!("/scheme/list/{}", model), &[("page", "1"), ("limit", "20")]),
        None,
    ));
    items.push(request(
        &format!("Search {}", model),
        "GET",
        url(&format!("/scheme/fuse-search/{}", model), &[("q", "")]),
        None,
    ));
    items.push(request(
        &format!("Read {} document", model),
        "GET",
        url("/scheme/relax/read", &[("model", model), ("id", "")]),
        None,
    ));
    items.push(request(
        &format!("{} CSV template", model),
        "GET",
        url(&format!("/scheme/csv/template/{}", model), &[]),
        None,
    ));
    items.push(request(
        &format!("{} CSV report", model),
        "GET",
        url(&format!("/scheme/csv/generate/{}", model), &[]),
        None,
    ));
    if schema.writable && schema.creatable {
        let mut upload = request(
            &format!("{} CSV import", model),
            "PUT",
            url(&format!("/scheme/csv/upload/{}", model), &[]),
            None,
        );
        upload["request"]["body"] = json!({
            "mode": "formdata",
            "formdata": [{"key": "file", "type": "file", "src": ""}],
        });
        items.push(upload);
    }
    items.push(request(
        &format!("{} PDF report", model),
        "GET",
        url(&format!("/scheme/pdf/generate/{}", model), &[]),
        None,
    ));

    json!({"name": model, "item": items})
}

/// Postman v2.1 collection covering the scheme operations of each model
pub fn generate(options: &PostmanOptions) -> Result<Value, SchemeError> {
    let schemas: Vec<&ModelSchema> = match &options.models {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| registry::lookup(name))
            .collect::<Result<_, _>>()?,
        _ => registry::all().iter().collect(),
    };

    let base_url = options
        .base_url
        .clone()
        .unwrap_or_else(|| CONFIG.scheme.public_base_url.clone());

    Ok(json!({
        "info": {
            "name": options.name.clone().unwrap_or_else(|| "SIMS API".to_string()),
            "schema": SCHEMA_URL,
        },
        "auth": {
            "type": "bearer",
            "bearer": [{"key": "token", "value": "{{token}}", "type": "string"}],
        },
        "variable": [
            {"key": "baseUrl", "value": base_url},
            {"key": "token", "value": ""},
        ],
        "item": schemas.into_iter().map(model_folder).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_names(folder: &Value) -> Vec<String> {
        folder["item"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_collection_shape() {
        let options = PostmanOptions {
            name: Some("Inventory".into()),
            base_url: Some("http://api.test".into()),
            models: Some(vec!["item".into(), "permission".into()]),
        };
        let collection = generate(&options).unwrap();

        assert_eq!(collection["info"]["name"], "Inventory");
        assert_eq!(collection["info"]["schema"], SCHEMA_URL);
        assert_eq!(collection["auth"]["type"], "bearer");
        assert_eq!(collection["variable"][0]["value"], "http://api.test");

        let folders = collection["item"].as_array().unwrap();
        assert_eq!(folders.len(), 2);
        assert!(request_names(&folders[0]).contains(&"Create item".to_string()));
        // read-only models get no write requests
        let permission = request_names(&folders[1]);
        assert!(!permission.iter().any(|n| n.starts_with("Create") || n.starts_with("Patch")));
        assert!(permission.contains(&"List permission".to_string()));
    }

    #[test]
    fn test_urls_use_base_variable() {
        let collection = generate(&PostmanOptions { models: Some(vec!["vendor".into()]), ..Default::default() }).unwrap();
        let read = &collection["item"][0]["item"][1]["request"]["url"];
        assert_eq!(read["raw"], "{{baseUrl}}/scheme/vendor?id=");
        assert_eq!(read["path"], json!(["scheme", "vendor"]));
    }

    #[test]
    fn test_sample_body_excludes_system_fields() {
        let item = registry::lookup("item").unwrap();
        let body = sample_body(item, false);
        assert!(body.get("item_id").is_none());
        assert!(body.get("org_id").is_none());
        assert!(sample_body(item, true).get("item_id").is_some());
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let options = PostmanOptions { models: Some(vec!["ghost".into()]), ..Default::default() };
        assert!(matches!(generate(&options), Err(SchemeError::UnknownModel(_))));
    }

    #[test]
    fn test_defaults_cover_every_model() {
        let collection = generate(&PostmanOptions::default()).unwrap();
        assert_eq!(collection["item"].as_array().unwrap().len(), registry::all().len());
    }
}
