//! In-memory Drupal used by unit tests.

use reqwest::Method;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{ApiRequest, ApiResponse, DrupalApi, RequestBody};
use crate::error::ApiResult;

pub(crate) const MOCK_HOST: &str = "http://localhost:8000";

/// Answers requests from a small in-memory site and records every request.
pub(crate) struct MockDrupal {
    requests: Mutex<Vec<ApiRequest>>,
    nodes: Mutex<HashMap<String, Value>>,
    next_id: Mutex<u64>,
    form_displays: HashMap<String, Value>,
    field_configs: HashMap<String, Value>,
    field_storages: HashMap<String, Value>,
    term_uris: HashMap<String, u64>,
    pub create_status: u16,
    pub update_status: u16,
    pub delete_status: u16,
    pub media_status: u16,
    pub location_header: bool,
}

impl MockDrupal {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            nodes: Mutex::new(HashMap::new()),
            next_id: Mutex::new(100),
            form_displays: HashMap::new(),
            field_configs: HashMap::new(),
            field_storages: HashMap::new(),
            term_uris: HashMap::new(),
            create_status: 201,
            update_status: 200,
            delete_status: 204,
            media_status: 201,
            location_header: true,
        }
    }

    pub fn with_node(self, id: &str, node: Value) -> Self {
        self.nodes.lock().unwrap().insert(id.to_string(), node);
        self
    }

    /// Serve field config for `(name, field_config, field_storage_config)` triples.
    pub fn with_remote_fields(
        mut self,
        content_type: &str,
        fields: Vec<(&str, Value, Value)>,
    ) -> Self {
        let mut content = Map::new();
        for (name, config, storage) in fields {
            content.insert(name.to_string(), json!({"weight": 0}));
            self.field_configs
                .insert(format!("node.{}.{}", content_type, name), config);
            self.field_storages.insert(format!("node.{}", name), storage);
        }
        self.form_displays.insert(
            format!("node.{}.default", content_type),
            json!({"content": content}),
        );
        self
    }

    /// Serve `term_from_uri` lookups for `uri`.
    pub fn with_term_uri(mut self, uri: &str, tid: u64) -> Self {
        self.term_uris.insert(uri.to_string(), tid);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<Value> {
        self.nodes.lock().unwrap().get(id).cloned()
    }

    fn respond(&self, request: &ApiRequest) -> ApiResponse {
        let path: Vec<&str> = request.path.iter().map(String::as_str).collect();
        let mut nodes = self.nodes.lock().unwrap();

        match (&request.method, path.as_slice()) {
            (m, ["entity", "entity_form_display", id]) if *m == Method::GET => {
                json_or_404(self.form_displays.get(*id))
            }
            (m, ["entity", "field_config", id]) if *m == Method::GET => {
                json_or_404(self.field_configs.get(*id))
            }
            (m, ["entity", "field_storage_config", id]) if *m == Method::GET => {
                json_or_404(self.field_storages.get(*id))
            }
            (m, ["term_from_uri"]) if *m == Method::GET => {
                let tid = request
                    .query
                    .iter()
                    .find(|(name, _)| name == "uri")
                    .and_then(|(_, uri)| self.term_uris.get(uri));
                let terms = match tid {
                    Some(tid) => json!([{"tid": [{"value": tid}]}]),
                    None => json!([]),
                };
                json_or_404(Some(&terms))
            }
            (m, ["node"]) if *m == Method::POST => {
                if self.create_status != 201 {
                    return status(self.create_status);
                }
                let mut next_id = self.next_id.lock().unwrap();
                let id = next_id.to_string();
                *next_id += 1;

                let mut node = match &request.body {
                    RequestBody::Json(body) => body.clone(),
                    _ => json!({}),
                };
                node["nid"] = json!([{"value": id.parse::<u64>().unwrap()}]);
                nodes.insert(id.clone(), node.clone());

                let mut response = ApiResponse {
                    status: 201,
                    headers: HashMap::new(),
                    body: node.to_string(),
                };
                if self.location_header {
                    response
                        .headers
                        .insert("location".into(), format!("{}/node/{}", MOCK_HOST, id));
                }
                response
            }
            (m, ["node", id]) if *m == Method::HEAD => {
                status(if nodes.contains_key(*id) { 200 } else { 404 })
            }
            (m, ["node", id]) if *m == Method::GET => json_or_404(nodes.get(*id)),
            (m, ["node", id]) if *m == Method::PATCH => {
                if !nodes.contains_key(*id) {
                    return status(404);
                }
                if let (200, RequestBody::Json(Value::Object(changes))) =
                    (self.update_status, &request.body)
                {
                    if let Some(Value::Object(node)) = nodes.get_mut(*id) {
                        for (key, value) in changes {
                            node.insert(key.clone(), value.clone());
                        }
                    }
                }
                status(self.update_status)
            }
            (m, ["node", id]) if *m == Method::DELETE => {
                if nodes.remove(*id).is_none() {
                    return status(404);
                }
                status(self.delete_status)
            }
            (m, ["node", id, "media", _, _]) if *m == Method::PUT => {
                if !nodes.contains_key(*id) {
                    return status(404);
                }
                status(self.media_status)
            }
            _ => status(404),
        }
    }
}

fn status(code: u16) -> ApiResponse {
    ApiResponse {
        status: code,
        ..Default::default()
    }
}

fn json_or_404(value: Option<&Value>) -> ApiResponse {
    match value {
        Some(value) => ApiResponse {
            status: 200,
            headers: HashMap::new(),
            body: value.to_string(),
        },
        None => status(404),
    }
}

impl DrupalApi for MockDrupal {
    async fn issue_request(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let response = self.respond(&request);
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}
