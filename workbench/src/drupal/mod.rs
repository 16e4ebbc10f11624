//! Drupal REST API access.
//!
//! Everything goes through [`DrupalApi::issue_request`]; the other operations
//! (field definitions, node ping, current field values) are built on top of
//! it, so a test double only has to answer raw requests.
//!
//! ## Endpoints
//!
//! | Operation            | Request                                                  |
//! |----------------------|----------------------------------------------------------|
//! | field definitions    | `GET /entity/entity_form_display/node.{type}.default`     |
//! |                      | `GET /entity/field_config/node.{type}.{field}`            |
//! |                      | `GET /entity/field_storage_config/node.{field}`           |
//! | node ping            | `HEAD /node/{id}`                                         |
//! | current values       | `GET /node/{id}`                                          |
//! | term by URI          | `GET /term_from_uri?uri={uri}`                            |
//!
//! All of them carry `?_format=json`.

pub mod client;

use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    Cardinality, FieldDefinition, FieldDefinitions, FieldPayload, FieldType, FieldValue,
    TargetType,
};

pub use client::DrupalClient;

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Bytes(Vec<u8>),
}

/// A request relative to the configured host.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path segments, unescaped; the client percent-encodes them.
    pub path: Vec<String>,
    /// Append `?_format=json`.
    pub json_format: bool,
    /// Extra query parameters, after `_format`.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            path: path.into_iter().map(Into::into).collect(),
            json_format: true,
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, body: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn without_format(mut self) -> Self {
        self.json_format = false;
        self
    }

    /// `node/7/media/image/17`, for messages.
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}

/// What came back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json(&self) -> ApiResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Turn any status outside `accepted` into [`ApiError::UnexpectedStatus`].
    pub fn expect_status(self, request: &ApiRequest, accepted: &[u16]) -> ApiResult<Self> {
        if accepted.contains(&self.status) {
            Ok(self)
        } else {
            Err(ApiError::UnexpectedStatus {
                method: request.method.to_string(),
                path: request.path_string(),
                status: self.status,
            })
        }
    }
}

/// Access to a Drupal site's REST API.
#[allow(async_fn_in_trait)]
pub trait DrupalApi {
    /// Send one request. Transport failures are errors; HTTP error statuses
    /// are not.
    async fn issue_request(&self, request: ApiRequest) -> ApiResult<ApiResponse>;

    /// Definitions of the `field_*` fields of a node bundle.
    async fn field_definitions(&self, content_type: &str) -> ApiResult<FieldDefinitions> {
        let display = get_json(
            self,
            vec![
                "entity".to_string(),
                "entity_form_display".to_string(),
                format!("node.{}.default", content_type),
            ],
        )
        .await?;

        let mut definitions = HashMap::new();
        for name in form_display_fields(&display) {
            let config = get_json(
                self,
                vec![
                    "entity".to_string(),
                    "field_config".to_string(),
                    format!("node.{}.{}", content_type, name),
                ],
            )
            .await?;
            let storage = get_json(
                self,
                vec![
                    "entity".to_string(),
                    "field_storage_config".to_string(),
                    format!("node.{}", name),
                ],
            )
            .await?;

            let definition = parse_field_definition(&name, &config, &storage)?;
            debug!(
                field = %name,
                field_type = ?definition.field_type,
                cardinality = ?definition.cardinality,
                "field definition"
            );
            definitions.insert(name, definition);
        }
        Ok(definitions)
    }

    /// Whether `node/{id}` exists and is accessible.
    async fn ping_node(&self, node_id: &str) -> bool {
        let request = ApiRequest::new(Method::HEAD, ["node", node_id]);
        match self.issue_request(request).await {
            Ok(response) => response.status == 200,
            Err(e) => {
                warn!(node_id, "node ping failed: {}", e);
                false
            }
        }
    }

    /// Current values of every defined field of a node, with transport-only
    /// attributes removed.
    async fn node_field_values(
        &self,
        node_id: &str,
        definitions: &FieldDefinitions,
    ) -> ApiResult<HashMap<String, FieldPayload>> {
        let node = get_json(self, vec!["node".to_string(), node_id.to_string()]).await?;
        Ok(parse_node_field_values(&node, definitions))
    }

    /// Id of the taxonomy term whose external URI is `uri`, if there is one.
    async fn term_id_from_uri(&self, uri: &str) -> ApiResult<Option<String>> {
        let request = ApiRequest::new(Method::GET, ["term_from_uri"]).query("uri", uri);
        let response = self
            .issue_request(request.clone())
            .await?
            .expect_status(&request, &[200])?;
        Ok(first_term_id(&response.json()?))
    }
}

/// `tid` of the first term in a `term_from_uri` response.
pub fn first_term_id(terms: &Value) -> Option<String> {
    match terms.pointer("/0/tid/0/value")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// GET a JSON document, requiring 200.
async fn get_json<A: DrupalApi + ?Sized>(api: &A, path: Vec<String>) -> ApiResult<Value> {
    let request = ApiRequest::new(Method::GET, path);
    let response = api.issue_request(request.clone()).await?;
    response.expect_status(&request, &[200])?.json()
}

/// Field names (`field_*`) listed in a form display's `content`.
pub fn form_display_fields(display: &Value) -> Vec<String> {
    display
        .get("content")
        .and_then(Value::as_object)
        .map(|content| {
            content
                .keys()
                .filter(|name| name.starts_with("field_"))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Combine a field config and its storage config into a definition.
pub fn parse_field_definition(
    name: &str,
    config: &Value,
    storage: &Value,
) -> ApiResult<FieldDefinition> {
    let storage_type = storage
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::InvalidResponse(format!("no storage type for {}", name)))?;

    let raw_cardinality = storage
        .get("cardinality")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::InvalidResponse(format!("no cardinality for {}", name)))?;
    let cardinality = Cardinality::from_drupal(raw_cardinality).ok_or_else(|| {
        ApiError::InvalidResponse(format!(
            "invalid cardinality {} for {}",
            raw_cardinality, name
        ))
    })?;

    let target_type = storage
        .pointer("/settings/target_type")
        .and_then(Value::as_str)
        .map(TargetType::from);

    Ok(FieldDefinition {
        name: name.to_string(),
        field_type: FieldType::from_drupal(storage_type),
        target_type,
        cardinality,
        required: config.get("required").and_then(Value::as_bool).unwrap_or(false),
        label: config
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string(),
    })
}

/// Extract defined fields from a node's JSON representation.
pub fn parse_node_field_values(
    node: &Value,
    definitions: &FieldDefinitions,
) -> HashMap<String, FieldPayload> {
    definitions
        .iter()
        .filter_map(|(name, definition)| {
            let values = node.get(name)?.as_array()?;
            let payload: FieldPayload = values
                .iter()
                .filter_map(|value| FieldValue::from_remote(definition, value))
                .collect();
            Some((name.clone(), payload))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod mock;

#[cfg(test)]
mod tests {
    use super::mock::MockDrupal;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_display_fields() {
        let display = json!({
            "content": {
                "title": {},
                "field_subject": {},
                "field_linked_agent": {},
                "langcode": {}
            }
        });
        let mut fields = form_display_fields(&display);
        fields.sort();
        assert_eq!(fields, vec!["field_linked_agent", "field_subject"]);
        assert!(form_display_fields(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_field_definition() {
        let config = json!({"required": true, "label": "Subject"});
        let storage = json!({
            "type": "entity_reference",
            "cardinality": -1,
            "settings": {"target_type": "taxonomy_term"}
        });

        let definition = parse_field_definition("field_subject", &config, &storage).unwrap();
        assert_eq!(definition.field_type, FieldType::EntityReference);
        assert_eq!(definition.cardinality, Cardinality::Unlimited);
        assert_eq!(definition.target_type, Some(TargetType::TaxonomyTerm));
        assert!(definition.required);
        assert_eq!(definition.label, "Subject");
    }

    #[test]
    fn test_parse_field_definition_text() {
        let storage = json!({"type": "string", "cardinality": 1, "settings": {"max_length": 255}});
        let definition = parse_field_definition("field_note", &json!({}), &storage).unwrap();
        assert_eq!(definition.field_type, FieldType::Text);
        assert_eq!(definition.cardinality, Cardinality::Limited(1));
        assert_eq!(definition.target_type, None);
        assert!(!definition.required);
        assert_eq!(definition.label, "field_note");
    }

    #[test]
    fn test_parse_field_definition_rejects_bad_cardinality() {
        let storage = json!({"type": "string", "cardinality": 0});
        assert!(matches!(
            parse_field_definition("field_x", &json!({}), &storage),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_expect_status() {
        let request = ApiRequest::new(Method::DELETE, ["node", "3"]);
        let ok = ApiResponse {
            status: 204,
            ..Default::default()
        };
        assert!(ok.expect_status(&request, &[204]).is_ok());

        let denied = ApiResponse {
            status: 403,
            ..Default::default()
        };
        let err = denied.expect_status(&request, &[204]).unwrap_err();
        assert_eq!(err.to_string(), "DELETE node/3 returned HTTP 403");
    }

    #[tokio::test]
    async fn test_field_definitions_from_api() {
        let api = MockDrupal::new().with_remote_fields(
            "islandora_object",
            vec![
                (
                    "field_subject",
                    json!({"required": false, "label": "Subject"}),
                    json!({"type": "entity_reference", "cardinality": 3, "settings": {"target_type": "taxonomy_term"}}),
                ),
                (
                    "field_linked_agent",
                    json!({"required": true, "label": "Contributors"}),
                    json!({"type": "typed_relation", "cardinality": -1, "settings": {"target_type": "taxonomy_term"}}),
                ),
            ],
        );

        let definitions = api.field_definitions("islandora_object").await.unwrap();
        assert_eq!(definitions.len(), 2);
        assert_eq!(
            definitions["field_subject"].cardinality,
            Cardinality::Limited(3)
        );
        assert_eq!(
            definitions["field_linked_agent"].field_type,
            FieldType::TypedRelation
        );
        assert!(definitions["field_linked_agent"].required);
    }

    #[tokio::test]
    async fn test_ping_node() {
        let api = MockDrupal::new().with_node("5", json!({"nid": [{"value": 5}]}));
        assert!(api.ping_node("5").await);
        assert!(!api.ping_node("6").await);
    }

    #[tokio::test]
    async fn test_node_field_values_strip_transport_attributes() {
        let api = MockDrupal::new().with_node(
            "5",
            json!({
                "nid": [{"value": 5}],
                "field_linked_agent": [{
                    "target_id": 45,
                    "target_type": "taxonomy_term",
                    "target_uuid": "3c1e",
                    "url": "/taxonomy/term/45",
                    "rel_type": "relators:aut"
                }],
                "field_note": [{"value": "hello", "format": null}]
            }),
        );
        let definitions: FieldDefinitions = [
            FieldDefinition::reference(
                "field_linked_agent",
                FieldType::TypedRelation,
                TargetType::TaxonomyTerm,
                Cardinality::Unlimited,
            ),
            FieldDefinition::text("field_note", Cardinality::Limited(1)),
            FieldDefinition::text("field_absent", Cardinality::Limited(1)),
        ]
        .into_iter()
        .map(|d| (d.name.clone(), d))
        .collect();

        let values = api.node_field_values("5", &definitions).await.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["field_note"], vec![FieldValue::text("hello")]);

        let agent = serde_json::to_value(&values["field_linked_agent"][0]).unwrap();
        assert_eq!(
            agent,
            json!({"target_id": "45", "target_type": "taxonomy_term", "rel_type": "relators:aut"})
        );
    }

    #[test]
    fn test_first_term_id() {
        assert_eq!(
            first_term_id(&json!([{"tid": [{"value": 17}], "name": [{"value": "Original File"}]}])),
            Some("17".to_string())
        );
        assert_eq!(first_term_id(&json!([])), None);
    }

    #[tokio::test]
    async fn test_term_id_from_uri() {
        let api = MockDrupal::new().with_term_uri("http://pcdm.org/use#OriginalFile", 17);

        let tid = api
            .term_id_from_uri("http://pcdm.org/use#OriginalFile")
            .await
            .unwrap();
        assert_eq!(tid, Some("17".to_string()));
        assert_eq!(api.term_id_from_uri("http://example.org/x").await.unwrap(), None);

        let lookups = api.requests_with(Method::GET);
        assert_eq!(lookups[0].path_string(), "term_from_uri");
        assert_eq!(
            lookups[0].query,
            vec![("uri".to_string(), "http://pcdm.org/use#OriginalFile".to_string())]
        );
    }

    #[tokio::test]
    async fn test_node_field_values_missing_node() {
        let api = MockDrupal::new();
        let err = api
            .node_field_values("99", &FieldDefinitions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedStatus { status: 404, .. }));
    }
}
