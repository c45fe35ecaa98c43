mod support;

use axum::{body::Body, http::Request};
use serde_json::{json, Value};
use support::{read_json, with_config, with_sitewise_harness};

use sitewise_sql::config::AppConfig;

const PROMPT: &str = "Select an asset model to build your query";

fn session_path(body: &Value, suffix: &str) -> String {
    let id = body["id"].as_str().expect("session id should be a string");
    format!("/api/sessions/{id}{suffix}")
}

#[tokio::test]
async fn health_is_public() {
    with_sitewise_harness(|harness| async move {
        let (status, body) = read_json(harness.get_without_api_key("/healthz").await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    })
    .await;
}

#[tokio::test]
async fn api_routes_require_api_key() {
    with_sitewise_harness(|harness| async move {
        let (status, body) = read_json(harness.get_without_api_key("/api/catalog").await).await;
        assert_eq!(status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("authentication failed"));
    })
    .await;
}

#[tokio::test]
async fn api_key_is_optional_when_unset() {
    with_config(AppConfig::embedded(), |harness| async move {
        let (status, _) = read_json(harness.get_without_api_key("/api/catalog").await).await;
        assert_eq!(status, http::StatusCode::OK);
    })
    .await;
}

#[tokio::test]
async fn catalog_lists_views_and_options() {
    with_sitewise_harness(|harness| async move {
        let (status, body) = read_json(harness.get("/api/catalog").await).await;
        assert_eq!(status, http::StatusCode::OK);

        let ids: Vec<&str> = body["assetModels"]
            .as_array()
            .expect("assetModels should be an array")
            .iter()
            .filter_map(|model| model["id"].as_str())
            .collect();
        assert_eq!(
            ids,
            vec![
                "asset",
                "asset_property",
                "raw_time_series",
                "latest_value_time_series",
                "precomputed_aggregates",
            ]
        );
        assert_eq!(body["timeIntervals"][0], json!("1s"));
        assert!(body["whereOperators"]
            .as_array()
            .is_some_and(|ops| ops.contains(&json!("BETWEEN"))));
        assert_eq!(body["dateFunctionArgs"], json!(["DAY", "MONTH", "YEAR"]));
        assert_eq!(
            body["tooltips"]["FROM"],
            json!("Select the view to query data from.")
        );
    })
    .await;
}

#[tokio::test]
async fn catalog_model_lookup() {
    with_sitewise_harness(|harness| async move {
        let (status, body) = read_json(harness.get("/api/catalog/asset").await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["properties"][1]["name"], json!("asset_name"));
        assert_eq!(body["properties"][1]["dataType"], json!("STRING"));

        let (status, body) = read_json(harness.get("/api/catalog/nope").await).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("not found: asset model 'nope'"));
    })
    .await;
}

#[tokio::test]
async fn preview_renders_builder_state() {
    with_sitewise_harness(|harness| async move {
        let state = json!({
            "selectedAssetModel": "raw_time_series",
            "selectFields": [
                { "column": "asset_id" },
                { "column": "double_value", "aggregation": "AVG", "alias": "avg_value" }
            ],
            "whereConditions": [
                { "column": "quality", "operator": "=", "value": "GOOD", "logicalOperator": "AND" },
                { "column": "asset_id", "operator": "=", "value": "$asset" }
            ],
            "groupByTags": ["asset_id"],
            "groupByTime": "1m",
            "orderByFields": [{ "column": "event_timestamp", "direction": "DESC" }],
            "limit": 50
        });

        let (status, body) = read_json(harness.post("/api/preview", &state).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(
            body["preview"],
            json!(
                "SELECT asset_id, AVG(double_value) AS \"avg_value\"\n\
                 FROM raw_time_series\n\
                 WHERE quality = 'GOOD' AND asset_id = $asset\n\
                 GROUP BY asset_id, time(1m)\n\
                 ORDER BY event_timestamp DESC\n\
                 LIMIT 50"
            )
        );
        assert_eq!(body["errors"], json!([]));
    })
    .await;
}

#[tokio::test]
async fn preview_without_model_prompts() {
    with_sitewise_harness(|harness| async move {
        let (status, body) = read_json(harness.post("/api/preview", &json!({})).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["preview"], json!(PROMPT));
        assert_eq!(body["errors"], json!(["Select an asset model."]));
    })
    .await;
}

#[tokio::test]
async fn preview_rejects_malformed_json() {
    with_sitewise_harness(|harness| async move {
        let request = Request::builder()
            .method("POST")
            .uri("/api/preview")
            .header("x-api-key", "test-api-key")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request should build");

        let (status, body) = read_json(harness.raw(request).await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .is_some_and(|msg| msg.starts_with("invalid request:")));
    })
    .await;
}

#[tokio::test]
async fn session_lifecycle() {
    with_sitewise_harness(|harness| async move {
        let (status, created) = read_json(harness.post_empty("/api/sessions").await).await;
        assert_eq!(status, http::StatusCode::CREATED);
        assert_eq!(created["preview"], json!(PROMPT));
        assert_eq!(created["mode"], json!("builder"));
        assert_eq!(created["state"]["limit"], json!(1000));
        assert_eq!(created["state"]["timezone"], json!("UTC"));
        assert_eq!(created["rawSQL"], json!("SELECT * FROM asset LIMIT 100"));

        let path = session_path(&created, "");
        let (status, fetched) = read_json(harness.get(&path).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(fetched["id"], created["id"]);

        let (status, _) = read_json(harness.delete(&path).await).await;
        assert_eq!(status, http::StatusCode::NO_CONTENT);

        let (status, body) = read_json(harness.get(&path).await).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert!(body["error"]
            .as_str()
            .is_some_and(|msg| msg.contains("session")));
    })
    .await;
}

#[tokio::test]
async fn clause_actions_drive_preview_and_document() {
    with_sitewise_harness(|harness| async move {
        let (_, created) = read_json(harness.post_empty("/api/sessions").await).await;
        let actions = session_path(&created, "/actions");

        let (status, body) = read_json(
            harness
                .post(&actions, &json!({ "type": "select_model", "model": "asset" }))
                .await,
        )
        .await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["preview"], json!("SELECT *\nFROM asset\nLIMIT 1000"));

        let (_, body) = read_json(
            harness
                .post(
                    &actions,
                    &json!({
                        "type": "update_select_field",
                        "index": 0,
                        "update": { "column": "asset_name" }
                    }),
                )
                .await,
        )
        .await;
        assert_eq!(
            body["preview"],
            json!("SELECT asset_name\nFROM asset\nLIMIT 1000")
        );

        let (_, body) = read_json(
            harness
                .post(&actions, &json!({ "type": "set_limit", "input": "10" }))
                .await,
        )
        .await;
        assert_eq!(body["preview"], json!("SELECT asset_name\nFROM asset\nLIMIT 10"));
        assert_eq!(body["rawSQL"], body["preview"]);
        assert_eq!(body["state"]["rawSQL"], body["preview"]);
        assert_eq!(body["errors"], json!([]));
    })
    .await;
}

#[tokio::test]
async fn unknown_action_is_rejected() {
    with_sitewise_harness(|harness| async move {
        let (_, created) = read_json(harness.post_empty("/api/sessions").await).await;
        let actions = session_path(&created, "/actions");

        let (status, _) =
            read_json(harness.post(&actions, &json!({ "type": "explode" })).await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
    })
    .await;
}

#[tokio::test]
async fn patch_merges_partial_state() {
    with_sitewise_harness(|harness| async move {
        let (_, created) = read_json(harness.post_empty("/api/sessions").await).await;
        let path = session_path(&created, "");

        let patch = json!({
            "selectedAssetModel": "asset_property",
            "selectFields": [{ "column": "property_name" }],
            "limit": null
        });
        let (status, body) = read_json(harness.patch(&path, &patch).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(
            body["preview"],
            json!("SELECT property_name\nFROM asset_property\nLIMIT 100")
        );
        assert_eq!(body["state"]["timezone"], json!("UTC"));
    })
    .await;
}

#[tokio::test]
async fn raw_edit_and_mode_toggle() {
    with_sitewise_harness(|harness| async move {
        let (_, created) = read_json(harness.post_empty("/api/sessions").await).await;

        let (status, body) =
            read_json(harness.post_empty(&session_path(&created, "/mode")).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["mode"], json!("raw"));

        let edit = json!({ "rawSQL": "SELECT asset_id FROM asset" });
        let (status, body) = read_json(harness.put(&session_path(&created, "/raw"), &edit).await).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["rawSQL"], json!("SELECT asset_id FROM asset"));
        assert_eq!(body["preview"], json!(PROMPT));

        let (_, body) = read_json(harness.post_empty(&session_path(&created, "/mode")).await).await;
        assert_eq!(body["mode"], json!("builder"));
        assert_eq!(body["rawSQL"], json!("SELECT asset_id FROM asset"));
    })
    .await;
}

#[tokio::test]
async fn resumes_saved_document() {
    with_sitewise_harness(|harness| async move {
        let document = json!({
            "rawSQL": "SELECT * FROM asset LIMIT 5",
            "sqlQueryState": {
                "selectedAssetModel": "asset",
                "selectFields": [{ "column": "asset_id" }],
                "limit": 5
            }
        });

        let (status, body) = read_json(harness.post("/api/sessions", &document).await).await;
        assert_eq!(status, http::StatusCode::CREATED);
        assert_eq!(body["preview"], json!("SELECT asset_id\nFROM asset\nLIMIT 5"));
        assert_eq!(body["rawSQL"], json!("SELECT * FROM asset LIMIT 5"));
    })
    .await;
}

#[tokio::test]
async fn malformed_session_document_returns_400() {
    with_sitewise_harness(|harness| async move {
        for body in ["{not json", r#"{"sqlQueryState":{"selectedAssetModel":5}}"#] {
            let request = Request::builder()
                .method("POST")
                .uri("/api/sessions")
                .header("x-api-key", "test-api-key")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request should build");

            let (status, response) = read_json(harness.raw(request).await).await;
            assert_eq!(status, http::StatusCode::BAD_REQUEST, "body: {body}");
            assert!(response["error"]
                .as_str()
                .is_some_and(|msg| msg.starts_with("invalid request: invalid session document")));
        }
    })
    .await;
}

#[tokio::test]
async fn invalid_session_id_returns_400() {
    with_sitewise_harness(|harness| async move {
        let (status, body) = read_json(harness.get("/api/sessions/not-a-uuid").await).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            json!("invalid request: session id must be a UUID")
        );
    })
    .await;
}

#[tokio::test]
async fn session_capacity_is_enforced() {
    let config = AppConfig {
        max_sessions: 1,
        ..AppConfig::embedded()
    };
    with_config(config, |harness| async move {
        let (status, _) = read_json(harness.post_empty("/api/sessions").await).await;
        assert_eq!(status, http::StatusCode::CREATED);

        let (status, body) = read_json(harness.post_empty("/api/sessions").await).await;
        assert_eq!(status, http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"]
            .as_str()
            .is_some_and(|msg| msg.starts_with("capacity exhausted")));
    })
    .await;
}
