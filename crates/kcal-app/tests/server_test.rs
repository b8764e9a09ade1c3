//! HTTP surface tests against an in-process server with a fake vision backend

use std::sync::Arc;

use async_trait::async_trait;
use kcal_app::{router, AnalysisService};
use kcal_types::{Error, ImageReference, Result};
use kcal_vision::VisionBackend;
use serde_json::{json, Value};

struct ScriptedBackend(fn() -> Result<String>);

#[async_trait]
impl VisionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn send_prompt(&self, _prompt: &str, _image: &ImageReference) -> Result<String> {
        (self.0)()
    }
}

async fn spawn_app(reply: fn() -> Result<String>) -> String {
    let service = Arc::new(AnalysisService::new(Arc::new(ScriptedBackend(reply))));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(service)).await.unwrap();
    });
    format!("http://{addr}")
}

fn salad() -> Result<String> {
    Ok(r#"```json
{"label": "caesar salad", "estimatedCalories": 350, "confidence": 0.75,
 "macros": {"proteinG": 6, "carbsG": 8, "fatG": 14}}
```"#
        .to_string())
}

fn assert_cors(response: &reqwest::Response) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-headers"],
        "authorization, x-client-info, apikey, content-type"
    );
}

#[tokio::test]
async fn analyze_food_returns_single_item() {
    let base = spawn_app(salad).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/analyze_food"))
        .json(&json!({ "imageBase64": "AAAA" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_cors(&response);

    let body: Value = response.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["label"], "Caesar Salad");
    assert_eq!(items[0]["calories"], 350.0);
    assert!((items[0]["sigmaCalories"].as_f64().unwrap() - 70.0).abs() < 1e-9);
    assert_eq!(items[0]["path"], "geometry");
    assert_eq!(items[0]["macros"]["fatG"], 14.0);
    assert_eq!(items[0]["priors"]["kcalPerG"]["mu"], 1.3);
    assert_eq!(body["meta"]["used"], json!(["openai"]));
    assert!(body["meta"]["latencyMs"].is_u64());
}

#[tokio::test]
async fn root_route_also_analyzes() {
    let base = spawn_app(salad).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/"))
        .json(&json!({ "imageUrl": "https://example.com/salad.jpg", "label": "ignored" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn missing_image_is_400() {
    let base = spawn_app(salad).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/analyze_food"))
        .json(&json!({ "label": "lunch" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_cors(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Either imageBase64 or imageUrl is required");
    assert!(body.get("meta").is_none());
}

#[tokio::test]
async fn malformed_body_is_500() {
    let base = spawn_app(salad).await;
    let response = reqwest::Client::new()
        .post(format!("{base}/analyze_food"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("JSON error"));
}

#[tokio::test]
async fn upstream_timeout_still_returns_200() {
    let base = spawn_app(|| {
        Err(Error::UpstreamError {
            status: None,
            message: "OpenAI request timed out after 12000ms".to_string(),
        })
    })
    .await;
    let response = reqwest::Client::new()
        .post(format!("{base}/analyze_food"))
        .json(&json!({ "imageBase64": "AAAA" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let item = &body["items"][0];
    assert_eq!(item["calories"], 200.0);
    assert_eq!(item["sigmaCalories"], 100.0);
    assert_eq!(item["confidence"], 0.3);
    assert!(item["evidence"]
        .as_array()
        .unwrap()
        .iter()
        .any(|tag| tag == "API_Failed"));
}

#[tokio::test]
async fn missing_credential_is_500_with_message() {
    let base = spawn_app(|| {
        Err(Error::UpstreamUnavailable(
            "OPENAI_API_KEY not configured".to_string(),
        ))
    })
    .await;
    let response = reqwest::Client::new()
        .post(format!("{base}/analyze_food"))
        .json(&json!({ "imageBase64": "AAAA" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "OPENAI_API_KEY not configured");
    assert!(body.get("meta").is_none());
}

#[tokio::test]
async fn preflight_and_health() {
    let base = spawn_app(salad).await;
    let client = reqwest::Client::new();

    for path in ["/", "/analyze_food"] {
        let response = client
            .request(reqwest::Method::OPTIONS, format!("{base}{path}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_cors(&response);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
}
