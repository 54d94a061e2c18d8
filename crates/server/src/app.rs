use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use docscan_core::{DocumentFields, FieldRuleSet};
use docscan_ocr::{DocumentPipeline, OcrBackend, PreprocessStrategy};
use docscan_storage::{DbPool, NewOcrResult, OcrResultRecord};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub pipeline: Arc<DocumentPipeline<Arc<dyn OcrBackend>>>,
}

impl AppState {
    pub fn new(
        db: DbPool,
        recognizer: Arc<dyn OcrBackend>,
        strategy: PreprocessStrategy,
        rule_set: FieldRuleSet,
    ) -> Self {
        Self {
            db,
            pipeline: Arc::new(DocumentPipeline::new(recognizer, strategy, rule_set)),
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ocr/process", post(process_document))
        .route("/api/ocr/results", get(list_results))
        .route("/api/ocr/{id}", get(get_result))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

// ── POST /api/ocr/process ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub id: i64,
    pub text: String,
    pub fields: DocumentFields,
    pub original_file_name: String,
    pub content_type: String,
    pub size: i64,
    pub processed_at: DateTime<Utc>,
}

struct Upload {
    file_name: String,
    content_type: String,
    data: axum::body::Bytes,
}

async fn process_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let mut upload: Option<Upload> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Upload(e.to_string()))?;
                upload = Some(Upload { file_name, content_type, data });
            }
            Some("language") => {
                language = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    // Both checks run before any OCR work is started.
    let upload = upload
        .ok_or_else(|| ApiError::Validation("Missing 'file' field in multipart body.".into()))?;
    if upload.data.is_empty() {
        return Err(ApiError::Validation(
            "Uploaded file is empty. Please provide a valid image file.".into(),
        ));
    }
    if !upload.content_type.starts_with("image/") {
        return Err(ApiError::Validation("Only image files are allowed.".into()));
    }

    let run = state
        .pipeline
        .process_bytes(&upload.data, language.as_deref())
        .await?;

    let id = docscan_storage::insert_result(
        &state.db,
        &NewOcrResult {
            file_name: &upload.file_name,
            extracted_text: &run.text,
            content_type: &upload.content_type,
            file_size: upload.data.len() as i64,
            processed_at: run.processed_at,
        },
    )
    .await?;

    info!(
        "processed {} ({} bytes) as result {id}",
        upload.file_name,
        upload.data.len()
    );

    Ok(Json(ProcessResponse {
        id,
        text: run.text,
        fields: run.fields,
        original_file_name: upload.file_name,
        content_type: upload.content_type,
        size: upload.data.len() as i64,
        processed_at: run.processed_at,
    }))
}

// ── GET /api/ocr/results ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    results: Vec<OcrResultRecord>,
    total: i64,
    limit: i64,
    offset: i64,
}

async fn list_results(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);

    let results = docscan_storage::list_results(&state.db, limit, offset).await?;
    let total = docscan_storage::count_results(&state.db).await?;

    Ok(Json(ListResponse { results, total, limit, offset }))
}

// ── GET /api/ocr/{id} ─────────────────────────────────────────────────────────

async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OcrResultRecord>, ApiError> {
    docscan_storage::get_result(&state.db, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use docscan_ocr::MockRecognizer;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-DOCSCAN-TEST-BOUNDARY";

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    async fn test_state(mock: Arc<MockRecognizer>) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = docscan_storage::create_db(&dir.path().join("test.db"))
            .await
            .unwrap();
        let state = AppState::new(
            db,
            mock as Arc<dyn OcrBackend>,
            PreprocessStrategy::Sharpen,
            FieldRuleSet::Standard,
        );
        (dir, state)
    }

    fn file_part_body(content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"cin.png\"\r\n",
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(content_type: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ocr/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(file_part_body(content_type, data)))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let mock = Arc::new(MockRecognizer::new(""));
        let (_dir, state) = test_state(mock).await;
        let response = router(state, 1024 * 1024)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn non_image_content_type_is_rejected_before_ocr() {
        let mock = Arc::new(MockRecognizer::new("should not run"));
        let (_dir, state) = test_state(mock.clone()).await;
        let db = state.db.clone();

        let response = router(state, 1024 * 1024)
            .oneshot(upload_request("text/plain", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.calls(), 0);
        assert_eq!(docscan_storage::count_results(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_file_is_rejected_and_not_persisted() {
        let mock = Arc::new(MockRecognizer::new("should not run"));
        let (_dir, state) = test_state(mock.clone()).await;
        let db = state.db.clone();

        let response = router(state, 1024 * 1024)
            .oneshot(upload_request("image/png", b""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("empty"));
        assert_eq!(mock.calls(), 0);
        assert_eq!(docscan_storage::count_results(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_file_field_is_a_validation_error() {
        let mock = Arc::new(MockRecognizer::new(""));
        let (_dir, state) = test_state(mock).await;

        let body = format!("--{BOUNDARY}--\r\n");
        let request = Request::builder()
            .method("POST")
            .uri("/api/ocr/process")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = router(state, 1024 * 1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn process_persists_and_returns_extracted_fields() {
        let mock = Arc::new(MockRecognizer::new(
            "MARIE CURIE\nNée le: 07.11.1867 à PARIS\n123456789",
        ));
        let (_dir, state) = test_state(mock).await;
        let app = router(state.clone(), 1024 * 1024);

        let response = app
            .clone()
            .oneshot(upload_request("image/png", &tiny_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["originalFileName"], "cin.png");
        assert_eq!(body["contentType"], "image/png");
        assert_eq!(body["fields"]["fullName"], "MARIE CURIE");
        assert_eq!(body["fields"]["birthDate"], "07.11.1867");
        assert_eq!(body["fields"]["birthPlace"], "PARIS");
        assert_eq!(body["fields"]["documentNumber"], "123456789");
        assert!(body["text"].as_str().unwrap().contains("MARIE CURIE"));

        // The stored record returns the creation-time fields unchanged.
        let response = app
            .clone()
            .oneshot(Request::get("/api/ocr/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = response_json(response).await;
        assert_eq!(stored["id"], 1);
        assert_eq!(stored["fileName"], "cin.png");
        assert_eq!(stored["extractedText"], body["text"]);
        assert_eq!(stored["processedAt"], body["processedAt"]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let mock = Arc::new(MockRecognizer::new(""));
        let (_dir, state) = test_state(mock).await;

        let response = router(state, 1024 * 1024)
            .oneshot(Request::get("/api/ocr/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_reflects_upload_count() {
        let mock = Arc::new(MockRecognizer::new("KARIM BENNANI 445566"));
        let (_dir, state) = test_state(mock).await;
        let app = router(state, 1024 * 1024);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(upload_request("image/png", &tiny_png()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/ocr/results?limit=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["limit"], 2);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        // Newest first.
        assert_eq!(results[0]["id"], 3);
    }
}
