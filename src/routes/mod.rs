//! Route modules for the membership server

pub mod cards;
pub mod form;
pub mod health;
pub mod members;
pub mod verify;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Upload limit for identity documents and photos
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(verify::router())
        .merge(members::router())
        .merge(cards::router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use image::{Rgba, RgbaImage};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::{Config, PathsConfig};
    use crate::db::memory_pool;
    use crate::extract::single_page_pdf;

    const BOUNDARY: &str = "membership-test-boundary";

    struct TestApp {
        dir: TempDir,
        state: AppState,
    }

    impl TestApp {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = Config::default();
            config.paths = PathsConfig::under(dir.path());
            config.paths.static_dir = dir.path().join("static");
            config.card.font_regular = dir.path().join("none.ttf");
            config.card.font_bold = dir.path().join("none-bold.ttf");
            for d in config.paths.all_dirs() {
                std::fs::create_dir_all(d).unwrap();
            }

            let state = AppState::new(config, memory_pool().await);
            Self { dir, state }
        }

        fn write_template(&self) {
            RgbaImage::from_pixel(1289, 800, Rgba([255, 255, 255, 255]))
                .save(self.state.config().paths.template_path())
                .unwrap();
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = router(self.state.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }
    }

    /// Build a multipart body from text fields and (name, file name, bytes) files
    fn multipart(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        for (name, file_name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, name, file_name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        (format!("multipart/form-data; boundary={}", BOUNDARY), body)
    }

    fn post_form(
        uri: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> Request<Body> {
        let (content_type, body) = multipart(fields, files);
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, json) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert!(json["ocr_providers"].is_array());
    }

    #[tokio::test]
    async fn test_verify_matching_pdf_returns_token() {
        let app = TestApp::new().await;
        let pdf = single_page_pdf("EPIC No ABC1234567");
        let request = post_form(
            "/verify-document/",
            &[("epic_number", " abc1234567 ")],
            &[("pdf_file", "voter.pdf", pdf.as_slice())],
        );

        let (status, json) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);

        let token = json["verification_token"].as_str().unwrap();
        let session = app.state.verification().get(token).await.unwrap();
        assert_eq!(session.identifier.as_str(), "ABC1234567");
        assert!(session.temp_pdf_path.exists());
    }

    #[tokio::test]
    async fn test_verify_mismatch_names_both_numbers() {
        let app = TestApp::new().await;
        let pdf = single_page_pdf("EPIC No ABC1234567");
        let request = post_form(
            "/verify-document/",
            &[("epic_number", "xyz7654321")],
            &[("pdf_file", "voter.pdf", pdf.as_slice())],
        );

        let (status, json) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["message"],
            "Mismatch: Entered EPIC 'XYZ7654321' does not match PDF EPIC 'ABC1234567'."
        );

        let leftovers = std::fs::read_dir(&app.state.config().paths.temp_upload_dir)
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
        assert!(app.state.verification().is_empty().await);
    }

    #[tokio::test]
    async fn test_verify_rejects_unreadable_pdf_and_cleans_up() {
        let app = TestApp::new().await;
        let request = post_form(
            "/verify-document/",
            &[("epic_number", "abc1234567")],
            &[("pdf_file", "voter.pdf", b"not a pdf".as_slice())],
        );

        let (status, json) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["message"],
            "Could not extract a matching EPIC number from the PDF."
        );

        let leftovers = std::fs::read_dir(&app.state.config().paths.temp_upload_dir)
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
        assert!(app.state.verification().is_empty().await);
    }

    #[tokio::test]
    async fn test_submit_with_unknown_token_is_unauthorized() {
        let app = TestApp::new().await;
        let token = uuid::Uuid::new_v4().to_string();
        let request = post_form(
            "/submit-details/",
            &[
                ("verification_token", token.as_str()),
                ("name", "Priya Raman"),
                ("contact_no", "9876543210"),
            ],
            &[("photo_file", "photo.jpg", b"jpeg bytes".as_slice())],
        );

        let (status, json) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("Invalid or expired verification token"));
    }

    #[tokio::test]
    async fn test_submit_validates_before_consuming_token() {
        let app = TestApp::new().await;
        let pdf = app.dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let session = app
            .state
            .verification()
            .create(pdf, crate::identifier::Identifier::parse("ABC1234567").unwrap())
            .await;
        let token = session.token.to_string();

        let request = post_form(
            "/submit-details/",
            &[
                ("verification_token", token.as_str()),
                ("name", "Priya Raman"),
                ("contact_no", "12345"),
            ],
            &[("photo_file", "photo.jpg", b"jpeg bytes".as_slice())],
        );
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.state.verification().get(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_registers_member() {
        let app = TestApp::new().await;
        let pdf = app.state.config().paths.temp_upload_dir.join("abc_doc.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let session = app
            .state
            .verification()
            .create(pdf.clone(), crate::identifier::Identifier::parse("ABC1234567").unwrap())
            .await;
        let token = session.token.to_string();

        let request = post_form(
            "/submit-details/",
            &[
                ("verification_token", token.as_str()),
                ("name", "Priya Raman"),
                ("contact_no", "9876543210"),
                ("blood_group", "O+"),
                ("dob", "1990-01-15"),
            ],
            &[("photo_file", "photo.jpg", b"jpeg bytes".as_slice())],
        );
        let (status, json) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);

        let member_id = json["member_id"].as_i64().unwrap();
        let membership_no = json["membership_no"].as_str().unwrap();
        assert!(membership_no.starts_with("BSP-"));
        assert!(membership_no.ends_with(&format!("-{:06}", member_id)));

        // Temp PDF moved, token consumed
        assert!(!pdf.exists());
        assert!(app.state.verification().get(&token).await.is_err());

        let stored = crate::db::MemberRepository::new(app.state.db())
            .get(member_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, "pending_payment");
        let photo = stored.photo_path.unwrap();
        assert!(photo.contains("ABC1234567_"));
        assert!(std::path::Path::new(&photo).exists());
        assert!(std::path::Path::new(&stored.pdf_proof_path.unwrap()).exists());
    }

    #[tokio::test]
    async fn test_failed_registration_removes_stored_files() {
        let app = TestApp::new().await;
        let pdf = app.state.config().paths.temp_upload_dir.join("abc_doc.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        let session = app
            .state
            .verification()
            .create(pdf.clone(), crate::identifier::Identifier::parse("ABC1234567").unwrap())
            .await;
        let token = session.token.to_string();

        // Every insert fails once the pool is closed
        app.state.db().close().await;

        let request = post_form(
            "/submit-details/",
            &[
                ("verification_token", token.as_str()),
                ("name", "Priya Raman"),
                ("contact_no", "9876543210"),
            ],
            &[("photo_file", "photo.jpg", b"jpeg bytes".as_slice())],
        );
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let paths = &app.state.config().paths;
        assert!(!pdf.exists());
        assert_eq!(std::fs::read_dir(&paths.pdf_upload_dir).unwrap().count(), 0);
        assert_eq!(std::fs::read_dir(&paths.photo_upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_update_payment() {
        let app = TestApp::new().await;
        let (_, seeded) = app
            .send(post_form("/seed-member/", &[("name", "Arun")], &[]))
            .await;
        let id = seeded["id"].as_i64().unwrap();

        let update = |member_id: i64| {
            Request::builder()
                .method("POST")
                .uri("/update-payment/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"member_id": {}, "status": "paid"}}"#,
                    member_id
                )))
                .unwrap()
        };

        let (status, json) = app.send(update(id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Payment paid.");

        let (status, _) = app.send(update(id + 1000)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_card_requires_a_key() {
        let app = TestApp::new().await;
        let (status, _) = app.send(post_form("/generate-card/", &[], &[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(post_form("/generate-card/", &[("member_id", "77")], &[]))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_card_without_template() {
        let app = TestApp::new().await;
        app.send(post_form(
            "/seed-member/",
            &[("name", "Arun"), ("membership_no", "BSP-202501-000009")],
            &[],
        ))
        .await;

        let (status, json) = app
            .send(post_form(
                "/generate-card/",
                &[("membership_no", "BSP-202501-000009")],
                &[],
            ))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "template_missing");
    }

    #[tokio::test]
    async fn test_generate_and_download_card() {
        let app = TestApp::new().await;
        app.write_template();
        app.send(post_form(
            "/seed-member/",
            &[("name", "Arun"), ("membership_no", "BSP-202501-000009")],
            &[],
        ))
        .await;

        let (status, json) = app
            .send(post_form(
                "/generate-card/",
                &[("membership_no", "BSP-202501-000009")],
                &[],
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["membership_no"], "BSP-202501-000009");

        let card_path = json["card_path"].as_str().unwrap().to_string();
        assert!(card_path.ends_with("bsp_membership_card_BSP-202501-000009.png"));

        let request = Request::builder()
            .uri(format!("/download-card?card_path={}", card_path))
            .body(Body::empty())
            .unwrap();
        let response = router(app.state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename=\"membership_card_"));
    }

    #[tokio::test]
    async fn test_download_outside_cards_dir_is_not_found() {
        let app = TestApp::new().await;
        let outside = app.dir.path().join("members.sqlite");
        std::fs::write(&outside, b"data").unwrap();

        let request = Request::builder()
            .uri(format!("/download-card?card_path={}", outside.display()))
            .body(Body::empty())
            .unwrap();
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
