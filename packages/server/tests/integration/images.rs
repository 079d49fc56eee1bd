use snapmap_server::config::UploadConfig;

use crate::common::{Location, SPRINGFIELD, TestApp, png_bytes, routes};

mod image_upload {
    use super::*;

    #[tokio::test]
    async fn single_png_upload_is_listed() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(SPRINGFIELD, &[("fileA.png", png_bytes(2 * 1024))])
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        let files = res.files();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".png"));

        let list = app.get(routes::IMAGES).await;
        assert_eq!(list.status, 200);
        let records = list.body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["filename"], files[0].as_str());
        assert_eq!(records[0]["town"], "Springfield");
        assert_eq!(records[0]["lat"], "44.0");
        assert_eq!(records[0]["lon"], "-72.5");
        assert_eq!(records[0]["originalName"], "fileA.png");
        assert!(records[0]["uploadedAt"].as_str().is_some());
    }

    #[tokio::test]
    async fn batch_upload_returns_a_name_per_file() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                SPRINGFIELD,
                &[
                    ("one.jpg", png_bytes(100)),
                    ("two.GIF", png_bytes(200)),
                    ("three.webp", png_bytes(300)),
                ],
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let files = res.files();
        assert_eq!(files.len(), 3);

        let list = app.get(routes::IMAGES).await;
        let listed: Vec<&str> = list
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["filename"].as_str().unwrap())
            .collect();
        assert_eq!(listed, files);
        assert_eq!(app.stored_file_count(), 3);
    }

    #[tokio::test]
    async fn ten_files_is_the_maximum() {
        let app = TestApp::spawn().await;
        let names: Vec<String> = (0..11).map(|i| format!("p{i}.png")).collect();
        let files: Vec<(&str, Vec<u8>)> =
            names.iter().map(|n| (n.as_str(), png_bytes(64))).collect();

        let res = app.upload(SPRINGFIELD, &files).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_file_count(), 0);

        let res = app.upload(SPRINGFIELD, &files[..10]).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.files().len(), 10);
    }

    #[tokio::test]
    async fn unknown_fields_are_ignored() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new()
            .text("town", "Springfield")
            .text("lat", "44.0")
            .text("lon", "-72.5")
            .text("caption", "ignored")
            .part(
                "photos",
                reqwest::multipart::Part::bytes(png_bytes(32)).file_name("a.png"),
            );

        let res = app.post_form(routes::UPLOAD, form).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
}

mod upload_validation {
    use super::*;

    #[tokio::test]
    async fn missing_town_is_rejected() {
        let app = TestApp::spawn().await;
        let location = Location {
            town: None,
            ..SPRINGFIELD
        };

        let res = app.upload(location, &[("a.png", png_bytes(16))]).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Missing data");
        assert_eq!(app.stored_file_count(), 0);
        assert!(app.state.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn empty_fields_are_rejected() {
        let app = TestApp::spawn().await;
        for location in [
            Location {
                town: Some(""),
                lat: Some("1"),
                lon: Some("1"),
            },
            Location {
                lat: Some(""),
                ..SPRINGFIELD
            },
            Location {
                lon: Some(""),
                ..SPRINGFIELD
            },
        ] {
            let res = app.upload(location, &[("fileA.png", png_bytes(16))]).await;
            assert_eq!(res.status, 400);
            assert_eq!(res.body["error"], "Missing data");
        }

        let list = app.get(routes::IMAGES).await;
        assert_eq!(list.body.as_array().unwrap().len(), 0);
        assert_eq!(app.stored_file_count(), 0);
    }

    #[tokio::test]
    async fn upload_without_photos_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.upload(SPRINGFIELD, &[]).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Missing data");
    }

    #[tokio::test]
    async fn missing_data_is_reported_before_file_problems() {
        let app = TestApp::spawn().await;
        let location = Location {
            lat: None,
            ..SPRINGFIELD
        };
        let res = app.upload(location, &[("notes.txt", b"hello".to_vec())]).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["error"], "Missing data");
    }

    #[tokio::test]
    async fn disallowed_type_rejects_whole_upload() {
        let app = TestApp::spawn().await;

        let res = app
            .upload(
                SPRINGFIELD,
                &[
                    ("good.png", png_bytes(16)),
                    ("script.svg", b"<svg/>".to_vec()),
                ],
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "UNSUPPORTED_FILE");
        assert_eq!(app.stored_file_count(), 0);
        let list = app.get(routes::IMAGES).await;
        assert_eq!(list.body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn oversize_file_rejects_whole_upload() {
        let app = TestApp::spawn_with(UploadConfig {
            max_file_size: 1024,
            ..UploadConfig::default()
        })
        .await;

        let res = app
            .upload(
                SPRINGFIELD,
                &[("small.png", png_bytes(512)), ("big.png", png_bytes(4096))],
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "UNSUPPORTED_FILE");
        assert_eq!(app.stored_file_count(), 0);
        assert!(app.state.ledger.is_empty().await);
    }

    #[tokio::test]
    async fn file_past_the_body_limit_is_unsupported() {
        let app = TestApp::spawn_with(UploadConfig {
            max_file_size: 1024,
            ..UploadConfig::default()
        })
        .await;

        // Larger than max_files * max_file_size plus the form overhead.
        let res = app
            .upload(SPRINGFIELD, &[("huge.png", png_bytes(3 * 1024 * 1024))])
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "UNSUPPORTED_FILE");
        assert_eq!(app.stored_file_count(), 0);
        assert!(app.state.ledger.is_empty().await);
    }
}

mod image_fetch {
    use super::*;

    #[tokio::test]
    async fn fetch_returns_uploaded_bytes_with_content_type() {
        let app = TestApp::spawn().await;
        let data = png_bytes(3000);
        let name = app.upload_one("photo.png", data.clone()).await;

        let res = app.get(&routes::image(&name)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.content_type.as_deref(), Some("image/png"));
        assert_eq!(res.bytes, data);
    }

    #[tokio::test]
    async fn fetch_is_idempotent() {
        let app = TestApp::spawn().await;
        let name = app.upload_one("photo.jpeg", png_bytes(777)).await;

        let first = app.get(&routes::image(&name)).await;
        let second = app.get(&routes::image(&name)).await;

        assert_eq!(first.status, 200);
        assert_eq!(first.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(first.bytes, second.bytes);
    }

    #[tokio::test]
    async fn unknown_name_is_plain_text_not_found() {
        let app = TestApp::spawn().await;
        app.upload_one("photo.png", png_bytes(10)).await;

        let res = app.get(&routes::image("1700000000000-123.png")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.text, "Not found");
        assert!(
            res.content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("text/plain"))
        );
    }

    #[tokio::test]
    async fn traversal_attempts_are_not_found() {
        let app = TestApp::spawn().await;
        app.upload_one("photo.png", png_bytes(10)).await;

        for path in [
            "..%2Fdata%2Fmetadata.json",
            "..%2F..%2F..%2Fetc%2Fpasswd",
            "..%5Cdata%5Cmetadata.json",
            "%2Etmp",
        ] {
            let res = app.get(&routes::image(path)).await;
            assert_eq!(res.status, 404, "{path} should not be served");
            assert_eq!(res.text, "Not found");
        }
    }
}

mod listing {
    use snapmap_common::MetadataLedger;

    use super::*;

    #[tokio::test]
    async fn empty_listing_is_an_empty_array() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::IMAGES).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn listing_keeps_upload_order_across_requests() {
        let app = TestApp::spawn().await;
        let first = app.upload_one("first.png", png_bytes(10)).await;
        let res = app
            .upload(
                Location {
                    town: Some("Shelbyville"),
                    lat: Some("39.4"),
                    lon: Some("-88.8"),
                },
                &[("second.gif", png_bytes(10))],
            )
            .await;
        let second = res.files().remove(0);

        let list = app.get(routes::IMAGES).await;
        let records = list.body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["filename"], first.as_str());
        assert_eq!(records[1]["filename"], second.as_str());
        assert_eq!(records[1]["town"], "Shelbyville");
    }

    #[tokio::test]
    async fn records_are_durable_on_disk() {
        let app = TestApp::spawn().await;
        let name = app.upload_one("photo.webp", png_bytes(10)).await;

        let reopened = MetadataLedger::open(&app.state.config.storage.ledger_path)
            .await
            .unwrap();
        let records = reopened.list_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, name);
    }
}

mod cors {
    use super::*;

    #[tokio::test]
    async fn any_origin_is_allowed() {
        let app = TestApp::spawn().await;
        let res = app
            .client
            .get(format!("http://{}{}", app.addr, routes::IMAGES))
            .header("Origin", "https://example.org")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), 200);
        assert_eq!(
            res.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
