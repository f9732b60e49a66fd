mod common;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use uuid::Uuid;

use cemse_api::database::{AuditAction, AuditFilter, EntityType};
use cemse_api::permissions::Role;
use common::{json_body, spawn, MAX_BATCH_FILES, MAX_FILE_BYTES};

fn file_part(name: &str, content_type: &str, bytes: Vec<u8>) -> Result<Part> {
    Ok(Part::bytes(bytes).file_name(name.to_string()).mime_str(content_type)?)
}

#[tokio::test]
async fn single_upload_lands_in_the_folder() -> Result<()> {
    let app = spawn().await?;
    let (user, token) = app.seed(Role::User, "ana@cemse.org").await;

    let form = Form::new()
        .text("folder", "avatars")
        .part("file", file_part("mi foto.png", "image/png", vec![7u8; 64])?);
    let resp = app.post("/api/files", Some(&token)).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("avatars/"));
    assert!(path.ends_with("-mi_foto.png"));
    assert_eq!(body["data"]["size"], 64);
    assert_eq!(body["data"]["sha256"].as_str().unwrap().len(), 64);

    let on_disk = tokio::fs::read(app.upload_dir.join(&path)).await?;
    assert_eq!(on_disk.len(), 64);

    let entries = app
        .audit_entries(
            AuditFilter {
                actor_id: Some(user.id),
                entity_type: Some(EntityType::File),
                ..Default::default()
            },
            1,
        )
        .await;
    assert_eq!(entries[0].action, AuditAction::Upload);
    assert_eq!(entries[0].entity_id.as_deref(), Some(path.as_str()));
    Ok(())
}

#[tokio::test]
async fn invalid_uploads_are_refused() -> Result<()> {
    let app = spawn().await?;
    let (_, token) = app.seed(Role::User, "ana@cemse.org").await;

    let form = Form::new().part("file", file_part("virus.exe", "application/x-msdownload", vec![1u8; 10])?);
    let resp = app.post("/api/files", Some(&token)).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let form = Form::new().part("file", file_part("big.pdf", "application/pdf", vec![1u8; MAX_FILE_BYTES + 1])?);
    let resp = app.post("/api/files", Some(&token)).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let form = Form::new()
        .text("folder", "../etc")
        .part("file", file_part("a.pdf", "application/pdf", vec![1u8; 10])?);
    let resp = app.post("/api/files", Some(&token)).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let form = Form::new().text("folder", "documents");
    let resp = app.post("/api/files", Some(&token)).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn evidence_batch_reports_skipped_files() -> Result<()> {
    let app = spawn().await?;
    let (_, token) = app.seed(Role::Director, "director@cemse.org").await;
    let case_id = Uuid::new_v4();

    let form = Form::new()
        .part("files", file_part("acta.pdf", "application/pdf", vec![1u8; 100])?)
        .part("files", file_part("nota.txt", "text/plain", vec![2u8; 100])?)
        .part("files", file_part("foto.jpg", "image/jpeg", vec![3u8; 200])?)
        .part("files", file_part("extra.png", "image/png", vec![4u8; 50])?);
    assert!(MAX_BATCH_FILES < 4);

    let resp = app
        .post(&format!("/api/files/evidence/{}", case_id), Some(&token))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    assert_eq!(body["data"]["case_id"], case_id.to_string());
    let uploaded: Vec<&str> = body["data"]["uploaded"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["file_name"].as_str().unwrap())
        .collect();
    assert_eq!(uploaded, vec!["acta.pdf", "foto.jpg"]);

    let skipped = body["data"]["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 2);
    assert_eq!(skipped[0]["file_name"], "nota.txt");
    assert!(skipped[0]["reason"].as_str().unwrap().contains("text/plain"));
    assert_eq!(skipped[1]["file_name"], "extra.png");
    assert!(skipped[1]["reason"].as_str().unwrap().contains("batch limit"));

    let resp = app
        .get(&format!("/api/files/evidence/{}", case_id), Some(&token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed = json_body(resp).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);

    let resp = app
        .get(&format!("/api/files/evidence/{}", Uuid::new_v4()), Some(&token))
        .send()
        .await?;
    assert!(json_body(resp).await["data"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn oversized_evidence_is_skipped_without_failing_the_batch() -> Result<()> {
    let app = spawn().await?;
    let (_, token) = app.seed(Role::User, "ana@cemse.org").await;
    let case_id = Uuid::new_v4();

    // Over the file limit but inside the request body limit: the batch goes on
    let form = Form::new()
        .part("files", file_part("grande.pdf", "application/pdf", vec![1u8; MAX_FILE_BYTES * 2])?)
        .part("files", file_part("acta.pdf", "application/pdf", vec![2u8; 100])?);
    let resp = app
        .post(&format!("/api/files/evidence/{}", case_id), Some(&token))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["data"]["uploaded"][0]["file_name"], "acta.pdf");
    assert_eq!(body["data"]["skipped"][0]["file_name"], "grande.pdf");
    assert!(body["data"]["skipped"][0]["reason"].as_str().unwrap().contains("maximum"));

    // Larger than the whole request body limit: files before it are still reported
    let other_case = Uuid::new_v4();
    let form = Form::new()
        .part("files", file_part("a.pdf", "application/pdf", vec![3u8; 100])?)
        .part("files", file_part("big.pdf", "application/pdf", vec![4u8; 80_000])?);
    let resp = app
        .post(&format!("/api/files/evidence/{}", other_case), Some(&token))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    let uploaded = body["data"]["uploaded"].as_array().unwrap();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0]["file_name"], "a.pdf");
    assert_eq!(body["data"]["skipped"][0]["file_name"], "big.pdf");

    let resp = app
        .get(&format!("/api/files/evidence/{}", other_case), Some(&token))
        .send()
        .await?;
    assert_eq!(json_body(resp).await["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn single_upload_over_the_body_limit_is_413() -> Result<()> {
    let app = spawn().await?;
    let (_, token) = app.seed(Role::User, "ana@cemse.org").await;

    let form = Form::new().part("file", file_part("big.pdf", "application/pdf", vec![1u8; 80_000])?);
    let resp = app.post("/api/files", Some(&token)).multipart(form).send().await?;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn evidence_batch_needs_files() -> Result<()> {
    let app = spawn().await?;
    let (_, token) = app.seed(Role::User, "ana@cemse.org").await;

    let form = Form::new().text("note", "nothing attached");
    let resp = app
        .post(&format!("/api/files/evidence/{}", Uuid::new_v4()), Some(&token))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_admins_delete_files() -> Result<()> {
    let app = spawn().await?;
    let (_, user_token) = app.seed(Role::User, "ana@cemse.org").await;
    let (_, admin_token) = app.seed(Role::Admin, "admin@cemse.org").await;

    let form = Form::new().part("file", file_part("acta.pdf", "application/pdf", vec![1u8; 10])?);
    let resp = app.post("/api/files", Some(&user_token)).multipart(form).send().await?;
    let path = json_body(resp).await["data"]["path"].as_str().unwrap().to_string();

    let resp = app
        .delete(&format!("/api/files?path={}", path), Some(&user_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .delete("/api/files?path=documents/../../secret", Some(&admin_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .delete(&format!("/api/files?path={}", path), Some(&admin_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!app.upload_dir.join(&path).exists());

    let resp = app
        .delete(&format!("/api/files?path={}", path), Some(&admin_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
