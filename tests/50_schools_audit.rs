mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use cemse_api::database::{AuditAction, AuditFilter, EntityType};
use cemse_api::permissions::Role;
use common::{json_body, spawn};

#[tokio::test]
async fn schools_are_managed_by_administrators() -> Result<()> {
    let app = spawn().await?;
    let (_, user_token) = app.seed(Role::User, "ana@cemse.org").await;
    let (admin, admin_token) = app.seed(Role::Admin, "admin@cemse.org").await;

    let resp = app.get("/api/schools", Some(&user_token)).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await["data"].as_array().unwrap().is_empty());

    let payload = json!({ "name": "Colegio Sur", "code": "cs-02", "address": "  " });
    let resp = app.post("/api/schools", Some(&user_token)).json(&payload).send().await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.post("/api/schools", Some(&admin_token)).json(&payload).send().await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["data"]["code"], "CS-02");
    assert!(body["data"]["address"].is_null());
    let school_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = app.post("/api/schools", Some(&admin_token)).json(&payload).send().await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .post("/api/schools", Some(&admin_token))
        .json(&json!({ "name": "Colegio Norte", "code": "NO SPACES" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .patch(&format!("/api/schools/{}", school_id), Some(&admin_token))
        .json(&json!({ "name": "Colegio del Sur", "address": "Av. Principal 12" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["data"]["name"], "Colegio del Sur");
    assert_eq!(body["data"]["address"], "Av. Principal 12");

    let entries = app
        .audit_entries(
            AuditFilter {
                entity_type: Some(EntityType::School),
                actor_id: Some(admin.id),
                ..Default::default()
            },
            2,
        )
        .await;
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert!(actions.contains(&AuditAction::Create));
    assert!(actions.contains(&AuditAction::Update));
    Ok(())
}

#[tokio::test]
async fn only_super_admin_deactivates_schools() -> Result<()> {
    let app = spawn().await?;
    let (_, user_token) = app.seed(Role::User, "ana@cemse.org").await;
    let (_, admin_token) = app.seed(Role::Admin, "admin@cemse.org").await;
    let (_, root_token) = app.seed(Role::SuperAdmin, "root@cemse.org").await;

    let resp = app
        .post("/api/schools", Some(&admin_token))
        .json(&json!({ "name": "Colegio Este", "code": "CE-03" }))
        .send()
        .await?;
    let school_id = json_body(resp).await["data"]["id"].as_str().unwrap().to_string();

    let resp = app
        .delete(&format!("/api/schools/{}", school_id), Some(&admin_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .delete(&format!("/api/schools/{}", school_id), Some(&root_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["is_active"], false);

    // Inactive schools are hidden from everyone but administrators
    let resp = app
        .get(&format!("/api/schools/{}", school_id), Some(&user_token))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.get("/api/schools?include_inactive=true", Some(&user_token)).send().await?;
    assert!(json_body(resp).await["data"].as_array().unwrap().is_empty());

    let resp = app.get("/api/schools?include_inactive=true", Some(&admin_token)).send().await?;
    assert_eq!(json_body(resp).await["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn audit_trail_is_admin_only_and_filterable() -> Result<()> {
    let app = spawn().await?;
    let (_, user_token) = app.seed(Role::User, "ana@cemse.org").await;
    let (admin, admin_token) = app.seed(Role::Admin, "admin@cemse.org").await;

    for code in ["AA-01", "AA-02", "AA-03"] {
        let resp = app
            .post("/api/schools", Some(&admin_token))
            .json(&json!({ "name": format!("Escuela {}", code), "code": code }))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
    app.audit_entries(
        AuditFilter {
            actor_id: Some(admin.id),
            ..Default::default()
        },
        3,
    )
    .await;

    let resp = app.get("/api/audit", Some(&user_token)).send().await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app.get("/api/audit?entity_type=SCHOOL", Some(&admin_token)).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e["action"] == "CREATE"));
    let mut codes: Vec<&str> = entries.iter().map(|e| e["metadata"]["code"].as_str().unwrap()).collect();
    codes.sort();
    assert_eq!(codes, vec!["AA-01", "AA-02", "AA-03"]);

    let resp = app
        .get(&format!("/api/audit?actor_id={}&limit=2", admin.id), Some(&admin_token))
        .send()
        .await?;
    assert_eq!(json_body(resp).await["data"].as_array().unwrap().len(), 2);

    let resp = app.get("/api/audit?entity_type=BOGUS", Some(&admin_token)).send().await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
