mod common;

use common::{fixture_path, ld_for};
use ldutils_lib::{CustomRoleSpec, LdError};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn role(key: &str, name: &str) -> CustomRoleSpec {
    CustomRoleSpec {
        key: key.into(),
        name: name.into(),
        policy: vec![json!({"resources": ["proj/*"], "actions": ["*"], "effect": "allow"})],
        description: None,
    }
}

/// `test-role-one` exists with a stale name, `test-role-two` does not.
async fn mount_one_existing_one_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v2/roles/test-role-one"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "test-role-one",
            "name": "stale",
            "policy": [{"resources": ["proj/*"], "actions": ["*"], "effect": "allow"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/roles/test-role-one"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "test-role-one", "patched": true})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/roles/test-role-two"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/roles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"key": "test-role-two", "created": true})))
        .expect(1)
        .mount(server)
        .await;
}

async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

#[tokio::test]
async fn test_sequential_bulk_upsert_order() {
    let server = MockServer::start().await;
    mount_one_existing_one_missing(&server).await;

    let roles = vec![role("test-role-one", "test role one"), role("test-role-two", "test role two")];
    let results = ld_for(&server)
        .roles()
        .bulk_upsert_custom_roles(&roles)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["patched"], true);
    assert_eq!(results[1]["created"], true);
    assert_eq!(
        request_log(&server).await,
        vec![
            "GET /api/v2/roles/test-role-one",
            "PATCH /api/v2/roles/test-role-one",
            "GET /api/v2/roles/test-role-two",
            "POST /api/v2/roles",
        ]
    );

    let requests = server.received_requests().await.unwrap();
    let patch: Value = requests[1].body_json().unwrap();
    assert_eq!(patch, json!([{"op": "replace", "path": "/name", "value": "test role one"}]));
}

#[tokio::test]
async fn test_parallel_bulk_upsert_keeps_input_order() {
    let server = MockServer::start().await;
    mount_one_existing_one_missing(&server).await;

    let roles = vec![role("test-role-one", "test role one"), role("test-role-two", "test role two")];
    let results = ld_for(&server)
        .roles()
        .bulk_upsert_custom_roles_parallel(&roles)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["key"], "test-role-one");
    assert_eq!(results[1]["key"], "test-role-two");
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_bulk_upsert_aborts_on_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/roles/test-role-one"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Access denied"})))
        .mount(&server)
        .await;

    let roles = vec![role("test-role-one", "one"), role("test-role-two", "two")];
    let err = ld_for(&server)
        .roles()
        .bulk_upsert_custom_roles(&roles)
        .await
        .unwrap_err();
    assert!(matches!(err, LdError::RemoteApi { status: Some(403), .. }));
    assert_eq!(request_log(&server).await, vec!["GET /api/v2/roles/test-role-one"]);
}

#[tokio::test]
async fn test_bulk_upsert_from_file() {
    let server = MockServer::start().await;
    mount_one_existing_one_missing(&server).await;

    let results = ld_for(&server)
        .roles()
        .bulk_upsert_custom_roles_from_file(&fixture_path("custom-roles-bulk-load-file.json"))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_bulk_upsert_from_folder() {
    let server = MockServer::start().await;
    mount_one_existing_one_missing(&server).await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("01-one.json"),
        serde_json::to_string(&role("test-role-one", "test role one")).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("02-two.json"),
        serde_json::to_string(&vec![role("test-role-two", "test role two")]).unwrap(),
    )
    .unwrap();

    let results = ld_for(&server)
        .roles()
        .bulk_upsert_custom_roles_from_folder(dir.path())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[1]["created"], true);
}

#[tokio::test]
async fn test_invalid_bulk_file_sends_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("roles.json");
    std::fs::write(&file, r#"[{"key": "ok", "name": "ok", "policy": []}, {"name": "no key", "policy": []}]"#).unwrap();

    let err = ld_for(&server)
        .roles()
        .bulk_upsert_custom_roles_from_file(&file)
        .await
        .unwrap_err();
    assert!(matches!(err, LdError::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
