mod common;

use common::{fixture, ld_for};
use ldutils_lib::{NewProject, PatchOperation};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_get_projects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("projects-list.json")))
        .expect(1)
        .mount(&server)
        .await;

    let projects = ld_for(&server).projects().get_projects().await.unwrap();
    assert_eq!(projects["items"][0]["key"], "abc123");
}

#[tokio::test]
async fn test_get_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("projects-get.json")))
        .expect(1)
        .mount(&server)
        .await;

    let project = ld_for(&server).projects().get_project("abc123").await.unwrap();
    assert_eq!(project["environments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_project() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/projects"))
        .and(body_json(json!({
            "key": "testProject",
            "name": "Test Project",
            "includeInSnippetByDefault": true,
            "tags": [],
            "environments": [{"key": "dev", "name": "Development", "color": "blue"}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixture("projects-create.json")))
        .expect(1)
        .mount(&server)
        .await;

    let project = NewProject::from_args(
        "testProject",
        "Test Project",
        Some("true"),
        Some("dev,Development,blue"),
        None,
        None,
        None,
    )
    .unwrap();
    let created = ld_for(&server).projects().create_project(&project).await.unwrap();
    assert_eq!(created["key"], "testProject");
}

#[tokio::test]
async fn test_update_project() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/projects/abc123"))
        .and(body_json(json!([{"op": "add", "path": "/tags/0", "value": "online"}])))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture("projects-get.json")))
        .expect(1)
        .mount(&server)
        .await;

    ld_for(&server)
        .projects()
        .update_project("abc123", &[PatchOperation::add("/tags/0", json!("online"))])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_project() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/projects/abc123"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    ld_for(&server).projects().delete_project("abc123").await.unwrap();
}
