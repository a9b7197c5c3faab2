use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use shared::{domain::ContentNodeKind, error::ErrorCode};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ApiState {
    lesson_collection_filters: Arc<Mutex<Vec<String>>>,
    node_fetches: Arc<Mutex<Vec<String>>>,
    saved_resource_lists: Arc<Mutex<Vec<Vec<ResourceRef>>>>,
}

fn sample_lesson(id: &str, class_id: &str) -> Lesson {
    Lesson {
        id: id.into(),
        name: format!("Lesson {id}"),
        description: String::new(),
        collection: class_id.into(),
        is_active: true,
        date_created: Some("2024-01-01T00:00:00Z".parse().expect("timestamp")),
        resources: vec![ResourceRef::new("node-1")],
    }
}

fn sample_node(id: &str) -> ContentNode {
    ContentNode {
        id: id.into(),
        kind: ContentNodeKind::Video,
        title: format!("Node {id}"),
        description: String::new(),
        files: Vec::new(),
        parent: Some("topic-1".into()),
        channel_id: Some("channel-a".into()),
        copies_count: None,
        progress_fraction: None,
        assessment_metadata: None,
    }
}

#[derive(Deserialize)]
struct CollectionFilter {
    collection: String,
}

async fn list_lessons(
    State(state): State<ApiState>,
    Query(filter): Query<CollectionFilter>,
) -> Json<Vec<Lesson>> {
    state
        .lesson_collection_filters
        .lock()
        .await
        .push(filter.collection.clone());
    Json(vec![sample_lesson("lesson-1", &filter.collection)])
}

async fn get_lesson(
    Path(id): Path<String>,
) -> Result<Json<Lesson>, (StatusCode, Json<shared::error::ApiError>)> {
    if id == "missing" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(shared::error::ApiError::new(
                ErrorCode::NotFound,
                "no such lesson",
            )),
        ));
    }
    Ok(Json(sample_lesson(&id, "class-1")))
}

#[derive(Deserialize)]
struct SaveBody {
    resources: Vec<ResourceRef>,
}

async fn save_lesson(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<SaveBody>,
) -> Json<Lesson> {
    state
        .saved_resource_lists
        .lock()
        .await
        .push(body.resources.clone());
    let mut lesson = sample_lesson(&id, "class-1");
    lesson.resources = body.resources;
    Json(lesson)
}

#[derive(Deserialize)]
struct ParentFilter {
    parent: String,
}

async fn list_learner_groups(Query(filter): Query<ParentFilter>) -> Json<Vec<LearnerGroup>> {
    Json(vec![LearnerGroup {
        id: "group-1".into(),
        name: "Group 1".to_string(),
        parent: filter.parent.as_str().into(),
    }])
}

async fn list_content_nodes(Query(filter): Query<ParentFilter>) -> Json<Vec<ContentNode>> {
    let mut child = sample_node("child-1");
    child.parent = Some(filter.parent.as_str().into());
    Json(vec![child])
}

async fn get_content_node(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ContentNode>, StatusCode> {
    state.node_fetches.lock().await.push(id.clone());
    if id == "missing" {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(sample_node(&id)))
}

async fn get_ancestors(Path(id): Path<String>) -> Json<Vec<ContentNode>> {
    let mut root = sample_node("channel-a-root");
    root.parent = None;
    let mut topic = sample_node("topic-1");
    topic.title = format!("Parent of {id}");
    Json(vec![root, topic])
}

async fn get_classroom(Path(id): Path<String>) -> Json<Classroom> {
    Json(Classroom {
        id: id.as_str().into(),
        name: format!("Class {id}"),
    })
}

async fn spawn_api_server() -> Result<(String, ApiState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ApiState::default();
    let app = Router::new()
        .route("/api/lessons", get(list_lessons))
        .route("/api/lessons/:id", get(get_lesson).patch(save_lesson))
        .route("/api/learnergroups", get(list_learner_groups))
        .route("/api/contentnodes", get(list_content_nodes))
        .route("/api/contentnodes/:id", get(get_content_node))
        .route("/api/contentnodes/:id/ancestors", get(get_ancestors))
        .route("/api/classrooms/:id", get(get_classroom))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn lesson_collection_passes_the_class_filter() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let lessons = LessonResource::get_collection(&resources, &"class-7".into())
        .await
        .expect("lesson collection");

    assert_eq!(lessons.len(), 1);
    assert_eq!(lessons[0].collection, ClassId::from("class-7"));
    assert_eq!(
        state.lesson_collection_filters.lock().await.clone(),
        vec!["class-7".to_string()]
    );
}

#[tokio::test]
async fn learner_groups_and_classroom_fetch_by_class() {
    let (server_url, _state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let groups = LearnerGroupResource::get_collection(&resources, &"class-7".into())
        .await
        .expect("learner groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].parent, ClassId::from("class-7"));

    let classroom = ClassroomResource::get_model(&resources, &"class-7".into())
        .await
        .expect("classroom");
    assert_eq!(classroom.name, "Class class-7");
}

#[tokio::test]
async fn content_node_models_are_cached_per_id() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");
    let node_id = ContentNodeId::from("node-5");

    let first = ContentNodeResource::get_model(&resources, &node_id)
        .await
        .expect("first fetch");
    let second = ContentNodeResource::get_model(&resources, &node_id)
        .await
        .expect("second fetch");

    assert_eq!(first, second);
    assert_eq!(
        state.node_fetches.lock().await.clone(),
        vec!["node-5".to_string()]
    );
}

#[tokio::test]
async fn progress_update_touches_only_the_cached_model() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");
    let node_id = ContentNodeId::from("node-5");

    let before = ContentNodeResource::get_model(&resources, &node_id)
        .await
        .expect("fetch");
    assert_eq!(before.progress_fraction, None);

    resources.update_progress(&node_id, 0.5).await;
    // Unknown ids are dropped silently rather than minting phantom models.
    resources.update_progress(&"node-unknown".into(), 1.0).await;

    let after = ContentNodeResource::get_model(&resources, &node_id)
        .await
        .expect("cached fetch");
    assert_eq!(after.progress_fraction, Some(0.5));
    assert_eq!(after.title, before.title);
    assert_eq!(
        state.node_fetches.lock().await.clone(),
        vec!["node-5".to_string()]
    );
}

#[tokio::test]
async fn collection_fetch_populates_the_model_cache() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let children = ContentNodeResource::get_collection(&resources, &"topic-1".into())
        .await
        .expect("children");
    assert_eq!(children.len(), 1);

    let cached = ContentNodeResource::get_model(&resources, &"child-1".into())
        .await
        .expect("cached model");
    assert_eq!(cached.id, ContentNodeId::from("child-1"));
    assert!(state.node_fetches.lock().await.is_empty());
}

#[tokio::test]
async fn ancestors_come_back_root_first() {
    let (server_url, _state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let ancestors = resources
        .fetch_ancestors(&"topic-9".into())
        .await
        .expect("ancestors");
    let ids: Vec<&str> = ancestors.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids, vec!["channel-a-root", "topic-1"]);
}

#[tokio::test]
async fn save_resources_replaces_the_list_via_patch() {
    let (server_url, state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let saved = resources
        .save_resources(
            &"lesson-1".into(),
            &[ResourceRef::new("node-1"), ResourceRef::new("node-2")],
        )
        .await
        .expect("save");

    assert_eq!(saved.resources.len(), 2);
    let recorded = state.saved_resource_lists.lock().await.clone();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0][1].contentnode_id, ContentNodeId::from("node-2"));
}

#[tokio::test]
async fn structured_error_bodies_surface_as_api_exceptions() {
    let (server_url, _state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let err = LessonResource::get_model(&resources, &"missing".into())
        .await
        .expect_err("must fail");
    let api = err
        .downcast_ref::<ApiException>()
        .expect("api exception in chain");
    assert_eq!(api.code, ErrorCode::NotFound);
    assert_eq!(api.message, "no such lesson");
}

#[tokio::test]
async fn plain_error_statuses_fail_with_the_status_in_the_message() {
    let (server_url, _state) = spawn_api_server().await.expect("spawn server");
    let resources = HttpResources::new(&server_url).expect("client");

    let err = ContentNodeResource::get_model(&resources, &"missing".into())
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("500"), "unexpected error: {err}");
}

#[test]
fn rejects_an_invalid_base_url() {
    assert!(HttpResources::new("not a url").is_err());
}

#[tokio::test]
async fn loader_over_http_assembles_the_root_page() {
    use crate::{LessonPageLoader, MemoryPageStore, PageLoadOutcome};
    use shared::protocol::LessonsPageName;

    let (server_url, _state) = spawn_api_server().await.expect("spawn server");
    let store = Arc::new(MemoryPageStore::new());
    let loader = LessonPageLoader::over_http(&server_url, store.clone()).expect("loader");

    let outcome = loader.show_lessons_root_page(&"class-7".into()).await;
    assert_eq!(outcome, PageLoadOutcome::Loaded);

    let view = store.view();
    assert!(!view.page_loading);
    assert_eq!(view.page_name, Some(LessonsPageName::Root));
    assert_eq!(view.title, "Lessons");
    assert_eq!(view.lessons.len(), 1);
    assert_eq!(view.learner_groups.len(), 1);
    assert_eq!(
        view.classroom.as_ref().map(|classroom| classroom.name.as_str()),
        Some("Class class-7")
    );
}
