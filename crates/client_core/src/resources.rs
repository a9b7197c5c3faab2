use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        ClassId, Classroom, ContentNode, ContentNodeId, LearnerGroup, Lesson, LessonId,
        ResourceRef,
    },
    error::{ApiError, ApiException},
};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

#[async_trait]
pub trait LessonResource: Send + Sync {
    async fn get_collection(&self, class_id: &ClassId) -> Result<Vec<Lesson>>;
    async fn get_model(&self, lesson_id: &LessonId) -> Result<Lesson>;
    /// Replaces the lesson's whole resource list; there is no partial update.
    async fn save_resources(
        &self,
        lesson_id: &LessonId,
        resources: &[ResourceRef],
    ) -> Result<Lesson>;
}

#[async_trait]
pub trait LearnerGroupResource: Send + Sync {
    async fn get_collection(&self, class_id: &ClassId) -> Result<Vec<LearnerGroup>>;
}

#[async_trait]
pub trait ContentNodeResource: Send + Sync {
    async fn get_model(&self, node_id: &ContentNodeId) -> Result<ContentNode>;
    async fn get_collection(&self, parent_id: &ContentNodeId) -> Result<Vec<ContentNode>>;
    /// Ancestor chain ordered root first, exclusive of the node itself.
    async fn fetch_ancestors(&self, node_id: &ContentNodeId) -> Result<Vec<ContentNode>>;
    /// Cache-only side effect; never triggers a request or invalidates a
    /// fetched collection.
    async fn update_progress(&self, node_id: &ContentNodeId, progress_fraction: f64);
}

#[async_trait]
pub trait ClassroomResource: Send + Sync {
    async fn get_model(&self, class_id: &ClassId) -> Result<Classroom>;
}

#[derive(Serialize)]
struct SaveResourcesRequest<'a> {
    resources: &'a [ResourceRef],
}

/// Resource layer backed by the platform's REST API. Content-node models are
/// cached per id, which is what lets a progress update touch a single field
/// without refetching the node's containing collection.
pub struct HttpResources {
    http: Client,
    base_url: Url,
    node_cache: RwLock<HashMap<ContentNodeId, ContentNode>>,
}

impl HttpResources {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .with_context(|| format!("invalid resource base url: {}", base_url.as_ref()))?;
        Ok(Self {
            http: Client::new(),
            base_url,
            node_cache: RwLock::new(HashMap::new()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid resource path: {path}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        let response = self.http.get(url).query(query).send().await?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
        return Err(ApiException::from(api_error).into());
    }
    Err(anyhow!("resource request failed with status {status}: {body}"))
}

#[async_trait]
impl LessonResource for HttpResources {
    async fn get_collection(&self, class_id: &ClassId) -> Result<Vec<Lesson>> {
        let url = self.endpoint("api/lessons")?;
        self.get_json(url, &[("collection", class_id.as_str())])
            .await
    }

    async fn get_model(&self, lesson_id: &LessonId) -> Result<Lesson> {
        let url = self.endpoint(&format!("api/lessons/{lesson_id}"))?;
        self.get_json(url, &[]).await
    }

    async fn save_resources(
        &self,
        lesson_id: &LessonId,
        resources: &[ResourceRef],
    ) -> Result<Lesson> {
        let url = self.endpoint(&format!("api/lessons/{lesson_id}"))?;
        let response = self
            .http
            .patch(url)
            .json(&SaveResourcesRequest { resources })
            .send()
            .await?;
        decode_response(response).await
    }
}

#[async_trait]
impl LearnerGroupResource for HttpResources {
    async fn get_collection(&self, class_id: &ClassId) -> Result<Vec<LearnerGroup>> {
        let url = self.endpoint("api/learnergroups")?;
        self.get_json(url, &[("parent", class_id.as_str())]).await
    }
}

#[async_trait]
impl ContentNodeResource for HttpResources {
    async fn get_model(&self, node_id: &ContentNodeId) -> Result<ContentNode> {
        {
            let cache = self.node_cache.read().await;
            if let Some(node) = cache.get(node_id) {
                debug!(node_id = %node_id, "content node served from model cache");
                return Ok(node.clone());
            }
        }

        let url = self.endpoint(&format!("api/contentnodes/{node_id}"))?;
        let node: ContentNode = self.get_json(url, &[]).await?;
        self.node_cache
            .write()
            .await
            .insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn get_collection(&self, parent_id: &ContentNodeId) -> Result<Vec<ContentNode>> {
        let url = self.endpoint("api/contentnodes")?;
        let nodes: Vec<ContentNode> = self
            .get_json(url, &[("parent", parent_id.as_str())])
            .await?;

        let mut cache = self.node_cache.write().await;
        for node in &nodes {
            cache.insert(node.id.clone(), node.clone());
        }
        Ok(nodes)
    }

    async fn fetch_ancestors(&self, node_id: &ContentNodeId) -> Result<Vec<ContentNode>> {
        let url = self.endpoint(&format!("api/contentnodes/{node_id}/ancestors"))?;
        self.get_json(url, &[]).await
    }

    async fn update_progress(&self, node_id: &ContentNodeId, progress_fraction: f64) {
        let mut cache = self.node_cache.write().await;
        match cache.get_mut(node_id) {
            Some(node) => node.progress_fraction = Some(progress_fraction),
            None => {
                debug!(node_id = %node_id, "progress update dropped for uncached content node")
            }
        }
    }
}

#[async_trait]
impl ClassroomResource for HttpResources {
    async fn get_model(&self, class_id: &ClassId) -> Result<Classroom> {
        let url = self.endpoint(&format!("api/classrooms/{class_id}"))?;
        self.get_json(url, &[]).await
    }
}

#[cfg(test)]
#[path = "tests/resources_tests.rs"]
mod tests;
