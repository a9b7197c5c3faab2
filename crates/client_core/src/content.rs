//! View-state normalization for content nodes, shared by the learn pages and
//! collection mappers.

use std::collections::HashMap;

use serde::Serialize;
use shared::domain::{Channel, ChannelId, ContentNode, ContentNodeKind};

/// Read-only channel lookup passed in by the caller.
pub type ChannelMap = HashMap<ChannelId, Channel>;

pub fn channel_map(channels: &[Channel]) -> ChannelMap {
    channels
        .iter()
        .map(|channel| (channel.id.clone(), channel.clone()))
        .collect()
}

/// First file flagged as an available thumbnail, if any.
pub fn content_node_thumbnail(node: &ContentNode) -> Option<&str> {
    node.files
        .iter()
        .find(|file| file.thumbnail && file.available)
        .map(|file| file.storage_url.as_str())
}

/// A content node denormalized for the view: resolved thumbnail and channel
/// fields on top of a copy of the record. The thumbnail key is omitted from
/// serialized output when absent; channel fields fall back to empty/null when
/// the channel is unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedContentNode {
    #[serde(flatten)]
    pub node: ContentNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub channel_title: String,
    pub channel_thumbnail: Option<String>,
}

pub fn normalize_content_node(node: &ContentNode, channels: &ChannelMap) -> NormalizedContentNode {
    let channel = node.channel_id.as_ref().and_then(|id| channels.get(id));
    let mut copy = node.clone();
    // Root nodes self-identify as channels regardless of their stored kind.
    if copy.parent.is_none() {
        copy.kind = ContentNodeKind::Channel;
    }
    NormalizedContentNode {
        thumbnail: content_node_thumbnail(node).map(str::to_string),
        channel_title: channel.map(|c| c.name.clone()).unwrap_or_default(),
        channel_thumbnail: channel.and_then(|c| c.thumbnail.clone()),
        node: copy,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentMetadataState {
    pub assessment: bool,
    pub assessment_ids: Vec<String>,
    pub mastery_model: Option<serde_json::Value>,
    pub randomize: bool,
}

impl AssessmentMetadataState {
    fn blank() -> Self {
        Self {
            assessment: false,
            assessment_ids: Vec::new(),
            mastery_model: None,
            randomize: false,
        }
    }
}

/// A node counts as an assessment only when its metadata carries both item
/// ids and a mastery model; anything less maps to the blank state.
pub fn assessment_metadata_state(node: &ContentNode) -> AssessmentMetadataState {
    let Some(metadata) = &node.assessment_metadata else {
        return AssessmentMetadataState::blank();
    };
    if metadata.assessment_item_ids.is_empty() {
        return AssessmentMetadataState::blank();
    }
    let Some(mastery_model) = &metadata.mastery_model else {
        return AssessmentMetadataState::blank();
    };
    AssessmentMetadataState {
        assessment: true,
        assessment_ids: metadata.assessment_item_ids.clone(),
        mastery_model: Some(mastery_model.clone()),
        randomize: metadata.randomize,
    }
}

/// Full view state for a leaf node: upcoming content plus the normalized
/// record plus assessment fields. The assessment struct is the only source of
/// its keys, so mapper output can never be shadowed by node fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentState {
    pub next_content: Vec<ContentNode>,
    #[serde(flatten)]
    pub node: NormalizedContentNode,
    #[serde(flatten)]
    pub assessment: AssessmentMetadataState,
}

fn content_state_for(
    node: &ContentNode,
    next_content: Vec<ContentNode>,
    channels: &ChannelMap,
) -> ContentState {
    ContentState {
        next_content,
        node: normalize_content_node(node, channels),
        assessment: assessment_metadata_state(node),
    }
}

/// A missing node propagates as `None` rather than an error.
pub fn content_state(
    node: Option<&ContentNode>,
    next_content: Vec<ContentNode>,
    channels: &ChannelMap,
) -> Option<ContentState> {
    node.map(|node| content_state_for(node, next_content, channels))
}

/// Collection rows: topics carry only structural normalization, everything
/// else gets the full content state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionItem {
    Topic(NormalizedContentNode),
    Content(ContentState),
}

pub fn collection_state(nodes: &[ContentNode], channels: &ChannelMap) -> Vec<CollectionItem> {
    nodes
        .iter()
        .map(|node| {
            if node.kind == ContentNodeKind::Topic {
                CollectionItem::Topic(normalize_content_node(node, channels))
            } else {
                CollectionItem::Content(content_state_for(node, Vec::new(), channels))
            }
        })
        .collect()
}
