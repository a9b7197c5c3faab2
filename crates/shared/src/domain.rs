use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ClassId);
id_newtype!(LessonId);
id_newtype!(LearnerGroupId);
id_newtype!(ContentNodeId);
id_newtype!(ChannelId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentNodeKind {
    Topic,
    Channel,
    Exercise,
    Video,
    Audio,
    Document,
    Html5,
    Slideshow,
}

/// One entry of a lesson's ordered resource list. Save operations replace the
/// whole list; entries with a blank id are rejected before any request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub contentnode_id: ContentNodeId,
}

impl ResourceRef {
    pub fn new(contentnode_id: impl Into<ContentNodeId>) -> Self {
        Self {
            contentnode_id: contentnode_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owning classroom.
    pub collection: ClassId,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerGroup {
    pub id: LearnerGroupId,
    pub name: String,
    /// Owning classroom.
    pub parent: ClassId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFile {
    #[serde(default)]
    pub thumbnail: bool,
    #[serde(default)]
    pub available: bool,
    pub storage_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentMetadata {
    #[serde(default)]
    pub assessment_item_ids: Vec<String>,
    /// Opaque mastery-model payload, passed through to the view untouched.
    #[serde(default)]
    pub mastery_model: Option<serde_json::Value>,
    #[serde(default)]
    pub randomize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: ContentNodeId,
    pub kind: ContentNodeKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<ContentFile>,
    /// Absent on channel roots.
    #[serde(default)]
    pub parent: Option<ContentNodeId>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub copies_count: Option<u32>,
    #[serde(default)]
    pub progress_fraction: Option<f64>,
    #[serde(default, rename = "assessmentmetadata")]
    pub assessment_metadata: Option<AssessmentMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// Content node at the channel's root of the content tree.
    pub root_id: ContentNodeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}
