use serde::{Deserialize, Serialize};

use crate::domain::{
    Channel, Classroom, ContentNode, ContentNodeId, ContentNodeKind, LearnerGroup, Lesson,
};

/// Pages of the lessons section. Names are part of the view contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonsPageName {
    Root,
    Summary,
    SelectionRoot,
    Selection,
    ResourceSummary,
    ResourceUserSummary,
    Review,
    SelectionSearch,
    ContentPreview,
}

/// One row of a resource-selection listing: a channel on the root page, a
/// topic or leaf node below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentListItem {
    pub id: ContentNodeId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub kind: ContentNodeKind,
}

/// Empty-but-shaped page state dispatched before a page's fetches start, so
/// the view never reads fields left over from the previous page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageStateSeed {
    Root {
        lessons: Vec<Lesson>,
        learner_groups: Vec<LearnerGroup>,
    },
    Summary {
        current_lesson: Option<Lesson>,
        resource_content_nodes: Vec<ContentNode>,
    },
    Selection {
        current_lesson: Option<Lesson>,
        content_list: Vec<ContentListItem>,
        ancestors: Vec<ContentNode>,
        selected_resources: Vec<ContentNodeId>,
    },
}

impl PageStateSeed {
    pub fn root() -> Self {
        Self::Root {
            lessons: Vec::new(),
            learner_groups: Vec::new(),
        }
    }

    pub fn summary() -> Self {
        Self::Summary {
            current_lesson: None,
            resource_content_nodes: Vec::new(),
        }
    }

    pub fn selection() -> Self {
        Self::Selection {
            current_lesson: None,
            content_list: Vec::new(),
            ancestors: Vec::new(),
            selected_resources: Vec::new(),
        }
    }
}

/// Store mutations dispatched by the page loader. One variant per action the
/// view layer consumes; payload shapes are the compatibility contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PageAction {
    SetPageLoading { loading: bool },
    SetPageState { page_state: PageStateSeed },
    SetLearnerGroups { learner_groups: Vec<LearnerGroup> },
    SetClassLessons { lessons: Vec<Lesson> },
    SetCurrentLesson { lesson: Lesson },
    SetResourceContentNodes { nodes: Vec<ContentNode> },
    SetAncestors { ancestors: Vec<ContentNode> },
    SetSelectedResources { resources: Vec<ContentNodeId> },
    SetContentList { content_list: Vec<ContentListItem> },
    SetPageName { page_name: LessonsPageName },
    SetTitle { title: String },
    SetClassInfo { classroom: Classroom },
}

/// Read-only view of the store state the loader consults synchronously:
/// uncommitted selections from the current modal session, and the channel
/// listing used for the selection root page.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub selected_resources: Vec<ContentNodeId>,
    pub channels: Vec<Channel>,
}
