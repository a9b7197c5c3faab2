use std::sync::Mutex;

use shared::{
    domain::{Channel, Classroom, ContentNode, ContentNodeId, LearnerGroup, Lesson},
    protocol::{ContentListItem, LessonsPageName, PageAction, PageStateSeed, StoreSnapshot},
};

/// Seam to the view layer's state store. `dispatch` is fire-and-forget; the
/// snapshot is a synchronous read of the few fields the loader consults.
pub trait PageStore: Send + Sync {
    fn dispatch(&self, action: PageAction);
    fn snapshot(&self) -> StoreSnapshot;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTitleKey {
    Lessons,
    SelectResources,
}

/// Localized page titles.
pub trait PageStrings: Send + Sync {
    fn page_title(&self, key: PageTitleKey) -> String;
}

pub struct EnglishPageStrings;

impl PageStrings for EnglishPageStrings {
    fn page_title(&self, key: PageTitleKey) -> String {
        match key {
            PageTitleKey::Lessons => "Lessons".to_string(),
            PageTitleKey::SelectResources => "Select resources".to_string(),
        }
    }
}

/// Everything the lessons section's views read, as folded from dispatched
/// actions.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub page_loading: bool,
    pub page_name: Option<LessonsPageName>,
    pub title: String,
    pub classroom: Option<Classroom>,
    pub channels: Vec<Channel>,
    pub lessons: Vec<Lesson>,
    pub learner_groups: Vec<LearnerGroup>,
    pub current_lesson: Option<Lesson>,
    pub resource_content_nodes: Vec<ContentNode>,
    pub ancestors: Vec<ContentNode>,
    pub selected_resources: Vec<ContentNodeId>,
    pub content_list: Vec<ContentListItem>,
}

impl ViewState {
    /// A page-state seed replaces the page-scoped fields wholesale; sections
    /// the seed does not carry are cleared, never merged.
    fn apply_seed(&mut self, seed: PageStateSeed) {
        self.lessons.clear();
        self.learner_groups.clear();
        self.current_lesson = None;
        self.resource_content_nodes.clear();
        self.ancestors.clear();
        self.selected_resources.clear();
        self.content_list.clear();

        match seed {
            PageStateSeed::Root {
                lessons,
                learner_groups,
            } => {
                self.lessons = lessons;
                self.learner_groups = learner_groups;
            }
            PageStateSeed::Summary {
                current_lesson,
                resource_content_nodes,
            } => {
                self.current_lesson = current_lesson;
                self.resource_content_nodes = resource_content_nodes;
            }
            PageStateSeed::Selection {
                current_lesson,
                content_list,
                ancestors,
                selected_resources,
            } => {
                self.current_lesson = current_lesson;
                self.content_list = content_list;
                self.ancestors = ancestors;
                self.selected_resources = selected_resources;
            }
        }
    }

    fn apply(&mut self, action: PageAction) {
        match action {
            PageAction::SetPageLoading { loading } => self.page_loading = loading,
            PageAction::SetPageState { page_state } => self.apply_seed(page_state),
            PageAction::SetLearnerGroups { learner_groups } => {
                self.learner_groups = learner_groups
            }
            PageAction::SetClassLessons { lessons } => self.lessons = lessons,
            PageAction::SetCurrentLesson { lesson } => self.current_lesson = Some(lesson),
            PageAction::SetResourceContentNodes { nodes } => self.resource_content_nodes = nodes,
            PageAction::SetAncestors { ancestors } => self.ancestors = ancestors,
            PageAction::SetSelectedResources { resources } => self.selected_resources = resources,
            PageAction::SetContentList { content_list } => self.content_list = content_list,
            PageAction::SetPageName { page_name } => self.page_name = Some(page_name),
            PageAction::SetTitle { title } => self.title = title,
            PageAction::SetClassInfo { classroom } => self.classroom = Some(classroom),
        }
    }
}

/// In-process store for embedders without their own state container, and for
/// tests that want to observe the folded view state.
#[derive(Default)]
pub struct MemoryPageStore {
    state: Mutex<ViewState>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channels: Vec<Channel>) -> Self {
        let store = Self::default();
        store.lock().channels = channels;
        store
    }

    pub fn set_channels(&self, channels: Vec<Channel>) {
        self.lock().channels = channels;
    }

    pub fn view(&self) -> ViewState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().expect("view state lock poisoned")
    }
}

impl PageStore for MemoryPageStore {
    fn dispatch(&self, action: PageAction) {
        self.lock().apply(action);
    }

    fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock();
        StoreSnapshot {
            selected_resources: state.selected_resources.clone(),
            channels: state.channels.clone(),
        }
    }
}
