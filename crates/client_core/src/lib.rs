use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::Result;
use futures::future::try_join_all;
use shared::{
    domain::{
        ClassId, Classroom, ContentNode, ContentNodeId, ContentNodeKind, Lesson, LessonId,
        ResourceRef, UserId,
    },
    protocol::{ContentListItem, LessonsPageName, PageAction, PageStateSeed},
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod content;
pub mod resources;
pub mod store;

pub use resources::{
    ClassroomResource, ContentNodeResource, HttpResources, LearnerGroupResource, LessonResource,
};
pub use store::{EnglishPageStrings, MemoryPageStore, PageStore, PageStrings, PageTitleKey};

/// How a page-show call ended. Fetch failures are folded into `FetchFailed`
/// after the loading-end signal; the caller never sees them as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoadOutcome {
    /// Page state fully assembled and dispatched.
    Loaded,
    /// A fetch in a load group failed; loading-end was signalled and nothing
    /// else was dispatched, so the view stays on the previous/loading state.
    FetchFailed,
    /// A newer page-show call started while this one was in flight; this call
    /// dispatched nothing past its join point.
    Superseded,
    /// The operation exists for callers but has no implementation yet.
    NotSupported,
}

#[derive(Debug, Error)]
pub enum SaveLessonError {
    #[error("resource at index {index} is missing a contentnode id")]
    MissingContentNodeId { index: usize },
    #[error("failed to save lesson resources: {source}")]
    Save {
        #[from]
        source: anyhow::Error,
    },
}

/// Assembles view state for the lessons section: one operation per page, each
/// running a fixed group of concurrent fetches joined all-or-nothing before
/// dispatching to the store.
///
/// A page-load generation counter makes superseding calls safe: every
/// operation captures the generation at entry and re-checks it after each
/// join point, so a slow load that lost the race dispatches nothing.
pub struct LessonPageLoader {
    lessons: Arc<dyn LessonResource>,
    learner_groups: Arc<dyn LearnerGroupResource>,
    content_nodes: Arc<dyn ContentNodeResource>,
    classrooms: Arc<dyn ClassroomResource>,
    store: Arc<dyn PageStore>,
    strings: Arc<dyn PageStrings>,
    page_load_generation: AtomicU64,
}

impl LessonPageLoader {
    pub fn new(
        lessons: Arc<dyn LessonResource>,
        learner_groups: Arc<dyn LearnerGroupResource>,
        content_nodes: Arc<dyn ContentNodeResource>,
        classrooms: Arc<dyn ClassroomResource>,
        store: Arc<dyn PageStore>,
    ) -> Self {
        Self::new_with_strings(
            lessons,
            learner_groups,
            content_nodes,
            classrooms,
            store,
            Arc::new(EnglishPageStrings),
        )
    }

    pub fn new_with_strings(
        lessons: Arc<dyn LessonResource>,
        learner_groups: Arc<dyn LearnerGroupResource>,
        content_nodes: Arc<dyn ContentNodeResource>,
        classrooms: Arc<dyn ClassroomResource>,
        store: Arc<dyn PageStore>,
        strings: Arc<dyn PageStrings>,
    ) -> Self {
        Self {
            lessons,
            learner_groups,
            content_nodes,
            classrooms,
            store,
            strings,
            page_load_generation: AtomicU64::new(0),
        }
    }

    /// Convenience constructor wiring every resource slot to one
    /// [`HttpResources`] instance.
    pub fn over_http(base_url: impl AsRef<str>, store: Arc<dyn PageStore>) -> Result<Self> {
        let resources = Arc::new(HttpResources::new(base_url)?);
        Ok(Self::new(
            resources.clone(),
            resources.clone(),
            resources.clone(),
            resources,
            store,
        ))
    }

    fn begin_page_load(&self) -> u64 {
        self.page_load_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn finishes_current_load(&self, generation: u64) -> bool {
        if self.page_load_generation.load(Ordering::SeqCst) == generation {
            return true;
        }
        debug!(generation, "lessons: discarding superseded page load");
        false
    }

    fn fail_page_load(&self, generation: u64, err: anyhow::Error) -> PageLoadOutcome {
        warn!("lessons: page load aborted by fetch failure: {err:#}");
        if !self.finishes_current_load(generation) {
            return PageLoadOutcome::Superseded;
        }
        self.store
            .dispatch(PageAction::SetPageLoading { loading: false });
        PageLoadOutcome::FetchFailed
    }

    /// Fetches the class's lesson collection and dispatches it; returns the
    /// list for chaining.
    pub async fn update_class_lessons(&self, class_id: &ClassId) -> Result<Vec<Lesson>> {
        let lessons = self.lessons.get_collection(class_id).await?;
        self.store.dispatch(PageAction::SetClassLessons {
            lessons: lessons.clone(),
        });
        Ok(lessons)
    }

    /// Fetches one lesson and dispatches it as the current lesson; returns it
    /// for chaining.
    pub async fn update_current_lesson(&self, lesson_id: &LessonId) -> Result<Lesson> {
        let lesson = self.lessons.get_model(lesson_id).await?;
        self.store.dispatch(PageAction::SetCurrentLesson {
            lesson: lesson.clone(),
        });
        Ok(lesson)
    }

    /// Fetches the classroom record and dispatches it; part of every page's
    /// load group.
    pub async fn update_class_state(&self, class_id: &ClassId) -> Result<Classroom> {
        let classroom = self.classrooms.get_model(class_id).await?;
        self.store.dispatch(PageAction::SetClassInfo {
            classroom: classroom.clone(),
        });
        Ok(classroom)
    }

    /// Lesson listing for a classroom.
    pub async fn show_lessons_root_page(&self, class_id: &ClassId) -> PageLoadOutcome {
        let generation = self.begin_page_load();
        info!(class_id = %class_id, "lessons: loading root page");
        self.store
            .dispatch(PageAction::SetPageLoading { loading: true });
        self.store.dispatch(PageAction::SetPageState {
            page_state: PageStateSeed::root(),
        });

        let load = futures::try_join!(
            self.learner_groups.get_collection(class_id),
            self.update_class_lessons(class_id),
            self.update_class_state(class_id),
        );

        match load {
            Ok((learner_groups, _lessons, _classroom)) => {
                if !self.finishes_current_load(generation) {
                    return PageLoadOutcome::Superseded;
                }
                self.store
                    .dispatch(PageAction::SetLearnerGroups { learner_groups });
                self.store.dispatch(PageAction::SetPageName {
                    page_name: LessonsPageName::Root,
                });
                self.store.dispatch(PageAction::SetTitle {
                    title: self.strings.page_title(PageTitleKey::Lessons),
                });
                self.store
                    .dispatch(PageAction::SetPageLoading { loading: false });
                PageLoadOutcome::Loaded
            }
            Err(err) => self.fail_page_load(generation, err),
        }
    }

    /// One lesson with its resolved resource nodes. Two join points: the
    /// resource fan-out needs the lesson's resource list, so it cannot start
    /// before the first group resolves.
    pub async fn show_lesson_summary_page(
        &self,
        class_id: &ClassId,
        lesson_id: &LessonId,
    ) -> PageLoadOutcome {
        let generation = self.begin_page_load();
        info!(class_id = %class_id, lesson_id = %lesson_id, "lessons: loading summary page");
        self.store
            .dispatch(PageAction::SetPageLoading { loading: true });
        self.store.dispatch(PageAction::SetPageState {
            page_state: PageStateSeed::summary(),
        });

        let load = futures::try_join!(
            self.update_current_lesson(lesson_id),
            self.learner_groups.get_collection(class_id),
            self.update_class_state(class_id),
        );

        let (lesson, learner_groups, _classroom) = match load {
            Ok(loaded) => loaded,
            Err(err) => return self.fail_page_load(generation, err),
        };

        // No batch endpoint for lesson resources; every node is fetched on
        // its own. try_join_all keeps results in resource-list order.
        let node_fetches = lesson
            .resources
            .iter()
            .map(|resource| self.content_nodes.get_model(&resource.contentnode_id));

        match try_join_all(node_fetches).await {
            Ok(nodes) => {
                if !self.finishes_current_load(generation) {
                    return PageLoadOutcome::Superseded;
                }
                self.store
                    .dispatch(PageAction::SetResourceContentNodes { nodes });
                self.store
                    .dispatch(PageAction::SetLearnerGroups { learner_groups });
                self.store
                    .dispatch(PageAction::SetPageLoading { loading: false });
                self.store.dispatch(PageAction::SetPageName {
                    page_name: LessonsPageName::Summary,
                });
                self.store.dispatch(PageAction::SetTitle {
                    title: lesson.name.clone(),
                });
                PageLoadOutcome::Loaded
            }
            Err(err) => self.fail_page_load(generation, err),
        }
    }

    async fn show_resource_selection_page(
        &self,
        generation: u64,
        class_id: &ClassId,
        lesson_id: &LessonId,
        content_list: Vec<ContentListItem>,
        page_name: LessonsPageName,
        ancestors: Vec<ContentNode>,
    ) -> PageLoadOutcome {
        self.store
            .dispatch(PageAction::SetPageLoading { loading: true });
        self.store.dispatch(PageAction::SetPageState {
            page_state: PageStateSeed::selection(),
        });

        let load = futures::try_join!(
            self.update_current_lesson(lesson_id),
            self.update_class_state(class_id),
        );

        match load {
            Ok((current_lesson, _classroom)) => {
                if !self.finishes_current_load(generation) {
                    return PageLoadOutcome::Superseded;
                }
                // Selections made earlier in this modal session win over the
                // resources already committed to the lesson.
                let pending_selections = self.store.snapshot().selected_resources;
                let current_resources = if pending_selections.is_empty() {
                    current_lesson
                        .resources
                        .iter()
                        .map(|resource| resource.contentnode_id.clone())
                        .collect()
                } else {
                    pending_selections
                };

                if !ancestors.is_empty() {
                    self.store.dispatch(PageAction::SetAncestors { ancestors });
                }
                self.store.dispatch(PageAction::SetSelectedResources {
                    resources: current_resources,
                });
                self.store
                    .dispatch(PageAction::SetContentList { content_list });
                self.store
                    .dispatch(PageAction::SetPageName { page_name });
                self.store.dispatch(PageAction::SetTitle {
                    title: self.strings.page_title(PageTitleKey::SelectResources),
                });
                self.store
                    .dispatch(PageAction::SetPageLoading { loading: false });
                PageLoadOutcome::Loaded
            }
            Err(err) => self.fail_page_load(generation, err),
        }
    }

    /// Resource selection entry point: all channels, one row per channel
    /// root.
    pub async fn show_lesson_resource_selection_root_page(
        &self,
        class_id: &ClassId,
        lesson_id: &LessonId,
    ) -> PageLoadOutcome {
        let generation = self.begin_page_load();
        info!(class_id = %class_id, lesson_id = %lesson_id, "lessons: loading resource selection root");

        let channel_content_list: Vec<ContentListItem> = self
            .store
            .snapshot()
            .channels
            .into_iter()
            .map(|channel| ContentListItem {
                id: channel.root_id,
                title: channel.name,
                description: channel.description,
                thumbnail: channel.thumbnail,
                kind: ContentNodeKind::Channel,
            })
            .collect();

        self.show_resource_selection_page(
            generation,
            class_id,
            lesson_id,
            channel_content_list,
            LessonsPageName::SelectionRoot,
            Vec::new(),
        )
        .await
    }

    /// Resource selection inside a topic: the topic's children as the content
    /// list, the ancestor chain (with the topic appended) as breadcrumbs.
    pub async fn show_lesson_resource_selection_topic_page(
        &self,
        class_id: &ClassId,
        lesson_id: &LessonId,
        topic_id: &ContentNodeId,
    ) -> PageLoadOutcome {
        let generation = self.begin_page_load();
        info!(
            class_id = %class_id,
            lesson_id = %lesson_id,
            topic_id = %topic_id,
            "lessons: loading resource selection topic"
        );
        self.store
            .dispatch(PageAction::SetPageLoading { loading: true });

        let load = futures::try_join!(
            self.content_nodes.get_model(topic_id),
            self.content_nodes.get_collection(topic_id),
            self.content_nodes.fetch_ancestors(topic_id),
        );

        match load {
            Ok((topic_node, child_nodes, mut ancestors)) => {
                if !self.finishes_current_load(generation) {
                    return PageLoadOutcome::Superseded;
                }
                let topic_content_list: Vec<ContentListItem> = child_nodes
                    .into_iter()
                    .map(|node| ContentListItem {
                        thumbnail: content::content_node_thumbnail(&node).map(str::to_string),
                        id: node.id,
                        title: node.title,
                        description: node.description,
                        kind: node.kind,
                    })
                    .collect();
                ancestors.push(topic_node);

                self.show_resource_selection_page(
                    generation,
                    class_id,
                    lesson_id,
                    topic_content_list,
                    LessonsPageName::Selection,
                    ancestors,
                )
                .await
            }
            Err(err) => self.fail_page_load(generation, err),
        }
    }

    /// Persists the full replacement resource list for a lesson. Entries with
    /// a blank contentnode id fail validation before any request is made.
    pub async fn save_lesson_resources(
        &self,
        lesson_id: &LessonId,
        resources: Vec<ResourceRef>,
    ) -> Result<Lesson, SaveLessonError> {
        if let Some(index) = resources
            .iter()
            .position(|resource| resource.contentnode_id.is_empty())
        {
            return Err(SaveLessonError::MissingContentNodeId { index });
        }

        let saved = self.lessons.save_resources(lesson_id, &resources).await?;
        info!(
            lesson_id = %lesson_id,
            resource_count = saved.resources.len(),
            "lessons: saved resource list"
        );
        Ok(saved)
    }

    pub async fn show_lesson_resource_summary_page(
        &self,
        _class_id: &ClassId,
        _lesson_id: &LessonId,
        _content_id: &ContentNodeId,
    ) -> PageLoadOutcome {
        debug!("lessons: resource summary page is not implemented");
        PageLoadOutcome::NotSupported
    }

    pub async fn show_lesson_resource_user_summary_page(
        &self,
        _class_id: &ClassId,
        _lesson_id: &LessonId,
        _content_id: &ContentNodeId,
        _user_id: &UserId,
    ) -> PageLoadOutcome {
        debug!("lessons: resource user summary page is not implemented");
        PageLoadOutcome::NotSupported
    }

    pub async fn show_lesson_review_page(
        &self,
        _class_id: &ClassId,
        _lesson_id: &LessonId,
    ) -> PageLoadOutcome {
        debug!("lessons: review page is not implemented");
        PageLoadOutcome::NotSupported
    }

    pub async fn show_lesson_selection_search_page(
        &self,
        _class_id: &ClassId,
        _lesson_id: &LessonId,
        _search_term: &str,
    ) -> PageLoadOutcome {
        debug!("lessons: selection search page is not implemented");
        PageLoadOutcome::NotSupported
    }

    pub async fn show_lesson_content_preview(
        &self,
        _class_id: &ClassId,
        _lesson_id: &LessonId,
        _content_id: &ContentNodeId,
    ) -> PageLoadOutcome {
        debug!("lessons: content preview is not implemented");
        PageLoadOutcome::NotSupported
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
