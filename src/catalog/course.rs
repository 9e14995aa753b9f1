use serde::{Deserialize, Serialize};

/// Closed set of orderable course content kinds. Resolution from raw
/// lesson payloads lives in [`super::resolve_content_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Video,
    Article,
    File,
    Assignment,
    Quiz,
    Exam,
    Project,
    Exercise,
    CaseStudy,
    Locked,
}

impl ContentType {
    /// Parse an explicit `lesson_type`/`type` field. Unknown strings yield
    /// `None` so the caller can fall back to the default.
    pub fn from_api(raw: &str) -> Option<Self> {
        match raw {
            "video" => Some(Self::Video),
            "article" => Some(Self::Article),
            "file" => Some(Self::File),
            "assignment" => Some(Self::Assignment),
            "quiz" => Some(Self::Quiz),
            "exam" => Some(Self::Exam),
            "project" => Some(Self::Project),
            "exercise" => Some(Self::Exercise),
            "case-study" | "case_study" => Some(Self::CaseStudy),
            _ => None,
        }
    }
}

/// A single orderable unit of course content: lesson, assignment, quiz,
/// exam, or the synthetic locked placeholder shown to non-enrolled viewers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,

    /// Display duration, already formatted (`"1:30"`, `"45:00"`, `"--:--"`).
    pub duration: String,

    #[serde(rename = "type")]
    pub item_type: ContentType,

    /// Free/preview content is visible without enrollment.
    pub is_preview: bool,
    pub completed: bool,
    pub locked: bool,
    pub order: u64,

    pub description: String,
    pub video_url: Option<String>,
    pub file_url: Option<String>,
    pub content: String,
}

/// Top-level content grouping within a course. Submodules are the same
/// shape, nested exactly one level with `parent_id` pointing back up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Formatted from the module's own duration in seconds, or summed from
    /// child lesson minutes when the module carries none.
    pub duration: String,
    pub order: u64,

    /// Merged lessons, assignments, quizzes and exams, sorted by `order`.
    pub items: Vec<ContentItem>,
    pub submodules: Vec<Module>,
    pub parent_id: Option<String>,

    /// Completion percentage, 0–100, re-derived from counts when available.
    pub progress: f64,
    pub completed_count: u64,
    pub total_count: u64,
}

impl Module {
    /// Content items that represent real course material, as opposed to the
    /// locked placeholder.
    pub fn real_items(&self) -> impl Iterator<Item = &ContentItem> {
        self.items
            .iter()
            .filter(|item| item.item_type != ContentType::Locked)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pricing {
    pub price: f64,
    pub discount_price: f64,
    pub discount_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instructor {
    pub name: String,
    pub title: String,
    pub bio: String,
}

/// Normalized course tree, rebuilt on every fetch. Every field is
/// populated; missing raw data degrades to empty strings, zeroes and empty
/// lists rather than errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub language: String,
    pub pricing: Pricing,
    pub instructors: Vec<Instructor>,
    pub rating: f64,
    pub review_count: u64,
    pub reviews: Vec<super::Review>,
    pub students: u64,
    pub total_lessons: u64,
    pub total_hours: u64,
    pub is_enrolled: bool,
    pub modules: Vec<Module>,
}
