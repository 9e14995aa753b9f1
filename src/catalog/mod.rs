mod course;
mod fields;
mod normalize;
mod progress;
mod reviews;

pub use course::{ContentItem, ContentType, Course, Instructor, Module, Pricing};
pub use fields::as_collection;
pub use normalize::{
    build_visibility_filtered_content, derive_subtitle, format_duration, normalize_course,
    normalize_instructors, organize_modules, resolve_content_type, DurationUnit,
};
pub use progress::{
    apply_progress, compute_module_progress, normalize_my_courses, parse_tracking, CourseSummary,
    ModuleProgress, MyCourses, ProgressRecord,
};
pub use reviews::{normalize_reviews, resolve_rating, Review};
