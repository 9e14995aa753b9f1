//! Tracking-API progress records and completion aggregation.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::course::{ContentItem, Module};
use super::fields;

/// Server-reported completion data for one module, fetched fresh per view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressRecord {
    pub progress: Option<f64>,
    pub completed_lessons: Option<u64>,
    pub total_lessons: Option<u64>,
    pub lessons_progress: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModuleProgress {
    pub progress: f64,
    pub completed_count: u64,
    pub total_count: u64,
}

/// Completion stats for a module, submodule lessons included.
///
/// The completed count comes from the first usable source, in order:
/// the per-lesson progress map, the record's `completed_lessons`, a count
/// derived from the record's percentage, and finally the lessons' own
/// completed flags. The display percentage is always re-derived from the
/// counts rather than trusting the raw `progress` field, which guards
/// against backend rounding drift.
pub fn compute_module_progress(
    module: &Module,
    record: Option<&ProgressRecord>,
) -> ModuleProgress {
    let items: Vec<&ContentItem> = module
        .real_items()
        .chain(module.submodules.iter().flat_map(Module::real_items))
        .collect();
    let total_count = items.len() as u64;

    let completed = if let Some(map) = record.and_then(|r| r.lessons_progress.as_ref()) {
        items
            .iter()
            .filter(|item| map.get(&item.id).copied().unwrap_or(false))
            .count() as u64
    } else if let Some(completed) = record.and_then(|r| r.completed_lessons) {
        completed
    } else if let Some(percent) = record.and_then(|r| r.progress) {
        ((percent / 100.0) * total_count as f64).round() as u64
    } else {
        items.iter().filter(|item| item.completed).count() as u64
    };

    let completed_count = completed.min(total_count);
    let progress = if total_count > 0 {
        ((completed_count as f64 / total_count as f64) * 100.0).min(100.0)
    } else {
        0.0
    };

    ModuleProgress {
        progress,
        completed_count,
        total_count,
    }
}

/// Parse a tracking response
/// (`{course: {modules: [{id, progress, completed_lessons, lessons: [..]}]}}`)
/// into per-module records keyed by module id.
pub fn parse_tracking(response: &Value) -> HashMap<String, ProgressRecord> {
    let modules = response
        .get("course")
        .and_then(|course| course.get("modules"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut records = HashMap::new();
    for raw in modules {
        let Some(id) = fields::resolve_id(raw, &["id"]) else {
            continue;
        };
        records.insert(
            id,
            ProgressRecord {
                progress: fields::get_attribute::<f64>(raw, "progress"),
                completed_lessons: fields::get_attribute::<f64>(raw, "completed_lessons")
                    .map(|f| f.max(0.0) as u64),
                total_lessons: fields::get_attribute::<f64>(raw, "total_lessons")
                    .map(|f| f.max(0.0) as u64),
                lessons_progress: lessons_progress_map(raw),
            },
        );
    }
    records
}

/// Merge tracking records into a normalized module tree, recomputing
/// completion stats for every module and submodule.
pub fn apply_progress(modules: &mut [Module], records: &HashMap<String, ProgressRecord>) {
    for module in modules.iter_mut() {
        if let Some(map) = records
            .get(&module.id)
            .and_then(|r| r.lessons_progress.as_ref())
        {
            merge_completed_flags(&mut module.items, map);
            for sub in module.submodules.iter_mut() {
                merge_completed_flags(&mut sub.items, map);
            }
        }

        for sub in module.submodules.iter_mut() {
            if let Some(map) = records
                .get(&sub.id)
                .and_then(|r| r.lessons_progress.as_ref())
            {
                merge_completed_flags(&mut sub.items, map);
            }
            let stats = compute_module_progress(sub, records.get(&sub.id));
            sub.progress = stats.progress;
            sub.completed_count = stats.completed_count;
            sub.total_count = stats.total_count;
        }

        let stats = compute_module_progress(module, records.get(&module.id));
        module.progress = stats.progress;
        module.completed_count = stats.completed_count;
        module.total_count = stats.total_count;
    }
}

/// One row of the "my courses" list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub progress: f64,
    pub total_lessons: u64,
    pub completed_lessons: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MyCourses {
    pub enrolled: Vec<CourseSummary>,
    pub completed: Vec<CourseSummary>,
}

/// Normalize the enrollments response. Enrolled courses clamp the reported
/// percentage into 0–100 and derive the completed count from it when the
/// backend omits one; completed courses always read 100%.
pub fn normalize_my_courses(response: &Value) -> MyCourses {
    let enrolled = course_rows(response, "enrolled_courses")
        .iter()
        .map(|raw| {
            let progress = fields::get_attribute::<f64>(raw, "progress")
                .unwrap_or(0.0)
                .clamp(0.0, 100.0);
            let total_lessons =
                fields::resolve_u64(raw, &["totalLessons", "total_lessons"]).unwrap_or(0);
            let completed_lessons = fields::resolve_u64(
                raw,
                &["completedLessons", "completed_lessons"],
            )
            .unwrap_or_else(|| ((progress / 100.0) * total_lessons as f64).floor() as u64);

            CourseSummary {
                id: fields::resolve_id(raw, &["id"]).unwrap_or_default(),
                title: fields::resolve_str(raw, &["title", "name"]).unwrap_or_default(),
                progress,
                total_lessons,
                completed_lessons,
            }
        })
        .collect();

    let completed = course_rows(response, "completed_courses")
        .iter()
        .map(|raw| {
            let total_lessons =
                fields::resolve_u64(raw, &["totalLessons", "total_lessons"]).unwrap_or(0);
            CourseSummary {
                id: fields::resolve_id(raw, &["id"]).unwrap_or_default(),
                title: fields::resolve_str(raw, &["title", "name"]).unwrap_or_default(),
                progress: 100.0,
                total_lessons,
                completed_lessons: total_lessons,
            }
        })
        .collect();

    MyCourses { enrolled, completed }
}

fn course_rows<'a>(response: &'a Value, key: &str) -> Vec<&'a Value> {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(|rows| rows.iter().collect())
        .unwrap_or_default()
}

fn merge_completed_flags(items: &mut [ContentItem], map: &HashMap<String, bool>) {
    for item in items.iter_mut() {
        if let Some(done) = map.get(&item.id) {
            item.completed = *done;
        }
    }
}

fn lessons_progress_map(raw: &Value) -> Option<HashMap<String, bool>> {
    if let Some(map) = raw.get("lessons_progress").and_then(Value::as_object) {
        return Some(
            map.iter()
                .map(|(id, done)| (id.clone(), fields::truthy(Some(done))))
                .collect(),
        );
    }

    let lessons = raw.get("lessons")?.as_array()?;
    if lessons.is_empty() {
        return None;
    }
    Some(
        lessons
            .iter()
            .filter_map(|lesson| {
                let id = fields::resolve_id(lesson, &["id"])?;
                Some((id, fields::truthy(lesson.get("completed"))))
            })
            .collect(),
    )
}
