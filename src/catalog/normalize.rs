use regex::Regex;
use serde_json::Value;

use super::course::{ContentItem, ContentType, Course, Instructor, Module, Pricing};
use super::{fields, progress, reviews};

/// Placeholder shown in place of real content to non-enrolled viewers.
const PROTECTED_CONTENT_TITLE: &str = "محتوى محمي - يرجى التسجيل في الدورة";
const PROTECTED_CONTENT_DESCRIPTION: &str = "هذا المحتوى متاح فقط للطلاب المسجلين في الدورة";

/// Title keyword rules, scanned in this order with first match winning.
/// The scan applies even when the payload carries an explicit type field:
/// a lesson typed `video` whose title contains "quiz" is reclassified.
const TYPE_KEYWORDS: &[(ContentType, &[&str])] = &[
    (ContentType::Assignment, &["واجب", "assignment", "homework"]),
    (ContentType::Quiz, &["كويز", "quiz", "test"]),
    (ContentType::Exam, &["امتحان", "exam", "final"]),
    (ContentType::Article, &["مقال", "article", "text"]),
    (ContentType::File, &["ملف", "file", "document"]),
    (ContentType::Project, &["مشروع", "project"]),
    (ContentType::Exercise, &["تمرين", "exercise", "practice"]),
    (ContentType::CaseStudy, &["دراسة", "case", "study"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    /// Module-level durations arrive in seconds.
    Seconds,
    /// Lesson-level durations arrive in minutes.
    Minutes,
}

/// Format a raw duration for display. Zero falls back to a fixed string
/// per unit (`"1h 00m"` for seconds, `"15:00"` for minutes).
pub fn format_duration(raw: u64, unit: DurationUnit) -> String {
    match unit {
        DurationUnit::Seconds => {
            if raw == 0 {
                return "1h 00m".to_string();
            }
            let hours = raw / 3600;
            let minutes = (raw % 3600) / 60;
            if hours > 0 {
                format!("{}h {}m", hours, minutes)
            } else {
                format!("{}m", minutes)
            }
        }
        DurationUnit::Minutes => {
            if raw == 0 {
                return "15:00".to_string();
            }
            let hours = raw / 60;
            let minutes = raw % 60;
            if hours > 0 {
                format!("{}:{:02}", hours, minutes)
            } else {
                format!("{}:00", minutes)
            }
        }
    }
}

/// Resolve the content type of a raw lesson. The explicit
/// `lesson_type`/`type` field is only the starting candidate; the title
/// keyword scan overrides it, and everything else defaults to video.
pub fn resolve_content_type(lesson: &Value) -> ContentType {
    let explicit = fields::resolve_str(lesson, &["lesson_type", "type"])
        .and_then(|raw| ContentType::from_api(&raw));

    let title = fields::resolve_str(lesson, &["title", "name"])
        .unwrap_or_default()
        .to_lowercase();

    for (content_type, keywords) in TYPE_KEYWORDS {
        if keywords.iter().any(|keyword| title.contains(keyword)) {
            return *content_type;
        }
    }

    explicit.unwrap_or(ContentType::Video)
}

/// Partition a flat module list into main modules and their submodules,
/// using the `submodule` foreign key. Submodules keep their source array
/// order under each parent; rows pointing at an unknown parent are dropped.
pub fn organize_modules<'a>(raw_modules: &[&'a Value]) -> Vec<(&'a Value, Vec<&'a Value>)> {
    let (subs, mains): (Vec<&Value>, Vec<&Value>) = raw_modules
        .iter()
        .copied()
        .partition(|module| fields::truthy(module.get("submodule")));

    mains
        .into_iter()
        .map(|main| {
            let main_id = fields::resolve_id(main, &["id"]);
            let related = subs
                .iter()
                .filter(|sub| {
                    main_id.is_some() && fields::resolve_id(sub, &["submodule"]) == main_id
                })
                .copied()
                .collect();
            (main, related)
        })
        .collect()
}

/// Decide what content a viewer gets for one module.
///
/// Enrolled viewers get the merged, order-sorted union of lessons,
/// assignments, quizzes and exams. Non-enrolled viewers get an empty list
/// when the module has submodules (the submodules are filtered through the
/// same rule independently, and take precedence over any direct lessons),
/// or a single locked placeholder when there is nothing to show at all.
pub fn build_visibility_filtered_content(
    module: &Value,
    submodules: &[&Value],
    is_enrolled: bool,
) -> Vec<ContentItem> {
    let lessons = raw_lessons(module);

    if !is_enrolled {
        if !submodules.is_empty() {
            return Vec::new();
        }
        if lessons.is_empty() {
            return vec![locked_placeholder(module)];
        }
    }

    let mut items = transform_lessons(lessons);
    items.extend(transform_attached(module, "assignments", AttachedKind::Assignment));
    items.extend(transform_attached(module, "quizzes", AttachedKind::Quiz));
    items.extend(transform_attached(module, "exams", AttachedKind::Exam));
    items.sort_by_key(|item| item.order);

    if items.is_empty() && !is_enrolled {
        return vec![locked_placeholder(module)];
    }

    items
}

/// Transform raw course, module, review and rating payloads into the
/// normalized [`Course`] tree. Pure and infallible: any missing or
/// malformed field degrades to a safe default.
pub fn normalize_course(
    api_course: &Value,
    raw_modules: &Value,
    raw_reviews: &Value,
    is_enrolled: bool,
    rating_stats: Option<&Value>,
) -> Course {
    let module_rows = fields::as_collection(raw_modules);
    let modules: Vec<Module> = organize_modules(&module_rows)
        .iter()
        .enumerate()
        .map(|(index, (main, subs))| transform_module(main, subs, index, is_enrolled, None))
        .collect();

    let price = fields::resolve::<f64>(api_course, &["price"]).unwrap_or(0.0);
    let discount_price = fields::resolve::<f64>(api_course, &["discount_price"]).unwrap_or(0.0);
    let discount_percent = if discount_price > 0.0 && price > 0.0 {
        (((price - discount_price) / price) * 100.0).round() as u32
    } else {
        0
    };

    // Lesson totals count every raw row, submodule rows included.
    let total_lessons: u64 = module_rows
        .iter()
        .map(|module| raw_lessons(module).len() as u64)
        .sum();
    let total_hours = (total_lessons as f64 * 0.5).round() as u64;

    let review_rows = fields::as_collection(raw_reviews);
    let reviews = reviews::normalize_reviews(&review_rows);
    let (rating, review_count) =
        reviews::resolve_rating(api_course, rating_stats, reviews.len() as u64);

    Course {
        id: fields::resolve_id(api_course, &["id"]).unwrap_or_default(),
        title: fields::resolve_str(api_course, &["title", "name"]).unwrap_or_default(),
        subtitle: derive_subtitle(api_course),
        description: fields::resolve_str(api_course, &["description"]).unwrap_or_default(),
        category: resolve_category(api_course),
        level: fields::resolve_str(api_course, &["level"]).unwrap_or_default(),
        language: fields::resolve_str(api_course, &["language"]).unwrap_or_default(),
        pricing: Pricing {
            price,
            discount_price,
            discount_percent,
        },
        instructors: normalize_instructors(api_course),
        rating,
        review_count,
        reviews,
        students: fields::resolve_u64(
            api_course,
            &["total_enrollments", "students_count", "enrollments_count"],
        )
        .unwrap_or(0),
        total_lessons,
        total_hours,
        is_enrolled,
        modules,
    }
}

/// Course subtitle: explicit fields first, otherwise the first hundred
/// characters of the HTML-stripped description.
pub fn derive_subtitle(api_course: &Value) -> String {
    if let Some(subtitle) = fields::resolve_str(api_course, &["subtitle", "short_description"]) {
        return subtitle;
    }

    let description = fields::resolve_str(api_course, &["description"]).unwrap_or_default();
    strip_html(&description).chars().take(100).collect()
}

/// Instructor list from whichever shape the backend uses, dropping the
/// internal "admin" account.
pub fn normalize_instructors(api_course: &Value) -> Vec<Instructor> {
    let singletons: Vec<&Value>;
    let candidates: &[&Value] = if let Some(list) = api_course
        .get("instructors")
        .or_else(|| api_course.get("teachers"))
        .and_then(Value::as_array)
    {
        singletons = list.iter().collect();
        &singletons
    } else if let Some(single) = api_course
        .get("instructor")
        .or_else(|| api_course.get("teacher"))
        .filter(|v| v.is_object())
    {
        singletons = vec![single];
        &singletons
    } else {
        &[]
    };

    candidates
        .iter()
        .filter_map(|raw| {
            let first = fields::resolve_str(raw, &["first_name"]).unwrap_or_default();
            let last = fields::resolve_str(raw, &["last_name"]).unwrap_or_default();
            let name = if !first.is_empty() || !last.is_empty() {
                format!("{} {}", first, last).trim().to_string()
            } else {
                fields::resolve_str(raw, &["name", "username", "email"]).unwrap_or_default()
            };

            let cleaned = name.trim().to_lowercase();
            if cleaned.is_empty() || cleaned == "admin" {
                return None;
            }

            Some(Instructor {
                name,
                title: fields::resolve_str(raw, &["title"]).unwrap_or_default(),
                bio: fields::resolve_str(raw, &["bio"]).unwrap_or_default(),
            })
        })
        .collect()
}

fn transform_module(
    raw: &Value,
    submodules: &[&Value],
    index: usize,
    is_enrolled: bool,
    parent_id: Option<&str>,
) -> Module {
    let id = fields::resolve_id(raw, &["id"]).unwrap_or_else(|| (index + 1).to_string());
    let title = fields::resolve_str(raw, &["name", "title"]).unwrap_or_else(|| {
        if parent_id.is_some() {
            format!("الوحدة الفرعية {}", index + 1)
        } else {
            format!("الوحدة {}", index + 1)
        }
    });

    let seconds = fields::resolve_u64(raw, &["video_duration", "duration"]).unwrap_or_else(|| {
        let direct: u64 = raw_lessons(raw).iter().map(lesson_minutes).sum();
        let nested: u64 = submodules
            .iter()
            .flat_map(|sub| raw_lessons(sub).iter())
            .map(lesson_minutes)
            .sum();
        (direct + nested) * 60
    });

    let items = build_visibility_filtered_content(raw, submodules, is_enrolled);
    let children: Vec<Module> = submodules
        .iter()
        .enumerate()
        .map(|(sub_index, sub)| transform_module(sub, &[], sub_index, is_enrolled, Some(&id)))
        .collect();

    let mut module = Module {
        id,
        title,
        description: fields::resolve_str(raw, &["description"]).unwrap_or_default(),
        duration: format_duration(seconds, DurationUnit::Seconds),
        order: fields::resolve_u64(raw, &["order"]).unwrap_or(index as u64 + 1),
        items,
        submodules: children,
        parent_id: parent_id.map(str::to_owned),
        progress: 0.0,
        completed_count: 0,
        total_count: 0,
    };

    let stats = progress::compute_module_progress(&module, None);
    module.progress = stats.progress;
    module.completed_count = stats.completed_count;
    module.total_count = stats.total_count;

    module
}

fn transform_lessons(lessons: &[Value]) -> Vec<ContentItem> {
    lessons
        .iter()
        .enumerate()
        .map(|(index, lesson)| ContentItem {
            id: fields::resolve_id(lesson, &["id"]).unwrap_or_else(|| (index + 1).to_string()),
            title: fields::resolve_str(lesson, &["title", "name"])
                .unwrap_or_else(|| format!("الدرس {}", index + 1)),
            duration: format_duration(lesson_minutes(lesson), DurationUnit::Minutes),
            item_type: resolve_content_type(lesson),
            is_preview: fields::truthy(lesson.get("is_free"))
                || fields::truthy(lesson.get("is_preview"))
                || fields::truthy(lesson.get("isPreview")),
            completed: fields::truthy(lesson.get("completed"))
                || fields::truthy(lesson.get("is_completed")),
            locked: fields::truthy(lesson.get("locked")),
            order: fields::resolve_u64(lesson, &["order"]).unwrap_or(index as u64 + 1),
            description: fields::resolve_str(lesson, &["description"]).unwrap_or_default(),
            video_url: fields::resolve_str(
                lesson,
                &["bunny_video_url", "video_url", "videoUrl"],
            ),
            file_url: fields::resolve_str(lesson, &["file_url", "fileUrl"]),
            content: fields::resolve_str(lesson, &["content"]).unwrap_or_default(),
        })
        .collect()
}

#[derive(Clone, Copy)]
enum AttachedKind {
    Assignment,
    Quiz,
    Exam,
}

impl AttachedKind {
    fn content_type(self) -> ContentType {
        match self {
            Self::Assignment => ContentType::Assignment,
            Self::Quiz => ContentType::Quiz,
            Self::Exam => ContentType::Exam,
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Self::Assignment => "assignment",
            Self::Quiz => "quiz",
            Self::Exam => "exam",
        }
    }

    fn fallback_title(self, number: usize) -> String {
        match self {
            Self::Assignment => format!("واجب {}", number),
            Self::Quiz => format!("كويز {}", number),
            Self::Exam => format!("امتحان {}", number),
        }
    }

    fn duration(self, raw: &Value) -> String {
        let default = match self {
            Self::Assignment => "45:00",
            Self::Quiz => "20:00",
            Self::Exam => "60:00",
        };
        match self {
            // Assignments carry no time limit upstream.
            Self::Assignment => default.to_string(),
            Self::Quiz | Self::Exam => fields::resolve_u64(raw, &["time_limit"])
                .map(|limit| format!("{}:00", limit))
                .unwrap_or_else(|| default.to_string()),
        }
    }
}

fn transform_attached(module: &Value, key: &str, kind: AttachedKind) -> Vec<ContentItem> {
    let rows = module
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    rows.iter()
        .enumerate()
        .map(|(index, raw)| ContentItem {
            id: format!(
                "{}_{}",
                kind.id_prefix(),
                fields::resolve_id(raw, &["id"]).unwrap_or_else(|| (index + 1).to_string())
            ),
            title: fields::resolve_str(raw, &["title", "name"])
                .unwrap_or_else(|| kind.fallback_title(index + 1)),
            duration: kind.duration(raw),
            item_type: kind.content_type(),
            is_preview: false,
            completed: false,
            locked: false,
            order: fields::resolve_u64(raw, &["order"]).unwrap_or(index as u64 + 1),
            description: fields::resolve_str(raw, &["description"]).unwrap_or_default(),
            video_url: None,
            file_url: None,
            content: String::new(),
        })
        .collect()
}

fn locked_placeholder(module: &Value) -> ContentItem {
    let module_id = fields::resolve_id(module, &["id"]).unwrap_or_else(|| "0".to_string());

    ContentItem {
        id: format!("placeholder_{}", module_id),
        title: PROTECTED_CONTENT_TITLE.to_string(),
        duration: "--:--".to_string(),
        item_type: ContentType::Locked,
        is_preview: false,
        completed: false,
        locked: true,
        order: 1,
        description: PROTECTED_CONTENT_DESCRIPTION.to_string(),
        video_url: None,
        file_url: None,
        content: String::new(),
    }
}

/// Direct lesson rows of a raw module, under whichever key the backend
/// version uses. The first key that exists wins, even when empty.
fn raw_lessons(module: &Value) -> &[Value] {
    ["lessons", "content", "lectures"]
        .iter()
        .find_map(|key| module.get(key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn lesson_minutes(lesson: &Value) -> u64 {
    fields::resolve_u64(lesson, &["duration_minutes", "duration"]).unwrap_or(0)
}

fn resolve_category(api_course: &Value) -> String {
    match api_course.get("category") {
        Some(Value::Object(_)) => {
            fields::resolve_str(&api_course["category"], &["name"]).unwrap_or_default()
        }
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn strip_html(input: &str) -> String {
    let tags = Regex::new(r"<[^>]+>").unwrap();
    let stripped = tags.replace_all(input, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn title_keywords_override_explicit_type() {
        let lesson = json!({ "title": "واجب 1 - الفصل الأول", "lesson_type": "video" });
        assert_eq!(resolve_content_type(&lesson), ContentType::Assignment);
    }

    #[test]
    fn keyword_order_is_first_match_wins() {
        // "quiz" outranks "exam" in the scan order.
        let lesson = json!({ "title": "Final quiz exam" });
        assert_eq!(resolve_content_type(&lesson), ContentType::Quiz);
    }

    #[test]
    fn explicit_type_survives_without_keyword() {
        let lesson = json!({ "title": "مقدمة", "lesson_type": "article" });
        assert_eq!(resolve_content_type(&lesson), ContentType::Article);
    }

    #[test]
    fn unknown_type_defaults_to_video() {
        assert_eq!(resolve_content_type(&json!({ "title": "مقدمة" })), ContentType::Video);
        assert_eq!(
            resolve_content_type(&json!({ "title": "مقدمة", "lesson_type": "webinar" })),
            ContentType::Video
        );
    }

    #[test]
    fn duration_formatting_matches_fixed_fallbacks() {
        assert_eq!(format_duration(0, DurationUnit::Minutes), "15:00");
        assert_eq!(format_duration(90, DurationUnit::Minutes), "1:30");
        assert_eq!(format_duration(30, DurationUnit::Minutes), "30:00");
        assert_eq!(format_duration(0, DurationUnit::Seconds), "1h 00m");
        assert_eq!(format_duration(5400, DurationUnit::Seconds), "1h 30m");
        assert_eq!(format_duration(540, DurationUnit::Seconds), "9m");
    }

    #[test]
    fn organize_groups_submodules_under_parent_in_array_order() {
        let rows = vec![
            json!({ "id": 1, "name": "الوحدة الأولى" }),
            json!({ "id": 20, "submodule": 1, "name": "فرعية ب" }),
            json!({ "id": 2, "name": "الوحدة الثانية" }),
            json!({ "id": 21, "submodule": 1, "name": "فرعية أ" }),
            json!({ "id": 30, "submodule": 99, "name": "يتيمة" }),
        ];
        let refs: Vec<&serde_json::Value> = rows.iter().collect();
        let organized = organize_modules(&refs);

        assert_eq!(organized.len(), 2);
        let (main, subs) = &organized[0];
        assert_eq!(main["id"], 1);
        // Source array order, not any sort key.
        assert_eq!(subs[0]["id"], 20);
        assert_eq!(subs[1]["id"], 21);
        // The orphan pointing at module 99 is dropped.
        assert!(organized[1].1.is_empty());
    }

    #[test]
    fn non_enrolled_empty_module_gets_one_locked_item() {
        let module = json!({ "id": 7, "lessons": [] });
        let items = build_visibility_filtered_content(&module, &[], false);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type, ContentType::Locked);
        assert!(items[0].locked);
        assert_eq!(items[0].id, "placeholder_7");
        assert_eq!(items[0].duration, "--:--");
    }

    #[test]
    fn non_enrolled_module_with_submodules_hides_direct_lessons() {
        let module = json!({
            "id": 1,
            "lessons": [{ "id": 10, "title": "درس" }, { "id": 11, "title": "درس" }]
        });
        let sub = json!({ "id": 2, "submodule": 1, "lessons": [{ "id": 12 }] });
        let subs = vec![&sub];

        // Direct lessons are suppressed whenever submodules exist.
        assert!(build_visibility_filtered_content(&module, &subs, false).is_empty());
        // The submodule itself is filtered independently by the same rule,
        // and has real lessons, so it keeps them.
        let sub_items = build_visibility_filtered_content(&sub, &[], false);
        assert_eq!(sub_items.len(), 1);
        assert_eq!(sub_items[0].id, "12");
    }

    #[test]
    fn enrolled_content_merges_and_sorts_by_order() {
        let module = json!({
            "id": 1,
            "lessons": [
                { "id": 10, "title": "درس متأخر", "order": 5 },
                { "id": 11, "title": "درس مبكر", "order": 1 }
            ],
            "quizzes": [{ "id": 3, "title": "مراجعة", "order": 2, "time_limit": 15 }],
            "assignments": [{ "id": 4, "order": 3 }]
        });
        let items = build_visibility_filtered_content(&module, &[], true);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["11", "quiz_3", "assignment_4", "10"]);
        assert_eq!(items[1].duration, "15:00");
        assert_eq!(items[2].duration, "45:00");
        assert_eq!(items[2].title, "واجب 1");
    }

    #[test]
    fn missing_order_falls_back_to_array_position() {
        let module = json!({
            "id": 1,
            "lessons": [
                { "id": 10, "title": "أول" },
                { "id": 11, "title": "ثاني" },
                { "id": 12, "title": "ثالث", "order": 1 }
            ]
        });
        let items = build_visibility_filtered_content(&module, &[], true);

        // Implicit orders are the 1-based positions; ties keep source order.
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "12", "11"]);
    }

    #[test]
    fn normalize_course_defaults_every_field() {
        let course = normalize_course(&json!({}), &json!(null), &json!(null), false, None);

        assert_eq!(course.id, "");
        assert_eq!(course.title, "");
        assert_eq!(course.pricing, Pricing::default());
        assert!(course.modules.is_empty());
        assert!(course.reviews.is_empty());
        assert_eq!(course.rating, 0.0);
        assert_eq!(course.total_lessons, 0);
    }

    #[test]
    fn normalize_course_is_idempotent() {
        let api_course = json!({ "id": 5, "title": "دورة", "price": "200", "discount_price": 150 });
        let modules = json!({ "modules": [
            { "id": 1, "name": "الوحدة", "lessons": [{ "id": 10, "duration_minutes": 30 }] }
        ]});
        let reviews = json!([{ "id": 1, "rating": 4 }]);

        let first = normalize_course(&api_course, &modules, &reviews, true, None);
        let second = normalize_course(&api_course, &modules, &reviews, true, None);
        assert_eq!(first, second);
    }

    #[test]
    fn discount_percent_is_derived_from_prices() {
        let course = normalize_course(
            &json!({ "price": "200", "discount_price": 150 }),
            &json!([]),
            &json!([]),
            false,
            None,
        );
        assert_eq!(course.pricing.discount_percent, 25);

        let free = normalize_course(
            &json!({ "price": 0, "discount_price": 10 }),
            &json!([]),
            &json!([]),
            false,
            None,
        );
        assert_eq!(free.pricing.discount_percent, 0);
    }

    #[test]
    fn module_duration_sums_child_minutes_when_absent() {
        let modules = json!([{
            "id": 1,
            "lessons": [
                { "id": 10, "duration_minutes": 40 },
                { "id": 11, "duration_minutes": 50 }
            ]
        }]);
        let course = normalize_course(&json!({ "id": 1 }), &modules, &json!([]), true, None);

        assert_eq!(course.modules[0].duration, "1h 30m");
    }

    #[test]
    fn admin_instructors_are_filtered() {
        let api_course = json!({ "instructors": [
            { "name": "Admin" },
            { "first_name": "سارة", "last_name": "الأحمد", "bio": "مدرسة فيزياء" },
            { "name": "" }
        ]});
        let instructors = normalize_instructors(&api_course);

        assert_eq!(instructors.len(), 1);
        assert_eq!(instructors[0].name, "سارة الأحمد");
    }

    #[test]
    fn subtitle_strips_html_and_truncates() {
        let api_course = json!({
            "description": format!("<p>شرح <b>مفصل</b> للمنهج</p> {}", "x".repeat(200))
        });
        let subtitle = derive_subtitle(&api_course);

        assert!(subtitle.starts_with("شرح مفصل للمنهج"));
        assert!(!subtitle.contains('<'));
        assert_eq!(subtitle.chars().count(), 100);
    }
}
