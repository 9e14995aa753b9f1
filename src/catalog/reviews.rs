use serde::Serialize;
use serde_json::Value;

use super::fields;

const ANONYMOUS_USER: &str = "مستخدم";

/// A normalized course review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: String,
    pub user_name: String,
    pub rating: f64,
    pub title: String,
    pub content: String,
    pub likes: u64,
    pub is_liked: bool,
    pub is_owner: bool,
    pub is_approved: bool,
    pub created_at: String,
}

pub fn normalize_reviews(raw_reviews: &[&Value]) -> Vec<Review> {
    raw_reviews
        .iter()
        .map(|raw| Review {
            id: fields::resolve_id(raw, &["id"]).unwrap_or_default(),
            user_name: resolve_user_name(raw),
            rating: fields::resolve::<f64>(raw, &["rating"]).unwrap_or(5.0),
            title: fields::resolve_str(raw, &["title"]).unwrap_or_default(),
            content: fields::resolve_str(raw, &["review_text", "content", "comment", "text"])
                .unwrap_or_default(),
            likes: fields::resolve_u64(raw, &["like_count", "helpful_count", "likes_count"])
                .unwrap_or(0),
            is_liked: fields::truthy(raw.get("is_liked_by_user"))
                || fields::truthy(raw.get("is_liked")),
            is_owner: fields::truthy(raw.get("is_owner")),
            // Only an explicit `false` marks a review unapproved.
            is_approved: raw.get("is_approved") != Some(&Value::Bool(false)),
            created_at: fields::resolve_str(raw, &["created_at"]).unwrap_or_default(),
        })
        .collect()
}

/// Course rating and review count, preferring the aggregate stats endpoint
/// over fields on the course object, over counting the review list.
pub fn resolve_rating(
    api_course: &Value,
    rating_stats: Option<&Value>,
    review_count_fallback: u64,
) -> (f64, u64) {
    let rating = rating_stats
        .and_then(|stats| fields::resolve::<f64>(stats, &["average_rating"]))
        .or_else(|| fields::resolve::<f64>(api_course, &["average_rating", "rating"]))
        .unwrap_or(0.0);

    let review_count = rating_stats
        .and_then(|stats| fields::resolve_u64(stats, &["review_count", "total_reviews"]))
        .unwrap_or(review_count_fallback);

    (rating, review_count)
}

fn resolve_user_name(review: &Value) -> String {
    if let Some(name) = fields::resolve_str(review, &["user_name"]) {
        return name;
    }
    review
        .get("user")
        .and_then(|user| fields::resolve_str(user, &["username", "first_name", "name"]))
        .unwrap_or_else(|| ANONYMOUS_USER.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn review_fields_cascade_across_backend_versions() {
        let rows = [
            json!({ "id": 1, "user": { "username": "sara" }, "comment": "ممتازة", "helpful_count": 3 }),
            json!({ "id": 2, "review_text": "جيدة", "is_approved": false }),
        ];
        let refs: Vec<&Value> = rows.iter().collect();
        let reviews = normalize_reviews(&refs);

        assert_eq!(reviews[0].user_name, "sara");
        assert_eq!(reviews[0].content, "ممتازة");
        assert_eq!(reviews[0].likes, 3);
        assert_eq!(reviews[0].rating, 5.0);
        assert!(reviews[0].is_approved);

        assert_eq!(reviews[1].user_name, ANONYMOUS_USER);
        assert!(!reviews[1].is_approved);
    }

    #[test]
    fn rating_prefers_stats_over_course_fields() {
        let api_course = json!({ "average_rating": 3.0 });
        let stats = json!({ "average_rating": 4.5, "review_count": 12 });

        assert_eq!(resolve_rating(&api_course, Some(&stats), 2), (4.5, 12));
        assert_eq!(resolve_rating(&api_course, None, 2), (3.0, 2));
        assert_eq!(resolve_rating(&json!({}), None, 0), (0.0, 0));
    }
}
