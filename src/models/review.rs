use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Reviews with this many reports drop out of public listings
pub const HIDE_AFTER_REPORTS: usize = 3;

pub const MIN_COMMENT_LEN: usize = 10;
pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Offensive,
    Fake,
    Inappropriate,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: ObjectId,
    pub helpful: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub user_id: ObjectId,
    pub reason: ReportReason,
    #[serde(default)]
    pub details: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopResponseNote {
    pub comment: String,
    pub responded_at: i64,
}

/// Document in the "reviews" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub cyclist_id: ObjectId,
    pub workshop_id: ObjectId,
    #[serde(default)]
    pub appointment_id: Option<ObjectId>,
    pub rating: i32,
    pub comment: String,
    #[serde(default)]
    pub helpful_votes: i64,
    #[serde(default)]
    pub not_helpful_votes: i64,
    #[serde(default)]
    pub voters: Vec<Vote>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub response: Option<WorkshopResponseNote>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Result of applying a vote to a review's tallies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Added,
    Switched,
    Unchanged,
}

/// Stored tally a vote counts towards
pub fn vote_counter(helpful: bool) -> &'static str {
    if helpful {
        "helpfulVotes"
    } else {
        "notHelpfulVotes"
    }
}

impl Review {
    pub fn has_reported(&self, user_id: &ObjectId) -> bool {
        self.reports.iter().any(|r| &r.user_id == user_id)
    }

    pub fn should_hide(&self) -> bool {
        self.reports.len() >= HIDE_AFTER_REPORTS
    }
}

pub fn validate_rating(rating: i32) -> Result<(), String> {
    if !(1..=5).contains(&rating) {
        return Err("Rating must be between 1 and 5".to_string());
    }
    Ok(())
}

pub fn validate_comment(comment: &str) -> Result<String, String> {
    let trimmed = comment.trim();
    let len = trimmed.chars().count();
    if len < MIN_COMMENT_LEN {
        return Err(format!("Comment must be at least {} characters", MIN_COMMENT_LEN));
    }
    if len > MAX_COMMENT_LEN {
        return Err(format!("Comment must not exceed {} characters", MAX_COMMENT_LEN));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub workshop_id: String,
    pub appointment_id: Option<String>,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct RespondReviewRequest {
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct VoteReviewRequest {
    pub helpful: bool,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ReportReviewRequest {
    pub reason: ReportReason,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort {
    #[default]
    Recent,
    RatingHigh,
    RatingLow,
    Helpful,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ReviewListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort: Option<ReviewSort>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatsQuery {
    pub workshop_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub cyclist_id: String,
    pub workshop_id: String,
    pub appointment_id: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub helpful_votes: i64,
    pub not_helpful_votes: i64,
    pub report_count: usize,
    pub response: Option<WorkshopResponseNote>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        ReviewResponse {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            cyclist_id: r.cyclist_id.to_hex(),
            workshop_id: r.workshop_id.to_hex(),
            appointment_id: r.appointment_id.map(|id| id.to_hex()),
            rating: r.rating,
            comment: r.comment,
            helpful_votes: r.helpful_votes,
            not_helpful_votes: r.not_helpful_votes,
            report_count: r.reports.len(),
            response: r.response,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub workshop_id: String,
    pub total_reviews: i64,
    pub average_rating: f64,
    /// Count per star, index 0 = 1 star
    pub distribution: Vec<i64>,
    pub responded: i64,
}

impl ReviewStats {
    pub fn from_reviews<'a>(workshop_id: &ObjectId, reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let mut distribution = [0i64; 5];
        let mut responded = 0;

        for review in reviews {
            if let Some(slot) = usize::try_from(review.rating - 1).ok().and_then(|i| distribution.get_mut(i)) {
                *slot += 1;
            }
            if review.response.is_some() {
                responded += 1;
            }
        }

        let total: i64 = distribution.iter().sum();
        let weighted: i64 = distribution
            .iter()
            .enumerate()
            .map(|(i, n)| (i as i64 + 1) * n)
            .sum();

        ReviewStats {
            workshop_id: workshop_id.to_hex(),
            total_reviews: total,
            average_rating: average_rating(weighted, total),
            distribution: distribution.to_vec(),
            responded,
        }
    }
}

/// Mean rating rounded to one decimal, 0 when there are no reviews
pub fn average_rating(sum: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    ((sum as f64 / count as f64) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i32) -> Review {
        Review {
            id: Some(ObjectId::new()),
            cyclist_id: ObjectId::new(),
            workshop_id: ObjectId::new(),
            appointment_id: None,
            rating,
            comment: "Muy buen servicio, rápido y barato".into(),
            helpful_votes: 0,
            not_helpful_votes: 0,
            voters: vec![],
            reports: vec![],
            is_hidden: false,
            response: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_vote_counters_match_stored_fields() {
        let mut r = review(5);
        r.helpful_votes = 2;
        r.not_helpful_votes = 1;

        let doc = mongodb::bson::to_document(&r).unwrap();
        assert_eq!(doc.get_i64(vote_counter(true)).unwrap(), 2);
        assert_eq!(doc.get_i64(vote_counter(false)).unwrap(), 1);
    }

    #[test]
    fn test_hidden_after_three_reports() {
        let mut r = review(1);
        for _ in 0..HIDE_AFTER_REPORTS - 1 {
            r.reports.push(Report {
                user_id: ObjectId::new(),
                reason: ReportReason::Spam,
                details: None,
                created_at: 0,
            });
        }
        assert!(!r.should_hide());

        let last = ObjectId::new();
        r.reports.push(Report { user_id: last, reason: ReportReason::Fake, details: None, created_at: 0 });
        assert!(r.should_hide());
        assert!(r.has_reported(&last));
        assert!(!r.has_reported(&ObjectId::new()));
    }

    #[test]
    fn test_validate_rating_and_comment() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());

        assert!(validate_comment("corto").is_err());
        assert_eq!(validate_comment("  Excelente atención  ").unwrap(), "Excelente atención");
        assert!(validate_comment(&"a".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }

    #[test]
    fn test_stats_from_reviews() {
        let workshop = ObjectId::new();
        let mut reviews = vec![review(5), review(4), review(4), review(1)];
        reviews[0].response = Some(WorkshopResponseNote { comment: "¡Gracias!".into(), responded_at: 0 });

        let stats = ReviewStats::from_reviews(&workshop, &reviews);
        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.distribution, [1, 0, 0, 2, 1]);
        assert_eq!(stats.average_rating, 3.5);
        assert_eq!(stats.responded, 1);
    }

    #[test]
    fn test_average_rating_rounding() {
        assert_eq!(average_rating(0, 0), 0.0);
        assert_eq!(average_rating(14, 3), 4.7);
        assert_eq!(average_rating(10, 2), 5.0);
    }

    #[test]
    fn test_report_reason_rejects_unknown() {
        assert!(serde_json::from_str::<ReportReviewRequest>(r#"{"reason":"boring"}"#).is_err());
        let req: ReportReviewRequest = serde_json::from_str(r#"{"reason":"offensive"}"#).unwrap();
        assert_eq!(req.reason, ReportReason::Offensive);
    }
}
