use actix_web::{web, HttpResponse};

use crate::api::failure;
use crate::database::MongoDB;
use crate::middleware::auth::Claims;
use crate::models::{
    CreateReviewRequest, ReportReviewRequest, RespondReviewRequest, ReviewListQuery, ReviewResponse,
    ReviewStats, ReviewStatsQuery, VoteOutcome, VoteReviewRequest,
};
use crate::services::review_service::{self, ReviewPage};
use crate::utils::parse_object_id;

#[utoipa::path(
    post,
    path = "/api/reviews",
    tag = "Reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Invalid rating/comment or workshop already reviewed"),
        (status = 403, description = "Only cyclists can write reviews")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_review(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<CreateReviewRequest>,
) -> HttpResponse {
    log::info!("⭐ POST /reviews - user: {}, workshop: {}", user.sub, body.workshop_id);

    match review_service::create_review(&db, &user, &body).await {
        Ok(review) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": "Review created successfully",
            "review": ReviewResponse::from(review)
        })),
        Err(e) => failure("POST /reviews", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/reviews/workshop/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "Workshop user ID"), ReviewListQuery),
    responses(
        (status = 200, description = "Visible reviews of a workshop", body = ReviewPage)
    )
)]
pub async fn workshop_reviews(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    query: web::Query<ReviewListQuery>,
) -> HttpResponse {
    log::info!("⭐ GET /reviews/workshop/{}", path);

    let workshop_id = match parse_object_id(&path, "workshop") {
        Ok(id) => id,
        Err(e) => return failure("GET /reviews/workshop/{id}", e),
    };

    match review_service::list_workshop_reviews(&db, &workshop_id, &query).await {
        Ok(page) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "reviews": page.reviews,
            "total": page.total,
            "page": page.page,
            "totalPages": page.total_pages
        })),
        Err(e) => failure("GET /reviews/workshop/{id}", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/reviews/my-reviews",
    tag = "Reviews",
    responses(
        (status = 200, description = "Reviews written by (cyclist) or about (workshop) the caller", body = [ReviewResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_reviews(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("⭐ GET /reviews/my-reviews - user: {}", user.sub);

    match review_service::my_reviews(&db, &user).await {
        Ok(reviews) => {
            let reviews: Vec<ReviewResponse> = reviews.into_iter().map(ReviewResponse::from).collect();
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "total": reviews.len(),
                "reviews": reviews
            }))
        }
        Err(e) => failure("GET /reviews/my-reviews", e),
    }
}

#[utoipa::path(
    get,
    path = "/api/reviews/stats",
    tag = "Reviews",
    params(ReviewStatsQuery),
    responses(
        (status = 200, description = "Rating distribution of a workshop", body = ReviewStats),
        (status = 400, description = "workshopId missing for non-workshop callers")
    ),
    security(("bearer_auth" = []))
)]
pub async fn review_stats(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<ReviewStatsQuery>,
) -> HttpResponse {
    log::info!("📊 GET /reviews/stats - user: {}", user.sub);

    match review_service::stats(&db, &user, &query).await {
        Ok(stats) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "stats": stats
        })),
        Err(e) => failure("GET /reviews/stats", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}/respond",
    tag = "Reviews",
    params(("id" = String, Path, description = "Review ID")),
    request_body = RespondReviewRequest,
    responses(
        (status = 200, description = "Response stored", body = ReviewResponse),
        (status = 400, description = "Review already answered"),
        (status = 403, description = "Only the reviewed workshop can respond")
    ),
    security(("bearer_auth" = []))
)]
pub async fn respond(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<RespondReviewRequest>,
) -> HttpResponse {
    log::info!("💬 POST /reviews/{}/respond - user: {}", path, user.sub);

    let review_id = match parse_object_id(&path, "review") {
        Ok(id) => id,
        Err(e) => return failure("POST /reviews/{id}/respond", e),
    };

    match review_service::respond(&db, &user, &review_id, &body).await {
        Ok(review) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Response added successfully",
            "review": ReviewResponse::from(review)
        })),
        Err(e) => failure("POST /reviews/{id}/respond", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}/vote",
    tag = "Reviews",
    params(("id" = String, Path, description = "Review ID")),
    request_body = VoteReviewRequest,
    responses(
        (status = 200, description = "Vote recorded", body = ReviewResponse),
        (status = 400, description = "Cannot vote on own review")
    ),
    security(("bearer_auth" = []))
)]
pub async fn vote(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<VoteReviewRequest>,
) -> HttpResponse {
    log::info!("👍 POST /reviews/{}/vote helpful={} - user: {}", path, body.helpful, user.sub);

    let review_id = match parse_object_id(&path, "review") {
        Ok(id) => id,
        Err(e) => return failure("POST /reviews/{id}/vote", e),
    };

    match review_service::vote(&db, &user, &review_id, &body).await {
        Ok((review, outcome)) => {
            let message = match outcome {
                VoteOutcome::Added => "Vote recorded",
                VoteOutcome::Switched => "Vote updated",
                VoteOutcome::Unchanged => "Vote already recorded",
            };
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": message,
                "review": ReviewResponse::from(review)
            }))
        }
        Err(e) => failure("POST /reviews/{id}/vote", e),
    }
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}/report",
    tag = "Reviews",
    params(("id" = String, Path, description = "Review ID")),
    request_body = ReportReviewRequest,
    responses(
        (status = 200, description = "Report recorded"),
        (status = 400, description = "Already reported")
    ),
    security(("bearer_auth" = []))
)]
pub async fn report(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<ReportReviewRequest>,
) -> HttpResponse {
    log::info!("🚩 POST /reviews/{}/report - user: {}", path, user.sub);

    let review_id = match parse_object_id(&path, "review") {
        Ok(id) => id,
        Err(e) => return failure("POST /reviews/{id}/report", e),
    };

    match review_service::report(&db, &user, &review_id, &body).await {
        Ok(review) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Review reported",
            "hidden": review.is_hidden
        })),
        Err(e) => failure("POST /reviews/{id}/report", e),
    }
}
