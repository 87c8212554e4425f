use crate::{
    database::{MongoDB, APPOINTMENTS, REVIEWS, USERS},
    middleware::auth::Claims,
    models::{
        average_rating, validate_comment, validate_rating, vote_counter, Appointment,
        AppointmentStatus, CreateReviewRequest, Report, ReportReviewRequest, RespondReviewRequest,
        Review, ReviewListQuery, ReviewResponse, ReviewSort, ReviewStats, ReviewStatsQuery,
        UserType, Vote, VoteOutcome, VoteReviewRequest, WorkshopResponseNote,
    },
    services::workshop_service,
    utils::{
        duplicate_as_bad_request, parse_object_id, require_text, total_pages, AppError,
        PaginationQuery,
    },
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::options::ReturnDocument;

pub const ALREADY_REVIEWED_MESSAGE: &str = "You have already reviewed this workshop";
use serde::Serialize;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<ReviewResponse>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

pub fn sort_document(sort: ReviewSort) -> Document {
    match sort {
        ReviewSort::Recent => doc! { "createdAt": -1 },
        ReviewSort::RatingHigh => doc! { "rating": -1, "createdAt": -1 },
        ReviewSort::RatingLow => doc! { "rating": 1, "createdAt": -1 },
        ReviewSort::Helpful => doc! { "helpfulVotes": -1, "createdAt": -1 },
    }
}

async fn find_review(db: &MongoDB, review_id: &ObjectId) -> Result<Review, AppError> {
    db.collection::<Review>(REVIEWS)
        .find_one(doc! { "_id": review_id })
        .await?
        .ok_or_else(|| AppError::not_found("Review not found"))
}

/// Recomputes the workshop's rating and review count from its visible reviews
pub async fn refresh_workshop_rating(db: &MongoDB, workshop_id: &ObjectId) -> Result<(f64, i64), AppError> {
    let pipeline = vec![
        doc! { "$match": { "workshopId": workshop_id, "isHidden": { "$ne": true } } },
        doc! { "$group": { "_id": null, "sum": { "$sum": "$rating" }, "count": { "$sum": 1 } } },
    ];

    let mut cursor = db.collection::<Review>(REVIEWS).aggregate(pipeline).await?;
    let (sum, count) = match cursor.try_next().await? {
        Some(group) => (bson_number(&group, "sum"), bson_number(&group, "count")),
        None => (0, 0),
    };

    let rating = average_rating(sum, count);
    db.collection::<Document>(USERS)
        .update_one(
            doc! { "_id": workshop_id },
            doc! { "$set": { "workshopInfo.rating": rating, "workshopInfo.reviewCount": count } },
        )
        .await?;

    Ok((rating, count))
}

/// `$sum` yields Int32 or Int64 depending on magnitude
fn bson_number(doc: &Document, key: &str) -> i64 {
    doc.get_i64(key)
        .or_else(|_| doc.get_i32(key).map(i64::from))
        .unwrap_or(0)
}

pub async fn create_review(db: &MongoDB, claims: &Claims, request: &CreateReviewRequest) -> Result<Review, AppError> {
    if claims.user_type != UserType::Cyclist {
        return Err(AppError::forbidden("Only cyclists can write reviews"));
    }
    let cyclist_id = claims.user_id()?;

    validate_rating(request.rating).map_err(AppError::BadRequest)?;
    let comment = validate_comment(&request.comment).map_err(AppError::BadRequest)?;
    let workshop_id = parse_object_id(&request.workshop_id, "workshop")?;
    let appointment_id = request
        .appointment_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(|id| parse_object_id(id, "appointment"))
        .transpose()?;

    workshop_service::find_workshop(db, &workshop_id).await?;

    let collection = db.collection::<Review>(REVIEWS);
    if collection
        .find_one(doc! { "cyclistId": cyclist_id, "workshopId": workshop_id })
        .await?
        .is_some()
    {
        return Err(AppError::bad_request(ALREADY_REVIEWED_MESSAGE));
    }

    if let Some(appointment_id) = appointment_id {
        let appointment = db
            .collection::<Appointment>(APPOINTMENTS)
            .find_one(doc! { "_id": appointment_id, "cyclistId": cyclist_id })
            .await?
            .ok_or_else(|| AppError::not_found("Appointment not found"))?;

        if appointment.workshop_id != workshop_id {
            return Err(AppError::bad_request("Appointment belongs to a different workshop"));
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(AppError::bad_request("You can only review completed appointments"));
        }
    }

    let now = chrono::Utc::now().timestamp();
    let mut review = Review {
        id: None,
        cyclist_id,
        workshop_id,
        appointment_id,
        rating: request.rating,
        comment,
        helpful_votes: 0,
        not_helpful_votes: 0,
        voters: vec![],
        reports: vec![],
        is_hidden: false,
        response: None,
        created_at: now,
        updated_at: now,
    };

    let result = collection
        .insert_one(&review)
        .await
        .map_err(|e| duplicate_as_bad_request(e, ALREADY_REVIEWED_MESSAGE))?;
    review.id = result.inserted_id.as_object_id();

    let (rating, count) = refresh_workshop_rating(db, &workshop_id).await?;
    log::info!("⭐ Review {} stars for workshop {} (now {} over {} reviews)", review.rating, workshop_id, rating, count);

    Ok(review)
}

pub async fn list_workshop_reviews(
    db: &MongoDB,
    workshop_id: &ObjectId,
    query: &ReviewListQuery,
) -> Result<ReviewPage, AppError> {
    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    let collection = db.collection::<Review>(REVIEWS);
    let filter = doc! { "workshopId": workshop_id, "isHidden": { "$ne": true } };

    let total = collection.count_documents(filter.clone()).await?;
    let reviews: Vec<Review> = collection
        .find(filter)
        .sort(sort_document(query.sort.unwrap_or_default()))
        .skip(pagination.skip())
        .limit(pagination.limit() as i64)
        .await?
        .try_collect()
        .await?;

    Ok(ReviewPage {
        reviews: reviews.into_iter().map(ReviewResponse::from).collect(),
        total,
        page: pagination.page(),
        total_pages: total_pages(total, pagination.limit()),
    })
}

pub async fn my_reviews(db: &MongoDB, claims: &Claims) -> Result<Vec<Review>, AppError> {
    let user_id = claims.user_id()?;
    let filter = match claims.user_type {
        UserType::Cyclist => doc! { "cyclistId": user_id },
        UserType::Workshop => doc! { "workshopId": user_id },
        UserType::Admin => return Err(AppError::forbidden("Admins have no reviews")),
    };

    let reviews = db
        .collection::<Review>(REVIEWS)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(reviews)
}

pub async fn respond(
    db: &MongoDB,
    claims: &Claims,
    review_id: &ObjectId,
    request: &RespondReviewRequest,
) -> Result<Review, AppError> {
    let comment = require_text(&request.comment, "Response")?;
    let mut review = find_review(db, review_id).await?;

    if claims.user_type != UserType::Workshop || review.workshop_id != claims.user_id()? {
        return Err(AppError::forbidden("Only the reviewed workshop can respond"));
    }
    if review.response.is_some() {
        return Err(AppError::bad_request("This review already has a response"));
    }

    let now = chrono::Utc::now().timestamp();
    let note = WorkshopResponseNote { comment, responded_at: now };

    let result = db
        .collection::<Review>(REVIEWS)
        .update_one(
            doc! { "_id": review_id, "response": null },
            doc! { "$set": { "response": to_bson(&note)?, "updatedAt": now } },
        )
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::bad_request("This review already has a response"));
    }

    review.response = Some(note);
    review.updated_at = now;
    Ok(review)
}

/// Filter and update recording a first vote by `user_id`
fn new_vote_update(review_id: &ObjectId, user_id: ObjectId, helpful: bool) -> Result<(Document, Document), AppError> {
    let filter = doc! { "_id": review_id, "voters.userId": { "$ne": user_id } };
    let update = doc! {
        "$push": { "voters": to_bson(&Vote { user_id, helpful })? },
        "$inc": { vote_counter(helpful): 1 },
    };
    Ok((filter, update))
}

/// Filter and update flipping an existing opposite vote by `user_id`
fn switch_vote_update(review_id: &ObjectId, user_id: ObjectId, helpful: bool) -> (Document, Document) {
    let filter = doc! {
        "_id": review_id,
        "voters": { "$elemMatch": { "userId": user_id, "helpful": !helpful } },
    };
    let update = doc! {
        "$set": { "voters.$.helpful": helpful },
        "$inc": { vote_counter(helpful): 1, vote_counter(!helpful): -1 },
    };
    (filter, update)
}

pub async fn vote(
    db: &MongoDB,
    claims: &Claims,
    review_id: &ObjectId,
    request: &VoteReviewRequest,
) -> Result<(Review, VoteOutcome), AppError> {
    let user_id = claims.user_id()?;
    let review = find_review(db, review_id).await?;

    if review.cyclist_id == user_id || review.workshop_id == user_id {
        return Err(AppError::bad_request("You cannot vote on a review you are part of"));
    }

    let collection = db.collection::<Review>(REVIEWS);

    let (filter, update) = new_vote_update(review_id, user_id, request.helpful)?;
    if let Some(updated) = collection
        .find_one_and_update(filter, update)
        .return_document(ReturnDocument::After)
        .await?
    {
        return Ok((updated, VoteOutcome::Added));
    }

    let (filter, update) = switch_vote_update(review_id, user_id, request.helpful);
    if let Some(updated) = collection
        .find_one_and_update(filter, update)
        .return_document(ReturnDocument::After)
        .await?
    {
        return Ok((updated, VoteOutcome::Switched));
    }

    // the same vote is already on record
    Ok((find_review(db, review_id).await?, VoteOutcome::Unchanged))
}

pub async fn report(
    db: &MongoDB,
    claims: &Claims,
    review_id: &ObjectId,
    request: &ReportReviewRequest,
) -> Result<Review, AppError> {
    let user_id = claims.user_id()?;
    let review = find_review(db, review_id).await?;

    if review.cyclist_id == user_id {
        return Err(AppError::bad_request("You cannot report your own review"));
    }
    if review.has_reported(&user_id) {
        return Err(AppError::bad_request("You have already reported this review"));
    }

    let entry = Report {
        user_id,
        reason: request.reason,
        details: request.details.as_ref().map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        created_at: chrono::Utc::now().timestamp(),
    };

    let collection = db.collection::<Review>(REVIEWS);

    // $ne on reports.userId keeps two concurrent reports by the same user out
    let mut review = collection
        .find_one_and_update(
            doc! { "_id": review_id, "reports.userId": { "$ne": user_id } },
            doc! { "$push": { "reports": to_bson(&entry)? } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::bad_request("You have already reported this review"))?;

    if review.should_hide() && !review.is_hidden {
        let hidden = collection
            .update_one(
                doc! { "_id": review_id, "isHidden": { "$ne": true } },
                doc! { "$set": { "isHidden": true } },
            )
            .await?;
        review.is_hidden = true;

        if hidden.modified_count > 0 {
            log::warn!("🚩 Review {} hidden after {} reports", review_id, review.reports.len());
            refresh_workshop_rating(db, &review.workshop_id).await?;
        }
    }

    Ok(review)
}

pub async fn stats(db: &MongoDB, claims: &Claims, query: &ReviewStatsQuery) -> Result<ReviewStats, AppError> {
    let workshop_id = match query.workshop_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => parse_object_id(id, "workshop")?,
        None if claims.user_type == UserType::Workshop => claims.user_id()?,
        None => return Err(AppError::bad_request("workshopId is required")),
    };

    let reviews: Vec<Review> = db
        .collection::<Review>(REVIEWS)
        .find(doc! { "workshopId": workshop_id, "isHidden": { "$ne": true } })
        .await?
        .try_collect()
        .await?;

    Ok(ReviewStats::from_reviews(&workshop_id, &reviews))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportReason;
    use crate::services::test_support;

    #[test]
    fn test_sort_documents() {
        assert_eq!(sort_document(ReviewSort::Recent), doc! { "createdAt": -1 });
        assert_eq!(sort_document(ReviewSort::RatingLow).get_i32("rating").unwrap(), 1);
        assert_eq!(sort_document(ReviewSort::Helpful).keys().next().unwrap(), "helpfulVotes");
    }

    #[test]
    fn test_bson_number_accepts_both_widths() {
        let d = doc! { "a": 3_i32, "b": 5_000_000_000_i64 };
        assert_eq!(bson_number(&d, "a"), 3);
        assert_eq!(bson_number(&d, "b"), 5_000_000_000);
        assert_eq!(bson_number(&d, "missing"), 0);
    }

    #[test]
    fn test_new_vote_only_matches_first_time_voters() {
        let review_id = ObjectId::new();
        let voter = ObjectId::new();
        let (filter, update) = new_vote_update(&review_id, voter, true).unwrap();

        assert_eq!(filter.get_document("voters.userId").unwrap(), &doc! { "$ne": voter });
        assert_eq!(
            update.get_document("$push").unwrap().get_document("voters").unwrap(),
            &doc! { "userId": voter, "helpful": true }
        );
        assert_eq!(update.get_document("$inc").unwrap(), &doc! { "helpfulVotes": 1 });
    }

    #[test]
    fn test_switch_vote_moves_one_count() {
        let review_id = ObjectId::new();
        let voter = ObjectId::new();
        let (filter, update) = switch_vote_update(&review_id, voter, false);

        assert_eq!(
            filter.get_document("voters").unwrap(),
            &doc! { "$elemMatch": { "userId": voter, "helpful": true } }
        );
        assert_eq!(update.get_document("$set").unwrap(), &doc! { "voters.$.helpful": false });
        assert_eq!(
            update.get_document("$inc").unwrap(),
            &doc! { "notHelpfulVotes": 1, "helpfulVotes": -1 }
        );
    }

    async fn write_review(db: &MongoDB, workshop: &Claims, rating: i32) -> (Claims, Review) {
        let author = test_support::register(db, UserType::Cyclist).await;
        let request = CreateReviewRequest {
            workshop_id: workshop.sub.clone(),
            appointment_id: None,
            rating,
            comment: "Arreglaron los frenos en una hora".into(),
        };
        let review = create_review(db, &author, &request).await.unwrap();
        (author, review)
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_rating_follows_visible_reviews() {
        let db = test_support::live_db().await;
        let workshop = test_support::register(&db, UserType::Workshop).await;
        let workshop_id = workshop.user_id().unwrap();

        assert_eq!(refresh_workshop_rating(&db, &workshop_id).await.unwrap(), (0.0, 0));

        write_review(&db, &workshop, 4).await;
        write_review(&db, &workshop, 5).await;
        assert_eq!(refresh_workshop_rating(&db, &workshop_id).await.unwrap(), (4.5, 2));

        let stored = workshop_service::find_workshop(&db, &workshop_id).await.unwrap();
        let info = stored.workshop_info.unwrap();
        assert_eq!((info.rating, info.review_count), (4.5, 2));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_second_review_of_a_workshop_is_rejected() {
        let db = test_support::live_db().await;
        let workshop = test_support::register(&db, UserType::Workshop).await;
        let (author, review) = write_review(&db, &workshop, 3).await;

        let again = CreateReviewRequest {
            workshop_id: workshop.sub.clone(),
            appointment_id: None,
            rating: 1,
            comment: review.comment.clone(),
        };
        let err = create_review(&db, &author, &again).await.unwrap_err();
        assert_eq!(err.public_message(), ALREADY_REVIEWED_MESSAGE);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_reports_hide_review_and_recompute_rating() {
        let db = test_support::live_db().await;
        let workshop = test_support::register(&db, UserType::Workshop).await;
        let workshop_id = workshop.user_id().unwrap();

        write_review(&db, &workshop, 5).await;
        let (author, reported) = write_review(&db, &workshop, 1).await;
        let review_id = reported.id.unwrap();
        assert_eq!(refresh_workshop_rating(&db, &workshop_id).await.unwrap(), (3.0, 2));

        let request = ReportReviewRequest { reason: ReportReason::Fake, details: None };
        assert!(report(&db, &author, &review_id, &request).await.is_err());

        let mut reporters = Vec::new();
        for _ in 0..crate::models::HIDE_AFTER_REPORTS {
            reporters.push(test_support::register(&db, UserType::Cyclist).await);
        }

        let first = report(&db, &reporters[0], &review_id, &request).await.unwrap();
        assert!(!first.is_hidden);
        assert!(report(&db, &reporters[0], &review_id, &request).await.is_err());

        let results = futures::future::join_all(
            reporters[1..].iter().map(|claims| report(&db, claims, &review_id, &request)),
        )
        .await;
        assert!(results.iter().all(Result::is_ok));

        let stored = find_review(&db, &review_id).await.unwrap();
        assert!(stored.is_hidden);
        assert_eq!(stored.reports.len(), crate::models::HIDE_AFTER_REPORTS);

        let info = workshop_service::find_workshop(&db, &workshop_id)
            .await
            .unwrap()
            .workshop_info
            .unwrap();
        assert_eq!((info.rating, info.review_count), (5.0, 1));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_concurrent_votes_are_all_counted() {
        let db = test_support::live_db().await;
        let workshop = test_support::register(&db, UserType::Workshop).await;
        let (_, review) = write_review(&db, &workshop, 4).await;
        let review_id = review.id.unwrap();

        let mut voters = Vec::new();
        for _ in 0..5 {
            voters.push(test_support::register(&db, UserType::Cyclist).await);
        }

        let helpful = VoteReviewRequest { helpful: true };
        let results = futures::future::join_all(
            voters.iter().map(|claims| vote(&db, claims, &review_id, &helpful)),
        )
        .await;
        assert!(results.iter().all(|r| matches!(r, Ok((_, VoteOutcome::Added)))));

        let (_, outcome) = vote(&db, &voters[0], &review_id, &helpful).await.unwrap();
        assert_eq!(outcome, VoteOutcome::Unchanged);

        let (updated, outcome) = vote(&db, &voters[0], &review_id, &VoteReviewRequest { helpful: false })
            .await
            .unwrap();
        assert_eq!(outcome, VoteOutcome::Switched);
        assert_eq!((updated.helpful_votes, updated.not_helpful_votes), (4, 1));
        assert_eq!(updated.voters.len(), 5);

        let err = vote(&db, &workshop, &review_id, &helpful).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
