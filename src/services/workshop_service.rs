use crate::{
    database::{MongoDB, USERS},
    models::{User, UserType, WorkshopResponse},
    utils::{total_pages, AppError, PaginationQuery},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document, Regex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopQuery {
    pub city: Option<String>,
    pub service: Option<String>,
    pub search: Option<String>,
    pub min_rating: Option<f64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopListResponse {
    pub success: bool,
    pub workshops: Vec<WorkshopResponse>,
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

/// Escapes user input so it can be embedded in a regex literally
pub fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn contains_ci(value: &str) -> Regex {
    Regex {
        pattern: escape_regex(value.trim()),
        options: "i".to_string(),
    }
}

pub fn build_filter(query: &WorkshopQuery) -> Document {
    let mut filter = doc! {
        "userType": UserType::Workshop.as_str(),
        "isActive": true,
    };

    if let Some(city) = query.city.as_deref().filter(|c| !c.trim().is_empty()) {
        filter.insert("address.city", contains_ci(city));
    }

    let mut and_clauses: Vec<Document> = Vec::new();

    if let Some(service) = query.service.as_deref().filter(|s| !s.trim().is_empty()) {
        and_clauses.push(doc! {
            "$or": [
                { "workshopInfo.services": contains_ci(service) },
                { "workshopInfo.specialties": contains_ci(service) },
            ]
        });
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        and_clauses.push(doc! {
            "$or": [
                { "name": contains_ci(search) },
                { "workshopInfo.businessName": contains_ci(search) },
            ]
        });
    }

    if !and_clauses.is_empty() {
        filter.insert("$and", and_clauses);
    }

    if let Some(min_rating) = query.min_rating.filter(|r| *r > 0.0) {
        filter.insert("workshopInfo.rating", doc! { "$gte": min_rating });
    }

    filter
}

pub async fn list_workshops(db: &MongoDB, query: &WorkshopQuery) -> Result<WorkshopListResponse, AppError> {
    let collection = db.collection::<User>(USERS);
    let filter = build_filter(query);

    let pagination = PaginationQuery { page: query.page, limit: query.limit };
    let (page, limit) = (pagination.page(), pagination.limit());

    let total = collection.count_documents(filter.clone()).await?;

    let users: Vec<User> = collection
        .find(filter)
        .sort(doc! { "workshopInfo.rating": -1, "name": 1 })
        .skip(pagination.skip())
        .limit(limit as i64)
        .await?
        .try_collect()
        .await?;

    Ok(WorkshopListResponse {
        success: true,
        workshops: users.into_iter().map(WorkshopResponse::from).collect(),
        total,
        page,
        total_pages: total_pages(total, limit),
    })
}

/// Active workshop by id, used by the catalog and by booking/review validation
pub async fn find_workshop(db: &MongoDB, workshop_id: &ObjectId) -> Result<User, AppError> {
    let user = db
        .collection::<User>(USERS)
        .find_one(doc! { "_id": workshop_id })
        .await?
        .filter(|u| u.is_workshop() && u.is_active)
        .ok_or_else(|| AppError::not_found("Workshop not found"))?;
    Ok(user)
}

pub async fn get_workshop(db: &MongoDB, workshop_id: &ObjectId) -> Result<WorkshopResponse, AppError> {
    Ok(WorkshopResponse::from(find_workshop(db, workshop_id).await?))
}
