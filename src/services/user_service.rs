// ==================== PROFILE & BIKES ====================
// Cyclists register their bikes here; the appointment guard counts them

use crate::{
    database::{MongoDB, BIKES, USERS},
    middleware::auth::Claims,
    models::{
        validate_total_km, validate_year, Bike, BikeResponse, CreateBikeRequest, UpdateBikeRequest,
        UpdateProfileRequest, User, UserResponse, UserType,
    },
    services::auth_service,
    utils::{require_text, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::options::ReturnDocument;

// ==================== PROFILE ====================

pub async fn get_profile(db: &MongoDB, claims: &Claims) -> Result<UserResponse, AppError> {
    let user = auth_service::get_current_user(db, &claims.user_id()?).await?;
    Ok(UserResponse::from(user))
}

/// Builds the `$set` document for a profile update
pub fn profile_update_doc(user_type: UserType, request: &UpdateProfileRequest) -> Result<Document, AppError> {
    let mut update = doc! { "updatedAt": chrono::Utc::now().timestamp() };

    if let Some(name) = &request.name {
        update.insert("name", require_text(name, "Name")?);
    }
    if let Some(phone) = &request.phone {
        update.insert("phone", phone.trim());
    }
    if let Some(address) = &request.address {
        update.insert("address", to_bson(address)?);
    }

    if let Some(info) = &request.workshop_info {
        if user_type != UserType::Workshop {
            return Err(AppError::bad_request("Only workshops have workshop information"));
        }
        if let Some(business_name) = &info.business_name {
            update.insert("workshopInfo.businessName", business_name.trim());
        }
        if let Some(description) = &info.description {
            update.insert("workshopInfo.description", description.trim());
        }
        if let Some(services) = &info.services {
            update.insert("workshopInfo.services", clean_list(services));
        }
        if let Some(specialties) = &info.specialties {
            update.insert("workshopInfo.specialties", clean_list(specialties));
        }
        if let Some(hours) = &info.hours {
            update.insert("workshopInfo.hours", to_bson(hours)?);
        }
    }

    Ok(update)
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn update_profile(
    db: &MongoDB,
    claims: &Claims,
    request: &UpdateProfileRequest,
) -> Result<UserResponse, AppError> {
    let update = profile_update_doc(claims.user_type, request)?;

    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(doc! { "_id": claims.user_id()? }, doc! { "$set": update })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    log::info!("✅ Profile updated: {}", claims.sub);
    Ok(UserResponse::from(user))
}

// ==================== BIKES ====================

fn require_cyclist(claims: &Claims) -> Result<ObjectId, AppError> {
    if claims.user_type != UserType::Cyclist {
        return Err(AppError::forbidden("Only cyclists can manage bikes"));
    }
    claims.user_id()
}

pub fn validate_new_bike(request: &CreateBikeRequest) -> Result<(String, String), AppError> {
    let brand = require_text(&request.brand, "Brand")?;
    let model = require_text(&request.model, "Model")?;
    if let Some(year) = request.year {
        validate_year(year).map_err(AppError::BadRequest)?;
    }
    validate_total_km(request.total_km).map_err(AppError::BadRequest)?;
    Ok((brand, model))
}

pub async fn list_bikes(db: &MongoDB, owner_id: &ObjectId) -> Result<Vec<Bike>, AppError> {
    let bikes = db
        .collection::<Bike>(BIKES)
        .find(doc! { "ownerId": owner_id, "isActive": true })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(bikes)
}

pub async fn count_bikes(db: &MongoDB, owner_id: &ObjectId) -> Result<u64, AppError> {
    let count = db
        .collection::<Bike>(BIKES)
        .count_documents(doc! { "ownerId": owner_id, "isActive": true })
        .await?;
    Ok(count)
}

pub async fn add_bike(
    db: &MongoDB,
    claims: &Claims,
    request: &CreateBikeRequest,
) -> Result<BikeResponse, AppError> {
    let owner_id = require_cyclist(claims)?;
    let (brand, model) = validate_new_bike(request)?;

    let collection = db.collection::<Bike>(BIKES);

    let serial_number = request
        .serial_number
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if let Some(serial) = &serial_number {
        let duplicate = collection
            .find_one(doc! { "ownerId": owner_id, "serialNumber": serial, "isActive": true })
            .await?;
        if duplicate.is_some() {
            return Err(AppError::bad_request("A bike with this serial number is already registered"));
        }
    }

    let now = chrono::Utc::now().timestamp();
    let mut bike = Bike {
        id: None,
        owner_id,
        brand,
        model,
        year: request.year,
        bike_type: request.bike_type,
        serial_number,
        total_km: request.total_km,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let result = collection.insert_one(&bike).await?;
    bike.id = result.inserted_id.as_object_id();

    log::info!("🚲 Bike registered: {} {} for {}", bike.brand, bike.model, claims.sub);
    Ok(BikeResponse::from(bike))
}

pub async fn update_bike(
    db: &MongoDB,
    claims: &Claims,
    bike_id: &ObjectId,
    request: &UpdateBikeRequest,
) -> Result<BikeResponse, AppError> {
    let owner_id = require_cyclist(claims)?;

    let mut update = doc! { "updatedAt": chrono::Utc::now().timestamp() };
    if let Some(brand) = &request.brand {
        update.insert("brand", require_text(brand, "Brand")?);
    }
    if let Some(model) = &request.model {
        update.insert("model", require_text(model, "Model")?);
    }
    if let Some(year) = request.year {
        validate_year(year).map_err(AppError::BadRequest)?;
        update.insert("year", year);
    }
    if let Some(bike_type) = &request.bike_type {
        update.insert("type", to_bson(bike_type)?);
    }
    if let Some(serial) = &request.serial_number {
        update.insert("serialNumber", serial.trim());
    }
    if let Some(total_km) = request.total_km {
        validate_total_km(total_km).map_err(AppError::BadRequest)?;
        update.insert("totalKm", total_km);
    }

    let bike = db
        .collection::<Bike>(BIKES)
        .find_one_and_update(
            doc! { "_id": bike_id, "ownerId": owner_id, "isActive": true },
            doc! { "$set": update },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Bike not found"))?;

    Ok(BikeResponse::from(bike))
}

/// Soft delete: past appointments keep pointing at the bike
pub async fn delete_bike(db: &MongoDB, claims: &Claims, bike_id: &ObjectId) -> Result<(), AppError> {
    let owner_id = require_cyclist(claims)?;

    let result = db
        .collection::<Bike>(BIKES)
        .update_one(
            doc! { "_id": bike_id, "ownerId": owner_id, "isActive": true },
            doc! { "$set": { "isActive": false, "updatedAt": chrono::Utc::now().timestamp() } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::not_found("Bike not found"));
    }

    log::info!("🗑️  Bike {} removed by {}", bike_id, claims.sub);
    Ok(())
}
