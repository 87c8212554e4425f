// ==================== APPOINTMENTS ====================
// Booking flow: cyclist -> workshop. A cyclist needs at least one registered
// bike before the first booking.

use crate::{
    database::{MongoDB, APPOINTMENTS},
    middleware::auth::Claims,
    models::{
        parse_schedule, Appointment, AppointmentQuery, AppointmentStatus, Bike,
        CreateAppointmentRequest, Pricing, UpdateAppointmentStatusRequest, UserType,
    },
    services::{user_service, workshop_service},
    utils::{parse_object_id, AppError},
};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};

pub const NO_BIKES_MESSAGE: &str =
    "Debes registrar al menos una bicicleta antes de solicitar una cita";

pub const EXPIRED_REASON: &str = "expired";

/// Booking payload after syntactic validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub workshop_id: ObjectId,
    pub appointment_date: String,
    pub appointment_time: String,
    pub service_type: Option<String>,
    pub requested_services: Vec<String>,
    pub bike_ids: Vec<ObjectId>,
    pub description: Option<String>,
}

pub fn ensure_has_bikes(bike_count: u64) -> Result<(), AppError> {
    if bike_count == 0 {
        return Err(AppError::bad_request(NO_BIKES_MESSAGE));
    }
    Ok(())
}

pub fn validate_booking(request: &CreateAppointmentRequest, today: NaiveDate) -> Result<ValidatedBooking, AppError> {
    let workshop_id = parse_object_id(&request.workshop_id, "workshop")?;

    let scheduled = parse_schedule(&request.appointment_date, &request.appointment_time)
        .map_err(AppError::BadRequest)?;
    if scheduled.date() < today {
        return Err(AppError::bad_request("Appointment date cannot be in the past"));
    }

    let service_type = request
        .service_type
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let requested_services: Vec<String> = request
        .requested_services
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if service_type.is_none() && requested_services.is_empty() {
        return Err(AppError::bad_request("Please specify at least one service"));
    }

    if let Some(price) = request.estimated_price {
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::bad_request("Estimated price must be a positive number"));
        }
    }

    let bike_ids = request
        .bike_ids
        .iter()
        .map(|id| parse_object_id(id, "bike"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedBooking {
        workshop_id,
        appointment_date: scheduled.format("%Y-%m-%d").to_string(),
        appointment_time: scheduled.format("%H:%M").to_string(),
        service_type,
        requested_services,
        bike_ids,
        description: request
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    })
}

/// Requested bikes must all belong to the cyclist; with neither ids nor a
/// free-form description the newest owned bike is attached
pub fn resolve_bike_ids(requested: &[ObjectId], owned: &[Bike], has_bike_info: bool) -> Result<Vec<ObjectId>, AppError> {
    if requested.is_empty() {
        if has_bike_info {
            return Ok(vec![]);
        }
        return Ok(owned.iter().filter_map(|b| b.id).take(1).collect());
    }

    let mut resolved = Vec::with_capacity(requested.len());
    for id in requested {
        if !owned.iter().any(|b| b.id.as_ref() == Some(id)) {
            return Err(AppError::bad_request(format!("Bike {} is not registered to your account", id)));
        }
        if !resolved.contains(id) {
            resolved.push(*id);
        }
    }
    Ok(resolved)
}

pub async fn create_appointment(
    db: &MongoDB,
    claims: &Claims,
    request: &CreateAppointmentRequest,
) -> Result<Appointment, AppError> {
    if claims.user_type != UserType::Cyclist {
        return Err(AppError::forbidden("Only cyclists can book appointments"));
    }
    let cyclist_id = claims.user_id()?;

    ensure_has_bikes(user_service::count_bikes(db, &cyclist_id).await?)?;

    let booking = validate_booking(request, chrono::Utc::now().date_naive())?;
    let workshop = workshop_service::find_workshop(db, &booking.workshop_id).await?;

    let owned = user_service::list_bikes(db, &cyclist_id).await?;
    let bike_ids = resolve_bike_ids(&booking.bike_ids, &owned, request.bike_info.is_some())?;

    let now = chrono::Utc::now().timestamp();
    let mut appointment = Appointment {
        id: None,
        cyclist_id,
        workshop_id: booking.workshop_id,
        appointment_date: booking.appointment_date,
        appointment_time: booking.appointment_time,
        service_type: booking.service_type,
        requested_services: booking.requested_services,
        bike_info: request.bike_info.clone(),
        bike_ids,
        description: booking.description,
        urgency: request.urgency,
        status: AppointmentStatus::Pending,
        pricing: Pricing::from_estimate(request.estimated_price),
        cancellation_reason: None,
        workshop_notes: None,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Appointment>(APPOINTMENTS)
        .insert_one(&appointment)
        .await?;
    appointment.id = result.inserted_id.as_object_id();

    log::info!(
        "📅 Appointment booked: cyclist {} -> {} on {} {}",
        cyclist_id,
        workshop.display_name(),
        appointment.appointment_date,
        appointment.appointment_time
    );

    Ok(appointment)
}

pub async fn list_appointments(
    db: &MongoDB,
    claims: &Claims,
    query: &AppointmentQuery,
) -> Result<Vec<Appointment>, AppError> {
    let user_id = claims.user_id()?;

    let mut filter = match claims.user_type {
        UserType::Cyclist => doc! { "cyclistId": user_id },
        UserType::Workshop => doc! { "workshopId": user_id },
        UserType::Admin => doc! {},
    };
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }

    let appointments = db
        .collection::<Appointment>(APPOINTMENTS)
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;
    Ok(appointments)
}

pub async fn get_appointment(db: &MongoDB, claims: &Claims, appointment_id: &ObjectId) -> Result<Appointment, AppError> {
    let appointment = db
        .collection::<Appointment>(APPOINTMENTS)
        .find_one(doc! { "_id": appointment_id })
        .await?
        .ok_or_else(|| AppError::not_found("Appointment not found"))?;

    if !claims.is_admin() && !appointment.involves(&claims.user_id()?) {
        return Err(AppError::forbidden("You are not part of this appointment"));
    }
    Ok(appointment)
}

pub async fn update_status(
    db: &MongoDB,
    claims: &Claims,
    appointment_id: &ObjectId,
    request: &UpdateAppointmentStatusRequest,
) -> Result<Appointment, AppError> {
    let mut appointment = get_appointment(db, claims, appointment_id).await?;
    let user_id = claims.user_id()?;

    // the workshop side of an appointment is only its own workshop
    if claims.user_type == UserType::Workshop && appointment.workshop_id != user_id {
        return Err(AppError::forbidden("You are not part of this appointment"));
    }

    let current = appointment.status;
    if !current.can_transition(request.status, claims.user_type) {
        return Err(AppError::bad_request(format!(
            "Cannot change appointment status from {} to {}",
            current, request.status
        )));
    }

    let now = chrono::Utc::now().timestamp();
    let mut update = doc! { "status": request.status.as_str(), "updatedAt": now };

    if let Some(price) = request.total_price {
        if claims.user_type == UserType::Cyclist {
            return Err(AppError::forbidden("Only the workshop can set the price"));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::bad_request("Total price must be a positive number"));
        }
        update.insert("pricing.totalPrice", price);
        appointment.pricing.total_price = price;
    }

    if let Some(notes) = request.workshop_notes.as_ref().filter(|n| !n.trim().is_empty()) {
        if claims.user_type == UserType::Cyclist {
            return Err(AppError::forbidden("Only the workshop can add notes"));
        }
        update.insert("workshopNotes", notes.trim());
        appointment.workshop_notes = Some(notes.trim().to_string());
    }

    if request.status == AppointmentStatus::Cancelled {
        let reason = request
            .cancellation_reason
            .as_ref()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| format!("cancelled by {}", claims.user_type));
        update.insert("cancellationReason", reason.clone());
        appointment.cancellation_reason = Some(reason);
    }

    // guard on the status we validated against, a concurrent change makes this a no-op
    let result = db
        .collection::<Appointment>(APPOINTMENTS)
        .update_one(
            doc! { "_id": appointment_id, "status": current.as_str() },
            doc! { "$set": update },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::bad_request("Appointment was modified meanwhile, please reload"));
    }

    log::info!("🔄 Appointment {} {} -> {} by {}", appointment_id, current, request.status, claims.sub);

    appointment.status = request.status;
    appointment.updated_at = now;
    Ok(appointment)
}

/// Cancels pending appointments whose day is already over
pub async fn expire_stale_appointments(db: &MongoDB, today: NaiveDate) -> Result<u64, AppError> {
    let result = db
        .collection::<Appointment>(APPOINTMENTS)
        .update_many(
            doc! {
                "status": AppointmentStatus::Pending.as_str(),
                "appointmentDate": { "$lt": today.format("%Y-%m-%d").to_string() },
            },
            doc! {
                "$set": {
                    "status": AppointmentStatus::Cancelled.as_str(),
                    "cancellationReason": EXPIRED_REASON,
                    "updatedAt": chrono::Utc::now().timestamp(),
                }
            },
        )
        .await?;
    Ok(result.modified_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BikeType, CreateBikeRequest, Urgency};
    use crate::services::test_support;

    fn request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            workshop_id: ObjectId::new().to_hex(),
            appointment_date: "2030-03-15".into(),
            appointment_time: "10:30".into(),
            service_type: Some("maintenance".into()),
            requested_services: vec![],
            bike_info: None,
            bike_ids: vec![],
            description: Some("  Ruido en la transmisión ".into()),
            urgency: Urgency::Medium,
            estimated_price: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 1).unwrap()
    }

    fn bike(id: ObjectId) -> Bike {
        Bike {
            id: Some(id),
            owner_id: ObjectId::new(),
            brand: "Trek".into(),
            model: "FX 3".into(),
            year: Some(2022),
            bike_type: BikeType::Hybrid,
            serial_number: None,
            total_km: 0.0,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_zero_bikes_is_rejected_with_bike_message() {
        let err = ensure_has_bikes(0).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.public_message().contains("bicicleta"));

        assert!(ensure_has_bikes(1).is_ok());
    }

    #[test]
    fn test_validate_booking_normalizes() {
        let booking = validate_booking(&request(), today()).unwrap();
        assert_eq!(booking.appointment_date, "2030-03-15");
        assert_eq!(booking.appointment_time, "10:30");
        assert_eq!(booking.description.as_deref(), Some("Ruido en la transmisión"));
    }

    #[test]
    fn test_validate_booking_rejects_past_date() {
        let mut req = request();
        req.appointment_date = "2030-02-28".into();
        assert!(validate_booking(&req, today()).is_err());

        req.appointment_date = "2030-03-01".into();
        assert!(validate_booking(&req, today()).is_ok());
    }

    #[test]
    fn test_validate_booking_requires_a_service() {
        let mut req = request();
        req.service_type = Some("  ".into());
        assert!(validate_booking(&req, today()).is_err());

        req.requested_services = vec!["Cambio de cadena".into()];
        let booking = validate_booking(&req, today()).unwrap();
        assert!(booking.service_type.is_none());
        assert_eq!(booking.requested_services, vec!["Cambio de cadena".to_string()]);
    }

    #[test]
    fn test_validate_booking_rejects_bad_ids() {
        let mut req = request();
        req.workshop_id = "123".into();
        assert_eq!(validate_booking(&req, today()).unwrap_err().public_message(), "Invalid workshop ID");

        let mut req = request();
        req.bike_ids = vec!["nope".into()];
        assert_eq!(validate_booking(&req, today()).unwrap_err().public_message(), "Invalid bike ID");
    }

    #[test]
    fn test_validate_booking_rejects_negative_estimate() {
        let mut req = request();
        req.estimated_price = Some(-10.0);
        assert!(validate_booking(&req, today()).is_err());
    }

    #[test]
    fn test_resolve_bike_ids() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let owned = vec![bike(a), bike(b)];

        assert_eq!(resolve_bike_ids(&[], &owned, false).unwrap(), vec![a]);
        assert!(resolve_bike_ids(&[], &owned, true).unwrap().is_empty());
        assert_eq!(resolve_bike_ids(&[b, b], &owned, false).unwrap(), vec![b]);

        let foreign = ObjectId::new();
        assert!(resolve_bike_ids(&[a, foreign], &owned, false).is_err());
    }

    fn live_request(workshop: &Claims) -> CreateAppointmentRequest {
        let mut req = request();
        req.workshop_id = workshop.sub.clone();
        req.appointment_date = (chrono::Utc::now().date_naive() + chrono::Duration::days(3))
            .format("%Y-%m-%d")
            .to_string();
        req
    }

    fn road_bike() -> CreateBikeRequest {
        CreateBikeRequest {
            brand: "Orbea".into(),
            model: "Orca".into(),
            year: Some(2022),
            bike_type: BikeType::Road,
            serial_number: None,
            total_km: 1200.0,
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_first_booking_waits_for_a_bike() {
        let db = test_support::live_db().await;
        let workshop = test_support::register(&db, UserType::Workshop).await;
        let cyclist = test_support::register(&db, UserType::Cyclist).await;
        let booking = live_request(&workshop);

        let err = create_appointment(&db, &cyclist, &booking).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.public_message().contains("bicicleta"));

        let bike = user_service::add_bike(&db, &cyclist, &road_bike()).await.unwrap();
        let owned = user_service::list_bikes(&db, &cyclist.user_id().unwrap()).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id.map(|id| id.to_hex()), Some(bike.id.clone()));

        let appointment = create_appointment(&db, &cyclist, &booking).await.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.workshop_id.to_hex(), workshop.sub);
        assert_eq!(appointment.bike_ids.iter().map(|id| id.to_hex()).collect::<Vec<_>>(), vec![bike.id]);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_only_the_booked_workshop_moves_the_status() {
        let db = test_support::live_db().await;
        let workshop = test_support::register(&db, UserType::Workshop).await;
        let other_workshop = test_support::register(&db, UserType::Workshop).await;
        let cyclist = test_support::register(&db, UserType::Cyclist).await;

        user_service::add_bike(&db, &cyclist, &road_bike()).await.unwrap();
        let appointment = create_appointment(&db, &cyclist, &live_request(&workshop)).await.unwrap();
        let appointment_id = appointment.id.unwrap();

        let confirm = UpdateAppointmentStatusRequest {
            status: AppointmentStatus::Confirmed,
            total_price: Some(45.0),
            workshop_notes: None,
            cancellation_reason: None,
        };

        let err = update_status(&db, &other_workshop, &appointment_id, &confirm).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = update_status(&db, &cyclist, &appointment_id, &confirm).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_) | AppError::Forbidden(_)));

        let confirmed = update_status(&db, &workshop, &appointment_id, &confirm).await.unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.pricing.total_price, 45.0);

        let stored = get_appointment(&db, &cyclist, &appointment_id).await.unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
    }
}
