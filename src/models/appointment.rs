use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::UserType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Transition table: who may move an appointment from `self` to `next`
    pub fn can_transition(&self, next: AppointmentStatus, actor: UserType) -> bool {
        use AppointmentStatus::*;

        let allowed = matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
        );
        if !allowed {
            return false;
        }

        match actor {
            UserType::Workshop | UserType::Admin => true,
            // cyclists can only back out before work starts
            UserType::Cyclist => next == Cancelled,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

/// Free-form bike description for bookings that don't reference a registered bike
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BikeInfo {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(rename = "type", default)]
    pub bike_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub estimated_price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Pricing {
    pub fn from_estimate(estimate: Option<f64>) -> Self {
        Pricing {
            total_price: estimate.unwrap_or(0.0),
            estimated_price: estimate,
            currency: default_currency(),
        }
    }
}

/// Document in the "appointments" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub cyclist_id: ObjectId,
    pub workshop_id: ObjectId,
    pub appointment_date: String,
    pub appointment_time: String,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub requested_services: Vec<String>,
    #[serde(default)]
    pub bike_info: Option<BikeInfo>,
    #[serde(default)]
    pub bike_ids: Vec<ObjectId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub status: AppointmentStatus,
    pub pricing: Pricing,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub workshop_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Appointment {
    pub fn involves(&self, user_id: &ObjectId) -> bool {
        &self.cyclist_id == user_id || &self.workshop_id == user_id
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub workshop_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub service_type: Option<String>,
    #[serde(default)]
    pub requested_services: Vec<String>,
    pub bike_info: Option<BikeInfo>,
    #[serde(default)]
    pub bike_ids: Vec<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub estimated_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
    pub total_price: Option<f64>,
    pub workshop_notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub cyclist_id: String,
    pub workshop_id: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub service_type: Option<String>,
    pub requested_services: Vec<String>,
    pub bike_info: Option<BikeInfo>,
    pub bike_ids: Vec<String>,
    pub description: Option<String>,
    pub urgency: Urgency,
    pub status: AppointmentStatus,
    pub pricing: Pricing,
    pub cancellation_reason: Option<String>,
    pub workshop_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        AppointmentResponse {
            id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
            cyclist_id: a.cyclist_id.to_hex(),
            workshop_id: a.workshop_id.to_hex(),
            appointment_date: a.appointment_date,
            appointment_time: a.appointment_time,
            service_type: a.service_type,
            requested_services: a.requested_services,
            bike_info: a.bike_info,
            bike_ids: a.bike_ids.iter().map(|id| id.to_hex()).collect(),
            description: a.description,
            urgency: a.urgency,
            status: a.status,
            pricing: a.pricing,
            cancellation_reason: a.cancellation_reason,
            workshop_notes: a.workshop_notes,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Parses `YYYY-MM-DD` + `HH:MM` (seconds optional); also accepts an ISO
/// datetime in the date field, keeping only its date part
pub fn parse_schedule(date: &str, time: &str) -> Result<NaiveDateTime, String> {
    let date_part = date.trim().get(..10).unwrap_or(date.trim());
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| "appointmentDate must use the YYYY-MM-DD format".to_string())?;

    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| "appointmentTime must use the HH:MM format".to_string())?;

    Ok(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), "\"in_progress\"");
        let s: AppointmentStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(s, Cancelled);
        assert_eq!(InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_workshop_transitions() {
        let w = UserType::Workshop;
        assert!(Pending.can_transition(Confirmed, w));
        assert!(Confirmed.can_transition(InProgress, w));
        assert!(InProgress.can_transition(Completed, w));
        assert!(Pending.can_transition(Cancelled, w));

        assert!(!Pending.can_transition(Completed, w));
        assert!(!InProgress.can_transition(Cancelled, w));
        assert!(!Completed.can_transition(Pending, w));
        assert!(!Cancelled.can_transition(Confirmed, w));
        assert!(!Pending.can_transition(Pending, w));
    }

    #[test]
    fn test_cyclist_can_only_cancel_before_work_starts() {
        let c = UserType::Cyclist;
        assert!(Pending.can_transition(Cancelled, c));
        assert!(Confirmed.can_transition(Cancelled, c));
        assert!(!Pending.can_transition(Confirmed, c));
        assert!(!InProgress.can_transition(Completed, c));
        assert!(!InProgress.can_transition(Cancelled, c));
    }

    #[test]
    fn test_finished_appointments_never_move() {
        for next in [Pending, Confirmed, InProgress, Completed, Cancelled] {
            for actor in [UserType::Cyclist, UserType::Workshop, UserType::Admin] {
                assert!(!Completed.can_transition(next, actor));
                assert!(!Cancelled.can_transition(next, actor));
            }
        }
    }

    #[test]
    fn test_parse_schedule() {
        let dt = parse_schedule("2030-05-14", "09:30").unwrap();
        assert_eq!(dt.to_string(), "2030-05-14 09:30:00");

        assert!(parse_schedule("2030-05-14T00:00:00.000Z", "17:45:00").is_ok());
        assert!(parse_schedule("14/05/2030", "09:30").is_err());
        assert!(parse_schedule("2030-05-14", "9h30").is_err());
        assert!(parse_schedule("2030-02-30", "10:00").is_err());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateAppointmentRequest = serde_json::from_str(
            r#"{"workshopId":"65f1c0a2b3d4e5f601234567","appointmentDate":"2030-01-10","appointmentTime":"10:00","serviceType":"maintenance"}"#,
        )
        .unwrap();
        assert_eq!(req.urgency, Urgency::Medium);
        assert!(req.bike_ids.is_empty());
        assert!(req.requested_services.is_empty());
    }

    #[test]
    fn test_pricing_from_estimate() {
        let p = Pricing::from_estimate(Some(45.0));
        assert_eq!(p.total_price, 45.0);
        assert_eq!(p.currency, "EUR");
        assert_eq!(Pricing::from_estimate(None).total_price, 0.0);
    }
}
