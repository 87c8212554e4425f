use chrono::Datelike;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BikeType {
    Road,
    Mountain,
    Hybrid,
    Electric,
    Bmx,
    City,
    Gravel,
    #[default]
    Other,
}

/// Document in the "bikes" collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(rename = "type", default)]
    pub bike_type: BikeType,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub total_km: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBikeRequest {
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    #[serde(rename = "type", default)]
    pub bike_type: BikeType,
    pub serial_number: Option<String>,
    #[serde(default)]
    pub total_km: f64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBikeRequest {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub bike_type: Option<BikeType>,
    pub serial_number: Option<String>,
    pub total_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BikeResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub brand: String,
    pub model: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub bike_type: BikeType,
    pub serial_number: Option<String>,
    pub total_km: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Bike> for BikeResponse {
    fn from(bike: Bike) -> Self {
        BikeResponse {
            id: bike.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: bike.owner_id.to_hex(),
            brand: bike.brand,
            model: bike.model,
            year: bike.year,
            bike_type: bike.bike_type,
            serial_number: bike.serial_number,
            total_km: bike.total_km,
            created_at: bike.created_at,
            updated_at: bike.updated_at,
        }
    }
}

pub const MIN_BIKE_YEAR: i32 = 1900;

/// Accepts model years up to next year's catalog
pub fn validate_year(year: i32) -> Result<(), String> {
    let max = chrono::Utc::now().year() + 1;
    if !(MIN_BIKE_YEAR..=max).contains(&year) {
        return Err(format!("Year must be between {} and {}", MIN_BIKE_YEAR, max));
    }
    Ok(())
}

pub fn validate_total_km(total_km: f64) -> Result<(), String> {
    if !total_km.is_finite() || total_km < 0.0 {
        return Err("Total km must be a positive number".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_uses_type_key() {
        let req: CreateBikeRequest = serde_json::from_str(
            r#"{"brand":"Trek","model":"Marlin 7","year":2022,"type":"mountain","serialNumber":"WTU123","totalKm":1500}"#,
        )
        .unwrap();
        assert_eq!(req.bike_type, BikeType::Mountain);
        assert_eq!(req.serial_number.as_deref(), Some("WTU123"));
        assert_eq!(req.total_km, 1500.0);
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateBikeRequest =
            serde_json::from_str(r#"{"brand":"Orbea","model":"Vector"}"#).unwrap();
        assert_eq!(req.bike_type, BikeType::Other);
        assert_eq!(req.total_km, 0.0);
        assert!(req.year.is_none());
    }

    #[test]
    fn test_validate_year() {
        assert!(validate_year(2020).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(chrono::Utc::now().year() + 1).is_ok());
        assert!(validate_year(chrono::Utc::now().year() + 2).is_err());
    }

    #[test]
    fn test_validate_total_km() {
        assert!(validate_total_km(0.0).is_ok());
        assert!(validate_total_km(-1.0).is_err());
        assert!(validate_total_km(f64::NAN).is_err());
    }
}
