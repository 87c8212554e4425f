use crate::database::{MongoDB, USERS};
use crate::models::{Address, OpeningHours, User, UserType, WorkshopInfo};
use mongodb::bson::doc;

/// Password shared by every demo workshop account
pub const DEMO_PASSWORD: &str = "bikefix123";

/// Inserts the demo workshops when the users collection has none.
pub async fn seed_demo_workshops(db: &MongoDB) {
    let collection = db.collection::<User>(USERS);

    let count = match collection
        .count_documents(doc! { "userType": UserType::Workshop.as_str() })
        .await
    {
        Ok(count) => count,
        Err(e) => {
            log::error!("❌ Workshop seed: could not count workshops - {}", e);
            return;
        }
    };

    if count > 0 {
        log::info!("🔧 Workshop seed: {} workshops already in DB, skipping", count);
        return;
    }

    let password = match bcrypt::hash(DEMO_PASSWORD, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("❌ Workshop seed: password hashing failed - {}", e);
            return;
        }
    };

    let workshops = build_demo_workshops(&password, chrono::Utc::now().timestamp());

    match collection.insert_many(&workshops).await {
        Ok(result) => log::info!("   ✅ Inserted {} demo workshops", result.inserted_ids.len()),
        Err(e) => log::error!("   ❌ Failed to seed demo workshops: {}", e),
    }
}

fn weekday_hours(open: &str, close: &str, saturday_close: Option<&str>) -> Vec<OpeningHours> {
    let mut hours: Vec<OpeningHours> = ["monday", "tuesday", "wednesday", "thursday", "friday"]
        .iter()
        .map(|day| OpeningHours {
            day: day.to_string(),
            open: Some(open.to_string()),
            close: Some(close.to_string()),
            closed: false,
        })
        .collect();

    hours.push(OpeningHours {
        day: "saturday".into(),
        open: saturday_close.map(|_| open.to_string()),
        close: saturday_close.map(str::to_string),
        closed: saturday_close.is_none(),
    });
    hours.push(OpeningHours { day: "sunday".into(), open: None, close: None, closed: true });
    hours
}

fn demo_workshop(
    password: &str,
    now: i64,
    (name, email, city, street): (&str, &str, &str, &str),
    description: &str,
    services: &[&str],
    specialties: &[&str],
    hours: Vec<OpeningHours>,
) -> User {
    User {
        id: None,
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        user_type: UserType::Workshop,
        phone: None,
        address: Some(Address {
            street: Some(street.to_string()),
            city: Some(city.to_string()),
            state: None,
            postal_code: None,
            country: Some("España".to_string()),
        }),
        is_verified: true,
        is_active: true,
        workshop_info: Some(WorkshopInfo {
            business_name: Some(name.to_string()),
            description: Some(description.to_string()),
            services: services.iter().map(|s| s.to_string()).collect(),
            specialties: specialties.iter().map(|s| s.to_string()).collect(),
            hours,
            rating: 0.0,
            review_count: 0,
        }),
        created_at: now,
        updated_at: now,
        last_login: None,
    }
}

fn build_demo_workshops(password: &str, now: i64) -> Vec<User> {
    vec![
        demo_workshop(
            password,
            now,
            ("Taller Pedal Madrid", "pedal.madrid@bikefix.demo", "Madrid", "Calle de Alcalá 120"),
            "Mecánica general y puesta a punto para bicicletas de carretera y urbanas.",
            &["Puesta a punto", "Frenos", "Cambio de cubiertas", "Ajuste de cambios"],
            &["Carretera", "Urbana"],
            weekday_hours("09:00", "19:00", Some("14:00")),
        ),
        demo_workshop(
            password,
            now,
            ("Ciclos Montjuïc", "montjuic@bikefix.demo", "Barcelona", "Carrer de Sants 45"),
            "Especialistas en montaña: suspensiones, tubeless y frenos hidráulicos.",
            &["Suspensiones", "Tubeless", "Frenos hidráulicos", "Puesta a punto"],
            &["Montaña", "Gravel"],
            weekday_hours("10:00", "20:00", Some("14:00")),
        ),
        demo_workshop(
            password,
            now,
            ("E-Bike Valencia", "ebike.valencia@bikefix.demo", "Valencia", "Avenida del Puerto 18"),
            "Diagnóstico y reparación de bicicletas eléctricas y sus baterías.",
            &["Diagnóstico eléctrico", "Baterías", "Puesta a punto", "Frenos"],
            &["Eléctrica", "Urbana"],
            weekday_hours("09:30", "18:30", None),
        ),
    ]
}
