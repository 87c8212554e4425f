// ==================== API SMOKE CLIENT ====================
// Replays the booking flow against a running server:
// a cyclist without bikes is refused, and the same request works once a bike exists
//
// usage: api_smoke [BASE_URL]   (default http://localhost:5000)

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::process::ExitCode;

const DEFAULT_BASE_URL: &str = "http://localhost:5000";

struct Smoke {
    client: Client,
    base_url: String,
    failures: u32,
}

impl Smoke {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn pass(&self, step: &str, detail: impl std::fmt::Display) {
        println!("✅ {} - {}", step, detail);
    }

    fn fail(&mut self, step: &str, detail: impl std::fmt::Display) {
        self.failures += 1;
        println!("❌ {} - {}", step, detail);
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Value), String> {
        let response = request.send().await.map_err(|e| format!("request failed: {}", e))?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value), String> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.send(request).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> Result<(StatusCode, Value), String> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        self.send(request).await
    }
}

fn message(body: &Value) -> &str {
    body.get("message").and_then(Value::as_str).unwrap_or("")
}

/// Next weekday at least two days ahead, as YYYY-MM-DD
fn booking_date() -> String {
    use chrono::Datelike;
    let mut date = chrono::Utc::now().date_naive() + chrono::Duration::days(2);
    while matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
        date += chrono::Duration::days(1);
    }
    date.format("%Y-%m-%d").to_string()
}

async fn run(smoke: &mut Smoke) -> Result<(), String> {
    // 1. health
    let (status, body) = smoke.get("/health", None).await?;
    if status.is_success() {
        smoke.pass("Health", format!("database: {}", body["database"]));
    } else {
        smoke.fail("Health", format!("status {} - {}", status, body));
        return Err("server is not healthy".into());
    }

    // 2. fresh cyclist
    let email = format!("smoke-{}@bikefix.test", uuid::Uuid::new_v4().simple());
    let (status, body) = smoke
        .post(
            "/api/auth/register",
            None,
            &json!({
                "name": "Smoke Cyclist",
                "email": email,
                "password": "smoke-pass-123",
                "userType": "cyclist"
            }),
        )
        .await?;
    let token = match body["token"].as_str() {
        Some(token) if status == StatusCode::CREATED => token.to_string(),
        _ => {
            smoke.fail("Register cyclist", format!("status {} - {}", status, message(&body)));
            return Err("cannot continue without a token".into());
        }
    };
    smoke.pass("Register cyclist", &email);

    // 3. pick a workshop
    let (status, body) = smoke.get("/api/workshops", None).await?;
    let workshop_id = match body["workshops"].get(0).and_then(|w| w["_id"].as_str()) {
        Some(id) if status.is_success() => id.to_string(),
        _ => {
            smoke.fail("List workshops", format!("status {} - no workshop available (try SEED_DEMO_WORKSHOPS=true)", status));
            return Err("no workshop to book".into());
        }
    };
    smoke.pass("List workshops", format!("{} found, using {}", body["total"], workshop_id));

    let appointment = json!({
        "workshopId": workshop_id,
        "appointmentDate": booking_date(),
        "appointmentTime": "10:00",
        "serviceType": "Puesta a punto",
        "requestedServices": ["Frenos"],
        "description": "Smoke test booking",
        "urgency": "medium"
    });

    // 4. booking without bikes must be refused
    let (status, body) = smoke.post("/api/appointments", Some(&token), &appointment).await?;
    if status == StatusCode::BAD_REQUEST && message(&body).to_lowercase().contains("bicicleta") {
        smoke.pass("Booking without bikes refused", message(&body));
    } else {
        smoke.fail("Booking without bikes refused", format!("expected 400 about bikes, got {} - {}", status, message(&body)));
    }

    // 5. register a bike and list it
    let (status, body) = smoke
        .post(
            "/api/users/bikes",
            Some(&token),
            &json!({ "brand": "Orbea", "model": "Orca", "year": 2022, "type": "road", "totalKm": 1200 }),
        )
        .await?;
    if status == StatusCode::CREATED {
        smoke.pass("Add bike", body["bike"]["_id"].as_str().unwrap_or("?"));
    } else {
        smoke.fail("Add bike", format!("status {} - {}", status, message(&body)));
    }

    let (status, body) = smoke.get("/api/users/bikes", Some(&token)).await?;
    let bikes = body["bikes"].as_array().map(Vec::len).unwrap_or(0);
    if status.is_success() && bikes > 0 {
        smoke.pass("List bikes", format!("{} bike(s)", bikes));
    } else {
        smoke.fail("List bikes", format!("status {} - {} bikes", status, bikes));
    }

    // 6. same booking now succeeds
    let (status, body) = smoke.post("/api/appointments", Some(&token), &appointment).await?;
    if status == StatusCode::CREATED {
        smoke.pass("Booking with a bike", body["appointment"]["_id"].as_str().unwrap_or("?"));
    } else {
        smoke.fail("Booking with a bike", format!("expected 201, got {} - {}", status, message(&body)));
    }

    // 7. the appointment is listed
    let (status, body) = smoke.get("/api/appointments", Some(&token)).await?;
    let total = body["total"].as_u64().unwrap_or(0);
    if status.is_success() && total > 0 {
        smoke.pass("List appointments", format!("{} appointment(s)", total));
    } else {
        smoke.fail("List appointments", format!("status {} - {} appointments", status, total));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let base_url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    println!("🚲 BikeFix smoke test against {}", base_url);

    let client = match Client::builder().timeout(std::time::Duration::from_secs(15)).build() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ Could not build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut smoke = Smoke { client, base_url, failures: 0 };

    if let Err(e) = run(&mut smoke).await {
        log::error!("smoke run aborted: {}", e);
        println!("❌ Aborted: {}", e);
        smoke.failures = smoke.failures.max(1);
    }

    if smoke.failures == 0 {
        println!("🎉 All smoke checks passed");
        ExitCode::SUCCESS
    } else {
        println!("💥 {} smoke check(s) failed", smoke.failures);
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_booking_date_is_future_weekday() {
        let date = chrono::NaiveDate::parse_from_str(&booking_date(), "%Y-%m-%d").unwrap();
        assert!(date > chrono::Utc::now().date_naive());
        assert!(!matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun));
    }

    #[test]
    fn test_url_join() {
        let smoke = Smoke { client: Client::new(), base_url: "http://x:5000/".into(), failures: 0 };
        assert_eq!(smoke.url("/health"), "http://x:5000/health");
    }
}
