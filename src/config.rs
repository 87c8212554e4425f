use std::env;

/// Runtime configuration loaded from the environment (and `.env` via dotenv)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub seed_demo_workshops: bool,
    pub appointment_expiry_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let appointment_expiry_interval_secs = env::var("APPOINTMENT_EXPIRY_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(3600);

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            database_url,
            cors_origins,
            seed_demo_workshops: env_flag("SEED_DEMO_WORKSHOPS"),
            appointment_expiry_interval_secs,
        })
    }
}

/// JWT settings, read once per process
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_hours: i64,
}

impl JwtSettings {
    pub fn from_env() -> Self {
        let secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using development secret");
            "bikefix-dev-secret-change-me".to_string()
        });

        Self {
            secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "bikefix-api".to_string()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "bikefix-web".to_string()),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|h| *h > 0)
                .unwrap_or(24),
        }
    }
}

lazy_static::lazy_static! {
    pub static ref JWT_SETTINGS: JwtSettings = JwtSettings::from_env();
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).map(|v| v.to_ascii_lowercase()).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}
