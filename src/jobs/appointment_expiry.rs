// ==================== APPOINTMENT EXPIRY ====================
// Pending appointments whose date already passed are cancelled with reason "expired"

use crate::{database::MongoDB, services::appointment_service};
use tokio::time::{interval, Duration};

/// Spawns the sweep; it runs once on startup and then every `every_secs`
pub fn start_appointment_expiry_job(db: MongoDB, every_secs: u64) {
    log::info!("⏰ Starting appointment expiry job (every {}s)", every_secs);

    tokio::spawn(async move {
        // the first tick of a tokio interval completes immediately
        let mut ticker = interval(Duration::from_secs(every_secs.max(1)));

        loop {
            ticker.tick().await;
            sweep(&db).await;
        }
    });
}

async fn sweep(db: &MongoDB) {
    let today = chrono::Utc::now().date_naive();

    match appointment_service::expire_stale_appointments(db, today).await {
        Ok(0) => log::debug!("⏰ No stale appointments before {}", today),
        Ok(count) => log::info!("⏰ Expired {} pending appointments dated before {}", count, today),
        Err(e) => log::error!("❌ Appointment expiry sweep failed: {}", e),
    }
}
