use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

pub const USERS: &str = "users";
pub const BIKES: &str = "bikes";
pub const APPOINTMENTS: &str = "appointments";
pub const REVIEWS: &str = "reviews";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    /// Connects, pings and makes sure the indexes exist
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mongodb = Self::from_uri(uri).await?;

        mongodb.ping().await?;
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Builds the client without touching the server (the driver connects lazily)
    pub async fn from_uri(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.app_name = Some("bikefix-api".to_string());
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db_name = database_name_from_uri(uri);
        let db = client.database(&db_name);

        Ok(Self { db })
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = IndexOptions::builder().unique(true).build();

        self.create_index(USERS, doc! { "email": 1 }, Some(unique.clone())).await;
        self.create_index(USERS, doc! { "userType": 1, "isActive": 1 }, None).await;
        self.create_index(BIKES, doc! { "ownerId": 1, "isActive": 1 }, None).await;
        self.create_index(APPOINTMENTS, doc! { "cyclistId": 1, "createdAt": -1 }, None).await;
        self.create_index(APPOINTMENTS, doc! { "workshopId": 1, "status": 1 }, None).await;
        self.create_index(REVIEWS, doc! { "workshopId": 1, "createdAt": -1 }, None).await;
        self.create_index(REVIEWS, doc! { "cyclistId": 1, "workshopId": 1 }, Some(unique)).await;

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn create_index(&self, collection: &str, keys: Document, options: Option<IndexOptions>) {
        let index = IndexModel::builder().keys(keys.clone()).options(options).build();

        match self.collection::<Document>(collection).create_index(index).await {
            Ok(_) => log::info!("   ✅ Index created: {}({})", collection, keys),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

/// Database name from the URI path, `bikefix` when absent
fn database_name_from_uri(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);

    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("bikefix")
        .to_string()
}
