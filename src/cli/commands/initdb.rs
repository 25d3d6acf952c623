use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use model::entities::{prelude::*, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, error, info};

/// Creates the schema and seeds the administrator account that manual
/// balance adjustments and payment approvals are attributed to.
pub async fn init_database(database_url: &str) -> Result<()> {
    info!("Initializing database");
    debug!("Database URL: {}", database_url);

    let db: DatabaseConnection = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    info!("Running database migrations");
    match Migrator::up(&db, None).await {
        Ok(_) => info!("Database migrations completed successfully"),
        Err(e) => {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
    }

    ensure_admin_user(&db).await?;

    info!("Database initialization completed successfully!");
    Ok(())
}

async fn ensure_admin_user(db: &DatabaseConnection) -> Result<()> {
    let existing = User::find()
        .filter(user::Column::Username.eq("admin"))
        .one(db)
        .await?;

    if let Some(admin) = existing {
        debug!(user_id = admin.id, "Administrator account already present");
        return Ok(());
    }

    let admin = user::ActiveModel {
        username: Set("admin".to_string()),
        full_name: Set(Some("Administrador".to_string())),
        active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(user_id = admin.id, "Seeded administrator account");

    Ok(())
}
