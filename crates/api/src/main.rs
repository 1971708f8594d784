use std::sync::Arc;

use anyhow::Context;

use peoplehub_api::app::{self, AppServices};
use peoplehub_api::config::ApiConfig;
use peoplehub_infra::{AccessStore, InMemoryRoleStore, PostgresRoleStore, RoleAssignments};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("failed to load configuration")?;
    peoplehub_observability::init(config.log_format);

    if config.insecure_jwt_secret {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let store = open_store(&config).await?;

    let services = AppServices::new(store.clone());
    let seeded = services.seed().await.context("failed to seed system roles")?;

    if let Some(identity_id) = config.bootstrap_admin {
        let admin = seeded
            .iter()
            .find(|r| r.name == "Admin")
            .context("Admin system role missing after seeding")?;
        store
            .assign_role(identity_id, admin.role_id)
            .await
            .context("failed to assign bootstrap admin")?;
        tracing::info!(%identity_id, "bootstrap identity assigned the Admin role");
    }

    let router = app::build_app(config.jwt_secret.as_bytes(), store);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router).await?;
    Ok(())
}

async fn open_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn AccessStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            let store = PostgresRoleStore::new(pool);
            store.migrate().await.context("failed to run migrations")?;
            tracing::info!("using postgres role store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory role store");
            Ok(Arc::new(InMemoryRoleStore::new()))
        }
    }
}
