use sqlx::SqlitePool;

/// Применить встроенные миграции (`crates/backend/migrations`) к пулу
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations applied successfully");
    Ok(())
}
