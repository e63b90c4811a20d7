use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::ConnectOptions;

use crate::shared::config::DatabaseConfig;
use crate::shared::data::migration_runner;

/// Открыть пул соединений по строке подключения и применить миграции.
///
/// Пул создаётся в sqlx, миграции идут по нему же, затем он отдаётся sea-orm,
/// так что in-memory база одна и та же для миграций и запросов.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let url = match executable_dir() {
        Some(dir) => resolve_sqlite_url(&config.url, &dir),
        None => config.url.clone(),
    };

    if let Some(db_file) = sqlite_file_path(&url) {
        if let Some(parent) = db_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&url)?.disable_statement_logging();
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect_with(options)
        .await?;
    tracing::info!(
        "Database pool ready: {} (max: {}, min: {})",
        url,
        config.max_connections,
        config.min_connections
    );

    migration_runner::run_migrations(&pool).await?;
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Путь к файлу БД для `sqlite:` URL; `None` для in-memory и прочих драйверов
pub fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Относительный путь к файлу sqlite разрешается от `base_dir` (каталог exe).
/// Абсолютные пути, in-memory и прочие драйверы не меняются.
pub fn resolve_sqlite_url(url: &str, base_dir: &Path) -> String {
    let Some(db_file) = sqlite_file_path(url) else {
        return url.to_string();
    };
    if db_file.is_absolute() {
        return url.to_string();
    }
    let query = url
        .split_once('?')
        .map(|(_, q)| format!("?{}", q))
        .unwrap_or_default();
    build_sqlite_url(&base_dir.join(db_file), &query)
}

fn build_sqlite_url(path: &Path, query: &str) -> String {
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}{}", prefix, normalized, query)
}

/// Fresh in-memory database with the schema applied
#[cfg(test)]
pub async fn connect_in_memory() -> DatabaseConnection {
    let config = DatabaseConfig {
        url: "sqlite::memory:".into(),
        // one connection, otherwise every pooled connection sees its own empty database
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 8,
    };
    connect(&config)
        .await
        .expect("in-memory database should open")
}
