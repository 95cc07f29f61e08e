use sqlx::{Row, SqlitePool};
use tracing::*;

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Applied in order, each one exactly once
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_panel_tables",
    sql: r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE CHECK (length(username) <= 50),
            password_hash TEXT NOT NULL,
            email TEXT UNIQUE CHECK (length(email) <= 100),
            role TEXT NOT NULL DEFAULT 'user',
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS servers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            ip TEXT,
            ssh_port INTEGER NOT NULL DEFAULT 22,
            status TEXT NOT NULL DEFAULT 'unknown',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT,
            enabled INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS docker_containers (
            id TEXT PRIMARY KEY,
            name TEXT,
            image TEXT,
            status TEXT,
            ports TEXT,   -- JSON
            env TEXT,     -- JSON
            volumes TEXT, -- JSON
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS apps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            version TEXT,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'installed',
            config TEXT, -- JSON
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            "key" TEXT NOT NULL UNIQUE,
            value TEXT,
            description TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
    "#,
}];

/// Bring the schema up to date, returns how many migrations were applied.
pub async fn run(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current: i64 = sqlx::query("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
        .fetch_one(pool)
        .await?
        .try_get(0)?;

    let mut applied = 0;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!("Applying migration {}: {}", migration.version, migration.name);

        let mut transaction = pool.begin().await?;

        sqlx::raw_sql(migration.sql).execute(&mut *transaction).await?;

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        applied += 1;
    }

    debug!("Schema at version {}", current.max(latest_version()));

    Ok(applied)
}

fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or_default()
}
