use anyhow::{bail, Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::store::StoreStats;

const REQUIRED_TABLES: [&str; 4] = ["employees", "task_statuses", "tasks", "users"];

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        log::info!("🔗 Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("Failed to connect to the database")?;

        log::info!("✅ Database connection established");
        Ok(Database { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        log::info!("🛠️  Applying database migrations...");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to apply database migrations")?;

        log::info!("✅ Database schema is up to date");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        let alive: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Health check query failed")?;

        if alive != 1 {
            bail!("Unexpected health check result: {}", alive);
        }
        Ok(())
    }

    /// Warns about any of the service's tables that are absent from `public`.
    pub async fn check_tables(&self) -> Result<()> {
        log::info!("📋 Checking database tables...");

        let present: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = ANY($1)",
        )
        .bind(&REQUIRED_TABLES[..])
        .fetch_all(&self.pool)
        .await
        .context("Failed to list database tables")?;

        let missing: Vec<&str> = REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|table| !present.iter().any(|p| p == table))
            .collect();

        if missing.is_empty() {
            log::info!("✅ Tables present: {}", REQUIRED_TABLES.join(", "));
        } else {
            log::warn!("⚠️  Missing tables: {}", missing.join(", "));
            log::warn!("   Set RUN_MIGRATIONS=true or apply the files in migrations/ manually");
        }
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<StoreStats> {
        let (employees, tasks, task_statuses, users): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM employees), \
                (SELECT COUNT(*) FROM tasks), \
                (SELECT COUNT(*) FROM task_statuses), \
                (SELECT COUNT(*) FROM users)",
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to read row counts")?;

        Ok(StoreStats {
            employees,
            tasks,
            task_statuses,
            users,
        })
    }
}
