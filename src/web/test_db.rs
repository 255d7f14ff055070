//! Throwaway Postgres schemas for tests of the SQL-backed stores.
//!
//! These tests need `TEST_DATABASE_URL`; without it they return early and pass.

use sqlx::{Executor, PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

pub struct TestDb {
    pool: PgPool,
    control: PgPool,
    schema: String,
}

impl TestDb {
    /// Creates a fresh schema, points every pooled connection at it and runs the migrations.
    pub async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL is unset; skipping Postgres-backed test");
            return None;
        };

        let schema = format!("t_{}", Uuid::new_v4().simple());
        let control = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        control
            .execute(format!("CREATE SCHEMA {schema}").as_str())
            .await
            .unwrap();

        let search_path = format!("SET search_path TO {schema}");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        Some(Self {
            pool,
            control,
            schema,
        })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn drop_schema(self) {
        self.pool.close().await;
        self.control
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await
            .unwrap();
    }
}
