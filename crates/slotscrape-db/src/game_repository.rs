use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use slotscrape_core::error::AppError;
use slotscrape_core::models::{ExtractedGame, SavedGame};
use slotscrape_core::traits::GameStore;

/// Stored provider when the page did not name one.
pub const UNKNOWN_PROVIDER: &str = "Unknown";

/// Game catalog in PostgreSQL, deduplicated by slug.
#[derive(Clone)]
pub struct GameRepository {
    pool: Pool<Postgres>,
}

/// A persisted game.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub provider: String,
    pub rtp: Option<String>,
    pub volatility: Option<String>,
    pub max_win: Option<String>,
    pub image_url: Option<String>,
    pub demo_url: Option<String>,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<GameRecord>, AppError> {
        sqlx::query_as::<_, GameRecord>(r#"SELECT * FROM games WHERE slug = $1"#)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM games"#)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(count)
    }
}

impl GameStore for GameRepository {
    async fn save_game(&self, game: &ExtractedGame, source_url: &str) -> Result<SavedGame, AppError> {
        let slug = game.slug();
        if slug.is_empty() {
            return Err(AppError::DatabaseError(format!(
                "Cannot derive a slug from game name '{}'",
                game.name
            )));
        }

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO games (name, slug, provider, rtp, volatility, max_win, image_url, demo_url, source_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&game.name)
        .bind(&slug)
        .bind(game.provider.as_deref().unwrap_or(UNKNOWN_PROVIDER))
        .bind(&game.rtp)
        .bind(game.volatility.map(|v| v.as_str()))
        .bind(&game.max_win)
        .bind(&game.image)
        .bind(&game.demo_url)
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if let Some((id,)) = inserted {
            tracing::info!(%slug, %id, "Saved new game");
            return Ok(SavedGame {
                id,
                slug,
                created: true,
            });
        }

        let (id,): (Uuid,) = sqlx::query_as(r#"SELECT id FROM games WHERE slug = $1"#)
            .bind(&slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(%slug, %id, "Game already exists");
        Ok(SavedGame {
            id,
            slug,
            created: false,
        })
    }
}
