use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{ProfileEdit, ProfileStore, StoreError, StoreResult, UserStore};
use crate::auth::repo_types::{NewUser, User};
use crate::profiles::model::{Education, Experience, Profile, Social};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    /// Connects and applies the embedded migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        Ok(Self { db })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find users by ids")?;
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, avatar, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .fetch_one(&self.db)
        .await;

        match created {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::EmailTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    company: Option<String>,
    website: Option<String>,
    location: Option<String>,
    bio: Option<String>,
    status: String,
    githubusername: Option<String>,
    skills: Vec<String>,
    social: Json<Social>,
    experience: Json<Vec<Experience>>,
    education: Json<Vec<Education>>,
    created_at: OffsetDateTime,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            id: r.id,
            user: r.user_id,
            company: r.company,
            website: r.website,
            location: r.location,
            bio: r.bio,
            status: r.status,
            githubusername: r.githubusername,
            skills: r.skills,
            social: r.social.0,
            experience: r.experience.0,
            education: r.education.0,
            created_at: r.created_at,
        }
    }
}

const PROFILE_COLUMNS: &str = "id, user_id, company, website, location, bio, status, \
     githubusername, skills, social, experience, education, created_at";

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find profile by user")?;
        Ok(row.map(Profile::from))
    }

    async fn list(&self) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list profiles")?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn update_by_user(&self, user_id: Uuid, edit: ProfileEdit) -> StoreResult<Option<Profile>> {
        let mut tx = self.db.begin().await.context("begin profile update")?;

        // Locking the owner row serializes writers of this profile, including
        // the one that inserts it.
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock profile owner")?;
        if owner.is_none() {
            return Ok(None);
        }

        let current = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("load profile for update")?
        .map(Profile::from);

        let Some(next) = edit(current) else {
            return Ok(None);
        };
        let saved = write_profile(&mut *tx, &next).await?;
        tx.commit().await.context("commit profile update")?;
        Ok(Some(saved))
    }

    async fn delete_by_user(&self, user_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete profile")?;
        Ok(())
    }
}

async fn write_profile(conn: &mut PgConnection, profile: &Profile) -> StoreResult<Profile> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!(
        r#"
        INSERT INTO profiles ({PROFILE_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (user_id) DO UPDATE SET
            company        = EXCLUDED.company,
            website        = EXCLUDED.website,
            location       = EXCLUDED.location,
            bio            = EXCLUDED.bio,
            status         = EXCLUDED.status,
            githubusername = EXCLUDED.githubusername,
            skills         = EXCLUDED.skills,
            social         = EXCLUDED.social,
            experience     = EXCLUDED.experience,
            education      = EXCLUDED.education
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(profile.id)
    .bind(profile.user)
    .bind(&profile.company)
    .bind(&profile.website)
    .bind(&profile.location)
    .bind(&profile.bio)
    .bind(&profile.status)
    .bind(&profile.githubusername)
    .bind(&profile.skills)
    .bind(Json(&profile.social))
    .bind(Json(&profile.experience))
    .bind(Json(&profile.education))
    .bind(profile.created_at)
    .fetch_one(conn)
    .await
    .context("upsert profile")?;
    Ok(row.into())
}
