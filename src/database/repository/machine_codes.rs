use rand::Rng;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::database::manager::{is_unique_violation, Database, DatabaseError};
use crate::database::models::machine_code::{
    CodeStatus, MachineCode, MACHINE_CODE_ALPHABET, MACHINE_CODE_LEN,
};

const CODE_COLUMNS: &str =
    "id, code, name, description, created_by, user_id, binded_at, is_active, created_at, updated_at";
const MAX_GENERATE_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum MachineCodeError {
    #[error("Machine code does not exist")]
    NotFound,

    #[error("Machine code is disabled")]
    Disabled,

    #[error("Machine code is already bound to a user")]
    AlreadyBound,

    #[error("User already has a machine code bound")]
    UserAlreadyBound,

    #[error("User has no machine code bound")]
    NotBound,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for MachineCodeError {
    fn from(err: sqlx::Error) -> Self {
        MachineCodeError::Database(err.into())
    }
}

/// A random code from `0-9A-Z`.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..MACHINE_CODE_LEN)
        .map(|_| MACHINE_CODE_ALPHABET[rng.gen_range(0..MACHINE_CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct MachineCodeRepository {
    pool: PgPool,
}

impl MachineCodeRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<MachineCode>, DatabaseError> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM machine_codes WHERE code = $1");
        Ok(sqlx::query_as::<_, MachineCode>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<MachineCode>, DatabaseError> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM machine_codes WHERE user_id = $1");
        Ok(sqlx::query_as::<_, MachineCode>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Classify a code without changing anything.
    pub async fn check(&self, code: &str) -> Result<CodeStatus, DatabaseError> {
        let found = self.find_by_code(code).await?;
        Ok(CodeStatus::of(found.as_ref()))
    }

    /// Bind `code` to `user_id`, mirroring it onto the user row.
    pub async fn bind(&self, code: &str, user_id: i64) -> Result<MachineCode, MachineCodeError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {CODE_COLUMNS} FROM machine_codes WHERE code = $1 FOR UPDATE");
        let current = sqlx::query_as::<_, MachineCode>(&sql)
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?;

        let current = match (CodeStatus::of(current.as_ref()), current) {
            (CodeStatus::Valid, Some(current)) => current,
            (CodeStatus::Disabled, _) => return Err(MachineCodeError::Disabled),
            (CodeStatus::AlreadyBound, _) => return Err(MachineCodeError::AlreadyBound),
            _ => return Err(MachineCodeError::NotFound),
        };

        let held: Option<String> = sqlx::query_scalar("SELECT code FROM machine_codes WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if held.is_some() {
            return Err(MachineCodeError::UserAlreadyBound);
        }

        let touched = sqlx::query("UPDATE users SET machine_code = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(&current.code)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?
            .rows_affected();
        if touched == 0 {
            tx.rollback().await?;
            return Err(MachineCodeError::UserNotFound);
        }

        let sql = format!(
            "UPDATE machine_codes SET user_id = $2, binded_at = NOW(), updated_at = NOW() \
             WHERE id = $1 RETURNING {CODE_COLUMNS}"
        );
        let bound = sqlx::query_as::<_, MachineCode>(&sql)
            .bind(current.id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    MachineCodeError::UserAlreadyBound
                } else {
                    DatabaseError::write_failed(e).into()
                }
            })?;

        tx.commit().await.map_err(DatabaseError::write_failed)?;
        info!("Bound machine code {} to user {}", bound.code, user_id);
        Ok(bound)
    }

    /// Release whatever code `user_id` holds.
    pub async fn unbind(&self, user_id: i64) -> Result<(), MachineCodeError> {
        let mut tx = self.pool.begin().await?;

        let released = sqlx::query(
            "UPDATE machine_codes SET user_id = NULL, binded_at = NULL, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::write_failed)?
        .rows_affected();

        if released == 0 {
            tx.rollback().await?;
            return Err(MachineCodeError::NotBound);
        }

        sqlx::query("UPDATE users SET machine_code = NULL, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::write_failed)?;

        tx.commit().await.map_err(DatabaseError::write_failed)?;
        info!("Unbound machine code from user {}", user_id);
        Ok(())
    }

    /// Mint a new active, unbound code.
    pub async fn create(
        &self,
        created_by: Option<i64>,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<MachineCode, DatabaseError> {
        let sql = format!(
            "INSERT INTO machine_codes (code, name, description, created_by, is_active) \
             VALUES ($1, $2, $3, $4, TRUE) RETURNING {CODE_COLUMNS}"
        );

        let mut last_err = None;
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = generate_code();
            match sqlx::query_as::<_, MachineCode>(&sql)
                .bind(&code)
                .bind(name)
                .bind(description)
                .bind(created_by)
                .fetch_one(&self.pool)
                .await
            {
                Ok(created) => return Ok(created),
                Err(e) if is_unique_violation(&e) => {
                    warn!("Generated machine code collided, retrying");
                    last_err = Some(e);
                }
                Err(e) => return Err(DatabaseError::write_failed(e)),
            }
        }

        Err(match last_err {
            Some(e) => DatabaseError::write_failed(e),
            None => DatabaseError::Conflict("Could not generate a unique machine code".to_string()),
        })
    }
}
