use std::{future::Future, str::FromStr, time::Duration};

use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Error, PgPool, Row,
};
use tokio::time;
use uuid::Uuid;

use crate::domain::person::{Person, PersonFilter, PersonRepository, PersonRepositoryError};

// serialization_failure, deadlock_detected
const CONFLICT_SQLSTATES: [&str; 2] = ["40001", "40P01"];

impl From<Error> for PersonRepositoryError {
    fn from(value: Error) -> Self {
        match value {
            Error::Database(database_error) => {
                if database_error.is_unique_violation() {
                    return Self::PersonAlreadyExists;
                }
                if let Some(code) = database_error.code() {
                    if CONFLICT_SQLSTATES.iter().any(|c| code == *c) {
                        return Self::ConcurrencyConflict(database_error.to_string());
                    }
                }
                return Self::InternalError(database_error.to_string());
            }
            Error::RowNotFound => {
                return Self::PersonNotFound;
            }
            _ => return Self::InternalError(value.to_string()),
        }
    }
}

impl TryFrom<PgRow> for Person {
    type Error = PersonRepositoryError;

    fn try_from(value: PgRow) -> Result<Self, Self::Error> {
        let uid: &str = value.try_get("uid")?;
        let first_name: &str = value.try_get("first_name")?;
        let last_name: &str = value.try_get("last_name")?;
        return Ok(Person::new(
            Uuid::from_str(uid.trim()).map_err(|_| {
                PersonRepositoryError::InternalError(format!("Invalid uid format for person {}", uid))
            })?,
            first_name,
            last_name,
        ));
    }
}

#[derive(Debug, Clone)]
pub struct PostgresPersonRepository {
    pool: PgPool,
    timeout: u64,
}

/// Runs a store call, turning an elapsed deadline into an internal error.
async fn with_timeout<T, F>(timeout: u64, future: F) -> Result<T, PersonRepositoryError>
where
    F: Future<Output = Result<T, Error>>,
{
    Ok(time::timeout(Duration::from_millis(timeout), future)
        .await
        .map_err(|e| PersonRepositoryError::InternalError(e.to_string()))??)
}

async fn init_table_async(pool: &PgPool, timeout: u64) -> Result<(), PersonRepositoryError> {
    let create_table_query = r#"CREATE TABLE IF NOT EXISTS person (
        uid CHAR(36) PRIMARY KEY,
        first_name VARCHAR NOT NULL CHECK (first_name <> ''),
        last_name VARCHAR NOT NULL CHECK (last_name <> '')
    )"#;
    with_timeout(timeout, sqlx::query(create_table_query).execute(pool)).await?;
    Ok(())
}

impl PostgresPersonRepository {
    pub async fn new(
        url: &str,
        timeout: u64,
        max_connections: u32,
    ) -> Result<Self, PersonRepositoryError> {
        let pool = with_timeout(
            timeout,
            PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_millis(timeout))
                .connect(url),
        )
        .await?;
        init_table_async(&pool, timeout).await?;
        log::info!("Connected to PostgreSQL, person table ready");
        Ok(Self { pool, timeout })
    }
}

#[async_trait::async_trait]
impl PersonRepository for PostgresPersonRepository {
    async fn create_person(&self, person: &Person) -> Result<(), PersonRepositoryError> {
        with_timeout(
            self.timeout,
            sqlx::query("INSERT INTO person (uid, first_name, last_name) VALUES ($1, $2, $3);")
                .bind(person.id().to_string())
                .bind(person.first_name())
                .bind(person.last_name())
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn update_person(&self, person: &Person) -> Result<(), PersonRepositoryError> {
        let result = with_timeout(
            self.timeout,
            sqlx::query("UPDATE person SET first_name = $2, last_name = $3 WHERE uid = $1;")
                .bind(person.id().to_string())
                .bind(person.first_name())
                .bind(person.last_name())
                .execute(&self.pool),
        )
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersonRepositoryError::ConcurrencyConflict(format!(
                "Expected to update 1 row for person {}, updated 0",
                person.id()
            )));
        }
        Ok(())
    }

    async fn get_person_by_id(&self, id: &Uuid) -> Result<Person, PersonRepositoryError> {
        let person_found = with_timeout(
            self.timeout,
            sqlx::query("SELECT uid, first_name, last_name FROM person WHERE uid = $1;")
                .bind(id.to_string())
                .fetch_one(&self.pool),
        )
        .await?;
        return Ok(person_found.try_into()?);
    }

    async fn get_people(&self, filter: &PersonFilter) -> Result<Vec<Person>, PersonRepositoryError> {
        // LEFT/RIGHT rather than LIKE so filter values are never read as patterns.
        let result = with_timeout(
            self.timeout,
            sqlx::query(
                r#"SELECT uid, first_name, last_name FROM person
                WHERE ($1::VARCHAR IS NULL
                        OR LEFT(LOWER(first_name), CHAR_LENGTH($1)) = $1
                        OR RIGHT(LOWER(first_name), CHAR_LENGTH($1)) = $1)
                    AND ($2::VARCHAR IS NULL
                        OR LEFT(LOWER(last_name), CHAR_LENGTH($2)) = $2
                        OR RIGHT(LOWER(last_name), CHAR_LENGTH($2)) = $2);"#,
            )
            .bind(filter.first_name())
            .bind(filter.last_name())
            .fetch_all(&self.pool),
        )
        .await?;
        result.into_iter().map(Person::try_from).collect()
    }

    async fn delete_person(&self, id: &Uuid) -> Result<(), PersonRepositoryError> {
        let result = with_timeout(
            self.timeout,
            sqlx::query("DELETE FROM person WHERE uid = $1")
                .bind(id.to_string())
                .execute(&self.pool),
        )
        .await?;
        if result.rows_affected() == 0 {
            return Err(PersonRepositoryError::PersonNotFound);
        }
        Ok(())
    }
}
