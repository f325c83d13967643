//! `PersistenceRepository`: the narrow typed database surface spec §6
//! allows the core to touch — `create/get/update/delete` per aggregate,
//! no raw queries reaching callers.
//!
//! Grounded in the pack's `async_trait`-based DB interface pattern (see
//! `game-database`'s `DbInterface`), narrowed to the four aggregates named
//! in spec §6: accounts, characters, realms, PvP records.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::PersistenceError;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Character {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub race_id: i64,
    pub appearance: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Realm {
    pub id: i64,
    pub name: String,
    pub population: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PvpRecord {
    pub id: i64,
    pub character_id: i64,
    pub rating: i32,
    pub wins: i32,
    pub losses: i32,
}

/// One aggregate's typed CRUD surface. Implemented once per aggregate per
/// backend, so `PersistenceRepository` is really four small traits bundled
/// behind one name.
#[async_trait]
pub trait AggregateRepository<T, Id>: Send + Sync {
    async fn create(&self, value: T) -> PersistenceResult<T>;
    async fn get(&self, id: Id) -> PersistenceResult<T>;
    async fn update(&self, value: T) -> PersistenceResult<T>;
    async fn delete(&self, id: Id) -> PersistenceResult<()>;
}

/// The full repository surface the runtime is allowed to touch (spec §6:
/// "no raw queries in the core").
#[async_trait]
pub trait PersistenceRepository: Send + Sync {
    async fn create_account(&self, account: Account) -> PersistenceResult<Account>;
    async fn get_account(&self, id: i64) -> PersistenceResult<Account>;
    async fn update_account(&self, account: Account) -> PersistenceResult<Account>;
    async fn delete_account(&self, id: i64) -> PersistenceResult<()>;

    async fn create_character(&self, character: Character) -> PersistenceResult<Character>;
    async fn get_character(&self, id: i64) -> PersistenceResult<Character>;
    async fn update_character(&self, character: Character) -> PersistenceResult<Character>;
    async fn delete_character(&self, id: i64) -> PersistenceResult<()>;

    async fn create_realm(&self, realm: Realm) -> PersistenceResult<Realm>;
    async fn get_realm(&self, id: i64) -> PersistenceResult<Realm>;
    async fn update_realm(&self, realm: Realm) -> PersistenceResult<Realm>;
    async fn delete_realm(&self, id: i64) -> PersistenceResult<()>;

    async fn create_pvp_record(&self, record: PvpRecord) -> PersistenceResult<PvpRecord>;
    async fn get_pvp_record(&self, id: i64) -> PersistenceResult<PvpRecord>;
    async fn update_pvp_record(&self, record: PvpRecord) -> PersistenceResult<PvpRecord>;
    async fn delete_pvp_record(&self, id: i64) -> PersistenceResult<()>;
}

/// Retries an idempotent read once on a timeout error (spec §7:
/// "contention/timeout... retried at most once for idempotent reads").
/// Writes are never retried here — callers that need at-most-once writes
/// must make them idempotent themselves (e.g. upsert by natural key).
pub async fn retry_read_once<T, F, Fut>(mut op: F) -> PersistenceResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = PersistenceResult<T>>,
{
    match op().await {
        Err(PersistenceError::Timeout(_)) => op().await,
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Postgres-backed implementation
// ---------------------------------------------------------------------------

pub struct PgPersistenceRepository {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgPersistenceRepository {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self { pool, statement_timeout }
    }

    fn map_sqlx_err(err: sqlx::Error) -> PersistenceError {
        match err {
            sqlx::Error::RowNotFound => PersistenceError::NotFound,
            other => PersistenceError::Database(other.to_string()),
        }
    }
}

#[async_trait]
impl PersistenceRepository for PgPersistenceRepository {
    async fn create_account(&self, account: Account) -> PersistenceResult<Account> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, username, email) VALUES ($1, $2, $3) \
             RETURNING id, username, email",
        )
        .bind(account.id)
        .bind(account.username)
        .bind(account.email)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn get_account(&self, id: i64) -> PersistenceResult<Account> {
        retry_read_once(|| async {
            tokio::time::timeout(
                self.statement_timeout,
                sqlx::query_as::<_, Account>("SELECT id, username, email FROM accounts WHERE id = $1")
                    .bind(id)
                    .fetch_one(&self.pool),
            )
            .await
            .map_err(|_| PersistenceError::Timeout(1))?
            .map_err(Self::map_sqlx_err)
        })
        .await
    }

    async fn update_account(&self, account: Account) -> PersistenceResult<Account> {
        sqlx::query_as::<_, Account>(
            "UPDATE accounts SET username = $2, email = $3 WHERE id = $1 \
             RETURNING id, username, email",
        )
        .bind(account.id)
        .bind(account.username)
        .bind(account.email)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn delete_account(&self, id: i64) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn create_character(&self, character: Character) -> PersistenceResult<Character> {
        sqlx::query_as::<_, Character>(
            "INSERT INTO characters (id, account_id, name, race_id, appearance) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, account_id, name, race_id, appearance",
        )
        .bind(character.id)
        .bind(character.account_id)
        .bind(character.name)
        .bind(character.race_id)
        .bind(character.appearance)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn get_character(&self, id: i64) -> PersistenceResult<Character> {
        retry_read_once(|| async {
            tokio::time::timeout(
                self.statement_timeout,
                sqlx::query_as::<_, Character>(
                    "SELECT id, account_id, name, race_id, appearance FROM characters WHERE id = $1",
                )
                .bind(id)
                .fetch_one(&self.pool),
            )
            .await
            .map_err(|_| PersistenceError::Timeout(1))?
            .map_err(Self::map_sqlx_err)
        })
        .await
    }

    async fn update_character(&self, character: Character) -> PersistenceResult<Character> {
        sqlx::query_as::<_, Character>(
            "UPDATE characters SET name = $2, race_id = $3, appearance = $4 WHERE id = $1 \
             RETURNING id, account_id, name, race_id, appearance",
        )
        .bind(character.id)
        .bind(character.name)
        .bind(character.race_id)
        .bind(character.appearance)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn delete_character(&self, id: i64) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn create_realm(&self, realm: Realm) -> PersistenceResult<Realm> {
        sqlx::query_as::<_, Realm>(
            "INSERT INTO realms (id, name, population) VALUES ($1, $2, $3) \
             RETURNING id, name, population",
        )
        .bind(realm.id)
        .bind(realm.name)
        .bind(realm.population)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn get_realm(&self, id: i64) -> PersistenceResult<Realm> {
        retry_read_once(|| async {
            tokio::time::timeout(
                self.statement_timeout,
                sqlx::query_as::<_, Realm>("SELECT id, name, population FROM realms WHERE id = $1")
                    .bind(id)
                    .fetch_one(&self.pool),
            )
            .await
            .map_err(|_| PersistenceError::Timeout(1))?
            .map_err(Self::map_sqlx_err)
        })
        .await
    }

    async fn update_realm(&self, realm: Realm) -> PersistenceResult<Realm> {
        sqlx::query_as::<_, Realm>(
            "UPDATE realms SET name = $2, population = $3 WHERE id = $1 \
             RETURNING id, name, population",
        )
        .bind(realm.id)
        .bind(realm.name)
        .bind(realm.population)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn delete_realm(&self, id: i64) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM realms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn create_pvp_record(&self, record: PvpRecord) -> PersistenceResult<PvpRecord> {
        sqlx::query_as::<_, PvpRecord>(
            "INSERT INTO pvp_records (id, character_id, rating, wins, losses) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, character_id, rating, wins, losses",
        )
        .bind(record.id)
        .bind(record.character_id)
        .bind(record.rating)
        .bind(record.wins)
        .bind(record.losses)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn get_pvp_record(&self, id: i64) -> PersistenceResult<PvpRecord> {
        retry_read_once(|| async {
            tokio::time::timeout(
                self.statement_timeout,
                sqlx::query_as::<_, PvpRecord>(
                    "SELECT id, character_id, rating, wins, losses FROM pvp_records WHERE id = $1",
                )
                .bind(id)
                .fetch_one(&self.pool),
            )
            .await
            .map_err(|_| PersistenceError::Timeout(1))?
            .map_err(Self::map_sqlx_err)
        })
        .await
    }

    async fn update_pvp_record(&self, record: PvpRecord) -> PersistenceResult<PvpRecord> {
        sqlx::query_as::<_, PvpRecord>(
            "UPDATE pvp_records SET rating = $2, wins = $3, losses = $4 WHERE id = $1 \
             RETURNING id, character_id, rating, wins, losses",
        )
        .bind(record.id)
        .bind(record.rating)
        .bind(record.wins)
        .bind(record.losses)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)
    }

    async fn delete_pvp_record(&self, id: i64) -> PersistenceResult<()> {
        sqlx::query("DELETE FROM pvp_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests, no-database runs)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryPersistenceRepository {
    accounts: RwLock<HashMap<i64, Account>>,
    characters: RwLock<HashMap<i64, Character>>,
    realms: RwLock<HashMap<i64, Realm>>,
    pvp_records: RwLock<HashMap<i64, PvpRecord>>,
}

impl InMemoryPersistenceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! in_memory_aggregate {
    ($create:ident, $get:ident, $update:ident, $delete:ident, $field:ident, $ty:ty) => {
        async fn $create(&self, value: $ty) -> PersistenceResult<$ty> {
            self.$field.write().insert(value.id, value.clone());
            Ok(value)
        }

        async fn $get(&self, id: i64) -> PersistenceResult<$ty> {
            self.$field.read().get(&id).cloned().ok_or(PersistenceError::NotFound)
        }

        async fn $update(&self, value: $ty) -> PersistenceResult<$ty> {
            let mut map = self.$field.write();
            if !map.contains_key(&value.id) {
                return Err(PersistenceError::NotFound);
            }
            map.insert(value.id, value.clone());
            Ok(value)
        }

        async fn $delete(&self, id: i64) -> PersistenceResult<()> {
            self.$field.write().remove(&id).ok_or(PersistenceError::NotFound)?;
            Ok(())
        }
    };
}

#[async_trait]
impl PersistenceRepository for InMemoryPersistenceRepository {
    in_memory_aggregate!(create_account, get_account, update_account, delete_account, accounts, Account);
    in_memory_aggregate!(
        create_character,
        get_character,
        update_character,
        delete_character,
        characters,
        Character
    );
    in_memory_aggregate!(create_realm, get_realm, update_realm, delete_realm, realms, Realm);
    in_memory_aggregate!(
        create_pvp_record,
        get_pvp_record,
        update_pvp_record,
        delete_pvp_record,
        pvp_records,
        PvpRecord
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_repository_round_trips_an_account() {
        let repo = InMemoryPersistenceRepository::new();
        let account = Account { id: 1, username: "alice".to_string(), email: "alice@example.com".to_string() };
        repo.create_account(account.clone()).await.unwrap();
        let fetched = repo.get_account(1).await.unwrap();
        assert_eq!(fetched.username, "alice");
    }

    #[tokio::test]
    async fn update_of_unknown_record_is_not_found() {
        let repo = InMemoryPersistenceRepository::new();
        let realm = Realm { id: 1, name: "Ghostwind".to_string(), population: 0 };
        let err = repo.update_realm(realm).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound));
    }

    #[tokio::test]
    async fn delete_then_get_reports_not_found() {
        let repo = InMemoryPersistenceRepository::new();
        let record = PvpRecord { id: 7, character_id: 1, rating: 1500, wins: 0, losses: 0 };
        repo.create_pvp_record(record).await.unwrap();
        repo.delete_pvp_record(7).await.unwrap();
        assert!(matches!(repo.get_pvp_record(7).await.unwrap_err(), PersistenceError::NotFound));
    }

    #[tokio::test]
    async fn retry_read_once_retries_exactly_once_on_timeout() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let attempts = AtomicU32::new(0);
        let result: PersistenceResult<i32> = retry_read_once(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(PersistenceError::Timeout(1))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
