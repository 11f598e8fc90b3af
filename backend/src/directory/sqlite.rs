use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use travel_common::{NewUser, Trip, TripRecord, TripsPage, UserRecord, UserStatus, UsersPage};

use super::{Directory, DirectoryError};

const USER_COLUMNS: &str = "account_id, email, name, image_url, joined_at, status";
const TRIP_COLUMNS: &str = "id, trip_detail, created_at, image_urls, user_id";

/// SQLite store holding the user directory and saved trips.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(database_url: &str) -> Result<Self, DirectoryError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| DirectoryError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;

        // account_id as primary key is what keeps one record per principal.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                account_id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                image_url TEXT,
                joined_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'user'
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trips (
                id TEXT PRIMARY KEY,
                trip_detail TEXT NOT NULL,
                created_at TEXT NOT NULL,
                image_urls TEXT NOT NULL,
                user_id TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_joined_at ON users(joined_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trips_created_at ON trips(created_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trips_user_id ON trips(user_id)",
            [],
        )?;

        tracing::info!("Store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DirectoryError> {
        self.conn
            .lock()
            .map_err(|e| DirectoryError::Database(e.to_string()))
    }

    pub fn ping(&self) -> Result<(), DirectoryError> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn get_user(&self, account_id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let conn = self.lock()?;
        select_user(&conn, account_id)
    }

    /// Insert unless the account already has a record; returns the stored record.
    pub fn insert_user_if_absent(
        &self,
        new_user: &NewUser,
        joined_at: DateTime<Utc>,
    ) -> Result<UserRecord, DirectoryError> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT INTO users (account_id, email, name, image_url, joined_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, 'user')
             ON CONFLICT(account_id) DO NOTHING",
            params![
                new_user.account_id,
                new_user.email,
                new_user.name,
                new_user.image_url,
                timestamp(joined_at),
            ],
        )?;

        if inserted == 1 {
            tracing::info!("Created new user: {} ({})", new_user.account_id, new_user.email);
        } else {
            tracing::debug!("User {} already exists, keeping stored record", new_user.account_id);
        }

        select_user(&conn, &new_user.account_id)?
            .ok_or_else(|| DirectoryError::NotFound(new_user.account_id.clone()))
    }

    pub fn promote_user(&self, account_id: &str) -> Result<UserRecord, DirectoryError> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE users SET status = 'admin' WHERE account_id = ?1",
            params![account_id],
        )?;
        if updated == 0 {
            return Err(DirectoryError::NotFound(account_id.to_string()));
        }

        tracing::info!("Promoted user {} to admin", account_id);
        select_user(&conn, account_id)?.ok_or_else(|| DirectoryError::NotFound(account_id.to_string()))
    }

    pub fn list_users_page(&self, limit: u32, offset: u32) -> Result<UsersPage, DirectoryError> {
        let conn = self.lock()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY joined_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map(params![limit, offset], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UsersPage {
            users,
            total: total as u64,
        })
    }

    /// Store a generated trip for `user_id`.
    pub fn insert_trip(
        &self,
        user_id: &str,
        trip: &Trip,
        image_urls: &[String],
    ) -> Result<TripRecord, DirectoryError> {
        let record = TripRecord {
            id: uuid::Uuid::new_v4().to_string(),
            trip_detail: serde_json::to_string(trip)
                .map_err(|e| DirectoryError::Database(e.to_string()))?,
            created_at: Utc::now().trunc_subsecs(6),
            image_urls: image_urls.to_vec(),
            user_id: user_id.to_string(),
        };
        let image_urls_json = serde_json::to_string(&record.image_urls)
            .map_err(|e| DirectoryError::Database(e.to_string()))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO trips (id, trip_detail, created_at, image_urls, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.trip_detail,
                timestamp(record.created_at),
                image_urls_json,
                record.user_id,
            ],
        )?;

        tracing::debug!("Stored trip {} for user {}", record.id, user_id);
        Ok(record)
    }

    pub fn get_trip(&self, id: &str) -> Result<Option<TripRecord>, DirectoryError> {
        let conn = self.lock()?;
        let trip = conn
            .query_row(
                &format!("SELECT {} FROM trips WHERE id = ?1", TRIP_COLUMNS),
                params![id],
                trip_from_row,
            )
            .optional()?;
        Ok(trip)
    }

    /// Newest trips first.
    pub fn list_trips(&self, limit: u32, offset: u32) -> Result<TripsPage, DirectoryError> {
        let conn = self.lock()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM trips", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trips ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
            TRIP_COLUMNS
        ))?;
        let trips = stmt
            .query_map(params![limit, offset], trip_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TripsPage {
            trips,
            total: total as u64,
        })
    }

    pub fn all_trips(&self) -> Result<Vec<TripRecord>, DirectoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trips ORDER BY created_at ASC, rowid ASC",
            TRIP_COLUMNS
        ))?;
        let trips = stmt
            .query_map([], trip_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    /// Number of stored trips per user id.
    pub fn trip_counts(&self) -> Result<HashMap<String, u64>, DirectoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT user_id, COUNT(*) FROM trips GROUP BY user_id")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }
}

fn select_user(conn: &Connection, account_id: &str) -> Result<Option<UserRecord>, DirectoryError> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE account_id = ?1", USER_COLUMNS),
            params![account_id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let joined_at: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(UserRecord {
        account_id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        image_url: row.get(3)?,
        joined_at: parse_timestamp(4, &joined_at)?,
        status: status
            .parse::<UserStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, e.into()))?,
    })
}

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<TripRecord> {
    let created_at: String = row.get(2)?;
    let image_urls: String = row.get(3)?;
    Ok(TripRecord {
        id: row.get(0)?,
        trip_detail: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
        image_urls: serde_json::from_str(&image_urls)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        user_id: row.get(4)?,
    })
}

#[async_trait]
impl Directory for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        SqliteStore::ping(self)
    }

    async fn find_user(&self, account_id: &str) -> Result<Option<UserRecord>, DirectoryError> {
        self.get_user(account_id)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError> {
        self.insert_user_if_absent(&new_user, Utc::now())
    }

    async fn promote(&self, account_id: &str) -> Result<UserRecord, DirectoryError> {
        self.promote_user(account_id)
    }

    async fn list_users(&self, limit: u32, offset: u32) -> Result<UsersPage, DirectoryError> {
        self.list_users_page(limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use chrono::Duration;
    use travel_common::DayPlan;

    fn store() -> SqliteStore {
        SqliteStore::open(":memory:").unwrap()
    }

    fn new_user(id: &str) -> NewUser {
        NewUser {
            account_id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_uppercase(),
            image_url: None,
        }
    }

    fn trip(name: &str, style: &str) -> Trip {
        Trip {
            name: name.to_string(),
            description: String::new(),
            estimated_price: "$100".to_string(),
            duration: 1,
            budget: "Budget".to_string(),
            travel_style: style.to_string(),
            country: "Italy".to_string(),
            interests: "Food".to_string(),
            group_type: "Solo".to_string(),
            best_time_to_visit: vec![],
            weather_info: vec![],
            location: None,
            itinerary: vec![DayPlan {
                day: 1,
                location: "Rome".to_string(),
                activities: vec![],
            }],
        }
    }

    #[test]
    fn test_create_then_get() {
        let store = store();
        assert!(store.get_user("acc-1").unwrap().is_none());

        let now = Utc::now();
        let created = store.insert_user_if_absent(&new_user("acc-1"), now).unwrap();
        assert_eq!(created.status, UserStatus::User);
        assert_eq!(created.email, "acc-1@example.com");

        let fetched = store.get_user("acc-1").unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_second_insert_keeps_first_record() {
        let store = store();
        let first_time = Utc::now() - Duration::days(3);
        let first = store.insert_user_if_absent(&new_user("acc-1"), first_time).unwrap();

        let mut other = new_user("acc-1");
        other.name = "Someone Else".to_string();
        let second = store.insert_user_if_absent(&other, Utc::now()).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_users_page(10, 0).unwrap().total, 1);
    }

    #[test]
    fn test_concurrent_inserts_leave_one_record() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut user = new_user("acc-race");
                    user.name = format!("tab-{}", i);
                    store.insert_user_if_absent(&user, Utc::now()).unwrap()
                })
            })
            .collect();

        let records: Vec<UserRecord> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(records.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list_users_page(10, 0).unwrap().total, 1);
    }

    #[test]
    fn test_promote_changes_only_status() {
        let store = store();
        let mut user = new_user("acc-1");
        user.image_url = Some("https://img/acc-1.png".to_string());
        let before = store.insert_user_if_absent(&user, Utc::now()).unwrap();

        let after = store.promote_user("acc-1").unwrap();
        assert_eq!(after.status, UserStatus::Admin);
        assert_eq!(UserRecord { status: UserStatus::User, ..after.clone() }, before);

        // Idempotent
        let again = store.promote_user("acc-1").unwrap();
        assert_eq!(again, after);
    }

    #[test]
    fn test_promote_missing_is_not_found_and_creates_nothing() {
        let store = store();
        let err = store.promote_user("ghost").unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(ref id) if id == "ghost"));
        assert!(store.get_user("ghost").unwrap().is_none());
        assert_eq!(store.list_users_page(10, 0).unwrap().total, 0);
    }

    #[test]
    fn test_list_users_paged_newest_first() {
        let store = store();
        let base = Utc::now() - Duration::days(10);
        for i in 0..5 {
            store
                .insert_user_if_absent(&new_user(&format!("acc-{}", i)), base + Duration::days(i))
                .unwrap();
        }

        let page = store.list_users_page(2, 0).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.users[0].account_id, "acc-4");
        assert_eq!(page.users[1].account_id, "acc-3");

        let last = store.list_users_page(2, 4).unwrap();
        assert_eq!(last.users.len(), 1);
        assert_eq!(last.users[0].account_id, "acc-0");
    }

    #[tokio::test]
    async fn test_directory_status_and_all_users() {
        let store = store();
        for i in 0..3 {
            store
                .insert_user_if_absent(&new_user(&format!("acc-{}", i)), Utc::now())
                .unwrap();
        }
        store.promote_user("acc-1").unwrap();

        assert_eq!(store.user_status("acc-1").await.unwrap(), UserStatus::Admin);
        assert_eq!(store.user_status("acc-2").await.unwrap(), UserStatus::User);
        assert!(matches!(
            store.user_status("nobody").await,
            Err(DirectoryError::NotFound(_))
        ));
        assert_eq!(store.all_users().await.unwrap().len(), 3);
    }

    #[test]
    fn test_trip_roundtrip_and_paging() {
        let store = store();
        let urls = vec!["https://img/1.jpg".to_string()];
        let first = store.insert_trip("acc-1", &trip("First", "Relaxed"), &urls).unwrap();
        let second = store.insert_trip("acc-2", &trip("Second", "Luxury"), &[]).unwrap();

        let fetched = store.get_trip(&first.id).unwrap().unwrap();
        assert_eq!(fetched.image_urls, urls);
        assert_eq!(fetched.trip().unwrap().name, "First");
        assert!(store.get_trip("missing").unwrap().is_none());

        let page = store.list_trips(1, 0).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.trips[0].id, second.id);

        assert_eq!(store.all_trips().unwrap().len(), 2);
    }

    #[test]
    fn test_trip_counts() {
        let store = store();
        store.insert_trip("acc-1", &trip("A", "Relaxed"), &[]).unwrap();
        store.insert_trip("acc-1", &trip("B", "Relaxed"), &[]).unwrap();
        store.insert_trip("acc-2", &trip("C", "Luxury"), &[]).unwrap();

        let counts = store.trip_counts().unwrap();
        assert_eq!(counts.get("acc-1"), Some(&2));
        assert_eq!(counts.get("acc-2"), Some(&1));
        assert_eq!(counts.get("acc-3"), None);
    }

    #[test]
    fn test_open_on_disk_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("travel.db");
        let url = format!("sqlite:{}", path.display());

        let store = SqliteStore::open(&url).unwrap();
        store.insert_user_if_absent(&new_user("acc-1"), Utc::now()).unwrap();
        drop(store);

        let reopened = SqliteStore::open(&url).unwrap();
        assert!(reopened.get_user("acc-1").unwrap().is_some());
    }
}
