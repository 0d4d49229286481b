//! User storage backed by SQLite.

use crate::auth::models::{AccountStatus, Role, User, TIMESTAMP_FORMAT};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use tracing::info;
use uuid::Uuid;

/// User storage with SQLite backend.
///
/// Email and username carry UNIQUE constraints in the schema; the
/// service-level existence checks exist only to pick the right duplicate
/// code, the constraints are what actually guarantee uniqueness.
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                status TEXT NOT NULL,
                joined_on TEXT NOT NULL,
                last_login TEXT
            )",
            [],
        )?;

        Ok(())
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let role_str: String = row.get(6)?;
        let status_str: String = row.get(7)?;
        let joined_on: String = row.get(8)?;
        let last_login: Option<String> = row.get(9)?;
        Ok(User {
            id: Uuid::parse_str(&row.get::<_, String>(0)?).unwrap(),
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            username: row.get(4)?,
            password_hash: row.get(5)?,
            role: Role::from_str(&role_str).unwrap_or(Role::User),
            status: AccountStatus::from_str(&status_str).unwrap_or(AccountStatus::Inactive),
            joined_on: NaiveDateTime::parse_from_str(&joined_on, TIMESTAMP_FORMAT).unwrap(),
            last_login: last_login
                .and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok()),
        })
    }

    const SELECT_COLUMNS: &'static str = "id, first_name, last_name, email, username, \
         password_hash, role, status, joined_on, last_login";

    pub fn insert(&self, user: &User) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (id, first_name, last_name, email, username,
                                password_hash, role, status, joined_on, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id.to_string(),
                user.first_name,
                user.last_name,
                user.email,
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.status.as_str(),
                user.joined_on.format(TIMESTAMP_FORMAT).to_string(),
                user.last_login
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            ],
        )
        .context("Failed to insert user")?;

        info!("Created user: {} ({})", user.username, user.role.as_str());
        Ok(())
    }

    /// Persist the mutable columns of an existing user.
    pub fn update(&self, user: &User) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "UPDATE users SET first_name = ?2, last_name = ?3, username = ?4,
                              password_hash = ?5, role = ?6, status = ?7, last_login = ?8
             WHERE id = ?1",
            params![
                user.id.to_string(),
                user.first_name,
                user.last_name,
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.status.as_str(),
                user.last_login
                    .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            ],
        )
        .context("Failed to update user")?;
        Ok(())
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE username = ?1",
            Self::SELECT_COLUMNS
        ))?;

        match stmt.query_row(params![username], Self::row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            Self::SELECT_COLUMNS
        ))?;

        match stmt.query_row(params![id.to_string()], Self::row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists_by_email(&self, email: &str) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn exists_by_username(&self, username: &str) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Set a user's role. Returns false when the id does not exist.
    pub fn set_role(&self, id: &Uuid, role: Role) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        let rows = conn.execute(
            "UPDATE users SET role = ?2 WHERE id = ?1",
            params![id.to_string(), role.as_str()],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    pub(crate) fn test_user(username: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: bcrypt::hash("P@ss1", 4).unwrap(),
            role: Role::User,
            status: AccountStatus::Inactive,
            joined_on: Utc::now().naive_utc(),
            last_login: None,
        }
    }

    fn create_test_store() -> (UserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    #[test]
    fn test_insert_and_find() {
        let (store, _temp) = create_test_store();
        let user = test_user("jdoe", "j@x.com");
        store.insert(&user).unwrap();

        let found = store.find_by_username("jdoe").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, "j@x.com");
        assert_eq!(found.role, Role::User);
        assert_eq!(found.status, AccountStatus::Inactive);
        assert!(found.last_login.is_none());

        let by_id = store.find_by_id(&user.id).unwrap();
        assert!(by_id.is_some());
        assert!(store.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_existence_checks() {
        let (store, _temp) = create_test_store();
        store.insert(&test_user("jdoe", "j@x.com")).unwrap();

        assert!(store.exists_by_email("j@x.com").unwrap());
        assert!(store.exists_by_username("jdoe").unwrap());
        assert!(!store.exists_by_email("other@x.com").unwrap());
        assert!(!store.exists_by_username("other").unwrap());
    }

    #[test]
    fn test_unique_constraints_enforced() {
        let (store, _temp) = create_test_store();
        store.insert(&test_user("jdoe", "j@x.com")).unwrap();

        // Same email, different username
        assert!(store.insert(&test_user("jdoe2", "j@x.com")).is_err());
        // Same username, different email
        assert!(store.insert(&test_user("jdoe", "j2@x.com")).is_err());
    }

    #[test]
    fn test_update_persists_login_state() {
        let (store, _temp) = create_test_store();
        let mut user = test_user("jdoe", "j@x.com");
        store.insert(&user).unwrap();

        user.status = AccountStatus::Active;
        user.last_login = Some(
            NaiveDateTime::parse_from_str("2026-01-02 03:04:05", TIMESTAMP_FORMAT).unwrap(),
        );
        store.update(&user).unwrap();

        let found = store.find_by_username("jdoe").unwrap().unwrap();
        assert_eq!(found.status, AccountStatus::Active);
        assert_eq!(
            found.last_login.unwrap().format(TIMESTAMP_FORMAT).to_string(),
            "2026-01-02 03:04:05"
        );
    }

    #[test]
    fn test_set_role() {
        let (store, _temp) = create_test_store();
        let user = test_user("jdoe", "j@x.com");
        store.insert(&user).unwrap();

        assert!(store.set_role(&user.id, Role::Admin).unwrap());
        let found = store.find_by_id(&user.id).unwrap().unwrap();
        assert_eq!(found.role, Role::Admin);

        // Unknown id affects no rows
        assert!(!store.set_role(&Uuid::new_v4(), Role::Admin).unwrap());
    }
}
