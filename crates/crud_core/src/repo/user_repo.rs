//! Actor (`users`) repository.

use crate::model::audit::now_utc;
use crate::model::user::{NewUser, User, UserId};
use crate::repo::row::{read_bool, read_timestamp, timestamp_to_db};
use crate::repo::{RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    first_name,
    last_name,
    is_active,
    date_joined
FROM users";

pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Removes the user; audit references to it become NULL.
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let username = user.username.trim();
        if username.is_empty() {
            return Err(RepoError::InvalidData(
                "username must not be empty".to_string(),
            ));
        }

        let date_joined = now_utc();
        self.conn.execute(
            "INSERT INTO users (username, first_name, last_name, is_active, date_joined)
             VALUES (?1, ?2, ?3, 1, ?4);",
            params![
                username,
                user.first_name.as_str(),
                user.last_name.as_str(),
                timestamp_to_db(date_joined),
            ],
        )?;
        let id = UserId(self.conn.last_insert_rowid());
        info!("event=user_create module=repo status=ok user_id={id}");

        Ok(User {
            id,
            username: username.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_active: true,
            date_joined,
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.0])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1;",
                [username.trim()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get_user(UserId(id)),
            None => Ok(None),
        }
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::UserNotFound(id));
        }
        info!("event=user_delete module=repo status=ok user_id={id}");
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        id: UserId(row.get("id")?),
        username: row.get("username")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        is_active: read_bool(row, "is_active")?,
        date_joined: read_timestamp(row, "date_joined")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{SqliteUserRepository, UserRepository};
    use crate::db::open_db_in_memory;
    use crate::model::user::{NewUser, UserId};
    use crate::repo::RepoError;

    #[test]
    fn create_and_lookup_user() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteUserRepository::new(&conn);

        let created = repo
            .create_user(&NewUser::new(" ada ").named("Ada", "Lovelace"))
            .unwrap();
        assert_eq!(created.username, "ada");

        let by_id = repo.get_user(created.id).unwrap().unwrap();
        assert_eq!(by_id, created);
        let by_name = repo.get_user_by_username("ada").unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(repo.get_user_by_username("grace").unwrap().is_none());
    }

    #[test]
    fn empty_username_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteUserRepository::new(&conn);
        let err = repo.create_user(&NewUser::new("   ")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn duplicate_username_propagates_db_error() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteUserRepository::new(&conn);
        repo.create_user(&NewUser::new("ada")).unwrap();
        let err = repo.create_user(&NewUser::new("ada")).unwrap_err();
        assert!(matches!(err, RepoError::Db(_)));
    }

    #[test]
    fn delete_missing_user_is_reported() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteUserRepository::new(&conn);
        let err = repo.delete_user(UserId(42)).unwrap_err();
        assert!(matches!(err, RepoError::UserNotFound(UserId(42))));
    }
}
