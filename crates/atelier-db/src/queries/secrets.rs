//! Secret record query functions.

use rusqlite::Connection;

use crate::{DbError, Result};

/// A raw secret record row.
#[derive(Clone, Debug)]
pub struct SecretRow {
    pub provider_id: String,
    pub encrypted: bool,
    /// Ciphertext when `encrypted`, otherwise the plaintext bytes.
    pub secret: Vec<u8>,
    pub iv: Option<Vec<u8>>,
    pub salt: Option<Vec<u8>>,
    pub iterations: Option<u32>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Insert or overwrite the record for a provider. `created_at` is kept
/// from the existing row on overwrite; everything else is replaced.
pub fn upsert(conn: &Connection, row: &SecretRow) -> Result<()> {
    conn.execute(
        "INSERT INTO secrets
             (provider_id, encrypted, secret, iv, salt, iterations, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(provider_id) DO UPDATE SET
             encrypted = excluded.encrypted,
             secret = excluded.secret,
             iv = excluded.iv,
             salt = excluded.salt,
             iterations = excluded.iterations,
             updated_at = excluded.updated_at",
        rusqlite::params![
            row.provider_id,
            row.encrypted,
            row.secret,
            row.iv,
            row.salt,
            row.iterations,
            row.created_at as i64,
            row.updated_at as i64,
        ],
    )?;
    Ok(())
}

/// Get the record for a provider.
pub fn get(conn: &Connection, provider_id: &str) -> Result<SecretRow> {
    conn.query_row(
        "SELECT provider_id, encrypted, secret, iv, salt, iterations, created_at, updated_at
         FROM secrets WHERE provider_id = ?1",
        [provider_id],
        |row| {
            Ok(SecretRow {
                provider_id: row.get(0)?,
                encrypted: row.get(1)?,
                secret: row.get(2)?,
                iv: row.get(3)?,
                salt: row.get(4)?,
                iterations: row.get(5)?,
                created_at: row.get::<_, i64>(6)? as u64,
                updated_at: row.get::<_, i64>(7)? as u64,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            DbError::NotFound(format!("secret for provider '{provider_id}'"))
        }
        other => DbError::Sqlite(other),
    })
}

/// Delete the record for a provider. Deleting an absent record is not
/// an error.
pub fn delete(conn: &Connection, provider_id: &str) -> Result<()> {
    conn.execute("DELETE FROM secrets WHERE provider_id = ?1", [provider_id])?;
    Ok(())
}

/// List provider ids with a stored record.
pub fn list(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT provider_id FROM secrets ORDER BY provider_id")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn plain_row(provider_id: &str, secret: &[u8]) -> SecretRow {
        SecretRow {
            provider_id: provider_id.to_string(),
            encrypted: false,
            secret: secret.to_vec(),
            iv: None,
            salt: None,
            iterations: None,
            created_at: 1000,
            updated_at: 1000,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let conn = test_db();
        upsert(&conn, &plain_row("together", b"secret-abc")).expect("upsert");

        let row = get(&conn, "together").expect("get");
        assert!(!row.encrypted);
        assert_eq!(row.secret, b"secret-abc");
        assert!(row.iv.is_none());
    }

    #[test]
    fn test_get_absent_is_not_found() {
        let conn = test_db();
        assert!(matches!(
            get(&conn, "nonexistent"),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_overwrite_preserves_created_at() {
        let conn = test_db();
        upsert(&conn, &plain_row("together", b"old")).expect("first");

        let mut newer = plain_row("together", b"new");
        newer.created_at = 9999;
        newer.updated_at = 9999;
        upsert(&conn, &newer).expect("second");

        let row = get(&conn, "together").expect("get");
        assert_eq!(row.secret, b"new");
        assert_eq!(row.created_at, 1000);
        assert_eq!(row.updated_at, 9999);
    }

    #[test]
    fn test_delete_idempotent() {
        let conn = test_db();
        upsert(&conn, &plain_row("together", b"secret")).expect("upsert");
        delete(&conn, "together").expect("delete");
        delete(&conn, "together").expect("delete again");
        assert!(get(&conn, "together").is_err());
    }

    #[test]
    fn test_list() {
        let conn = test_db();
        upsert(&conn, &plain_row("together", b"a")).expect("upsert");
        upsert(&conn, &plain_row("fal", b"b")).expect("upsert");

        let ids = list(&conn).expect("list");
        assert_eq!(ids, vec!["fal".to_string(), "together".to_string()]);
    }
}
