//! # rm-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rm-core` domain models.
//!
//! Uniqueness of machine codes and the machine → fault → comment ownership are
//! enforced by the schema (UNIQUE and FOREIGN KEY constraints), so racing
//! requests cannot slip past an application-level check.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rm_core::error::{AppError, Result};
use rm_core::models::{
    Comment, Fault, FaultDetail, FaultStatus, FaultUpdate, Machine, MachineDetail, NewComment,
    NewFault, NewMachine,
};
use rm_core::traits::{InsertHook, MaintenanceRepo};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteMaintenanceRepo {
    pool: SqlitePool,
}

impl SqliteMaintenanceRepo {
    /// Opens (creating if missing) the database at `url` and applies migrations.
    ///
    /// In-memory URLs get a single, never-recycled connection: every SQLite
    /// memory connection is its own database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await.map_err(db_err)?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Storage(format!("migration failed: {e}")))?;

        log::info!("sqlite store ready at {url}");
        Ok(Self { pool })
    }

    /// Fresh private database, used by tests and demos.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }
}

/// Maps a driver failure to the domain error. Constraint violations that the
/// callers care about are handled by the call sites first.
fn db_err(e: sqlx::Error) -> AppError {
    AppError::Storage(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|d| d.is_unique_violation())
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|d| d.is_foreign_key_violation())
}

fn machine_from_row(row: &SqliteRow) -> Result<Machine> {
    Ok(Machine {
        id: row.try_get("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        code: row.try_get("code").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn fault_from_row(row: &SqliteRow) -> Result<Fault> {
    Ok(Fault {
        id: row.try_get("id").map_err(db_err)?,
        machine_id: row.try_get("machine_id").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        status: row.try_get("status").map_err(db_err)?,
        technician: row.try_get("technician").map_err(db_err)?,
        resolution: row.try_get("resolution").map_err(db_err)?,
        reported_at: row.try_get("reported_at").map_err(db_err)?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id").map_err(db_err)?,
        fault_id: row.try_get("fault_id").map_err(db_err)?,
        text: row.try_get("text").map_err(db_err)?,
        author: row.try_get("author").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

// Connection-level helpers so single operations and `apply_fault_update`
// share the same statements inside whatever transaction the caller holds.

async fn fetch_fault(conn: &mut SqliteConnection, id: i64) -> Result<Fault> {
    let row = sqlx::query(
        "SELECT id, machine_id, description, status, technician, resolution, reported_at \
         FROM faults WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    match row {
        Some(row) => fault_from_row(&row),
        None => Err(AppError::fault_not_found(id)),
    }
}

async fn insert_comment(conn: &mut SqliteConnection, fault_id: i64, comment: &NewComment) -> Result<Comment> {
    let created_at = Utc::now();
    let id = sqlx::query("INSERT INTO comments (fault_id, text, author, created_at) VALUES (?, ?, ?, ?)")
        .bind(fault_id)
        .bind(&comment.text)
        .bind(&comment.author)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::fault_not_found(fault_id)
            } else {
                db_err(e)
            }
        })?
        .last_insert_rowid();

    Ok(Comment {
        id,
        fault_id,
        text: comment.text.clone(),
        author: comment.author.clone(),
        created_at,
    })
}

async fn update_status(conn: &mut SqliteConnection, fault_id: i64, status: &str) -> Result<()> {
    let done = sqlx::query("UPDATE faults SET status = ? WHERE id = ?")
        .bind(status)
        .bind(fault_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    if done.rows_affected() == 0 {
        return Err(AppError::fault_not_found(fault_id));
    }
    Ok(())
}

async fn update_resolution(conn: &mut SqliteConnection, fault_id: i64, resolution: Option<&str>) -> Result<()> {
    let done = sqlx::query("UPDATE faults SET resolution = ? WHERE id = ?")
        .bind(resolution)
        .bind(fault_id)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
    if done.rows_affected() == 0 {
        return Err(AppError::fault_not_found(fault_id));
    }
    Ok(())
}

async fn fetch_comments(conn: &mut SqliteConnection, fault_id: i64) -> Result<Vec<Comment>> {
    sqlx::query(
        "SELECT id, fault_id, text, author, created_at FROM comments \
         WHERE fault_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(fault_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?
    .iter()
    .map(comment_from_row)
    .collect()
}

#[async_trait]
impl MaintenanceRepo for SqliteMaintenanceRepo {
    /// Inserts the machine and runs `on_insert` before committing.
    ///
    /// # Developer Note
    /// The hook runs while the transaction is open, so a failed QR write
    /// leaves no machine row behind: dropping `tx` rolls back.
    async fn create_machine_with(&self, new: NewMachine, on_insert: InsertHook<'_>) -> Result<Machine> {
        new.validate()?;
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let id = sqlx::query("INSERT INTO machines (name, code, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(&new.name)
            .bind(&new.code)
            .bind(&new.description)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::DuplicateCode(new.code.clone())
                } else {
                    db_err(e)
                }
            })?
            .last_insert_rowid();

        let machine = Machine {
            id,
            name: new.name,
            code: new.code,
            description: new.description,
            created_at,
        };

        on_insert(&machine)?;
        tx.commit().await.map_err(db_err)?;
        Ok(machine)
    }

    async fn get_machine_by_code(&self, code: &str) -> Result<Machine> {
        let row = sqlx::query("SELECT id, name, code, description, created_at FROM machines WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => machine_from_row(&row),
            None => Err(AppError::machine_not_found(code)),
        }
    }

    async fn get_machine(&self, id: i64) -> Result<Machine> {
        let row = sqlx::query("SELECT id, name, code, description, created_at FROM machines WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => machine_from_row(&row),
            None => Err(AppError::NotFound { entity: "machine", key: id.to_string() }),
        }
    }

    async fn list_machines(&self) -> Result<Vec<Machine>> {
        sqlx::query("SELECT id, name, code, description, created_at FROM machines ORDER BY code ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(machine_from_row)
            .collect()
    }

    /// Retrieves a machine, its faults and every fault's comment log from
    /// one read transaction.
    async fn machine_detail(&self, code: &str) -> Result<MachineDetail> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let machine = match sqlx::query("SELECT id, name, code, description, created_at FROM machines WHERE code = ?")
            .bind(code)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
        {
            Some(row) => machine_from_row(&row)?,
            None => return Err(AppError::machine_not_found(code)),
        };

        let faults = sqlx::query(
            "SELECT id, machine_id, description, status, technician, resolution, reported_at \
             FROM faults WHERE machine_id = ? ORDER BY reported_at DESC, id DESC",
        )
        .bind(machine.id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?
        .iter()
        .map(fault_from_row)
        .collect::<Result<Vec<_>>>()?;

        let mut comments_by_fault: HashMap<i64, Vec<Comment>> = HashMap::new();
        let rows = sqlx::query(
            "SELECT c.id, c.fault_id, c.text, c.author, c.created_at FROM comments c \
             JOIN faults f ON c.fault_id = f.id \
             WHERE f.machine_id = ? ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(machine.id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;
        for row in &rows {
            let comment = comment_from_row(row)?;
            comments_by_fault.entry(comment.fault_id).or_default().push(comment);
        }

        tx.commit().await.map_err(db_err)?;

        let faults = faults
            .into_iter()
            .map(|fault| FaultDetail {
                comments: comments_by_fault.remove(&fault.id).unwrap_or_default(),
                fault,
            })
            .collect();

        Ok(MachineDetail { machine, faults })
    }

    async fn create_fault(&self, machine_id: i64, new: NewFault) -> Result<Fault> {
        new.validate()?;
        let reported_at = Utc::now();
        let status = FaultStatus::Pending.label();

        let id = sqlx::query(
            "INSERT INTO faults (machine_id, description, status, technician, reported_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(machine_id)
        .bind(&new.description)
        .bind(status)
        .bind(&new.technician)
        .bind(reported_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound { entity: "machine", key: machine_id.to_string() }
            } else {
                db_err(e)
            }
        })?
        .last_insert_rowid();

        Ok(Fault {
            id,
            machine_id,
            description: new.description,
            status: status.to_string(),
            technician: new.technician,
            resolution: None,
            reported_at,
        })
    }

    async fn get_fault(&self, id: i64) -> Result<Fault> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        fetch_fault(&mut conn, id).await
    }

    async fn set_fault_status(&self, fault_id: i64, status: &str) -> Result<Fault> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        update_status(&mut tx, fault_id, status).await?;
        let fault = fetch_fault(&mut tx, fault_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(fault)
    }

    async fn set_fault_resolution(&self, fault_id: i64, resolution: Option<&str>) -> Result<Fault> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        update_resolution(&mut tx, fault_id, resolution).await?;
        let fault = fetch_fault(&mut tx, fault_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(fault)
    }

    async fn apply_fault_update(&self, fault_id: i64, update: FaultUpdate) -> Result<Fault> {
        update.validate()?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Writes go first so the transaction takes the write lock up front.
        if let Some(comment) = update.comment.as_ref().filter(|c| !c.is_blank()) {
            insert_comment(&mut tx, fault_id, comment).await?;
        }
        if let Some(status) = &update.status {
            update_status(&mut tx, fault_id, status).await?;
        }
        if let Some(resolution) = &update.resolution {
            update_resolution(&mut tx, fault_id, Some(resolution)).await?;
        }

        let fault = fetch_fault(&mut tx, fault_id).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(fault)
    }

    async fn append_comment(&self, fault_id: i64, comment: NewComment) -> Result<Option<Comment>> {
        if comment.is_blank() {
            return Ok(None);
        }
        comment.validate()?;
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_comment(&mut conn, fault_id, &comment).await.map(Some)
    }

    async fn list_comments(&self, fault_id: i64) -> Result<Vec<Comment>> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        fetch_comments(&mut conn, fault_id).await
    }

    async fn close(&self) {
        self.pool.close().await;
        log::info!("sqlite store closed");
    }
}
