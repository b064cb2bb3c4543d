// ============================================================================
// REPLICATION SERVICE - Writes replicated rows into the destination table
// ============================================================================

use async_trait::async_trait;
use shared::{AppError, DatabaseService};
use sqlx::{pool::PoolConnection, Postgres};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{ReplicationRecord, RowId, DATA_COLUMN_COUNT, DESTINATION_COLUMNS};

/// Source of destination-store connections, one per batch.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn DestinationWriter>, AppError>;
}

/// A held destination connection. Every operation is a single statement,
/// committed before it returns. Dropping the writer releases the connection.
#[async_trait]
pub trait DestinationWriter: Send {
    async fn insert(&mut self, record: &ReplicationRecord) -> Result<(), AppError>;
    async fn update(&mut self, record: &ReplicationRecord) -> Result<(), AppError>;
    async fn delete(&mut self, row_id: RowId) -> Result<(), AppError>;
}

/// Parameterized statements for one destination table.
#[derive(Debug)]
struct Statements {
    insert: String,
    update: String,
    delete: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        let columns = DESTINATION_COLUMNS.join(", ");
        let placeholders = (1..=DESTINATION_COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let assignments = DESTINATION_COLUMNS[..DATA_COLUMN_COUNT]
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let id_column = DESTINATION_COLUMNS[DATA_COLUMN_COUNT];

        Self {
            insert: format!("INSERT INTO {} ({}) VALUES ({})", table, columns, placeholders),
            update: format!(
                "UPDATE {} SET {} WHERE {} = ${}",
                table,
                assignments,
                id_column,
                DATA_COLUMN_COUNT + 1
            ),
            delete: format!("DELETE FROM {} WHERE {} = $1", table, id_column),
        }
    }
}

#[derive(Clone)]
pub struct PgDestinationStore {
    db: DatabaseService,
    statements: Arc<Statements>,
}

impl PgDestinationStore {
    /// `table` must already be validated as a plain identifier.
    pub fn new(db: DatabaseService, table: &str) -> Self {
        Self {
            db,
            statements: Arc::new(Statements::for_table(table)),
        }
    }
}

#[async_trait]
impl DestinationStore for PgDestinationStore {
    async fn connect(&self) -> Result<Box<dyn DestinationWriter>, AppError> {
        let conn = self.db.pool().acquire().await?;
        Ok(Box::new(PgDestinationWriter {
            conn,
            statements: self.statements.clone(),
        }))
    }
}

pub struct PgDestinationWriter {
    conn: PoolConnection<Postgres>,
    statements: Arc<Statements>,
}

#[async_trait]
impl DestinationWriter for PgDestinationWriter {
    async fn insert(&mut self, record: &ReplicationRecord) -> Result<(), AppError> {
        let mut query = sqlx::query(&self.statements.insert);
        for value in record.values() {
            query = query.bind(value);
        }
        query.execute(&mut *self.conn).await?;

        info!("Row {} inserted", record.correlation_id());
        Ok(())
    }

    async fn update(&mut self, record: &ReplicationRecord) -> Result<(), AppError> {
        let mut query = sqlx::query(&self.statements.update);
        for value in record.values() {
            query = query.bind(value);
        }
        let result = query.execute(&mut *self.conn).await?;

        if result.rows_affected() == 0 {
            warn!("Update matched no destination row for {}", record.correlation_id());
        } else {
            info!("Row {} updated", record.correlation_id());
        }
        Ok(())
    }

    async fn delete(&mut self, row_id: RowId) -> Result<(), AppError> {
        let result = sqlx::query(&self.statements.delete)
            .bind(row_id.to_string())
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            warn!("Delete matched no destination row for {}", row_id);
        } else {
            info!("Row {} deleted", row_id);
        }
        Ok(())
    }
}
