//! Durable store backed by a single SQLite file.
//!
//! Disruptions, flights, and worker records are kept as JSON documents keyed
//! by id. Messages get real columns so mailbox filters run in SQL.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use irops_core::{
    Disruption, Flight, FlightId, IropsError, IropsResult, JobId, Message, MessageId, WorkerRecord,
};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::store::{MessageQuery, Store};

const MESSAGE_COLUMNS: &str =
    "id, sender, receiver, message_type, content, disruption_id, processed, timestamp";

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn storage_err(context: &'static str) -> impl Fn(rusqlite::Error) -> IropsError {
    move |e| IropsError::Storage(format!("{context}: {e}"))
}

// Fixed-width UTC so lexical order matches chronological order.
fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode<T: DeserializeOwned>(raw: &str) -> IropsResult<T> {
    serde_json::from_str(raw).map_err(|e| IropsError::Storage(format!("Corrupt record: {e}")))
}

struct RawMessage {
    id: String,
    sender: String,
    receiver: String,
    message_type: String,
    content: String,
    disruption_id: Option<i64>,
    processed: bool,
    timestamp: String,
}

impl RawMessage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender: row.get(1)?,
            receiver: row.get(2)?,
            message_type: row.get(3)?,
            content: row.get(4)?,
            disruption_id: row.get(5)?,
            processed: row.get(6)?,
            timestamp: row.get(7)?,
        })
    }

    fn into_message(self) -> IropsResult<Message> {
        let id = uuid::Uuid::parse_str(&self.id)
            .map_err(|e| IropsError::Storage(format!("Corrupt message id: {e}")))?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| IropsError::Storage(format!("Corrupt message timestamp: {e}")))?;
        Ok(Message {
            id,
            sender: self.sender,
            receiver: self.receiver,
            message_type: self.message_type,
            content: decode(&self.content)?,
            disruption_id: self.disruption_id,
            processed: self.processed,
            timestamp,
        })
    }
}

/// WHERE clause and bound values for a message filter.
fn message_filter(query: &MessageQuery) -> (String, Vec<SqlValue>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(receiver) = &query.receiver {
        values.push(SqlValue::Text(receiver.clone()));
        clauses.push(format!("receiver = ?{}", values.len()));
    }
    if let Some(sender) = &query.sender {
        values.push(SqlValue::Text(sender.clone()));
        clauses.push(format!("sender = ?{}", values.len()));
    }
    if let Some(id) = query.disruption_id {
        values.push(SqlValue::Integer(id));
        clauses.push(format!("disruption_id = ?{}", values.len()));
    }
    if query.unprocessed_only {
        clauses.push("processed = 0".to_string());
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_sql, values)
}

fn select_messages(
    conn: &Connection,
    query: &MessageQuery,
    tail: &str,
) -> IropsResult<Vec<Message>> {
    let (where_sql, values) = message_filter(query);
    let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages {where_sql} {tail}");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(storage_err("Failed to prepare message query"))?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), RawMessage::from_row)
        .map_err(storage_err("Failed to query messages"))?;
    let raw = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage_err("Failed to read messages"))?;
    raw.into_iter().map(RawMessage::into_message).collect()
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> IropsResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(storage_err("Failed to open database"))?;
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests.
    pub fn in_memory() -> IropsResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(storage_err("Failed to open database"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> IropsResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> IropsResult<()> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS disruptions (
                id INTEGER PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS flights (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS workers (
                name TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender TEXT NOT NULL,
                receiver TEXT NOT NULL,
                message_type TEXT NOT NULL,
                content TEXT NOT NULL,
                disruption_id INTEGER,
                processed INTEGER NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_messages_receiver
                ON messages(receiver, processed);
            CREATE INDEX IF NOT EXISTS idx_messages_disruption
                ON messages(disruption_id);
            ",
        )
        .map_err(storage_err("Failed to init schema"))
    }

    fn put_document(&self, table: &str, key: SqlValue, data: String) -> IropsResult<()> {
        let key_column = if table == "workers" { "name" } else { "id" };
        let sql = format!(
            "INSERT INTO {table} ({key_column}, data) VALUES (?1, ?2)
             ON CONFLICT({key_column}) DO UPDATE SET data = excluded.data"
        );
        self.conn
            .lock()
            .execute(&sql, params![key, data])
            .map_err(storage_err("Failed to write record"))?;
        Ok(())
    }

    fn list_documents<T: DeserializeOwned>(&self, table: &str) -> IropsResult<Vec<T>> {
        let key_column = if table == "workers" { "name" } else { "id" };
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT data FROM {table} ORDER BY {key_column}"))
            .map_err(storage_err("Failed to prepare list"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage_err("Failed to list records"))?;
        let raw = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err("Failed to read records"))?;
        raw.iter().map(|r| decode(r)).collect()
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_disruption(&self, id: JobId) -> IropsResult<Option<Disruption>> {
        let raw: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT data FROM disruptions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_err("Failed to load disruption"))?;
        raw.as_deref().map(decode).transpose()
    }

    async fn put_disruption(&self, disruption: &Disruption) -> IropsResult<()> {
        let data = serde_json::to_string(disruption)?;
        self.put_document("disruptions", SqlValue::Integer(disruption.id), data)
    }

    async fn list_disruptions(&self) -> IropsResult<Vec<Disruption>> {
        self.list_documents("disruptions")
    }

    async fn get_flights(&self, ids: &[FlightId]) -> IropsResult<Vec<Flight>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT data FROM flights WHERE id = ?1")
            .map_err(storage_err("Failed to prepare flight lookup"))?;
        let mut flights = Vec::with_capacity(ids.len());
        for id in ids {
            let raw: Option<String> = stmt
                .query_row(params![id], |row| row.get(0))
                .optional()
                .map_err(storage_err("Failed to load flight"))?;
            if let Some(raw) = raw {
                flights.push(decode(&raw)?);
            }
        }
        Ok(flights)
    }

    async fn put_flight(&self, flight: &Flight) -> IropsResult<()> {
        let data = serde_json::to_string(flight)?;
        self.put_document("flights", SqlValue::Text(flight.id.clone()), data)
    }

    async fn list_flights(&self) -> IropsResult<Vec<Flight>> {
        self.list_documents("flights")
    }

    async fn upsert_worker(&self, record: &WorkerRecord) -> IropsResult<()> {
        let data = serde_json::to_string(record)?;
        self.put_document("workers", SqlValue::Text(record.name.clone()), data)
    }

    async fn list_workers(&self) -> IropsResult<Vec<WorkerRecord>> {
        self.list_documents("workers")
    }

    async fn insert_message(&self, message: &Message) -> IropsResult<()> {
        let content = serde_json::to_string(&message.content)?;
        self.conn
            .lock()
            .execute(
                "INSERT INTO messages (id, sender, receiver, message_type, content, disruption_id, processed, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id.to_string(),
                    message.sender,
                    message.receiver,
                    message.message_type,
                    content,
                    message.disruption_id,
                    message.processed,
                    ts(&message.timestamp),
                ],
            )
            .map_err(storage_err("Failed to insert message"))?;

        debug!(
            message_id = %message.id,
            sender = %message.sender,
            receiver = %message.receiver,
            message_type = %message.message_type,
            "Message stored"
        );
        Ok(())
    }

    async fn query_messages(&self, query: &MessageQuery) -> IropsResult<Vec<Message>> {
        let conn = self.conn.lock();
        select_messages(&conn, query, "ORDER BY timestamp ASC, rowid ASC")
    }

    async fn claim_messages(&self, query: &MessageQuery) -> IropsResult<Vec<Message>> {
        let query = MessageQuery {
            unprocessed_only: true,
            ..query.clone()
        };
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(storage_err("Failed to begin claim"))?;
        let mut claimed = select_messages(&tx, &query, "ORDER BY timestamp ASC, rowid ASC")?;
        {
            let mut stmt = tx
                .prepare("UPDATE messages SET processed = 1 WHERE id = ?1")
                .map_err(storage_err("Failed to prepare claim"))?;
            for msg in &mut claimed {
                stmt.execute(params![msg.id.to_string()])
                    .map_err(storage_err("Failed to claim message"))?;
                msg.processed = true;
            }
        }
        tx.commit().map_err(storage_err("Failed to commit claim"))?;
        Ok(claimed)
    }

    async fn mark_processed(&self, id: MessageId) -> IropsResult<bool> {
        let changed = self
            .conn
            .lock()
            .execute(
                "UPDATE messages SET processed = 1 WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(storage_err("Failed to mark message processed"))?;
        Ok(changed > 0)
    }

    async fn recent_messages(&self, limit: usize) -> IropsResult<Vec<Message>> {
        let conn = self.conn.lock();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        select_messages(
            &conn,
            &MessageQuery::default(),
            &format!("ORDER BY timestamp DESC, rowid DESC LIMIT {limit}"),
        )
    }
}
