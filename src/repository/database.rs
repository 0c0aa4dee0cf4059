use anyhow::{Context, Result};
use rusqlite::Connection;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        let db_path = db_path.strip_prefix("sqlite:").unwrap_or(db_path);
        let conn = Connection::open(db_path).context("Failed to open database")?;

        let db = Database { conn };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> Result<()> {
        // Saved analysis/event queries. Result payloads are opaque JSON.
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS saved_queries (
                id TEXT PRIMARY KEY,
                contract_address TEXT NOT NULL,
                query_type TEXT NOT NULL,
                from_block INTEGER,
                to_block INTEGER,
                result_json TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_saved_queries_contract
             ON saved_queries(contract_address)",
            [],
        )?;

        Ok(())
    }
}
