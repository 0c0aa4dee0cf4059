use super::models::SavedQuery;
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

pub struct QueryRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> QueryRepository<'a> {
    // SQL queries as constants
    const INSERT_QUERY: &'static str = "INSERT OR REPLACE INTO saved_queries (
            id, contract_address, query_type, from_block, to_block, result_json, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

    const GET_QUERY: &'static str =
        "SELECT id, contract_address, query_type, from_block, to_block, result_json, created_at
         FROM saved_queries WHERE id = ?1";

    const LIST_FOR_CONTRACT: &'static str =
        "SELECT id, contract_address, query_type, from_block, to_block, result_json, created_at
         FROM saved_queries WHERE contract_address = ?1
         ORDER BY created_at DESC LIMIT ?2";

    const LIST_RECENT: &'static str =
        "SELECT id, contract_address, query_type, from_block, to_block, result_json, created_at
         FROM saved_queries ORDER BY created_at DESC LIMIT ?1";

    const DELETE_QUERY: &'static str = "DELETE FROM saved_queries WHERE id = ?1";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, query: &SavedQuery) -> Result<()> {
        self.conn.execute(
            Self::INSERT_QUERY,
            params![
                query.id,
                query.contract_address,
                query.query_type,
                query.from_block,
                query.to_block,
                query.result_json,
                query.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<SavedQuery>> {
        let query = self
            .conn
            .query_row(Self::GET_QUERY, params![id], row_to_query)
            .optional()?;
        Ok(query)
    }

    pub fn list_for_contract(&self, contract_address: &str, limit: usize) -> Result<Vec<SavedQuery>> {
        let mut stmt = self.conn.prepare(Self::LIST_FOR_CONTRACT)?;
        let rows = stmt.query_map(params![contract_address, limit as i64], row_to_query)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_recent(&self, limit: usize) -> Result<Vec<SavedQuery>> {
        let mut stmt = self.conn.prepare(Self::LIST_RECENT)?;
        let rows = stmt.query_map(params![limit as i64], row_to_query)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let affected = self.conn.execute(Self::DELETE_QUERY, params![id])?;
        Ok(affected > 0)
    }
}

fn row_to_query(row: &Row) -> rusqlite::Result<SavedQuery> {
    Ok(SavedQuery {
        id: row.get(0)?,
        contract_address: row.get(1)?,
        query_type: row.get(2)?,
        from_block: row.get(3)?,
        to_block: row.get(4)?,
        result_json: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Database;

    fn sample(id: &str, contract: &str, created_at: i64) -> SavedQuery {
        SavedQuery {
            id: id.to_string(),
            contract_address: contract.to_string(),
            query_type: "analyze".to_string(),
            from_block: Some(100),
            to_block: Some(200),
            result_json: "{\"transaction_count\":3}".to_string(),
            created_at,
        }
    }

    #[test]
    fn insert_get_roundtrip() {
        let db = Database::new(":memory:").unwrap();
        let repo = QueryRepository::new(&db.conn);

        repo.insert(&sample("q-1", "0xabc", 1_000)).unwrap();

        let stored = repo.get("q-1").unwrap().unwrap();
        assert_eq!(stored.contract_address, "0xabc");
        assert_eq!(stored.from_block, Some(100));
        assert_eq!(stored.result_json, "{\"transaction_count\":3}");

        assert!(repo.get("missing").unwrap().is_none());
    }

    #[test]
    fn lists_newest_first_per_contract() {
        let db = Database::new(":memory:").unwrap();
        let repo = QueryRepository::new(&db.conn);

        repo.insert(&sample("q-1", "0xabc", 1_000)).unwrap();
        repo.insert(&sample("q-2", "0xabc", 2_000)).unwrap();
        repo.insert(&sample("q-3", "0xdef", 3_000)).unwrap();

        let queries = repo.list_for_contract("0xabc", 10).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].id, "q-2");

        let recent = repo.list_recent(2).unwrap();
        assert_eq!(recent[0].id, "q-3");
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let db = Database::new(":memory:").unwrap();
        let repo = QueryRepository::new(&db.conn);

        repo.insert(&sample("q-1", "0xabc", 1_000)).unwrap();
        assert!(repo.delete("q-1").unwrap());
        assert!(!repo.delete("q-1").unwrap());
    }
}
