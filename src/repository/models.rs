/// A persisted query result, keyed by an opaque id. The payload is JSON
/// text the store never interprets.
#[derive(Debug, Clone)]
pub struct SavedQuery {
    pub id: String,
    pub contract_address: String,
    pub query_type: String,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub result_json: String,
    pub created_at: i64,
}
