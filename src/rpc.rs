use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{Block, EventFilter, EventsPage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only view of the chain. Everything above the transport talks to
/// this trait, so tests can substitute a canned chain for live endpoints.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current chain tip height.
    async fn block_number(&self) -> Result<u64>;

    /// Full block, including its transactions and timestamp.
    async fn block_with_txs(&self, block_number: u64) -> Result<Block>;

    /// One page of a contract's events. Pass the previous page's
    /// continuation token to fetch the next one.
    async fn events_page(
        &self,
        filter: &EventFilter,
        continuation_token: Option<&str>,
    ) -> Result<EventsPage>;

    /// Contract class at the `latest` alias. Only used as an existence probe.
    async fn class_at(&self, contract_address: &str) -> Result<Value>;
}

/// Ordered upstream endpoints plus the index of the currently preferred
/// one. The index is shared across clones, so rotation triggered by one
/// request is visible to every other request on the same pool.
#[derive(Clone)]
pub struct EndpointPool {
    urls: Vec<String>,
    current: Arc<AtomicUsize>,
}

impl EndpointPool {
    pub fn new(urls: &[String]) -> Result<Self> {
        if urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }
        Ok(EndpointPool {
            urls: urls.to_vec(),
            current: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn current_url(&self) -> &str {
        let index = self.current.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn advance(&self) {
        let next = (self.current.load(Ordering::Relaxed) + 1) % self.urls.len();
        self.current.store(next, Ordering::Relaxed);

        if self.urls.len() > 1 {
            debug!("Rotating to RPC endpoint #{}", next);
        }
    }
}

/// JSON-RPC 2.0 client over a rotating endpoint pool.
///
/// One logical call makes at most `pool.len()` sequential attempts: any
/// transport error, non-2xx status, malformed body, JSON-RPC error, or
/// missing result advances the pool and retries on the next endpoint
/// immediately. There is no backoff; the pool size bounds the worst case.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    pool: EndpointPool,
    request_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String]) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(RpcClient {
            http,
            pool: EndpointPool::new(rpc_urls)?,
            request_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        for _ in 0..self.pool.len() {
            let url = self.pool.current_url().to_string();

            match self.http.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<Value>().await {
                        Ok(payload) => match extract_result(&payload) {
                            Ok(result) => return Ok(result),
                            Err(e) => self.handle_error(&url, &e.to_string()),
                        },
                        Err(e) => self.handle_error(&url, &e.to_string()),
                    }
                }
                Ok(response) => self.handle_error(&url, &format!("HTTP {}", response.status())),
                Err(e) => self.handle_error(&url, &e.to_string()),
            }
        }

        Err(anyhow::anyhow!(
            "All {} RPC endpoints exhausted for {}",
            self.pool.len(),
            method
        ))
    }

    fn handle_error(&self, url: &str, error: &str) {
        warn!("RPC error on {}: {}, rotating endpoint", url, error);
        self.pool.advance();
    }
}

/// Pulls the `result` member out of a JSON-RPC response envelope.
fn extract_result(payload: &Value) -> Result<Value> {
    if let Some(error) = payload.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown RPC error");
        return Err(anyhow::anyhow!("RPC error: {}", message));
    }

    match payload.get("result") {
        Some(result) if !result.is_null() => Ok(result.clone()),
        _ => Err(anyhow::anyhow!("Response missing result field")),
    }
}

/// Block heights arrive as hex strings from some endpoints and as plain
/// numbers from others.
fn parse_block_number(value: &Value) -> Result<u64> {
    if let Some(raw) = value.as_str() {
        return u64::from_str_radix(raw.trim_start_matches("0x"), 16)
            .with_context(|| format!("Invalid block number: {}", raw));
    }
    value
        .as_u64()
        .context("Invalid block number format in response")
}

#[async_trait]
impl ChainReader for RpcClient {
    async fn block_number(&self) -> Result<u64> {
        let result = self.call("starknet_blockNumber", json!([])).await?;
        parse_block_number(&result)
    }

    async fn block_with_txs(&self, block_number: u64) -> Result<Block> {
        let result = self
            .call(
                "starknet_getBlockWithTxs",
                json!([{ "block_number": block_number }]),
            )
            .await?;
        serde_json::from_value(result)
            .with_context(|| format!("Malformed block {} in response", block_number))
    }

    async fn events_page(
        &self,
        filter: &EventFilter,
        continuation_token: Option<&str>,
    ) -> Result<EventsPage> {
        let mut inner = json!({
            "from_block": { "block_number": filter.from_block },
            "to_block": { "block_number": filter.to_block },
            "address": filter.address,
            "chunk_size": filter.chunk_size,
        });
        if let Some(token) = continuation_token {
            inner["continuation_token"] = json!(token);
        }

        let result = self
            .call("starknet_getEvents", json!({ "filter": inner }))
            .await?;
        serde_json::from_value(result).context("Malformed events page in response")
    }

    async fn class_at(&self, contract_address: &str) -> Result<Value> {
        self.call("starknet_getClassAt", json!([contract_address, "latest"]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> EndpointPool {
        let urls: Vec<String> = (0..n).map(|i| format!("http://rpc-{}.test", i)).collect();
        EndpointPool::new(&urls).unwrap()
    }

    #[test]
    fn pool_rejects_empty_url_list() {
        assert!(EndpointPool::new(&[]).is_err());
    }

    #[test]
    fn pool_rotates_round_robin_and_wraps() {
        let pool = pool(3);
        assert_eq!(pool.current_url(), "http://rpc-0.test");
        pool.advance();
        assert_eq!(pool.current_url(), "http://rpc-1.test");
        pool.advance();
        pool.advance();
        assert_eq!(pool.current_url(), "http://rpc-0.test");
    }

    #[test]
    fn pool_state_is_shared_across_clones() {
        let pool = pool(2);
        let clone = pool.clone();
        clone.advance();
        assert_eq!(pool.current_url(), "http://rpc-1.test");
    }

    #[test]
    fn extracts_result_member() {
        let payload = json!({ "jsonrpc": "2.0", "id": 1, "result": "0x42" });
        assert_eq!(extract_result(&payload).unwrap(), json!("0x42"));
    }

    #[test]
    fn rejects_error_and_missing_result() {
        let error = json!({ "error": { "code": 20, "message": "Contract not found" } });
        let err = extract_result(&error).unwrap_err();
        assert!(err.to_string().contains("Contract not found"));

        assert!(extract_result(&json!({ "id": 1 })).is_err());
        assert!(extract_result(&json!({ "result": null })).is_err());
    }

    #[test]
    fn parses_block_number_in_both_shapes() {
        assert_eq!(parse_block_number(&json!("0x7a120")).unwrap(), 500_000);
        assert_eq!(parse_block_number(&json!(500_000)).unwrap(), 500_000);
        assert!(parse_block_number(&json!("0xzz")).is_err());
        assert!(parse_block_number(&json!({})).is_err());
    }
}
