use anyhow::Result;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::resolver::resolve_block_range;
use crate::rpc::ChainReader;
use crate::types::{
    DecodedEvent, EventFilter, EventQueryResult, is_valid_contract_address, parse_hex_u128,
};

/// Selector felts for the ERC-20 events this engine knows how to decode.
pub const TRANSFER_SELECTOR: &str =
    "0x99cd8bde557814842a3121e8ddfd433a539b8c9f14bf31ebf108d12e6196e9";
pub const APPROVAL_SELECTOR: &str =
    "0x1dcde06aabdbca2f80aa51392b345d7549d7757aa855f7e37f5d335ac8243b1";

/// Window used when no date bounds are supplied.
pub const DEFAULT_EVENT_WINDOW: u64 = 2_000;

/// Safety cap on the continuation-token chain.
pub const MAX_EVENT_PAGES: u32 = 100;

const CHUNK_SIZE: u32 = 1_000;

/// Retrieves a contract's events over a block range, following the
/// continuation-token chain until exhausted, and attaches decoding plus an
/// interpolated per-event timestamp.
pub struct EventFetcher<C: ChainReader> {
    chain: C,
}

impl<C: ChainReader> EventFetcher<C> {
    pub fn new(chain: C) -> Self {
        EventFetcher { chain }
    }

    pub async fn fetch(
        &self,
        contract_address: &str,
        from_timestamp: Option<u64>,
        to_timestamp: Option<u64>,
    ) -> Result<EventQueryResult> {
        if !is_valid_contract_address(contract_address) {
            return Err(anyhow::anyhow!(
                "Invalid contract address format: {}",
                contract_address
            ));
        }

        let current_block = self.chain.block_number().await?;
        let (from_block, to_block) = resolve_block_range(
            &self.chain,
            current_block,
            from_timestamp,
            to_timestamp,
            DEFAULT_EVENT_WINDOW,
        )
        .await?;

        info!(
            "Fetching events for {}: blocks {} to {}",
            contract_address, from_block, to_block
        );

        let filter = EventFilter {
            address: contract_address.to_string(),
            from_block,
            to_block,
            chunk_size: CHUNK_SIZE,
        };

        let mut raw_events = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut pages_fetched = 0u32;

        // Pages must be consumed in the order the token chain dictates.
        loop {
            let page = match self
                .chain
                .events_page(&filter, continuation_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) if pages_fetched > 0 => {
                    warn!(
                        "Event page {} failed, returning partial results: {}",
                        pages_fetched + 1,
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            };

            pages_fetched += 1;
            debug!("Page {}: {} events", pages_fetched, page.events.len());
            raw_events.extend(page.events);

            continuation_token = page.continuation_token;
            if continuation_token.is_none() {
                break;
            }
            if pages_fetched >= MAX_EVENT_PAGES {
                warn!(
                    "Reached page cap ({}) with a continuation token outstanding",
                    MAX_EVENT_PAGES
                );
                break;
            }
        }

        info!(
            "Fetched {} events across {} pages",
            raw_events.len(),
            pages_fetched
        );

        let anchors = self.fetch_anchors(from_block, to_block).await;

        let events: Vec<DecodedEvent> = raw_events
            .into_iter()
            .map(|event| {
                let (event_name, decoded_fields) = decode_event(&event.keys, &event.data);
                let estimated_timestamp = anchors
                    .as_ref()
                    .map(|a| a.estimate(event.block_number))
                    .unwrap_or(0);
                DecodedEvent {
                    block_number: event.block_number,
                    transaction_hash: event.transaction_hash,
                    keys: event.keys,
                    data: event.data,
                    event_name,
                    decoded_fields,
                    estimated_timestamp,
                    estimated_time: format_rfc3339(estimated_timestamp),
                }
            })
            .collect();

        Ok(EventQueryResult {
            contract_address: contract_address.to_string(),
            from_block,
            to_block,
            current_block,
            total_event_count: events.len(),
            pages_fetched,
            events,
        })
    }

    /// Both anchors are fetched once per request, not per event. When
    /// either is unavailable the events go out without estimates rather
    /// than failing the request.
    async fn fetch_anchors(&self, from_block: u64, to_block: u64) -> Option<TimestampAnchors> {
        let upper = self.chain.block_with_txs(to_block).await;
        let lower = self.chain.block_with_txs(from_block).await;

        match (upper, lower) {
            (Ok(upper), Ok(lower)) => Some(TimestampAnchors {
                from_block,
                to_block,
                from_timestamp: lower.timestamp,
                to_timestamp: upper.timestamp,
            }),
            (upper, lower) => {
                if let Err(e) = upper {
                    warn!("Upper anchor block {} unavailable: {}", to_block, e);
                }
                if let Err(e) = lower {
                    warn!("Lower anchor block {} unavailable: {}", from_block, e);
                }
                None
            }
        }
    }
}

/// Two block/timestamp anchors bounding a range. Event timestamps are
/// estimated by linear interpolation between them; real inter-block time
/// is irregular, so the estimate is consistent rather than exact.
#[derive(Debug, Clone, Copy)]
struct TimestampAnchors {
    from_block: u64,
    to_block: u64,
    from_timestamp: u64,
    to_timestamp: u64,
}

impl TimestampAnchors {
    fn estimate(&self, block_number: u64) -> u64 {
        let span = self.to_block.saturating_sub(self.from_block);
        if span == 0 {
            return self.to_timestamp;
        }

        let block_diff = self.to_block.saturating_sub(block_number);
        let time_span = self.to_timestamp.saturating_sub(self.from_timestamp);
        let offset = (block_diff as u128 * time_span as u128 / span as u128) as u64;
        self.to_timestamp.saturating_sub(offset)
    }
}

/// Identifies an event by its first key and decodes positional fields for
/// known selectors. Unrecognized selectors pass through undecoded; this
/// never fails.
pub fn decode_event(keys: &[String], data: &[String]) -> (String, Value) {
    let Some(selector) = keys.first() else {
        return ("Unknown Event".to_string(), json!({}));
    };

    match selector.as_str() {
        TRANSFER_SELECTOR if data.len() >= 3 => (
            "Transfer".to_string(),
            json!({
                "from": data[0],
                "to": data[1],
                "amount": felt_to_decimal(&data[2]),
            }),
        ),
        APPROVAL_SELECTOR if data.len() >= 3 => (
            "Approval".to_string(),
            json!({
                "owner": data[0],
                "spender": data[1],
                "amount": felt_to_decimal(&data[2]),
            }),
        ),
        _ => ("Unknown Event".to_string(), json!({})),
    }
}

/// Hex felt to decimal string, falling back to the raw word when it does
/// not fit in 128 bits.
fn felt_to_decimal(word: &str) -> String {
    parse_hex_u128(word)
        .map(|value| value.to_string())
        .unwrap_or_else(|| word.to_string())
}

fn format_rfc3339(timestamp: u64) -> String {
    if timestamp == 0 {
        return String::new();
    }
    chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
