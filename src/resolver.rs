use anyhow::Result;
use tracing::{debug, info};

use crate::rpc::ChainReader;

/// Maps a unix timestamp to the number of the nearest block by binary
/// search, assuming block timestamps are non-decreasing in block number.
///
/// An exact timestamp hit returns that block. Otherwise the search
/// converges on the first block whose timestamp is at or after the target.
/// If a probed block is unavailable mid-search, the search stops and
/// returns its current lower bound instead of failing; callers clamp the
/// resulting range before scanning.
pub async fn find_block_by_timestamp(
    chain: &impl ChainReader,
    target_timestamp: u64,
) -> Result<u64> {
    let latest = chain.block_number().await?;
    info!(
        "Resolving timestamp {} against chain tip {}",
        target_timestamp, latest
    );

    let mut low = 0u64;
    let mut high = latest;

    while low <= high {
        let mid = (low + high) / 2;

        let block = match chain.block_with_txs(mid).await {
            Ok(block) => block,
            Err(e) => {
                debug!("Block {} unavailable during search: {}", mid, e);
                break;
            }
        };

        if block.timestamp < target_timestamp {
            low = mid + 1;
        } else if block.timestamp > target_timestamp {
            match mid.checked_sub(1) {
                Some(prev) => high = prev,
                None => break,
            }
        } else {
            return Ok(mid);
        }
    }

    Ok(low)
}

/// Turns optional timestamp bounds into a block range against the given
/// tip. Missing bounds fall back to `[tip - default_window, tip]`; both
/// bounds are clamped to the tip and an inverted pair is swapped, so the
/// returned range always satisfies `from <= to <= tip`.
pub async fn resolve_block_range(
    chain: &impl ChainReader,
    current_block: u64,
    from_timestamp: Option<u64>,
    to_timestamp: Option<u64>,
    default_window: u64,
) -> Result<(u64, u64)> {
    let from_block = match from_timestamp {
        Some(ts) => find_block_by_timestamp(chain, ts).await?,
        None => current_block.saturating_sub(default_window),
    };

    let to_block = match to_timestamp {
        Some(ts) => find_block_by_timestamp(chain, ts).await?,
        None => current_block,
    };

    let from_block = from_block.min(current_block);
    let to_block = to_block.min(current_block);

    if from_block > to_block {
        Ok((to_block, from_block))
    } else {
        Ok((from_block, to_block))
    }
}
