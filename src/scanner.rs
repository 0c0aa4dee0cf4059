use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::resolver::resolve_block_range;
use crate::rpc::ChainReader;
use crate::types::{
    ActivityStatus, ContractAnalysis, TransactionRecord, is_valid_contract_address,
    parse_hex_u128,
};

/// Hard cap on blocks visited per scan, whatever range the caller asks for.
pub const MAX_SCAN_BLOCKS: u64 = 20_000;

/// Window used when no date bounds are supplied.
pub const DEFAULT_SCAN_WINDOW: u64 = 1_000;

const SAMPLE_LIMIT: usize = 10;
const FEE_UNIT: f64 = 1e18;

/// Walks a bounded block range newest-to-oldest and aggregates the
/// transactions touching one contract.
pub struct ContractScanner<C: ChainReader> {
    chain: C,
}

impl<C: ChainReader> ContractScanner<C> {
    pub fn new(chain: C) -> Self {
        ContractScanner { chain }
    }

    pub async fn analyze(
        &self,
        contract_address: &str,
        from_timestamp: Option<u64>,
        to_timestamp: Option<u64>,
    ) -> Result<ContractAnalysis> {
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
            DEFAULT_SCAN_WINDOW,
        )
        .await?;

        let search_blocks = (to_block - from_block + 1).min(MAX_SCAN_BLOCKS);
        info!(
            "Analyzing {}: blocks {} to {} ({} searched)",
            contract_address, from_block, to_block, search_blocks
        );

        let mut collected: Vec<TransactionRecord> = Vec::new();
        let mut failed_blocks = 0u64;

        for i in 0..search_blocks {
            let block_number = to_block - i;
            if block_number < from_block {
                break;
            }

            let block = match self.chain.block_with_txs(block_number).await {
                Ok(block) => block,
                Err(e) => {
                    warn!("Failed to fetch block {}: {}", block_number, e);
                    failed_blocks += 1;
                    continue;
                }
            };

            for tx in &block.transactions {
                if !tx.touches(contract_address) {
                    continue;
                }
                collected.push(TransactionRecord {
                    block_number,
                    transaction_hash: tx.transaction_hash.clone(),
                    sender_address: tx.sender_address.clone().unwrap_or_default(),
                    contract_address: contract_address.to_string(),
                    max_fee: tx.max_fee.clone().unwrap_or_else(|| "0x0".to_string()),
                    tx_type: tx.tx_type.clone().unwrap_or_else(|| "INVOKE".to_string()),
                    timestamp: block.timestamp,
                });
            }
        }

        info!("Found {} transactions", collected.len());

        if collected.is_empty() {
            return Ok(self
                .no_activity_report(
                    contract_address,
                    current_block,
                    from_block,
                    to_block,
                    search_blocks,
                    failed_blocks,
                )
                .await);
        }

        // Aggregates cover the full collected set; only the sample list
        // handed back to the caller is truncated.
        let total_fees: u128 = collected
            .iter()
            .filter_map(|tx| parse_hex_u128(&tx.max_fee))
            .sum();
        let avg_fee = total_fees / collected.len() as u128;
        let unique_senders = collected
            .iter()
            .map(|tx| tx.sender_address.as_str())
            .collect::<HashSet<_>>()
            .len();

        let transaction_count = collected.len();
        collected.truncate(SAMPLE_LIMIT);

        Ok(ContractAnalysis {
            contract_address: contract_address.to_string(),
            status: ActivityStatus::Active,
            transaction_count,
            total_fees: format!("{:.4}", total_fees as f64 / FEE_UNIT),
            avg_fee: format!("{:.6}", avg_fee as f64 / FEE_UNIT),
            unique_senders,
            blocks_scanned: search_blocks,
            failed_blocks,
            current_block,
            from_block,
            to_block,
            contract_info: None,
            message: None,
            suggestion: None,
            transactions: collected,
        })
    }

    /// Zero matches is still a successful report. The class probe only
    /// enriches the message text; its failure is swallowed.
    async fn no_activity_report(
        &self,
        contract_address: &str,
        current_block: u64,
        from_block: u64,
        to_block: u64,
        search_blocks: u64,
        failed_blocks: u64,
    ) -> ContractAnalysis {
        let contract_info = match self.chain.class_at(contract_address).await {
            Ok(_) => "Valid Contract (Deployed)".to_string(),
            Err(e) => {
                warn!("Contract class probe failed: {}", e);
                "Contract Not Found or Invalid".to_string()
            }
        };

        ContractAnalysis {
            contract_address: contract_address.to_string(),
            status: ActivityStatus::NoRecentActivity,
            transaction_count: 0,
            total_fees: "0".to_string(),
            avg_fee: "0".to_string(),
            unique_senders: 0,
            blocks_scanned: search_blocks,
            failed_blocks,
            current_block,
            from_block,
            to_block,
            contract_info: Some(contract_info),
            message: Some(format!(
                "No transactions found in blocks {} to {}. This contract may be inactive or have older transactions.",
                from_block, to_block
            )),
            suggestion: Some(
                "Try a more active contract address or adjust the date range.".to_string(),
            ),
            transactions: vec![],
        }
    }
}
