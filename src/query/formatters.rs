use crate::repository::SavedQuery;
use crate::types::{ContractAnalysis, EventQueryResult};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_analysis(analysis: &ContractAnalysis, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_analysis_table(analysis),
        OutputFormat::Json => {
            serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Csv => format_analysis_csv(analysis),
    }
}

fn format_analysis_table(analysis: &ContractAnalysis) -> String {
    let mut summary = Table::new();
    summary
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Metric", "Value"]);

    let status = serde_json::to_value(analysis.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    summary.add_row(vec![Cell::new("Status"), Cell::new(status)]);
    summary.add_row(vec![
        Cell::new("Transactions"),
        Cell::new(analysis.transaction_count),
    ]);
    summary.add_row(vec![
        Cell::new("Total Fees"),
        Cell::new(&analysis.total_fees),
    ]);
    summary.add_row(vec![Cell::new("Avg Fee"), Cell::new(&analysis.avg_fee)]);
    summary.add_row(vec![
        Cell::new("Unique Senders"),
        Cell::new(analysis.unique_senders),
    ]);
    summary.add_row(vec![
        Cell::new("Blocks Scanned"),
        Cell::new(analysis.blocks_scanned),
    ]);
    summary.add_row(vec![
        Cell::new("Failed Blocks"),
        Cell::new(analysis.failed_blocks),
    ]);
    summary.add_row(vec![
        Cell::new("Block Range"),
        Cell::new(format!("{} - {}", analysis.from_block, analysis.to_block)),
    ]);
    summary.add_row(vec![
        Cell::new("Current Block"),
        Cell::new(analysis.current_block),
    ]);

    let mut output = summary.to_string();

    if let Some(message) = &analysis.message {
        output.push('\n');
        output.push_str(message);
        if let Some(info) = &analysis.contract_info {
            output.push_str(&format!(" ({})", info));
        }
        if let Some(suggestion) = &analysis.suggestion {
            output.push('\n');
            output.push_str(suggestion);
        }
    }

    if !analysis.transactions.is_empty() {
        let mut txs = Table::new();
        txs.load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Block", "Type", "Sender", "Max Fee", "Tx Hash"]);

        for tx in &analysis.transactions {
            txs.add_row(vec![
                Cell::new(tx.block_number),
                Cell::new(&tx.tx_type),
                Cell::new(shorten_word(&tx.sender_address)),
                Cell::new(&tx.max_fee),
                Cell::new(shorten_word(&tx.transaction_hash)),
            ]);
        }

        output.push('\n');
        output.push_str(&txs.to_string());
    }

    output
}

fn format_analysis_csv(analysis: &ContractAnalysis) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "block_number",
        "transaction_hash",
        "sender_address",
        "max_fee",
        "type",
        "timestamp",
    ]);

    for tx in &analysis.transactions {
        let _ = wtr.write_record([
            &tx.block_number.to_string(),
            &tx.transaction_hash,
            &tx.sender_address,
            &tx.max_fee,
            &tx.tx_type,
            &tx.timestamp.to_string(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_events(result: &EventQueryResult, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_events_table(result),
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Csv => format_events_csv(result),
    }
}

fn format_events_table(result: &EventQueryResult) -> String {
    if result.events.is_empty() {
        return format!(
            "No events found in blocks {} to {}.",
            result.from_block, result.to_block
        );
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Block", "Event", "Fields", "Est. Time", "Tx Hash"]);

    for event in &result.events {
        table.add_row(vec![
            Cell::new(event.block_number),
            Cell::new(&event.event_name),
            Cell::new(event.decoded_fields.to_string()),
            Cell::new(&event.estimated_time),
            Cell::new(shorten_word(&event.transaction_hash)),
        ]);
    }

    format!(
        "{} events in blocks {} to {} ({} pages)\n{}",
        result.total_event_count,
        result.from_block,
        result.to_block,
        result.pages_fetched,
        table
    )
}

fn format_events_csv(result: &EventQueryResult) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "block_number",
        "event_name",
        "decoded_fields",
        "estimated_timestamp",
        "transaction_hash",
    ]);

    for event in &result.events {
        let _ = wtr.write_record([
            &event.block_number.to_string(),
            &event.event_name,
            &event.decoded_fields.to_string(),
            &event.estimated_timestamp.to_string(),
            &event.transaction_hash,
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn format_saved_queries(queries: &[SavedQuery], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_saved_queries_table(queries),
        OutputFormat::Json => {
            let json_queries: Vec<_> = queries
                .iter()
                .map(|q| {
                    json!({
                        "id": q.id,
                        "contract_address": q.contract_address,
                        "query_type": q.query_type,
                        "from_block": q.from_block,
                        "to_block": q.to_block,
                        "created_at": q.created_at,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json_queries).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => format_saved_queries_csv(queries),
    }
}

fn format_saved_queries_table(queries: &[SavedQuery]) -> String {
    if queries.is_empty() {
        return "No saved queries.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Id", "Contract", "Type", "Blocks", "Created"]);

    for query in queries {
        let range = match (query.from_block, query.to_block) {
            (Some(from), Some(to)) => format!("{} - {}", from, to),
            _ => "N/A".to_string(),
        };
        table.add_row(vec![
            Cell::new(&query.id),
            Cell::new(shorten_word(&query.contract_address)),
            Cell::new(&query.query_type),
            Cell::new(range),
            Cell::new(
                chrono::DateTime::from_timestamp(query.created_at, 0)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default(),
            ),
        ]);
    }

    table.to_string()
}

fn format_saved_queries_csv(queries: &[SavedQuery]) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "id",
        "contract_address",
        "query_type",
        "from_block",
        "to_block",
        "created_at",
    ]);

    for query in queries {
        let _ = wtr.write_record([
            &query.id,
            &query.contract_address,
            &query.query_type,
            &query.from_block.map_or("N/A".to_string(), |b| b.to_string()),
            &query.to_block.map_or("N/A".to_string(), |b| b.to_string()),
            &query.created_at.to_string(),
        ]);
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

fn shorten_word(word: &str) -> String {
    if word.len() <= 12 {
        return word.to_string();
    }
    format!("{}...{}", &word[..6], &word[word.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_long_words_only() {
        assert_eq!(shorten_word("0x1"), "0x1");
        let full = format!("0x{}", "a".repeat(64));
        let short = shorten_word(&full);
        assert!(short.starts_with("0x"));
        assert!(short.contains("..."));
        assert_eq!(short.len(), 13);
    }
}
