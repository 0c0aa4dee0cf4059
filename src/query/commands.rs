use crate::events::EventFetcher;
use crate::query::formatters::{
    OutputFormat, format_analysis, format_events, format_saved_queries,
};
use crate::repository::{QueryRepository, SavedQuery};
use crate::rpc::ChainReader;
use crate::scanner::ContractScanner;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(input: &str) -> Result<u64> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("Invalid calendar date")?
            .and_utc()
            .timestamp();
        return u64::try_from(midnight).context("Date is before 1970");
    }

    let parsed = DateTime::parse_from_rfc3339(input)
        .with_context(|| format!("Invalid date: {} (expected YYYY-MM-DD or RFC 3339)", input))?;
    u64::try_from(parsed.timestamp()).context("Date is before 1970")
}

pub async fn cmd_analyze<C: ChainReader>(
    scanner: &ContractScanner<C>,
    repo: Option<&QueryRepository<'_>>,
    address: &str,
    from_date: Option<&str>,
    to_date: Option<&str>,
    format: &OutputFormat,
) -> Result<()> {
    let from_ts = from_date.map(parse_date).transpose()?;
    let to_ts = to_date.map(parse_date).transpose()?;

    let analysis = scanner.analyze(address, from_ts, to_ts).await?;
    println!("{}", format_analysis(&analysis, format));

    if let Some(repo) = repo {
        let id = save_result(
            repo,
            address,
            "analyze",
            Some(analysis.from_block),
            Some(analysis.to_block),
            serde_json::to_value(&analysis)?,
        )?;
        println!("Saved as {}", id);
    }

    Ok(())
}

pub async fn cmd_events<C: ChainReader>(
    fetcher: &EventFetcher<C>,
    repo: Option<&QueryRepository<'_>>,
    address: &str,
    from_date: Option<&str>,
    to_date: Option<&str>,
    limit: usize,
    format: &OutputFormat,
) -> Result<()> {
    let from_ts = from_date.map(parse_date).transpose()?;
    let to_ts = to_date.map(parse_date).transpose()?;

    let mut result = fetcher.fetch(address, from_ts, to_ts).await?;

    if let Some(repo) = repo {
        let id = save_result(
            repo,
            address,
            "events",
            Some(result.from_block),
            Some(result.to_block),
            serde_json::to_value(&result)?,
        )?;
        println!("Saved as {}", id);
    }

    // Display truncation only; total_event_count keeps the full count.
    if result.events.len() > limit {
        result.events.truncate(limit);
    }
    println!("{}", format_events(&result, format));

    Ok(())
}

pub fn cmd_saved_list(
    repo: &QueryRepository<'_>,
    contract: Option<&str>,
    limit: usize,
    format: &OutputFormat,
) -> Result<()> {
    let queries = match contract {
        Some(address) => repo.list_for_contract(address, limit)?,
        None => repo.list_recent(limit)?,
    };
    println!("{}", format_saved_queries(&queries, format));
    Ok(())
}

pub fn cmd_saved_show(repo: &QueryRepository<'_>, id: &str) -> Result<()> {
    let query = repo
        .get(id)?
        .ok_or_else(|| anyhow::anyhow!("No saved query with id {}", id))?;

    let payload: Value = serde_json::from_str(&query.result_json)
        .with_context(|| format!("Stored payload for {} is not valid JSON", id))?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

pub fn cmd_saved_delete(repo: &QueryRepository<'_>, id: &str) -> Result<()> {
    if repo.delete(id)? {
        println!("Deleted {}", id);
    } else {
        println!("No saved query with id {}", id);
    }
    Ok(())
}

fn save_result(
    repo: &QueryRepository<'_>,
    contract_address: &str,
    query_type: &str,
    from_block: Option<u64>,
    to_block: Option<u64>,
    payload: Value,
) -> Result<String> {
    let created_at = Utc::now().timestamp();
    // Addresses were validated by the operation that produced the payload.
    let id = format!("q-{}-{}", created_at, &contract_address[2..10]);

    repo.insert(&SavedQuery {
        id: id.clone(),
        contract_address: contract_address.to_string(),
        query_type: query_type.to_string(),
        from_block,
        to_block,
        result_json: payload.to_string(),
        created_at,
    })?;

    Ok(id)
}
