use anyhow::Result;
use clap::{Parser, Subcommand};
use starknet_activity::config::Config;
use starknet_activity::events::EventFetcher;
use starknet_activity::query::commands::{
    cmd_analyze, cmd_events, cmd_saved_delete, cmd_saved_list, cmd_saved_show,
};
use starknet_activity::query::formatters::OutputFormat;
use starknet_activity::repository::{Database, QueryRepository};
use starknet_activity::rpc::RpcClient;
use starknet_activity::scanner::ContractScanner;

#[derive(Parser)]
#[command(name = "analyze")]
#[command(about = "Inspect contract activity on Starknet", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a block range for transactions touching a contract
    Analyze {
        address: String,

        #[arg(long)]
        from_date: Option<String>,

        #[arg(long)]
        to_date: Option<String>,

        #[arg(long, default_value = "false")]
        save: bool,
    },
    /// Fetch and decode a contract's events
    Events {
        address: String,

        #[arg(long)]
        from_date: Option<String>,

        #[arg(long)]
        to_date: Option<String>,

        #[arg(long, default_value = "50")]
        limit: usize,

        #[arg(long, default_value = "false")]
        save: bool,
    },
    /// Work with locally saved query results
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    List {
        #[arg(long)]
        contract: Option<String>,

        #[arg(long, default_value = "20")]
        limit: usize,
    },
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url)?;
    let repo = QueryRepository::new(&db.conn);

    match cli.command {
        Commands::Analyze {
            address,
            from_date,
            to_date,
            save,
        } => {
            let client = RpcClient::new(&config.rpc_urls)?;
            let scanner = ContractScanner::new(client);
            cmd_analyze(
                &scanner,
                save.then_some(&repo),
                &address,
                from_date.as_deref(),
                to_date.as_deref(),
                &format,
            )
            .await?;
        }
        Commands::Events {
            address,
            from_date,
            to_date,
            limit,
            save,
        } => {
            let client = RpcClient::new(&config.rpc_urls)?;
            let fetcher = EventFetcher::new(client);
            cmd_events(
                &fetcher,
                save.then_some(&repo),
                &address,
                from_date.as_deref(),
                to_date.as_deref(),
                limit,
                &format,
            )
            .await?;
        }
        Commands::Saved { command } => match command {
            SavedCommands::List { contract, limit } => {
                cmd_saved_list(&repo, contract.as_deref(), limit, &format)?;
            }
            SavedCommands::Show { id } => {
                cmd_saved_show(&repo, &id)?;
            }
            SavedCommands::Delete { id } => {
                cmd_saved_delete(&repo, &id)?;
            }
        },
    }

    Ok(())
}
