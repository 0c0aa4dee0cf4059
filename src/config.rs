use anyhow::Result;

/// Public mainnet endpoints used when no explicit list is configured.
pub const DEFAULT_RPC_URLS: &[&str] = &[
    "https://rpc.starknet.lava.build",
    "https://starknet-mainnet.g.alchemy.com/v2/demo",
    "https://starknet-mainnet.public.blastapi.io",
    "https://free-rpc.nethermind.io/mainnet-juno",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_urls: Vec<String>,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let rpc_urls: Vec<String> = match std::env::var("STARKNET_RPC_URLS") {
            Ok(raw) => raw
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect(),
            Err(_) => DEFAULT_RPC_URLS.iter().map(|url| url.to_string()).collect(),
        };

        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("STARKNET_RPC_URLS is set but empty"));
        }

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./activity.db".to_string());

        Ok(Config {
            rpc_urls,
            database_url,
        })
    }
}
