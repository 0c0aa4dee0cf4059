use anyhow::Result;
use starknet_activity::repository::Database;

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    dotenv::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./activity.db".to_string());

    println!("Running migrations on database: {database_url}");

    let _db = Database::new(&database_url)?;

    println!("Migrations completed successfully!");

    Ok(())
}
