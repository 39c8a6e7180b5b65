//! Lists candidate accounts in a tdata directory
//!
//! Pure filesystem inspection - nothing is decrypted and no password
//! is needed.

use std::path::Path;

fn main() -> Result<(), tdata_session::Error> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        println!("Usage: tdata-discover <path to tdata directory>");
        return Ok(());
    }

    let catalog = tdata_session::discover(Path::new(&args[1]))?;
    println!("estimated accounts: {}", catalog.account_count);
    for folder in &catalog.folders {
        println!("folder    {}", folder);
    }
    for file in &catalog.data_files {
        println!("data file {}", file);
    }
    for meta in &catalog.metadata {
        println!(
            "metadata  {} (user id {})",
            meta.phone_number,
            meta.user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        );
    }
    Ok(())
}
