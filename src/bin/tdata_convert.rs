//! Recovers a session from a tdata directory and writes it out
//!
//! Primarily for scripted conversions. It takes the passcode on the
//! CLI, which is insecure

use std::path::Path;
use tdata_session::{session, ConvertOptions};

fn main() -> Result<(), tdata_session::Error> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        println!("Usage: tdata-convert <path to tdata> [password] [account index] [output dir]");
        return Ok(());
    }

    let options = ConvertOptions {
        password: args.get(2).cloned().unwrap_or_default(),
        account_index: args.get(3).and_then(|arg| arg.parse().ok()).unwrap_or(0),
        ..Default::default()
    };
    let out_dir = args.get(4).map(String::as_str).unwrap_or("./sessions");

    let conversion = tdata_session::convert(Path::new(&args[1]), &options)?;
    let metadata = session::SessionMetadata::new(
        &conversion.session,
        conversion.user_id,
        conversion.metadata.as_ref(),
    );
    let written = session::export(Path::new(out_dir), &conversion.session, &metadata)?;

    println!(
        "recovered user {} on DC {} -> {}",
        conversion.user_id,
        conversion.session.dc_id,
        written.display()
    );
    Ok(())
}
