use std::process::ExitCode;

use clap::Parser;
use reqwest::Url;

use text_generator::health::{check, DEFAULT_HEARTBEAT_URL};

#[derive(Parser)]
#[command(author, version, about = "Check the text generator heartbeat", long_about = None)]
struct Args {
    /// Heartbeat URL of the service
    #[arg(default_value = DEFAULT_HEARTBEAT_URL)]
    url: Url,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match check(args.url) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Health check failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
