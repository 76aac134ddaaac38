use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgGroup, Parser};
use reqwest::Url;

use text_generator::controller::DEFAULT_API_URL;
use text_generator::frontend::form::{self, DEFAULT_FORM_ADDRESS};
use text_generator::frontend::repl;
use text_generator::TextController;

#[derive(Parser)]
#[command(author, version, about = "Text Generator Application", long_about = None)]
#[command(group(ArgGroup::new("interface").required(true).args(["text", "graphical"])))]
struct Args {
    /// Use the interactive text interface
    #[arg(short)]
    text: bool,

    /// Use the browser form interface
    #[arg(short)]
    graphical: bool,

    /// URL of the /v1/prompt endpoint
    #[arg(short, long, env = "TEXT_GENERATOR_URL", default_value = DEFAULT_API_URL)]
    url: Url,

    /// Value sent in the MS-API-Key header
    #[arg(short = 'k', long, env = "TEXT_GENERATOR_API_KEY")]
    api_key: Option<String>,

    /// Request timeout in seconds, waits indefinitely when unset
    #[arg(long)]
    timeout: Option<u64>,

    /// Address the browser form listens on
    #[arg(long, default_value = DEFAULT_FORM_ADDRESS)]
    form_address: SocketAddr,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let controller = Arc::new(TextController::new(
        args.url,
        args.api_key,
        args.timeout.map(Duration::from_secs),
    )?);

    if args.text {
        let stdin = io::stdin();
        repl::run(controller.as_ref(), stdin.lock(), &mut io::stdout())?;
    } else {
        // the blocking client must outlive the runtime, so `controller` is dropped last
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(form::serve(args.form_address, controller.clone()))?;
    }
    Ok(())
}
