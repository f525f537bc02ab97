mod cli;

use clap::Parser;

#[tokio::main]
async fn main() {
    powerlens_core::logging::init_logging_stderr();

    let args = cli::Cli::parse();
    if let Err(e) = cli::run(args).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
