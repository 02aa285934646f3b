use anyhow::Result;
use clap::Parser;
use washbay_cli::{Cli, Command, commands, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    logging::init(&config.logging, cli.log_level.as_deref())?;

    match cli.subcommand() {
        Command::Run => commands::run(config).await,
        Command::Ports => commands::ports(&config),
        Command::ScanRfid => commands::scan_rfid(&config).await,
        Command::ScanQr => commands::scan_qr(&config).await,
        Command::Config => commands::print_config(&config),
    }
}
