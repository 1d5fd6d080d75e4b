use clap::Parser;
use mix_station::{Cli, Command, commands, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. dotenv, config, logging
    let config = setup_environment();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!(
                scale_mode = %config.scale_mode,
                printer_port = config.printer_port,
                "Mix station starting"
            );
            if let Err(e) = commands::run(config).await {
                tracing::error!("Station error: {:#}", e);
                return Err(e);
            }
        }
        Command::Ports => {
            let ports = commands::ports(&config);
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                println!("{port}");
            }
        }
        Command::Parse { file } => {
            let recipe = commands::parse(&file).await?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        Command::Replay { file, addr } => {
            let sent = commands::replay(&file, &addr).await?;
            println!("Sent {sent} bytes to {addr}");
        }
    }

    Ok(())
}
