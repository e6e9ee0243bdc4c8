use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memify::app::App;
use memify::models::Config;
use memify::server;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "memify")]
#[command(about = "Caption an image and generate AI-edited variations of it")]
struct CliArgs {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the web UI and JSON API (default).
    Serve {
        /// Address to listen on; overrides BIND_ADDR.
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Run the whole pipeline once for a local image and print the report.
    Run {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memify=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let app = match App::from_config(&config).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            server::serve(app, bind.unwrap_or(config.bind_addr)).await?;
        }
        Command::Run { image } => {
            let data = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let file_name = image
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());

            match app.run(&data, &file_name).await {
                Ok(report) => {
                    info!("Pipeline completed successfully");
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CliArgs, Command};
    use clap::Parser;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let args = CliArgs::try_parse_from(["memify"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_serve_bind_flag() {
        let args = CliArgs::try_parse_from(["memify", "serve", "--bind", "127.0.0.1:8080"]).unwrap();
        match args.command {
            Some(Command::Serve { bind: Some(addr) }) => assert_eq!(addr.port(), 8080),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_image_path() {
        assert!(CliArgs::try_parse_from(["memify", "run"]).is_err());

        let args = CliArgs::try_parse_from(["memify", "run", "photos/dog.png"]).unwrap();
        assert!(matches!(args.command, Some(Command::Run { image }) if image.ends_with("dog.png")));
    }

    #[test]
    fn test_invalid_bind_address() {
        let err = CliArgs::try_parse_from(["memify", "serve", "--bind", "nowhere"]).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
