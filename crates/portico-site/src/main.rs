//! Portico Site - Entry point

use std::path::PathBuf;

use portico::server::Server;
use portico::telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
    /// Listen address overriding the configured one.
    addr: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;
        let mut addr = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--addr" | "-a" => {
                    addr = args.next();
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("portico-site {}", portico_site::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config, addr }
    }
}

fn print_help() {
    println!(
        r"Portico Site - demonstration members site

USAGE:
    portico-site [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -a, --addr <ADDR>      Listen address, e.g. 127.0.0.1:8080
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    PORTICO__SERVER__HTTP_ADDR    Listen address
    PORTICO__APP__DEBUG           Detailed error pages (true/false)
    PORTICO__LOGGING__LEVEL       Log level or filter directive
    RUST_LOG                      Overrides the log filter

DEMO ACCOUNTS:
    admin@example.com / admin-password   (role admin)
    user@example.com  / user-password    (role member)
"
    );
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match portico_site::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig::from_config(&config)) {
        eprintln!("Failed to initialize telemetry: {e}");
        std::process::exit(1);
    }

    info!(
        version = portico_site::VERSION,
        env = %config.app.env,
        routes = config.routes.len(),
        "starting portico site"
    );

    let app = match portico_site::application(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to build application");
            std::process::exit(1);
        }
    };

    let mut server = Server::new(app);
    if let Some(addr) = args.addr {
        server = server.http_addr(addr);
    }

    if let Err(e) = server.run().await {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
