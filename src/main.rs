use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use payrecon::application::verifier::SignatureVerifier;
use payrecon::config::PayreconConfig;
use payrecon::domain::intent::BuyerId;
use payrecon::domain::session::{GatewayPaymentId, SessionId};
use payrecon::infrastructure::storage::open_stores;
use payrecon::interfaces::csv::order_writer::OrderWriter;
use payrecon::server::Server;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service and the stale-session sweeper
    Serve {
        /// Configuration file (TOML)
        #[arg(short, long, env = "PAYRECON_CONFIG")]
        config: Option<String>,

        /// Listen address, overrides `server.listen_addr`
        #[arg(short, long)]
        listen: Option<String>,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Emit logs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a buyer's orders as CSV to stdout, newest first
    Export {
        #[arg(long)]
        buyer_id: String,

        /// Path to persistent database (optional). If provided, uses RocksDB.
        #[arg(long)]
        db_path: Option<PathBuf>,
    },

    /// Print the signature the configured secret gives a session/payment pair
    Sign {
        #[arg(long)]
        session_id: String,

        #[arg(long)]
        payment_id: String,

        /// Configuration file (TOML)
        #[arg(short, long, env = "PAYRECON_CONFIG")]
        config: Option<String>,
    },
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.to_string().into());

    // stdout is reserved for command output (CSV exports, signatures).
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            listen,
            db_path,
            json,
        } => {
            let mut config = PayreconConfig::load(config.as_deref()).into_diagnostic()?;
            init_tracing(&config.logging.level, json || config.logging.json);

            if let Some(listen) = listen {
                config.server.listen_addr = listen
                    .parse()
                    .map_err(|e| miette!("Invalid listen address: {}", e))?;
            }
            if db_path.is_some() {
                config.storage.db_path = db_path;
            }

            let server = Server::new(config).into_diagnostic()?;
            server.run().await.into_diagnostic()?;
        }
        Command::Export { buyer_id, db_path } => {
            let config = PayreconConfig::load(None).into_diagnostic()?;
            init_tracing(&config.logging.level, config.logging.json);

            let buyer_id = BuyerId::new(buyer_id).into_diagnostic()?;
            let stores = open_stores(db_path.or(config.storage.db_path).as_deref())
                .into_diagnostic()?;
            let orders = stores.orders.list_by_buyer(&buyer_id).await.into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = OrderWriter::new(stdout.lock());
            writer.write_orders(&orders).into_diagnostic()?;
        }
        Command::Sign {
            session_id,
            payment_id,
            config,
        } => {
            let config = PayreconConfig::load(config.as_deref()).into_diagnostic()?;
            if config.gateway.secret.is_empty() {
                return Err(miette!(
                    "gateway.secret must be set (PAYRECON_GATEWAY__SECRET)"
                ));
            }

            let verifier = SignatureVerifier::new(config.gateway.secret);
            let signature = verifier.sign(
                &SessionId::new(session_id),
                &GatewayPaymentId::new(payment_id),
            );
            println!("{}", signature);
        }
    }

    Ok(())
}
