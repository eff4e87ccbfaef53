use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pepper_gateway::api::ApiServer;
use pepper_gateway::client::PepperClient;
use pepper_gateway::config::{DEFAULT_SERVER_PORT, HEALTH_ENDPOINT, RobotBackend};
use pepper_gateway::http::{GatewayClient, build_url, check_health};
use pepper_gateway::model::ModelWrapper;
use pepper_gateway::{Config, robot};

/// Default server for the `chat` and `health` commands
const DEFAULT_CLIENT_SERVER: &str = "http://localhost:5000";

/// Default message for the `chat` command
const DEFAULT_CHAT_MESSAGE: &str = "こんにちは、Pepper";

/// Pepper - speech gateway between a robot and a language model
#[derive(Parser)]
#[command(name = "pepper", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway HTTP server
    Server {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the robot client loop
    Client {
        /// Robot IP address
        #[arg(value_name = "PEPPER_IP")]
        robot_ip: Option<String>,

        /// Robot port
        #[arg(long)]
        port: Option<u16>,

        /// Gateway server host
        #[arg(long)]
        server_host: Option<String>,

        /// Gateway server port
        #[arg(long)]
        server_port: Option<u16>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Seconds to wait between cycles
        #[arg(long)]
        interval: Option<f64>,

        /// Robot backend
        #[arg(long, value_enum)]
        robot: Option<RobotBackend>,

        /// Wake word
        #[arg(long)]
        keyword: Option<String>,

        /// Seconds recorded per cycle
        #[arg(long)]
        recording_seconds: Option<u64>,
    },
    /// Send a text message to a running server
    Chat {
        /// Server base URL
        #[arg(long, default_value = DEFAULT_CLIENT_SERVER)]
        server: String,

        /// Message to send
        #[arg(long, short, default_value = DEFAULT_CHAT_MESSAGE)]
        message: String,
    },
    /// Check whether a server is healthy
    Health {
        /// Server base URL
        #[arg(long, default_value = DEFAULT_CLIENT_SERVER)]
        server: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,pepper_gateway=info",
        1 => "info,pepper_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();

    match cli.command {
        Command::Server { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Client {
            robot_ip,
            port,
            server_host,
            server_port,
            once,
            interval,
            robot,
            keyword,
            recording_seconds,
        } => {
            let client = &mut config.client;
            if let Some(ip) = robot_ip {
                client.robot_ip = ip;
            }
            if let Some(port) = port {
                client.robot_port = port;
            }
            if let Some(host) = server_host {
                client.server_host = host;
            }
            if let Some(port) = server_port {
                client.server_port = port;
            }
            if let Some(interval) = interval {
                client.interval = Duration::try_from_secs_f64(interval)
                    .map_err(|e| anyhow::anyhow!("invalid interval {interval}: {e}"))?;
            }
            if let Some(robot) = robot {
                client.robot = robot;
            }
            if let Some(keyword) = keyword {
                client.keyword = keyword;
            }
            if let Some(secs) = recording_seconds {
                client.recording = Duration::from_secs(secs);
            }
            client.once = once;

            run_client(config).await
        }
        Command::Chat { server, message } => chat(&config, &server, &message).await,
        Command::Health { server } => health(&config, &server).await,
    }
}

/// Run the gateway server until Ctrl+C
async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "starting pepper gateway server"
    );

    if config.model.api_key.is_none() {
        tracing::warn!(base_url = %config.model.base_url, "no model API key configured");
    }

    let model = ModelWrapper::from_config(&config.model)?;
    ApiServer::new(&config.server, model).run().await?;

    Ok(())
}

/// Run the robot client loop
#[allow(clippy::future_not_send)]
async fn run_client(config: Config) -> anyhow::Result<()> {
    let client_config = config.client;

    tracing::info!(
        robot_ip = %client_config.robot_ip,
        server = %client_config.server_url(),
        once = client_config.once,
        "starting pepper client"
    );

    let robot = robot::create(&client_config)?;
    let mut client = PepperClient::from_config(robot, client_config)?;
    client.run().await?;

    Ok(())
}

/// Send one chat message and print the exchange
async fn chat(config: &Config, server: &str, message: &str) -> anyhow::Result<()> {
    let gateway = GatewayClient::new(
        server,
        config.client.http_timeout,
        config.client.health_timeout,
    )?;

    println!("Sending to {}: {message}", gateway.base_url());

    let exchange = gateway.chat(message).await?;

    println!("input_text:    {}", exchange.input_text);
    println!("response_text: {}", exchange.response_text);

    Ok(())
}

/// Print whether `server` answers its health endpoint
async fn health(config: &Config, server: &str) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .timeout(config.client.health_timeout)
        .build()?;

    let url = format!("{}{HEALTH_ENDPOINT}", server.trim_end_matches('/'));
    if check_health(&http, &url).await {
        println!("{server} is healthy");
        Ok(())
    } else {
        println!("{server} is not responding");
        println!(
            "Start one with: pepper server (default {})",
            build_url("0.0.0.0", DEFAULT_SERVER_PORT, "")
        );
        anyhow::bail!("server unhealthy")
    }
}
