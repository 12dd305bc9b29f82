use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use slp::{Conf, Protocol, SlpErr, Status, DEFAULT_BEDROCK_PORT, DEFAULT_JAVA_PORT};
use std::{process::ExitCode, thread, time::Duration};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "slp", version, about = "Retrieve the status of Minecraft servers")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieves and displays the status of the given Minecraft server
    Status(StatusArgs),
    /// Retrieves and displays the status of the given Minecraft Bedrock Dedicated server
    StatusBedrock(BedrockArgs),
    /// Show version and exit
    Version,
}

#[derive(Args, Debug)]
struct RetryArgs {
    /// If retry-limit is non-zero, status will be retried at this interval, in seconds
    #[arg(long, default_value_t = 10)]
    retry_interval: u64,

    /// If non-zero, failed status will be retried this many times before exiting
    #[arg(long, default_value_t = 0)]
    retry_limit: u32,

    /// The timeout the ping can take as a maximum, in seconds (0 disables it)
    #[arg(long, default_value_t = 15)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Hostname of the Minecraft server
    #[arg(long, env = "MC_HOST", default_value = "localhost")]
    host: String,

    /// Port of the Minecraft server
    #[arg(long, env = "MC_PORT", default_value_t = DEFAULT_JAVA_PORT)]
    port: u16,

    /// Use the legacy server list ping, for servers before 1.7
    #[arg(long, conflicts_with = "use_old_server_list_ping")]
    use_server_list_ping: bool,

    /// Use the old server list ping, for servers from beta 1.8 to 1.3
    #[arg(long)]
    use_old_server_list_ping: bool,

    /// Send a PROXY protocol header first, for BungeeCord with proxy_protocol enabled
    #[arg(long)]
    use_proxy: bool,

    /// Version of the PROXY protocol to use
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    proxy_version: u8,

    /// Succeed when the server reports a max player count of 0
    #[arg(long)]
    skip_readiness_check: bool,

    /// Show just the online player count
    #[arg(long)]
    show_player_count: bool,

    /// Output server status as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    retry: RetryArgs,
}

#[derive(Args, Debug)]
struct BedrockArgs {
    /// Hostname of the Bedrock server
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port of the Bedrock server
    #[arg(long, default_value_t = DEFAULT_BEDROCK_PORT)]
    port: u16,

    #[command(flatten)]
    retry: RetryArgs,
}

#[derive(Debug, thiserror::Error)]
enum ProbeErr {
    #[error(transparent)]
    Slp(#[from] SlpErr),
    #[error("server not ready")]
    NotReady,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    host: &'a str,
    port: u16,
    server_info: &'a Status,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run `probe` until it succeeds or `retry_limit` retries are spent, with a fixed delay.
fn with_retry<T>(
    retry: &RetryArgs,
    mut probe: impl FnMut() -> Result<T, ProbeErr>,
) -> Result<T, ProbeErr> {
    let interval = Duration::from_secs(retry.retry_interval.max(1));
    let mut attempt = 0;

    loop {
        match probe() {
            Ok(result) => return Ok(result),
            Err(err) if attempt < retry.retry_limit => {
                attempt += 1;
                tracing::warn!(attempt, error = %err, "probe failed, retrying");
                thread::sleep(interval);
            }
            Err(err) => return Err(err),
        }
    }
}

fn build_conf(host: &str, port: u16, retry: &RetryArgs) -> Conf {
    let conf = Conf::create_with_port(host, port);

    match retry.timeout {
        0 => conf,
        secs => conf.with_timeout(Duration::from_secs(secs)),
    }
}

fn summary_line(conf: &Conf, status: &Status) -> String {
    match status {
        Status::Modern(s) => format!(
            "{} : version={} online={} max={} motd='{}'",
            conf,
            s.version.name,
            s.players.online,
            s.players.max,
            s.description.text()
        ),
        Status::Legacy(s) => format!(
            "{} : version={} online={} max={} motd='{}'",
            conf, s.server_version, s.online_players, s.max_players, s.motd
        ),
        Status::Beta(s) => format!(
            "{} : online={} max={} motd='{}'",
            conf, s.online_players, s.max_players, s.motd
        ),
        Status::Bedrock(s) => format!(
            "{} : version={} online={} max={}",
            conf, s.version_name, s.online_players, s.max_players
        ),
    }
}

fn player_count(status: &Status) -> String {
    match status {
        Status::Modern(s) => s.players.online.to_string(),
        Status::Legacy(s) => s.online_players.clone(),
        Status::Beta(s) => s.online_players.clone(),
        Status::Bedrock(s) => s.online_players.to_string(),
    }
}

fn run_status(args: &StatusArgs) -> Result<(), ProbeErr> {
    let mut conf = build_conf(&args.host, args.port, &args.retry);

    if args.use_proxy {
        conf = conf.with_proxy_protocol(args.proxy_version);
    }

    let protocol = if args.use_server_list_ping {
        Protocol::Legacy
    } else if args.use_old_server_list_ping {
        Protocol::Beta
    } else {
        Protocol::Modern
    };

    let status = with_retry(&args.retry, || {
        tracing::debug!(%conf, ?protocol, "pinging");

        let status = conf.get_status(protocol)?;

        tracing::debug!(?status, "ping returned");

        if !status.is_ready() && !args.skip_readiness_check {
            return Err(ProbeErr::NotReady);
        }

        Ok(status)
    })?;

    if args.json {
        let output = StatusOutput {
            host: &conf.host,
            port: conf.port,
            server_info: &status,
        };

        match serde_json::to_string(&output) {
            Ok(json) => println!("{}", json),
            Err(err) => tracing::error!(error = %err, "failed to encode info"),
        }
    } else if args.show_player_count {
        println!("{}", player_count(&status));
    } else {
        println!("{}", summary_line(&conf, &status));
    }

    Ok(())
}

fn run_status_bedrock(args: &BedrockArgs) -> Result<(), ProbeErr> {
    let conf = build_conf(&args.host, args.port, &args.retry);
    let status = with_retry(&args.retry, || Ok(conf.get_status(Protocol::Bedrock)?))?;

    println!("{}", summary_line(&conf, &status));

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    let (host, port, result) = match &cli.command {
        Command::Status(args) => (&args.host, args.port, run_status(args)),
        Command::StatusBedrock(args) => (&args.host, args.port, run_status_bedrock(args)),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("failed to ping {}:{} : {}", host, port, err);
            ExitCode::FAILURE
        }
    }
}
