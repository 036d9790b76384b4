use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use toolmux_core::config::{ConfigLevel, FileConfigProvider};
use toolmux_core::frontend::FrontEndTask;
use toolmux_core::logging::SharedLogger;
use toolmux_core::{
    create_reasoner, default_chain, run_until_first_exit, CancellationToken, ConfigProvider,
    ConsoleFrontEnd, ConsoleLogger, ConversationStore, FileLogger, ListenerSettings, LogLevel,
    NetworkFrontEnd, ProviderRegistry, QueryOrchestrator, SecretStore, ServerConfig, ServerTransport,
    ToolCatalog, ToolFilter,
};

#[derive(Parser)]
#[command(name = "toolmux", about = "Chat with a model that can call MCP tool providers", version)]
struct Cli {
    /// Path to config file (default: workspace, then user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect providers and start the console and network front ends
    Run {
        /// Do not start the console
        #[arg(long)]
        no_console: bool,

        /// Do not start the network listener
        #[arg(long)]
        no_listener: bool,

        /// Listener port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Manage configured tool providers
    Servers {
        #[command(subcommand)]
        action: ServerCommands,
    },
}

#[derive(Subcommand)]
enum ServerCommands {
    /// List configured servers
    List,
    /// Add a server: either --command (spawned locally) or --url (remote)
    Add {
        name: String,

        /// Executable to spawn
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        command: Option<String>,

        /// Streamable HTTP endpoint
        #[arg(long)]
        url: Option<String>,

        /// Arguments for --command
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Remove a server
    Remove { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(dispatch(cli));
    // The console reader thread may still be parked on stdin
    runtime.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => FileConfigProvider::new(path, ConfigLevel::Explicit),
        None => FileConfigProvider::discover(),
    };

    let command = cli.command.unwrap_or(Commands::Run {
        no_console: false,
        no_listener: false,
        port: None,
    });

    match command {
        Commands::Run {
            no_console,
            no_listener,
            port,
        } => {
            let logger = make_logger(cli.log_file)?;
            run(&config, logger, !no_console, !no_listener, port).await
        }
        Commands::Servers { action } => servers(&config, action).await,
    }
}

fn make_logger(log_file: Option<PathBuf>) -> Result<SharedLogger> {
    let logger: SharedLogger = match log_file {
        Some(path) => {
            let logger = FileLogger::open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Arc::new(logger.with_min_level(LogLevel::from_env(LogLevel::Info)))
        }
        None => Arc::new(ConsoleLogger::new().with_min_level(LogLevel::from_env(LogLevel::Warn))),
    };
    Ok(logger)
}

async fn run(
    config: &FileConfigProvider,
    logger: SharedLogger,
    console_enabled: bool,
    listener_enabled: bool,
    port: Option<u16>,
) -> Result<()> {
    let file = config
        .get_config()
        .with_context(|| format!("Failed to load {}", config.path().display()))?;

    let registry = Arc::new(ProviderRegistry::new(logger.clone()));
    for (name, error) in registry.connect_all(&file.servers).await {
        eprintln!("Skipping server '{}': {}", name, error);
    }
    if registry.is_empty() {
        eprintln!("No tool providers connected; queries will be rejected.");
    }

    let catalog = Arc::new(
        ToolCatalog::new(registry.clone(), logger.clone())
            .with_policy(file.collision_policy)
            .with_filter(ToolFilter::from(&file.tools)),
    );
    let conversations = Arc::new(ConversationStore::from_settings(&file.conversation));
    let secrets: Arc<dyn SecretStore> = Arc::new(default_chain());
    let reasoner = create_reasoner(&file.model, secrets, logger.clone())?;
    let orchestrator = Arc::new(QueryOrchestrator::new(
        catalog,
        conversations,
        reasoner,
        logger.clone(),
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let listener_settings = ListenerSettings {
        port: port.unwrap_or(file.listener.port),
        ..file.listener
    };
    let listener_enabled = listener_enabled && listener_settings.enabled;
    if !console_enabled && !listener_enabled {
        bail!("Both the console and the listener are disabled; nothing to run");
    }

    let listener: Option<FrontEndTask<'static>> = if listener_enabled {
        let address = listener_settings.address();
        let socket = TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {}", address))?;
        eprintln!("Listening on {}", address);
        let network = Arc::new(NetworkFrontEnd::new(orchestrator.clone(), logger.clone()));
        Some(Box::pin(network.serve(socket, cancel.clone())))
    } else {
        None
    };

    let console: Option<FrontEndTask<'static>> = if console_enabled {
        let front_end = ConsoleFrontEnd::new(orchestrator.clone(), logger.clone());
        let cancel = cancel.clone();
        Some(Box::pin(async move {
            front_end
                .run(BufReader::new(io::stdin()), io::stdout(), cancel)
                .await
        }))
    } else {
        None
    };

    run_until_first_exit(console, listener, cancel, registry, logger).await?;
    Ok(())
}

fn describe(server: &ServerConfig) -> String {
    let target = match &server.transport {
        ServerTransport::Stdio { command, args, .. } if args.is_empty() => format!("stdio  {}", command),
        ServerTransport::Stdio { command, args, .. } => format!("stdio  {} {}", command, args.join(" ")),
        ServerTransport::Http { url } => format!("http   {}", url),
    };
    let state = if server.enabled { "" } else { "  (disabled)" };
    format!("{:<16} {}{}", server.name, target, state)
}

async fn servers(config: &FileConfigProvider, action: ServerCommands) -> Result<()> {
    match action {
        ServerCommands::List => {
            let servers = config.get_servers().await;
            if servers.is_empty() {
                println!("No servers configured in {}", config.path().display());
            }
            for server in &servers {
                println!("{}", describe(server));
            }
        }
        ServerCommands::Add {
            name,
            command,
            url,
            args,
        } => {
            let server = match (command, url) {
                (Some(command), None) => ServerConfig::stdio(name, command, args),
                (None, Some(url)) => ServerConfig::http(name, url),
                _ => bail!("Give exactly one of --command or --url"),
            };
            let line = describe(&server);
            config.add_server(server).await?;
            println!("Added {}", line);
        }
        ServerCommands::Remove { name } => {
            config.remove_server(&name).await?;
            println!("Removed {}", name);
        }
    }
    Ok(())
}
