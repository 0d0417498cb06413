use std::env;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;

use agora::api::{self, AppState};
use agora::auth::AuthState;
use agora::chat::ChatHub;
use agora::chatbot::{ChatbotService, ExchangeRepository};
use agora::config::{self as app_config, APP_NAME, AppConfig, AppPaths};
use agora::db::Database;
use agora::generation::GenerationClient;
use agora::user::{CreateUserRequest, UserRepository};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

#[tokio::main]
async fn async_users(ctx: RuntimeContext, cmd: UsersCommand) -> Result<()> {
    handle_users(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let create_config = !matches!(cli.command, Command::Init(_));
    let ctx = RuntimeContext::new(cli.common.clone(), create_config)?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Users { command } => async_users(ctx, command),
        Command::Token { username } => handle_token(&ctx, &username),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Agora - community chat hub and chatbot server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Config file (or directory holding config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Only log errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// More log output; repeat for trace
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,
    /// Log at trace level
    #[arg(long, global = true)]
    trace: bool,
    /// JSON logs and JSON command output
    #[arg(long, global = true)]
    json: bool,
    /// Plain log output without ANSI colors
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// When to color log output
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP and WebSocket server
    Serve(ServeCommand),
    /// Write the default config file
    Init(InitCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Manage the user directory
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Mint a bearer token for a username (requires auth.jwt_secret)
    Token {
        username: String,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (overrides server.host)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Overwrite an existing config file
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Clone, Subcommand)]
enum UsersCommand {
    /// Add a user
    Add {
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// List users
    List,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts, create_config: bool) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = app_config::load_or_init_config(&paths.config_file, create_config)?;
        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = self.effective_log_level()?;
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}"))
        });

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_ansi(!disable_color),
                )
                .try_init()
                .ok();
        }

        Ok(())
    }

    fn effective_log_level(&self) -> Result<LevelFilter> {
        if self.common.quiet {
            return Ok(LevelFilter::ERROR);
        }
        if self.common.trace {
            return Ok(LevelFilter::TRACE);
        }
        if self.common.debug {
            return Ok(LevelFilter::DEBUG);
        }
        match self.common.verbose {
            0 => self
                .config
                .logging
                .level
                .parse()
                .with_context(|| format!("invalid logging.level '{}'", self.config.logging.level)),
            1 => Ok(LevelFilter::DEBUG),
            _ => Ok(LevelFilter::TRACE),
        }
    }

    async fn open_database(&self) -> Result<Database> {
        let path = self.config.database_path(&self.paths.data_dir)?;
        let db = Database::new(&path).await?;
        debug!("database ready at {}", path.display());
        Ok(db)
    }
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let config = &ctx.config;
    let db = ctx.open_database().await?;

    let users = Arc::new(UserRepository::new(db.pool().clone()));
    let exchanges = Arc::new(ExchangeRepository::new(db.pool().clone()));
    let generator = Arc::new(
        GenerationClient::new(config.generation.clone())
            .context("creating generation client")?,
    );
    info!(
        "Generation backend: {} (model {})",
        config.generation.base_url, config.generation.model
    );

    let chatbot = ChatbotService::new(users, generator, exchanges, config.chatbot.clone());

    let auth = AuthState::new(&config.auth).context("configuring authentication")?;
    if !auth.is_enabled() {
        warn!("No auth.jwt_secret configured; every chatbot caller is anonymous");
    }

    let hub = ChatHub::new(&config.chat);
    let state = AppState::new(hub, config.chat.clone(), chatbot, auth);
    let app = api::create_router(state);

    let host = cmd.host.unwrap_or_else(|| config.server.host.clone());
    let port = cmd.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;
    info!("agora listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !cmd.force {
        return Err(anyhow!(
            "{} exists; pass --force to replace it",
            ctx.paths.config_file.display()
        ));
    }

    app_config::write_default_config(&ctx.paths.config_file)?;
    println!("{}", ctx.paths.config_file.display());
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else {
                println!(
                    "{}",
                    toml::to_string_pretty(&ctx.config).context("serializing config to TOML")?
                );
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
    }
}

async fn handle_users(ctx: &RuntimeContext, command: UsersCommand) -> Result<()> {
    let db = ctx.open_database().await?;
    let repo = UserRepository::new(db.pool().clone());

    match command {
        UsersCommand::Add { username, email } => {
            let user = repo
                .create(CreateUserRequest { username, email })
                .await
                .context("adding user")?;
            if ctx.common.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{}\t{}", user.id, user.username);
            }
        }
        UsersCommand::List => {
            let users = repo.list().await?;
            if ctx.common.json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else {
                for user in users {
                    println!(
                        "{}\t{}\t{}",
                        user.id,
                        user.username,
                        user.email.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_token(ctx: &RuntimeContext, username: &str) -> Result<()> {
    let auth = AuthState::new(&ctx.config.auth).context("configuring authentication")?;
    let token = auth.generate_token(username)?;
    println!("{token}");
    Ok(())
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}
