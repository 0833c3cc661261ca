use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lexchat::api::{AppState, create_router};
use lexchat::client::{
    ApiClient, ChatSession, ChatTransport, HealthMonitor, SessionEvent, SessionState,
};
use lexchat::config::{APP_NAME, AppConfig, default_config_path};
use lexchat::inference::{ChatBackend, OllamaClient};
use lexchat::pdf::PdfTextExtractor;
use lexchat_protocol::Mode;

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common)?;
    ctx.init_logging();
    debug!("effective config: {:#?}", ctx.config);

    match cli.command {
        Command::Config { command } => handle_config(&ctx, command),
        command => async_main(ctx, command),
    }
}

#[tokio::main]
async fn async_main(ctx: RuntimeContext, command: Command) -> Result<()> {
    match command {
        Command::Serve(cmd) => handle_serve(ctx, cmd).await,
        Command::Ask(cmd) => handle_ask(ctx, cmd).await,
        Command::Extract(cmd) => handle_extract(ctx, cmd).await,
        Command::Config { .. } => Ok(()),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Lexchat - streaming legal assistant server and client.",
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
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Output machine readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Send one message and stream the answer
    Ask(AskCommand),
    /// Extract the text of a PDF through the server
    Extract(ExtractCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Model served by the runtime
    #[arg(long, env = "AI_MODEL")]
    model: Option<String>,
    /// Base URL of the LLM runtime
    #[arg(long, value_name = "URL")]
    runtime_url: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct ClientOpts {
    /// Base URL of the lexchat server
    #[arg(long, env = "LEXCHAT_API_URL", value_name = "URL")]
    api_url: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct AskCommand {
    /// Message to send
    message: String,
    /// Assistance mode (chat, agent, resume)
    #[arg(short, long, default_value = "chat")]
    mode: Mode,
    /// PDF to extract and attach (repeatable)
    #[arg(short, long = "attach", value_name = "PDF")]
    attachments: Vec<PathBuf>,
    #[command(flatten)]
    client: ClientOpts,
}

#[derive(Debug, Clone, Args)]
struct ExtractCommand {
    /// PDF file to upload
    path: PathBuf,
    #[command(flatten)]
    client: ClientOpts,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default config file path
    Path,
}

#[derive(Debug)]
struct RuntimeContext {
    common: CommonOpts,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config = AppConfig::load(common.config.as_deref())?;
        Ok(Self { common, config })
    }

    fn init_logging(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = if self.common.quiet {
            "error"
        } else {
            match self.common.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}"))
        });

        // Logs go to stderr so `ask` and `extract` output stays clean.
        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
                .try_init()
                .ok();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .try_init()
                .ok();
        }
    }

    fn api_url(&self, opts: &ClientOpts) -> String {
        opts.api_url
            .clone()
            .unwrap_or_else(|| self.config.client.api_url.clone())
    }
}

async fn handle_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    let mut config = ctx.config;
    if let Some(bind) = cmd.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(model) = cmd.model {
        config.inference.model = model;
    }
    if let Some(url) = cmd.runtime_url {
        config.inference.base_url = url;
    }

    let runtime: Arc<dyn ChatBackend> = Arc::new(
        OllamaClient::new(
            config.inference.base_url.clone(),
            config.inference.connect_timeout(),
        )
        .context("creating runtime client")?,
    );

    let url = &config.inference.base_url;
    match runtime.health().await {
        Ok(true) => info!(%url, "LLM runtime reachable"),
        Ok(false) | Err(_) => warn!(
            %url,
            "LLM runtime not reachable yet; chat requests will fail until it is up"
        ),
    }

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .context("parsing listen address")?;
    info!(model = %config.inference.model, "Starting {} on {}", APP_NAME, addr);

    let state = AppState::new(config, runtime, Arc::new(PdfTextExtractor));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn handle_ask(ctx: RuntimeContext, cmd: AskCommand) -> Result<()> {
    let client = ApiClient::new(ctx.api_url(&cmd.client)).context("creating API client")?;
    let transport: Arc<dyn ChatTransport> = Arc::new(client.clone());

    let monitor = HealthMonitor::start(transport.clone(), ctx.config.client.health_interval());
    let mut health = monitor.subscribe();
    health
        .wait_for(|status| status.is_some())
        .await
        .context("health monitor stopped")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ChatSession::new(transport)
        .with_health(monitor.subscribe())
        .with_events(tx);
    session.set_mode(cmd.mode);

    for path in &cmd.attachments {
        let file = extract_file(&client, path).await?;
        info!(name = %file.name, pages = file.pages, "Attached document");
        session.attach(file);
    }

    let json = ctx.common.json;
    let printer = tokio::spawn(async move {
        let mut printed = String::new();
        let mut stdout = io::stdout();
        while let Some(event) = rx.recv().await {
            if let SessionEvent::LastMessageUpdated { content, .. } = event {
                if json {
                    continue;
                }
                match content.strip_prefix(printed.as_str()) {
                    Some(delta) => {
                        let _ = write!(stdout, "{delta}");
                    }
                    None => {
                        let _ = write!(stdout, "\n{content}");
                    }
                }
                let _ = stdout.flush();
                printed = content;
            }
        }
    });

    let state = session.send(&cmd.message).await;
    let messages = session.messages().to_vec();
    drop(session);
    let _ = printer.await;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
    } else if state == SessionState::Failed {
        if let Some(last) = messages.last() {
            println!("{}", last.content);
        }
    } else {
        println!();
    }

    if state == SessionState::Failed {
        bail!("request failed");
    }
    Ok(())
}

async fn handle_extract(ctx: RuntimeContext, cmd: ExtractCommand) -> Result<()> {
    let client = ApiClient::new(ctx.api_url(&cmd.client)).context("creating API client")?;
    let file = extract_file(&client, &cmd.path).await?;

    if ctx.common.json {
        println!("{}", serde_json::to_string_pretty(&file)?);
    } else {
        println!("{}", file.text);
        info!(name = %file.name, pages = file.pages, "Extraction complete");
    }
    Ok(())
}

async fn extract_file(
    client: &ApiClient,
    path: &Path,
) -> Result<lexchat_protocol::AttachedFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    client
        .extract_pdf(name, data)
        .await
        .with_context(|| format!("extracting {}", path.display()))
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", ctx.config.to_toml()?);
        }
        ConfigCommand::Path => match ctx.common.config.clone().or_else(default_config_path) {
            Some(path) => println!("{}", path.display()),
            None => bail!("no config directory available on this platform"),
        },
    }
    Ok(())
}
