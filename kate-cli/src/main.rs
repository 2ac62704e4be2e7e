// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  kate: admin client for the Kate API gateway
//
//  Routes:  list, search, create and edit gateway routes
//  Traces:  page through recorded requests, inspect bodies
//  Session: bearer token kept in a local file between runs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod render;

use anyhow::{Context, bail};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use kate_client::{FileTokenStore, GatewayClient, ReqwestTransport, Session};
use kate_core::config::ClientConfig;
use kate_core::route::{HttpMethod, RequestBodyType};
use kate_core::trace::AuthType;
use kate_store::{
    DashboardRepository, LoginRepository, RouteEditSession, RouteRepository, StatusFilter, TraceFilter,
    TraceRepository, WriteOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "kate", version, about = "Kate Admin: manage routes and inspect traces on a Kate gateway")]
struct Cli {
    /// Path to configuration file (YAML, or TOML with a .toml extension)
    #[arg(short, long, env = "KATE_CONFIG", default_value = "kate.yaml")]
    config: PathBuf,

    /// Log level (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    /// Gateway base URL (overrides the config file)
    #[arg(long, env = "KATE_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long, env = "KATE_EMAIL")]
        email: String,
        #[arg(long, env = "KATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the dashboard summary
    Home,
    /// List, create and edit routes
    #[command(subcommand)]
    Routes(RoutesCommand),
    /// Browse recorded traces
    Traces(TracesArgs),
}

#[derive(Subcommand, Debug)]
enum RoutesCommand {
    /// List routes, optionally filtered by path substring
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a route in a service
    Add {
        #[arg(long)]
        service: String,
        #[arg(long)]
        path: String,
        #[arg(long, default_value = "GET", value_parser = parse_method)]
        method: HttpMethod,
        /// Attach the gateway's JWT policy
        #[arg(long)]
        protected: bool,
        #[arg(long, default_value = "JSON", value_parser = parse_body_type)]
        body_type: RequestBodyType,
    },
    /// Edit an existing route, identified by path and current method
    Edit {
        #[arg(long)]
        path: String,
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long, value_parser = parse_method)]
        set_method: Option<HttpMethod>,
        #[arg(long)]
        protected: Option<bool>,
        #[arg(long, value_parser = parse_body_type)]
        body_type: Option<RequestBodyType>,
        /// Move the route to another service
        #[arg(long)]
        service: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TracesArgs {
    #[command(subcommand)]
    show: Option<TracesCommand>,

    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Page size (defaults to `traces.page_size`)
    #[arg(long)]
    count: Option<u32>,
    /// Route substring
    #[arg(long)]
    route: Option<String>,
    /// Exact status (404) or class (5xx)
    #[arg(long)]
    status: Option<StatusFilter>,
    /// Only traces at or after this time (2024-05-01T10:00:00)
    #[arg(long, value_parser = parse_since)]
    since: Option<NaiveDateTime>,
    #[arg(long)]
    auth: Option<AuthType>,
    /// Free text over id, route, method and source IP
    #[arg(long)]
    text: Option<String>,
}

#[derive(Subcommand, Debug)]
enum TracesCommand {
    /// Show one trace of the selected page with its bodies
    Show { id: String },
}

fn parse_method(s: &str) -> Result<HttpMethod, String> {
    s.to_ascii_uppercase().parse()
}

fn parse_body_type(s: &str) -> Result<RequestBodyType, String> {
    s.parse()
}

fn parse_since(s: &str) -> Result<NaiveDateTime, String> {
    s.parse::<NaiveDateTime>().map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Config ──
    let mut config = if cli.config.exists() {
        ClientConfig::load(&cli.config)?
    } else {
        ClientConfig::from_env()?
    };
    if let Some(base_url) = &cli.base_url {
        config.gateway.base_url = base_url.clone();
    }

    // ── Tracing ──
    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!(version = env!("CARGO_PKG_VERSION"), gateway = %config.gateway.base_url, "kate starting");

    // ── Client ──
    let store = FileTokenStore::new(config.session.token_file.clone());
    let session = Arc::new(Session::new(Arc::new(store)));
    let transport = ReqwestTransport::new(&config.gateway)?;
    let client = GatewayClient::new(Arc::new(transport), session);

    match cli.command {
        Command::Login { email, password } => login(client, &email, &password).await,
        Command::Logout => {
            LoginRepository::new(client).logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Home => home(client).await,
        Command::Routes(cmd) => routes(client, cmd).await,
        Command::Traces(args) => traces(client, config.traces.page_size, args).await,
    }
}

async fn login(client: GatewayClient, email: &str, password: &str) -> anyhow::Result<()> {
    let repo = LoginRepository::new(client);
    repo.login(email, password).await;
    let state = repo.state();
    if let Some(error) = &state.error {
        bail!("login failed: {error}");
    }
    info!("session stored");
    println!("Signed in as {email}.");
    Ok(())
}

async fn home(client: GatewayClient) -> anyhow::Result<()> {
    let repo = DashboardRepository::new(client);
    repo.load().await;
    let state = repo.state();
    if let Some(error) = &state.error {
        bail!("{error}");
    }
    if let Some(home) = &state.data {
        render::home(home);
    }
    Ok(())
}

async fn routes(client: GatewayClient, cmd: RoutesCommand) -> anyhow::Result<()> {
    let repo = RouteRepository::new(client);
    repo.load().await;
    if let Some(error) = &repo.state().error {
        bail!("{error}");
    }

    match cmd {
        RoutesCommand::List { search } => {
            if let Some(query) = search {
                repo.search(&query);
            }
            render::routes(&repo.state().routes);
            Ok(())
        }
        RoutesCommand::Add {
            service,
            path,
            method,
            protected,
            body_type,
        } => {
            let state = repo.state();
            let service = state
                .services
                .iter()
                .find(|s| s.name == service)
                .cloned()
                .with_context(|| format!("no service named {service:?}"))?;

            let mut session = RouteEditSession::new();
            session.begin_create()?;
            session.set_path(path)?;
            session.set_method(method)?;
            session.select_service(service)?;
            session.set_protected(protected)?;
            session.set_request_body_type(body_type)?;
            let name = session.display_name().unwrap_or_default();
            commit(&repo, &mut session, &name).await
        }
        RoutesCommand::Edit {
            path,
            method,
            set_method,
            protected,
            body_type,
            service,
        } => {
            let state = repo.state();
            let row = state
                .original_routes
                .iter()
                .find(|r| r.path == path && r.method.eq_ignore_ascii_case(&method))
                .with_context(|| format!("no route {method} {path}"))?;

            let mut session = RouteEditSession::new();
            session.begin_edit(row, &state.services)?;
            if let Some(method) = set_method {
                session.set_method(method)?;
            }
            if let Some(protected) = protected {
                session.set_protected(protected)?;
            }
            if let Some(body_type) = body_type {
                session.set_request_body_type(body_type)?;
            }
            if let Some(name) = service {
                let service = state
                    .services
                    .iter()
                    .find(|s| s.name == name)
                    .cloned()
                    .with_context(|| format!("no service named {name:?}"))?;
                session.select_service(service)?;
            }
            let name = session.display_name().unwrap_or_default();
            commit(&repo, &mut session, &name).await
        }
    }
}

async fn commit(repo: &RouteRepository, session: &mut RouteEditSession, name: &str) -> anyhow::Result<()> {
    match session.save(repo).await? {
        WriteOutcome::Applied => {
            println!("Saved {name}.");
            Ok(())
        }
        WriteOutcome::Failed | WriteOutcome::Rejected => {
            let error = repo.state().error.clone().unwrap_or_default();
            bail!("could not save {name}: {error}")
        }
    }
}

async fn traces(client: GatewayClient, page_size: u32, args: TracesArgs) -> anyhow::Result<()> {
    let repo = TraceRepository::with_page_size(client, page_size);
    repo.fetch_traces(args.page, args.count.unwrap_or(repo.page_size())).await;
    let state = repo.state();
    if let Some(error) = &state.error {
        bail!("{error}");
    }

    match args.show {
        Some(TracesCommand::Show { id }) => {
            let detail = repo
                .detail(&id)
                .with_context(|| format!("trace {id} is not on page {}", args.page))?;
            render::trace_detail(&detail);
        }
        None => {
            repo.set_filter(TraceFilter {
                route: args.route,
                status: args.status,
                since: args.since,
                auth_type: args.auth,
                text: args.text,
            });
            render::traces(&repo.state());
        }
    }
    Ok(())
}
