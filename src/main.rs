use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dashboard_client::config::{ClientConfig, ConfigError, normalize_base_url};
use dashboard_client::net::api::ApiClient;
use dashboard_client::net::types::{ApiError, RegisterRequest};
use dashboard_client::router::{Navigation, Router, RouterError};
use dashboard_client::router::routes::{HOME_PATH, LOGIN_PATH};
use dashboard_client::state::session::{FileStore, KeyValueStore, SessionStore, SessionView, StoreError};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("access to {page} denied; redirected to {location}")]
    Denied { page: String, location: String },
}

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "County poverty dashboard client")]
struct Cli {
    /// API root including `/api`; overrides `DASHBOARD_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Session file; overrides `DASHBOARD_SESSION_FILE`.
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Request timeout; overrides `DASHBOARD_REQUEST_TIMEOUT_SECS`.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        username: String,
        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        fullname: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Logout,
    Whoami,
    Routes,
    Navigate {
        path: String,
    },
    Api(ApiCommand),
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Me,
    UpdateMe {
        #[arg(long)]
        data: String,
    },
    Users,
    DeleteUser {
        user_id: i64,
    },
    Counties {
        #[arg(long)]
        province_id: Option<i64>,
        #[arg(long)]
        keyword: Option<String>,
    },
    Search {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        province_id: Option<i64>,
    },
    County {
        county_id: i64,
    },
    UpdateCounty {
        county_id: i64,
        #[arg(long)]
        data: String,
    },
    Indicators {
        county_id: i64,
        #[arg(long)]
        from: Option<i32>,
        #[arg(long)]
        to: Option<i32>,
    },
    Provinces,
    Projects {
        county_id: i64,
    },
    CreateProject {
        county_id: i64,
        #[arg(long)]
        data: String,
    },
    UpdateProject {
        county_id: i64,
        project_id: i64,
        #[arg(long)]
        data: String,
    },
    DeleteProject {
        county_id: i64,
        project_id: i64,
    },
    Alerts,
    Scan,
    ScanStatus,
    Rules,
    CreateRule {
        #[arg(long)]
        data: String,
    },
    UpdateRule {
        rule_id: i64,
        #[arg(long)]
        data: String,
    },
    DeleteRule {
        rule_id: i64,
    },
    Resolve {
        event_id: i64,
    },
    Summary {
        #[arg(long)]
        year: Option<i32>,
    },
    Charts {
        #[arg(long)]
        year: Option<i32>,
    },
    Analysis {
        #[arg(long)]
        year: Option<i32>,
    },
}

impl ApiSubcommand {
    /// Page whose data this call loads; the guard for that page gates the call.
    fn page(&self) -> &'static str {
        match self {
            Self::Me | Self::UpdateMe { .. } => "/profile",
            Self::Users | Self::DeleteUser { .. } => "/users",
            Self::Counties { .. }
            | Self::Search { .. }
            | Self::County { .. }
            | Self::UpdateCounty { .. }
            | Self::Indicators { .. }
            | Self::Provinces
            | Self::Projects { .. }
            | Self::CreateProject { .. }
            | Self::UpdateProject { .. }
            | Self::DeleteProject { .. } => "/county",
            Self::Alerts
            | Self::Scan
            | Self::ScanStatus
            | Self::Rules
            | Self::CreateRule { .. }
            | Self::UpdateRule { .. }
            | Self::DeleteRule { .. }
            | Self::Resolve { .. } => "/alerts",
            Self::Summary { .. } | Self::Charts { .. } => HOME_PATH,
            Self::Analysis { .. } => "/analysis",
        }
    }
}

type Session = Arc<SessionStore<FileStore>>;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dashboard_client::telemetry::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let session: Session = Arc::new(SessionStore::new(FileStore::new(&config.session_file)));
    let client = ApiClient::new(&config, Arc::clone(&session))?;
    let mut router = Router::dashboard(Arc::clone(&session));

    match cli.command {
        Command::Login { username, password } => run_login(&client, &mut router, &username, &password).await,
        Command::Register { username, password, role, fullname, email } => {
            let request = RegisterRequest { username, password, role, fullname, email };
            let response = client.register(&request).await?;
            print_json(&json!({ "success": response.success, "message": response.message }))
        }
        Command::Logout => {
            client.logout()?;
            print_navigation(&router.navigate(LOGIN_PATH)?)
        }
        Command::Whoami => {
            let snapshot = session.session();
            print_json(&json!({
                "authenticated": snapshot.is_authenticated(),
                "role": session.role(),
                "user": snapshot.user,
            }))
        }
        Command::Routes => print_routes(&router),
        Command::Navigate { path } => print_navigation(&router.navigate(&path)?),
        Command::Api(api) => print_json(&run_api(&client, &mut router, api.command).await?),
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = normalize_base_url(base_url)?;
    }
    if let Some(session_file) = &cli.session_file {
        config.session_file.clone_from(session_file);
    }
    if let Some(secs) = cli.timeout_secs.filter(|s| *s > 0) {
        config.timeouts.request_secs = secs;
    }
    Ok(config)
}

async fn run_login(
    client: &ApiClient<FileStore>,
    router: &mut Router<Session>,
    username: &str,
    password: &str,
) -> Result<(), CliError> {
    let response = client.login(username, password).await?;
    if let Some(message) = &response.message {
        eprintln!("{message}");
    }
    print_navigation(&router.navigate(HOME_PATH)?)
}

/// Navigate to the page behind `api` and refuse before any request when the guard redirects.
fn gate<V: SessionView>(router: &mut Router<V>, api: &ApiSubcommand) -> Result<(), CliError> {
    let page = api.page();
    let nav = router.navigate(page)?;
    if !nav.allowed() {
        return Err(CliError::Denied { page: page.to_owned(), location: nav.location });
    }
    Ok(())
}

async fn run_api<S: KeyValueStore, V: SessionView>(
    client: &ApiClient<S>,
    router: &mut Router<V>,
    api: ApiSubcommand,
) -> Result<Value, CliError> {
    gate(router, &api)?;

    match call_api(client, api).await {
        Ok(json) => Ok(json),
        Err(CliError::Api(e)) if e.redirect_target().is_some() => {
            let nav = router.handle_unauthorized()?;
            eprintln!("session expired; now at {}", nav.location);
            Err(e.into())
        }
        Err(e) => Err(e),
    }
}

async fn call_api<S: KeyValueStore>(client: &ApiClient<S>, api: ApiSubcommand) -> Result<Value, CliError> {
    let json = match api {
        ApiSubcommand::Me => client.current_user().await?,
        ApiSubcommand::UpdateMe { data } => client.update_current_user(&parse_data(&data)?).await?,
        ApiSubcommand::Users => client.users().await?,
        ApiSubcommand::DeleteUser { user_id } => client.delete_user(user_id).await?,
        ApiSubcommand::Counties { province_id, keyword } => client.counties(province_id, keyword.as_deref()).await?,
        ApiSubcommand::Search { keyword, province_id } => client.search_counties(keyword.as_deref(), province_id).await?,
        ApiSubcommand::County { county_id } => client.county_detail(county_id).await?,
        ApiSubcommand::UpdateCounty { county_id, data } => client.update_county(county_id, &parse_data(&data)?).await?,
        ApiSubcommand::Indicators { county_id, from, to } => client.county_indicators(county_id, from, to).await?,
        ApiSubcommand::Provinces => client.provinces().await?,
        ApiSubcommand::Projects { county_id } => client.projects(county_id).await?,
        ApiSubcommand::CreateProject { county_id, data } => client.create_project(county_id, &parse_data(&data)?).await?,
        ApiSubcommand::UpdateProject { county_id, project_id, data } => {
            client.update_project(county_id, project_id, &parse_data(&data)?).await?
        }
        ApiSubcommand::DeleteProject { county_id, project_id } => client.delete_project(county_id, project_id).await?,
        ApiSubcommand::Alerts => client.alerts().await?,
        ApiSubcommand::Scan => client.scan_alerts().await?,
        ApiSubcommand::ScanStatus => client.scan_status().await?,
        ApiSubcommand::Rules => client.rules().await?,
        ApiSubcommand::CreateRule { data } => client.create_rule(&parse_data(&data)?).await?,
        ApiSubcommand::UpdateRule { rule_id, data } => client.update_rule(rule_id, &parse_data(&data)?).await?,
        ApiSubcommand::DeleteRule { rule_id } => client.delete_rule(rule_id).await?,
        ApiSubcommand::Resolve { event_id } => client.resolve_alert(event_id).await?,
        ApiSubcommand::Summary { year } => client.summary(year).await?,
        ApiSubcommand::Charts { year } => client.charts_data(year).await?,
        ApiSubcommand::Analysis { year } => client.analysis_data(year).await?,
    };
    Ok(json)
}

fn parse_data(raw: &str) -> Result<Value, CliError> {
    Ok(serde_json::from_str(raw)?)
}

fn print_routes(router: &Router<Session>) -> Result<(), CliError> {
    let routes: Vec<Value> = router
        .table()
        .routes()
        .map(|r| json!({ "path": r.path, "requiresAuth": r.requires_auth, "roles": r.roles }))
        .collect();
    let aliases: Vec<Value> = router
        .table()
        .aliases()
        .map(|(from, to)| json!({ "path": from, "redirect": to }))
        .collect();
    print_json(&json!({ "routes": routes, "aliases": aliases }))
}

fn print_navigation(nav: &Navigation) -> Result<(), CliError> {
    let redirects: Vec<Value> = nav
        .redirects
        .iter()
        .map(|hop| json!({ "from": hop.from, "to": hop.to, "reason": format!("{:?}", hop.reason) }))
        .collect();
    print_json(&json!({
        "requested": nav.requested,
        "location": nav.location,
        "allowed": nav.allowed(),
        "redirects": redirects,
    }))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
