use dashboard_client::router::routes::{RouteTable, ROLE_ADMIN, ROLE_CITIZEN};
use dashboard_client::state::session::{MemoryStore, UserProfile};

use super::*;

type MemorySession = Arc<SessionStore<MemoryStore>>;

fn session_with_role(role: Option<&str>) -> MemorySession {
    let session = Arc::new(SessionStore::new(MemoryStore::new()));
    if let Some(role) = role {
        session.set_session("tok", Some(&UserProfile::with_role(role))).unwrap();
    }
    session
}

/// Client aimed at a port nothing listens on: any request that goes out fails with a transport error.
async fn unreachable_client(session: &MemorySession) -> ApiClient<MemoryStore> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let config = ClientConfig::new(&format!("http://{addr}/api")).unwrap();
    ApiClient::new(&config, Arc::clone(session)).unwrap()
}

fn parse_api(args: &[&str]) -> ApiSubcommand {
    let argv = ["dashboard", "api"].into_iter().chain(args.iter().copied());
    match Cli::try_parse_from(argv).unwrap().command {
        Command::Api(api) => api.command,
        other => panic!("expected api command, got {other:?}"),
    }
}

// =============================================================================
// page map
// =============================================================================

#[test]
fn every_api_page_is_a_dashboard_route() {
    let table = RouteTable::dashboard();
    let commands = [
        vec!["me"],
        vec!["users"],
        vec!["counties", "--keyword", "县"],
        vec!["search", "--province-id", "3"],
        vec!["county", "8"],
        vec!["update-county", "8", "--data", "{}"],
        vec!["projects", "8"],
        vec!["create-project", "8", "--data", "{}"],
        vec!["update-project", "8", "2", "--data", "{}"],
        vec!["delete-project", "8", "2"],
        vec!["alerts"],
        vec!["summary"],
        vec!["analysis", "--year", "2020"],
    ];
    for args in commands {
        let api = parse_api(&args);
        assert!(table.find(api.page()).is_some(), "{args:?} maps to unknown page {}", api.page());
    }
}

#[test]
fn county_commands_are_gated_on_county_page() {
    for args in [vec!["search"], vec!["update-county", "1", "--data", "{}"], vec!["delete-project", "1", "2"]] {
        assert_eq!(parse_api(&args).page(), "/county");
    }
    assert_eq!(parse_api(&["users"]).page(), "/users");
    assert_eq!(parse_api(&["scan"]).page(), "/alerts");
}

// =============================================================================
// gating
// =============================================================================

#[tokio::test]
async fn citizen_is_refused_user_list_before_any_request() {
    let session = session_with_role(Some(ROLE_CITIZEN));
    let client = unreachable_client(&session).await;
    let mut router = Router::dashboard(Arc::clone(&session));

    match run_api(&client, &mut router, ApiSubcommand::Users).await {
        Err(CliError::Denied { page, location }) => {
            assert_eq!(page, "/users");
            assert_eq!(location, HOME_PATH);
        }
        other => panic!("expected denial, got {other:?}"),
    }
    assert_eq!(router.current(), Some(HOME_PATH));
    assert_eq!(session.token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn anonymous_county_call_is_sent_to_login() {
    let session = session_with_role(None);
    let client = unreachable_client(&session).await;
    let mut router = Router::dashboard(Arc::clone(&session));

    let result = run_api(&client, &mut router, ApiSubcommand::Projects { county_id: 8 }).await;
    assert!(matches!(result, Err(CliError::Denied { ref location, .. }) if location == LOGIN_PATH));
}

#[tokio::test]
async fn admin_request_goes_out() {
    let session = session_with_role(Some(ROLE_ADMIN));
    let client = unreachable_client(&session).await;
    let mut router = Router::dashboard(Arc::clone(&session));

    let result = run_api(&client, &mut router, ApiSubcommand::Users).await;
    assert!(matches!(result, Err(CliError::Api(ApiError::Transport(_)))));
    assert_eq!(router.current(), Some("/users"));
}

#[test]
fn invalid_payload_is_reported() {
    assert!(matches!(parse_data("{not json"), Err(CliError::InvalidJson(_))));
    assert_eq!(parse_data(r#"{"name":"饮水工程"}"#).unwrap(), json!({ "name": "饮水工程" }));
}
