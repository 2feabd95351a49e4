use super::*;

#[test]
fn dashboard_table_declares_admin_pages() {
    let table = RouteTable::dashboard();
    for path in ["/alerts", "/users"] {
        let route = table.find(path).unwrap();
        assert!(route.requires_auth, "{path} should require auth");
        assert_eq!(route.roles, vec![ROLE_ADMIN.to_owned()]);
    }
}

#[test]
fn dashboard_table_public_pages_have_no_requirements() {
    let table = RouteTable::dashboard();
    for path in [HOME_PATH, LOGIN_PATH, REGISTER_PATH] {
        let route = table.find(path).unwrap();
        assert!(!route.requires_auth);
        assert!(route.roles.is_empty());
    }
}

#[test]
fn analysis_allows_every_named_role() {
    let route = RouteTable::dashboard().find("/analysis").cloned().unwrap();
    assert!(route.allows_role(ROLE_CITIZEN));
    assert!(route.allows_role(ROLE_ANALYST));
    assert!(route.allows_role(ROLE_ADMIN));
    assert!(!route.allows_role("普通用户"));
}

#[test]
fn root_aliases_to_home() {
    let table = RouteTable::dashboard();
    assert_eq!(table.resolve_alias("/"), HOME_PATH);
    assert_eq!(table.resolve_alias("/county"), "/county");
}

#[test]
fn unknown_path_has_no_route() {
    assert!(RouteTable::dashboard().find("/dashboard").is_none());
}

#[test]
fn normalize_path_strips_query_fragment_and_trailing_slash() {
    assert_eq!(normalize_path("/county/?id=3"), "/county");
    assert_eq!(normalize_path("alerts#top"), "/alerts");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path(""), "/");
}
