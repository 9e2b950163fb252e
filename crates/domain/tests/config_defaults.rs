use rh_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 7009);
}

#[test]
fn empty_file_yields_working_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.auth.expected_issuer, "slxx");
    assert_eq!(config.dispatch.permitted_org_level, "Department");
    assert_eq!(config.dispatch.timezone, "America/New_York");
    assert_eq!(config.resolver.num_perm, 64);
    assert_eq!(config.resolver.shingle_size, 3);
    assert!((config.resolver.threshold - 0.1).abs() < f64::EPSILON);
    assert_eq!(config.resolver.max_results, 10);
    assert_eq!(config.planner.seed, Some(42));
    assert!(config.validate().is_empty());
}

#[test]
fn sections_parse_independently() {
    let toml_str = r#"
[staffing]
base_url = "https://staffing.example.com"
max_attempts = 5

[dispatch]
history_exchanges = 4

[pool]
max_queued = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.staffing.base_url, "https://staffing.example.com");
    assert_eq!(config.staffing.max_attempts, 5);
    assert_eq!(config.staffing.backoff_ms, 300);
    assert_eq!(config.dispatch.history_exchanges, 4);
    assert_eq!(config.dispatch.snapshot_capacity, 3);
    assert_eq!(config.pool.max_queued, 0);
}

#[test]
fn cors_config_parses_custom_origins() {
    let toml_str = r#"
[server.cors]
allowed_origins = ["https://myapp.com", "http://localhost:3000"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.cors.allowed_origins.len(), 2);
    assert!(config.server.cors.allowed_origins.contains(&"https://myapp.com".to_string()));
}
