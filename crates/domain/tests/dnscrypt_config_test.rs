use ferrous_dnscrypt_domain::config::dnscrypt::{parse_provider_address, ProviderEntry};
use ferrous_dnscrypt_domain::config::LogFormat;
use ferrous_dnscrypt_domain::{CliOverrides, Config, ConfigError};

const SIGNING_KEY: &str =
    "B735:1140:206F:225D:3E2B:D822:D7FD:691E:A1C3:3CC8:D666:8D0C:BE04:BFAB:CA43:FB79";

fn provider_entry(address: &str) -> ProviderEntry {
    ProviderEntry {
        name: "example".to_string(),
        provider_name: "2.dnscrypt-cert.example.org".to_string(),
        public_key: SIGNING_KEY.to_string(),
        address: address.to_string(),
        tcp_only: false,
        dnssec: true,
        no_logs: true,
    }
}

#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.server.dns_port, 53);
    assert_eq!(config.server.bind_address, "0.0.0.0");
    assert_eq!(config.upstream.protocol, "udp");
    assert_eq!(config.upstream.query_timeout_ms, 3000);
    assert!(config.dnscrypt.ephemeral_keys);
    assert_eq!(config.dnscrypt.status_interval_secs, 420);
    assert!(config.dnscrypt.providers.is_empty());
    assert!(config.dnscrypt.server.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_parses_providers_from_toml() {
    let toml_str = r#"
        [upstream]
        servers = []

        [dnscrypt]
        ephemeral_keys = false

        [[dnscrypt.providers]]
        name = "example"
        provider_name = "2.dnscrypt-cert.example.org"
        public_key = "B735:1140:206F:225D:3E2B:D822:D7FD:691E:A1C3:3CC8:D666:8D0C:BE04:BFAB:CA43:FB79"
        address = "192.0.2.10"
        no_logs = true
    "#;

    let config = Config::from_toml(toml_str).unwrap();
    assert!(!config.dnscrypt.ephemeral_keys);
    assert!(config.validate().is_ok());

    let providers = config.dnscrypt.resolve_providers().unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].address.port(), 443);
    assert_eq!(providers[0].id(), "192.0.2.10:443");
    assert_eq!(providers[0].signing_key_fingerprint(), SIGNING_KEY);
    assert!(providers[0].no_logs);
    assert!(!providers[0].tcp_only);
}

#[test]
fn test_provider_with_bad_key_is_rejected() {
    let mut entry = provider_entry("192.0.2.10:5353");
    entry.public_key = "B735:1140".to_string();

    match entry.to_provider() {
        Err(ConfigError::Provider(name, _)) => assert_eq!(name, "example"),
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_provider_addresses_fail_validation() {
    let mut config = Config::default();
    config.dnscrypt.providers = vec![
        provider_entry("192.0.2.10"),
        provider_entry("192.0.2.10:443"),
    ];

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Provider(_, _))
    ));
}

#[test]
fn test_parse_provider_address_variants() {
    assert_eq!(
        parse_provider_address("192.0.2.1").unwrap().to_string(),
        "192.0.2.1:443"
    );
    assert_eq!(
        parse_provider_address("192.0.2.1:5443").unwrap().port(),
        5443
    );
    assert_eq!(
        parse_provider_address("[2001:db8::1]").unwrap().to_string(),
        "[2001:db8::1]:443"
    );
    assert!(parse_provider_address("not-an-ip").is_none());
}

#[test]
fn test_provider_entry_round_trips_through_domain_type() {
    let entry = provider_entry("192.0.2.10:443");
    let provider = entry.to_provider().unwrap();
    assert_eq!(ProviderEntry::from(&provider), entry);
}

#[test]
fn test_cli_overrides_enable_serving() {
    let config = Config::load(
        Some("/nonexistent/ferrous-dnscrypt.toml"),
        CliOverrides::default(),
    );
    assert!(matches!(config, Err(ConfigError::FileRead(_, _))));

    let mut config = Config::from_toml("").unwrap();
    let overrides = CliOverrides {
        dns_port: Some(5353),
        server_name: Some("2.dnscrypt-cert.local".to_string()),
        server_public_key_file: Some("pk.bin".to_string()),
        server_secret_key_file: Some("sk.bin".to_string()),
        server_certificate_file: Some("cert.bin".to_string()),
        ..Default::default()
    };
    let dir = std::env::temp_dir().join(format!("ferrous-dnscrypt-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    config.server.dns_port = 53;
    config.save(path.to_str().unwrap()).unwrap();

    let loaded = Config::load(path.to_str(), overrides).unwrap();
    assert_eq!(loaded.server.dns_port, 5353);
    let server = loaded.dnscrypt.server.expect("serving configured");
    assert_eq!(server.provider_name, "2.dnscrypt-cert.local");
    assert_eq!(server.certificate_file, "cert.bin");

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_partial_server_overrides_require_all_files() {
    let dir = std::env::temp_dir().join(format!("ferrous-dnscrypt-partial-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    Config::default().save(path.to_str().unwrap()).unwrap();

    let overrides = CliOverrides {
        server_name: Some("2.dnscrypt-cert.local".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        Config::load(path.to_str(), overrides),
        Err(ConfigError::Validation(_))
    ));

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_logging_section_parses_format_and_level() {
    let config = Config::from_toml(
        r#"
        [logging]
        level = "debug"
        format = "json"
        "#,
    )
    .unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(config.validate().is_ok());
    assert_eq!(Config::default().logging.format, LogFormat::Text);

    let directives = Config::from_toml(
        r#"
        [logging]
        level = "warn,ferrous_dnscrypt_jobs=debug"
        "#,
    )
    .unwrap();
    assert!(directives.validate().is_ok());
}

#[test]
fn test_unknown_log_level_fails_validation() {
    let mut config = Config::default();
    config.logging.level = "chatty".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

    assert!(Config::from_toml("[logging]\nformat = \"xml\"\n").is_err());
}
