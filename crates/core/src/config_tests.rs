use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"
template: ./template.txt
strict: true
orgs:
  - name: acme
    allBranches: true
    uniqueOnly: true
repos:
  - name: acme/widgets
    token: ghp_explicit
    branches: [main, release-1.x]
  - name: corp/platform
    enterpriseUrl: https://github.corp.example.com
reports:
  - signatures:
      - username: alice
      - username: alice-corp
        enterpriseUrl: https://github.corp.example.com
    outputDir: ./reports/alice
    extraFields:
      employeeName: Alice Example
  - signatures:
      - username: bob
"#;

#[test]
fn test_parse_full_config() {
    let config = Config::from_yaml(FULL_CONFIG).expect("config should parse");

    assert_eq!(config.template.as_deref(), Some("./template.txt"));
    assert!(config.strict);

    assert_eq!(config.orgs.len(), 1);
    assert!(config.orgs[0].all_branches);
    assert!(config.orgs[0].unique_only);
    assert!(config.orgs[0].branches.is_empty());

    assert_eq!(config.repos[0].token, "ghp_explicit");
    assert_eq!(config.repos[0].branches, vec!["main", "release-1.x"]);
    assert_eq!(
        config.repos[1].enterprise_url,
        "https://github.corp.example.com"
    );

    let alice = &config.reports[0];
    assert_eq!(alice.signatures.len(), 2);
    assert_eq!(alice.output_dir, "./reports/alice");
    assert_eq!(
        alice.extra_fields.get("employeeName").map(String::as_str),
        Some("Alice Example")
    );
    assert_eq!(alice.display_name(), "alice, alice-corp");

    // missing outputDir falls back to the working directory
    assert_eq!(config.reports[1].output_dir, ".");
}

#[test]
fn test_minimal_config_defaults() {
    let config = Config::from_yaml("repos:\n  - name: acme/widgets\n").expect("config should parse");

    assert_eq!(config.template, None);
    assert!(!config.strict);
    assert!(config.orgs.is_empty());
    assert!(config.reports.is_empty());

    let repo = &config.repos[0];
    assert!(repo.token.is_empty());
    assert!(repo.enterprise_url.is_empty());
    assert!(!repo.all_branches);
    assert!(!repo.unique_only);
}

#[test]
fn test_hosts_lists_each_host_once() {
    let config = Config::from_yaml(FULL_CONFIG).expect("config should parse");

    let hosts: Vec<String> = config.hosts().into_iter().collect();

    assert_eq!(
        hosts,
        vec![
            String::new(),
            "https://github.corp.example.com".to_string()
        ]
    );
}

#[test]
fn test_org_and_repo() {
    let remote = |name: &str| Remote {
        name: name.to_string(),
        ..Default::default()
    };

    assert_eq!(remote("acme/widgets").org_and_repo(), Some(("acme", "widgets")));
    assert_eq!(remote("acme").org_and_repo(), None);
    assert_eq!(remote("acme/").org_and_repo(), None);
    assert_eq!(remote("/widgets").org_and_repo(), None);
    assert_eq!(remote("acme/widgets/extra").org_and_repo(), None);
}

#[test]
fn test_invalid_repo_name_is_rejected() {
    let result = Config::from_yaml("repos:\n  - name: widgets\n");

    assert!(matches!(result, Err(ConfigLoadError::Invalid(msg)) if msg.contains("widgets")));
}

#[test]
fn test_org_name_with_slash_is_rejected() {
    let result = Config::from_yaml("orgs:\n  - name: acme/widgets\n");

    assert!(matches!(result, Err(ConfigLoadError::Invalid(_))));
}

#[test]
fn test_report_without_signatures_is_rejected() {
    let result = Config::from_yaml("reports:\n  - outputDir: ./out\n");

    assert!(matches!(result, Err(ConfigLoadError::Invalid(msg)) if msg.contains("#1")));
}

#[test]
fn test_signature_without_username_is_rejected() {
    let yaml = "reports:\n  - signatures:\n      - enterpriseUrl: https://ghe.example.com\n";

    // username is required by serde
    assert!(matches!(
        Config::from_yaml(yaml),
        Err(ConfigLoadError::Yaml(_))
    ));

    let yaml = "reports:\n  - signatures:\n      - username: \"\"\n";
    assert!(matches!(
        Config::from_yaml(yaml),
        Err(ConfigLoadError::Invalid(_))
    ));
}

#[test]
fn test_load_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", FULL_CONFIG).unwrap();

    let config = load_config(file.path()).expect("config should load");

    assert_eq!(config.reports.len(), 2);
}

#[test]
fn test_load_config_file_not_found() {
    let dir = tempfile::tempdir().unwrap();

    let result = load_config(dir.path().join(DEFAULT_CONFIG_FILE));

    assert!(matches!(result, Err(ConfigLoadError::NotFound(_))));
}

#[test]
fn test_load_config_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "repos: [name: acme/widgets").unwrap();

    let result = load_config(file.path());

    assert!(matches!(result, Err(ConfigLoadError::Yaml(_))));
}
