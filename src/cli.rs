use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::InMemoryCatalog;
use crate::config::Settings;
use crate::domain::FormSchema;
use crate::form::{FormEngine, FormError, LoadPhase};
use crate::search::{parse_query, SearchOrchestrator};

/// Formwright - schema-driven forms and smart search over local catalogs
#[derive(Parser, Debug, Clone)]
#[command(name = "formwright", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FORMWRIGHT_CONFIG", default_value = "formwright.toml")]
    pub config: PathBuf,

    /// Quiet window before a search is sent, in milliseconds
    #[arg(long, env = "FORMWRIGHT_DEBOUNCE_MS")]
    pub debounce_ms: Option<u64>,

    /// Upper bound for option loads and searches, in milliseconds
    #[arg(long, env = "FORMWRIGHT_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a form from a schema file and print its state
    Inspect {
        /// JSON or YAML form schema
        schema: PathBuf,

        /// Assign a field value, `key=value`; the value is read as JSON when it parses
        #[arg(long = "set", value_parser = parse_assignment)]
        assignments: Vec<(String, Value)>,
    },

    /// Print the filters a query parses into
    Parse {
        #[arg(long)]
        source: String,

        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Run one search against the configured catalog
    Search {
        #[arg(long)]
        source: String,

        #[arg(required = true)]
        query: Vec<String>,
    },
}

/// Parse a `key=value` assignment
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Execute `command` and return its JSON report
pub async fn run(command: &Command, settings: &Settings) -> anyhow::Result<Value> {
    match command {
        Command::Inspect {
            schema,
            assignments,
        } => inspect(schema, assignments, settings).await,
        Command::Parse { source, query } => {
            let source = lookup_source(settings, source)?;
            let filters = parse_query(&query.join(" "), source);
            Ok(serde_json::to_value(filters)?)
        }
        Command::Search { source, query } => search(source, &query.join(" "), settings).await,
    }
}

fn lookup_source<'a>(
    settings: &'a Settings,
    key: &str,
) -> anyhow::Result<&'a crate::domain::SearchSourceConfig> {
    settings
        .source(key)
        .ok_or_else(|| anyhow::anyhow!("Unknown search source '{}'", key))
}

async fn inspect(
    path: &Path,
    assignments: &[(String, Value)],
    settings: &Settings,
) -> anyhow::Result<Value> {
    let schema = FormSchema::from_path(path)?;
    let catalog = Arc::new(InMemoryCatalog::from_settings(settings));
    let mut engine = FormEngine::new(catalog).with_options_timeout(settings.options_timeout());
    engine.load_schema(&schema);
    engine.settled().await;

    let mut patch = Map::new();
    for (key, value) in assignments {
        if engine.control(key).is_none() {
            return Err(FormError::UnknownControl(key.clone()).into());
        }
        patch.insert(key.clone(), value.clone());
    }
    engine.patch_value(&patch);
    engine.settled().await;

    let errors: Map<String, Value> = engine
        .errors()
        .into_iter()
        .map(|(key, errors)| {
            let messages = errors.iter().map(|e| Value::String(e.to_string())).collect();
            (key, Value::Array(messages))
        })
        .collect();
    let mut fields = Map::new();
    for key in engine.keys() {
        if let Some(state) = engine.field_state(key) {
            if !state.options.is_empty() || state.phase != LoadPhase::Idle {
                fields.insert(key.clone(), serde_json::to_value(state)?);
            }
        }
    }

    Ok(json!({
        "title": schema.title,
        "value": engine.form_value(),
        "valid": engine.is_valid(),
        "errors": errors,
        "fields": fields,
    }))
}

async fn search(source: &str, query: &str, settings: &Settings) -> anyhow::Result<Value> {
    let source = lookup_source(settings, source)?.clone();
    let catalog = Arc::new(InMemoryCatalog::from_settings(settings));
    let orchestrator = SearchOrchestrator::new(source, catalog, settings.orchestrator_config());

    let mut rx = orchestrator.subscribe();
    orchestrator.update_query(query);
    if !query.trim().is_empty() {
        let _ = rx
            .wait_for(|s| s.has_completed_search || s.error_message.is_some())
            .await;
    }

    Ok(serde_json::to_value(orchestrator.state())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["formwright", "parse", "--source", "orgs", "ON:Apollo"]);
        assert_eq!(cli.config, PathBuf::from("formwright.toml"));
        assert!(cli.debounce_ms.is_none());
        assert!(cli.timeout_ms.is_none());
        assert!(matches!(
            cli.command,
            Command::Parse { ref source, ref query } if source == "orgs" && query == &["ON:Apollo"]
        ));
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "formwright",
            "--config",
            "custom.toml",
            "--debounce-ms",
            "250",
            "inspect",
            "form.json",
            "--set",
            "country=in",
            "--set",
            "age=42",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert_eq!(cli.debounce_ms, Some(250));
        let Command::Inspect {
            schema,
            assignments,
        } = cli.command
        else {
            panic!("expected inspect");
        };
        assert_eq!(schema, PathBuf::from("form.json"));
        assert_eq!(
            assignments,
            vec![
                ("country".to_string(), json!("in")),
                ("age".to_string(), json!(42)),
            ]
        );
    }

    #[test]
    fn test_multi_word_query() {
        let cli = Cli::parse_from(["formwright", "search", "--source", "orgs", "ON:Apollo", "!MN:1"]);
        let Command::Search { query, .. } = cli.command else {
            panic!("expected search");
        };
        assert_eq!(query.join(" "), "ON:Apollo !MN:1");
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("a=b").unwrap(), ("a".to_string(), json!("b")));
        assert_eq!(parse_assignment("flag=true").unwrap().1, json!(true));
        assert_eq!(parse_assignment("list=[1,2]").unwrap().1, json!([1, 2]));
        assert_eq!(parse_assignment("eq=x=y").unwrap().1, json!("x=y"));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    const ADDRESS_FORM: &str = r#"{
        "title": "Address",
        "rows": [{ "columns": [
            { "field": { "key": "country", "type": "select", "api": { "endpoint": "countries" } } },
            { "field": { "key": "state", "type": "select",
                "api": { "endpoint": "states", "dependency": "country" } } }
        ] }]
    }"#;

    fn address_settings() -> Settings {
        let catalog = |endpoint: &str, records: Value| crate::config::CatalogConfig {
            endpoint: endpoint.to_string(),
            records: serde_json::from_value(records).unwrap(),
        };
        Settings {
            catalogs: vec![
                catalog("countries", json!([{"label": "India", "value": "in"}])),
                catalog(
                    "states",
                    json!([
                        {"label": "Kerala", "value": "kl", "parent": "in"},
                        {"label": "Texas", "value": "tx", "parent": "us"}
                    ]),
                ),
            ],
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_inspect_keeps_dependent_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address.json");
        std::fs::write(&path, ADDRESS_FORM).unwrap();

        // the dependent is assigned before its parent on purpose
        let command = Command::Inspect {
            schema: path,
            assignments: vec![
                ("state".to_string(), json!("kl")),
                ("country".to_string(), json!("in")),
            ],
        };
        let report = run(&command, &address_settings()).await.unwrap();

        assert_eq!(report["value"], json!({"country": "in", "state": "kl"}));
        assert_eq!(report["fields"]["state"]["phase"], json!("loaded"));
        assert_eq!(report["fields"]["state"]["options"][0]["label"], json!("Kerala"));
    }

    #[tokio::test]
    async fn test_inspect_unknown_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address.json");
        std::fs::write(&path, ADDRESS_FORM).unwrap();

        let command = Command::Inspect {
            schema: path,
            assignments: vec![("ghost".to_string(), json!(1))],
        };
        let err = run(&command, &address_settings()).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_parse_command_unknown_source() {
        let command = Command::Parse {
            source: "ghost".to_string(),
            query: vec!["x".to_string()],
        };
        let err = run(&command, &Settings::default()).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
