use formwright::adapters::InMemoryCatalog;
use formwright::domain::{
    AutoCompleteSearchString, ConditionalOperator, SearchFieldConfig, SearchSourceConfig,
    WildcardOperator,
};
use formwright::search::{parse_query, OrchestratorConfig, SearchOrchestrator};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn source() -> SearchSourceConfig {
    SearchSourceConfig::new("organizations", "org/search")
        .with_field(SearchFieldConfig::new("ON", "org_name").with_label("Organization Name"))
        .with_field(SearchFieldConfig::new("MN", "mobile_no").allow_not())
        .with_field(SearchFieldConfig::new("CT", "city").with_wildcard(WildcardOperator::StartsWith))
}

fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::new().with_records(
        "org/search",
        vec![
            json!({"org_name": "Apollo Hospitals", "mobile_no": "98765", "city": "Chennai"}),
            json!({"org_name": "Apollo Clinic", "mobile_no": "12345", "city": "Bangalore"}),
            json!({"org_name": "Fortis", "mobile_no": "55555", "city": "Bangalore"}),
        ],
    ))
}

async fn settle(orchestrator: &SearchOrchestrator) {
    tokio::time::sleep(Duration::from_millis(500)).await;
    let mut rx = orchestrator.subscribe();
    let _ = rx.wait_for(|s| !s.is_loading).await;
}

#[test]
fn test_parse_mixed_query() {
    let filters = parse_query("ON:Apollo !MN:12345 ZZ:x ct:Ban", &source());

    assert_eq!(
        filters,
        vec![
            AutoCompleteSearchString {
                parameter_name: "org_name".to_string(),
                parameter_code: "ON".to_string(),
                conditional_operator: ConditionalOperator::And,
                wildcard_operator: WildcardOperator::Contains,
                parameter_value: "Apollo".to_string(),
            },
            AutoCompleteSearchString {
                parameter_name: "mobile_no".to_string(),
                parameter_code: "MN".to_string(),
                conditional_operator: ConditionalOperator::Not,
                wildcard_operator: WildcardOperator::Contains,
                parameter_value: "12345".to_string(),
            },
            AutoCompleteSearchString {
                parameter_name: "city".to_string(),
                parameter_code: "CT".to_string(),
                conditional_operator: ConditionalOperator::And,
                wildcard_operator: WildcardOperator::StartsWith,
                parameter_value: "Ban".to_string(),
            },
        ]
    );
}

#[test]
fn test_filters_serialize_to_wire_format() {
    let filters = parse_query("!MN:12345", &source());
    assert_eq!(
        serde_json::to_value(&filters).unwrap(),
        json!([{
            "parameter_name": "mobile_no",
            "parameter_code": "MN",
            "conditional_operator": "NOT",
            "wildcard_operator": "CONTAINS",
            "parameter_value": "12345"
        }])
    );
}

#[tokio::test(start_paused = true)]
async fn test_search_against_catalog() {
    let orchestrator = SearchOrchestrator::new(source(), catalog(), OrchestratorConfig::default());

    orchestrator.update_query("ON:Apollo !MN:12345");
    settle(&orchestrator).await;

    assert!(orchestrator.has_completed_search());
    assert!(orchestrator.error_message().is_none());
    let items = orchestrator.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["org_name"], "Apollo Hospitals");
}

#[tokio::test(start_paused = true)]
async fn test_positional_query_uses_first_field() {
    let orchestrator = SearchOrchestrator::new(source(), catalog(), OrchestratorConfig::default());

    orchestrator.update_query("fortis");
    settle(&orchestrator).await;

    assert_eq!(orchestrator.items().len(), 1);
    assert_eq!(orchestrator.items()[0]["city"], "Bangalore");
}

#[tokio::test(start_paused = true)]
async fn test_base_filters_are_prepended() {
    let mut source = source();
    source.base_filters.push(AutoCompleteSearchString {
        parameter_name: "city".to_string(),
        parameter_code: "CT".to_string(),
        conditional_operator: ConditionalOperator::And,
        wildcard_operator: WildcardOperator::Exact,
        parameter_value: "bangalore".to_string(),
    });
    let orchestrator = SearchOrchestrator::new(source, catalog(), OrchestratorConfig::default());

    orchestrator.update_query("Apollo");
    settle(&orchestrator).await;

    let items = orchestrator.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["org_name"], "Apollo Clinic");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_endpoint_surfaces_error() {
    let source = SearchSourceConfig::new("ghost", "nowhere")
        .with_field(SearchFieldConfig::new("ON", "org_name"));
    let orchestrator = SearchOrchestrator::new(source, catalog(), OrchestratorConfig::default());

    orchestrator.update_query("Apollo");
    settle(&orchestrator).await;

    assert!(!orchestrator.has_completed_search());
    assert!(orchestrator.items().is_empty());
    let message = orchestrator.error_message().unwrap();
    assert!(message.contains("nowhere"));
}

#[tokio::test(start_paused = true)]
async fn test_custom_debounce_window() {
    let config = OrchestratorConfig {
        debounce: Duration::from_millis(100),
        timeout: None,
    };
    let orchestrator = SearchOrchestrator::new(source(), catalog(), config);

    orchestrator.update_query("Apollo");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!orchestrator.has_completed_search());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(orchestrator.has_completed_search());
    assert_eq!(orchestrator.items().len(), 2);
}
