#![allow(clippy::expect_used, clippy::unwrap_used)]

use cic_wave::{Credentials, WaveConfig, WavePipeline};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

fn jenkins_build(number: u64, timestamp: i64, duration: i64, parameters: Value) -> Value {
    json!({
        "_class": "hudson.model.FreeStyleBuild",
        "number": number,
        "timestamp": timestamp,
        "duration": duration,
        "actions": [
            {"_class": "hudson.model.CauseAction"},
            {"_class": "hudson.model.ParametersAction", "parameters": parameters}
        ]
    })
}

fn component_history() -> Value {
    let params = |instance: &str| {
        json!([
            {"name": "INSTANCE", "value": instance},
            {"name": "EPM_VERSION", "value": "1.00.201721.01"},
            {"name": "SAP_PASSWORD", "value": "component-secret"}
        ])
    };
    json!({
        "_class": "hudson.model.FreeStyleProject",
        "allBuilds": [
            jenkins_build(41, 100_000, 5_000, params("epmprod81")),
            jenkins_build(42, 200_000, 5_000, params("epmprod82")),
            jenkins_build(43, 50_000, 1_000, json!([{"name": "SAP_PASSWORD", "value": "component-secret"}]))
        ]
    })
}

fn application_history() -> Value {
    let params = |instance: &str| {
        json!([
            {"name": "INSTANCE", "value": instance},
            {"name": "FPA_DU_DIR", "value": "/net/dropzone/EPM_FPA/rel/2017.21"},
            {"name": "HANA_PASSWORD", "value": "application-secret"}
        ])
    };
    json!({
        "_class": "hudson.model.FreeStyleProject",
        "allBuilds": [
            jenkins_build(7, 300_000, 700_000, params("epmprod81")),
            jenkins_build(8, 250_000, 110_000, params("epmprod82"))
        ]
    })
}

async fn mount_jenkins(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/job/Cloud/job/HCP_Component_Update/api/json"))
        .and(query_param("depth", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_history()))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/Cloud/job/Cloud_system_admin/api/json"))
        .and(query_param("depth", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(application_history()))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_cic(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "JSESSIONID=wave; Path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/TMS/systems"))
        .and(query_param("enforce_complete_results", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"details": {"name": "epmprod81", "updateGroup": "Group1-EU"}},
            {"details": {"name": "epmprod82", "updateGroup": "Group1-EU"}},
            {"details": {"name": "epmprod40", "updateGroup": "Canary"}}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn run_fetches_groups_and_measures_wave() {
    let server = MockServer::start().await;
    mount_jenkins(&server).await;
    mount_cic(&server).await;

    let snapshots = tempfile::tempdir().unwrap();
    let config = WaveConfig {
        jenkins_url: server.uri(),
        cic_url: server.uri(),
        snapshot_dir: snapshots.path().to_path_buf(),
        report_groups: vec!["Group1-EU".to_string()],
        instances: vec!["epmprod82".to_string()],
        ..WaveConfig::default()
    };
    let credentials = Credentials::parse("I852047:pa55word").unwrap();
    let pipeline = WavePipeline::new(config).unwrap();

    let analysis = pipeline.run(&credentials).await.unwrap();

    assert!(analysis.is_complete());
    let lines: Vec<String> = analysis.reports.iter().map(ToString::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "Total Group1-EU update time for wave 2017.21: 15 min".to_string(),
            "epmprod82 update time for wave 2017.21: 3 min".to_string(),
        ]
    );
    assert_eq!(analysis.reports[0].invalid_downstream_builds, 1);

    let dir = snapshots.path();
    let raw = std::fs::read_to_string(dir.join("epm log - origin.json")).unwrap();
    assert!(raw.contains("component-secret"));
    for sanitized in ["epm log.json", "fpa log.json"] {
        let text = std::fs::read_to_string(dir.join(sanitized)).unwrap();
        assert!(!text.contains("secret"), "{sanitized} still holds credentials");
    }

    let groups: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("group info.json")).unwrap())
            .unwrap();
    assert_eq!(groups, json!({"Group1-EU": ["epmprod81", "epmprod82"]}));
    assert!(dir.join("Group1-EU - 2017.21.json").is_file());
    assert!(dir.join("epmprod82 - 1.00.201721.01 - invalid.json").is_file());
}

#[tokio::test]
async fn jenkins_failure_stops_the_run() {
    let server = MockServer::start().await;
    mount_cic(&server).await;
    Mock::given(method("GET"))
        .and(path("/job/Cloud/job/Cloud_system_admin/api/json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/Cloud/job/HCP_Component_Update/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(component_history()))
        .mount(&server)
        .await;

    let snapshots = tempfile::tempdir().unwrap();
    let config = WaveConfig {
        jenkins_url: server.uri(),
        cic_url: server.uri(),
        snapshot_dir: snapshots.path().to_path_buf(),
        ..WaveConfig::default()
    };
    let credentials = Credentials::parse("user:pass").unwrap();
    let pipeline = WavePipeline::new(config).unwrap();

    let err = pipeline.run(&credentials).await.unwrap_err();

    assert!(err.to_string().contains("HTTP 403"), "{err}");
    assert!(!snapshots.path().join("fpa log.json").exists());
}
