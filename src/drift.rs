//! Desired-state reconciliation: compose document vs observed containers.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::container::{ContainerInfo, ContainerState};
use crate::error::Error;
use crate::messages::{MessageCatalog, render};

pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
const DEFAULT_PROJECT_NAME: &str = "default";

/// The subset of the compose format this detector reasons about. Unknown
/// keys are ignored by serde, so full compose files parse fine.
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub name: Option<String>,
    /// Document order is kept: drift entries are emitted per service in the
    /// order the compose file declares them.
    pub services: IndexMap<String, ComposeService>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeService {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub deploy: Option<DeploySection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploySection {
    #[serde(default)]
    pub replicas: Option<u64>,
}

impl ComposeService {
    fn replicas(&self) -> u64 {
        self.deploy.as_ref().and_then(|d| d.replicas).unwrap_or(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    Synced,
    Drifted,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    NotRunning,
    ExtraContainer,
    ReplicaMismatch,
    ImageMismatch,
}

impl DriftType {
    fn as_str(&self) -> &'static str {
        match self {
            DriftType::NotRunning => "not_running",
            DriftType::ExtraContainer => "extra_container",
            DriftType::ReplicaMismatch => "replica_mismatch",
            DriftType::ImageMismatch => "image_mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDrift {
    pub service_name: String,
    pub drift_type: DriftType,
    pub expected: Value,
    pub actual: Value,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub timestamp: String,
    pub compose_file: String,
    pub status: DriftStatus,
    pub differences: Vec<ServiceDrift>,
    pub untracked: Vec<ContainerInfo>,
    pub summary: String,
}

/// Reads and parses the desired-state document. A missing file and an
/// unparseable file surface as distinct error kinds; neither is retried.
pub fn load_compose_file(path: &Path) -> Result<ComposeFile, Error> {
    if !path.exists() {
        return Err(Error::NotFound(format!("compose file {}", path.display())));
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::Internal(e.to_string()))?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::Parse(format!("compose file {}: {e}", path.display())))
}

/// Compares the desired services against the observed containers.
///
/// Matching is computed independently per service; a container may satisfy
/// more than one service. The per-service match sets are unioned afterwards
/// to find untracked containers.
pub fn detect_drift(
    compose: &ComposeFile,
    source: &str,
    containers: &[ContainerInfo],
    project_name: Option<&str>,
    catalog: &MessageCatalog,
) -> DriftReport {
    let project = project_name
        .or(compose.name.as_deref())
        .unwrap_or(DEFAULT_PROJECT_NAME);

    let mut differences = Vec::new();
    let mut tracked_ids: HashSet<&str> = HashSet::new();

    for (service_name, service) in &compose.services {
        let Some(image) = service.image.as_deref() else {
            // Build-based and image-less services are out of scope.
            log::warn!("service {service_name} declares no image, skipping");
            continue;
        };

        let matched: Vec<&ContainerInfo> = containers
            .iter()
            .filter(|container| matches_service(container, service_name, project, service))
            .collect();
        tracked_ids.extend(matched.iter().map(|container| container.id.as_str()));

        let expected_replicas = service.replicas();
        let running = matched
            .iter()
            .filter(|container| container.state == ContainerState::Running)
            .count() as u64;

        if matched.is_empty() {
            differences.push(ServiceDrift {
                service_name: service_name.clone(),
                drift_type: DriftType::NotRunning,
                expected: json!({ "replicas": expected_replicas, "status": "running" }),
                actual: json!({ "replicas": 0, "status": "stopped" }),
                message: render(
                    &catalog.drift_not_running,
                    &[("service", service_name.clone())],
                ),
            });
        } else if running < expected_replicas {
            differences.push(ServiceDrift {
                service_name: service_name.clone(),
                drift_type: DriftType::ReplicaMismatch,
                expected: json!({ "replicas": expected_replicas }),
                actual: json!({ "replicas": running }),
                message: render(
                    &catalog.drift_replica_mismatch,
                    &[
                        ("service", service_name.clone()),
                        ("expected", expected_replicas.to_string()),
                        ("actual", running.to_string()),
                    ],
                ),
            });
        }

        // Image check against the first matched container only.
        if let Some(first) = matched.first()
            && !image_matches(&first.image, image)
        {
            differences.push(ServiceDrift {
                service_name: service_name.clone(),
                drift_type: DriftType::ImageMismatch,
                expected: json!({ "image": image }),
                actual: json!({ "image": first.image }),
                message: render(
                    &catalog.drift_image_mismatch,
                    &[("service", service_name.clone())],
                ),
            });
        }
    }

    let untracked: Vec<ContainerInfo> = containers
        .iter()
        .filter(|container| !tracked_ids.contains(container.id.as_str()))
        .cloned()
        .collect();
    for container in &untracked {
        differences.push(ServiceDrift {
            service_name: container.name.clone(),
            drift_type: DriftType::ExtraContainer,
            expected: json!({}),
            actual: json!({ "name": container.name }),
            message: render(
                &catalog.drift_extra_container,
                &[("container", container.name.clone())],
            ),
        });
    }

    let status = if differences.is_empty() {
        DriftStatus::Synced
    } else {
        DriftStatus::Drifted
    };
    let summary = summarize(&differences, catalog);

    DriftReport {
        timestamp: Utc::now().to_rfc3339(),
        compose_file: source.to_string(),
        status,
        differences,
        untracked,
        summary,
    }
}

/// Match rules in fixed priority order: compose service label, declared
/// container name, then the "{project}-{service}" name prefix.
fn matches_service(
    container: &ContainerInfo,
    service_name: &str,
    project: &str,
    service: &ComposeService,
) -> bool {
    if container
        .labels
        .get(COMPOSE_SERVICE_LABEL)
        .is_some_and(|label| label == service_name)
    {
        return true;
    }
    if service
        .container_name
        .as_deref()
        .is_some_and(|name| name == container.name)
    {
        return true;
    }
    container
        .name
        .starts_with(&format!("{project}-{service_name}"))
}

/// Tagless references are equivalent to ":latest".
fn image_matches(actual: &str, expected: &str) -> bool {
    normalize_image(actual) == normalize_image(expected)
}

fn normalize_image(image: &str) -> String {
    if image.contains(':') {
        image.to_string()
    } else {
        format!("{image}:latest")
    }
}

fn summarize(differences: &[ServiceDrift], catalog: &MessageCatalog) -> String {
    if differences.is_empty() {
        return catalog.drift_synced.clone();
    }
    let mut parts = Vec::new();
    for drift_type in [
        DriftType::NotRunning,
        DriftType::ExtraContainer,
        DriftType::ReplicaMismatch,
        DriftType::ImageMismatch,
    ] {
        let count = differences
            .iter()
            .filter(|drift| drift.drift_type == drift_type)
            .count();
        if count > 0 {
            parts.push(format!("{}: {count}", drift_type.as_str()));
        }
    }
    render(&catalog.drift_summary, &[("details", parts.join(", "))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn catalog() -> MessageCatalog {
        MessageCatalog::default()
    }

    fn container(name: &str, image: &str, state: ContainerState) -> ContainerInfo {
        ContainerInfo {
            id: format!("{name:0<12}").chars().take(12).collect(),
            name: name.to_string(),
            image: image.to_string(),
            state,
            status: String::new(),
            created: String::new(),
            ports: HashMap::new(),
            labels: HashMap::new(),
        }
    }

    fn labeled(mut info: ContainerInfo, service: &str) -> ContainerInfo {
        info.labels
            .insert(COMPOSE_SERVICE_LABEL.to_string(), service.to_string());
        info
    }

    fn compose(yaml: &str) -> ComposeFile {
        serde_yaml::from_str(yaml).expect("valid compose yaml")
    }

    #[test]
    fn parses_compose_subset_and_defaults() {
        let compose = compose(
            r#"
name: shop
services:
  web:
    image: nginx:1.25
    deploy:
      replicas: 2
  worker:
    image: worker
  builder:
    build: .
"#,
        );
        assert_eq!(compose.name.as_deref(), Some("shop"));
        assert_eq!(compose.services["web"].replicas(), 2);
        assert_eq!(compose.services["worker"].replicas(), 1);
        assert_eq!(compose.services["builder"].image, None);
    }

    #[test]
    fn missing_compose_file_is_not_found() {
        let err = load_compose_file(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn image_and_replica_mismatch_are_both_reported() {
        let compose = compose(
            r#"
services:
  web:
    image: "nginx:1.25"
    deploy:
      replicas: 2
"#,
        );
        let containers = vec![labeled(
            container("web-1", "nginx:1.24", ContainerState::Running),
            "web",
        )];
        let report = detect_drift(&compose, "docker-compose.yml", &containers, None, &catalog());

        assert_eq!(report.status, DriftStatus::Drifted);
        let types: Vec<DriftType> = report
            .differences
            .iter()
            .map(|drift| drift.drift_type)
            .collect();
        assert_eq!(
            types,
            vec![DriftType::ReplicaMismatch, DriftType::ImageMismatch]
        );
        assert!(report.untracked.is_empty());
    }

    #[test]
    fn unmatched_service_and_extra_container() {
        let compose = compose(
            r#"
services:
  api:
    image: api:1
"#,
        );
        let containers = vec![container("random-task", "busybox", ContainerState::Running)];
        let report = detect_drift(&compose, "compose.yml", &containers, None, &catalog());

        let types: Vec<DriftType> = report
            .differences
            .iter()
            .map(|drift| drift.drift_type)
            .collect();
        assert_eq!(
            types,
            vec![DriftType::NotRunning, DriftType::ExtraContainer]
        );
        assert_eq!(report.untracked.len(), 1);
        assert_eq!(report.untracked[0].name, "random-task");
        assert_eq!(report.status, DriftStatus::Drifted);
    }

    #[test]
    fn synced_when_everything_matches() {
        let compose = compose(
            r#"
services:
  web:
    image: nginx
"#,
        );
        let containers = vec![labeled(
            container("web-1", "nginx:latest", ContainerState::Running),
            "web",
        )];
        let report = detect_drift(&compose, "compose.yml", &containers, None, &catalog());
        assert_eq!(report.status, DriftStatus::Synced);
        assert!(report.differences.is_empty());
        assert_eq!(report.summary, catalog().drift_synced);
    }

    #[test]
    fn matches_by_container_name_and_project_prefix() {
        let service_with_name: ComposeService = serde_yaml::from_str(
            "image: redis\ncontainer_name: cache-primary\n",
        )
        .unwrap();
        let by_name = container("cache-primary", "redis", ContainerState::Running);
        assert!(matches_service(
            &by_name,
            "cache",
            "default",
            &service_with_name
        ));

        let plain: ComposeService = serde_yaml::from_str("image: redis\n").unwrap();
        let by_prefix = container("shop-cache-1", "redis", ContainerState::Running);
        assert!(matches_service(&by_prefix, "cache", "shop", &plain));
        assert!(!matches_service(&by_prefix, "cache", "other", &plain));
    }

    #[test]
    fn project_name_defaults_follow_priority() {
        let compose_with_name = compose(
            r#"
name: shop
services:
  cache:
    image: redis
"#,
        );
        let containers = vec![container("shop-cache-1", "redis", ContainerState::Running)];
        // Document name used when no explicit project is given.
        let report = detect_drift(
            &compose_with_name,
            "compose.yml",
            &containers,
            None,
            &catalog(),
        );
        assert_eq!(report.status, DriftStatus::Synced);

        // An explicit project overrides the document name.
        let report = detect_drift(
            &compose_with_name,
            "compose.yml",
            &containers,
            Some("other"),
            &catalog(),
        );
        assert_eq!(report.status, DriftStatus::Drifted);
    }

    #[test]
    fn stopped_match_counts_as_replica_mismatch_not_running_absence() {
        let compose = compose(
            r#"
services:
  web:
    image: nginx
"#,
        );
        let containers = vec![labeled(
            container("web-1", "nginx", ContainerState::Exited),
            "web",
        )];
        let report = detect_drift(&compose, "compose.yml", &containers, None, &catalog());
        let types: Vec<DriftType> = report
            .differences
            .iter()
            .map(|drift| drift.drift_type)
            .collect();
        assert_eq!(types, vec![DriftType::ReplicaMismatch]);
    }

    #[test]
    fn imageless_services_are_skipped_entirely() {
        let compose = compose(
            r#"
services:
  builder:
    build: .
"#,
        );
        let report = detect_drift(&compose, "compose.yml", &[], None, &catalog());
        assert_eq!(report.status, DriftStatus::Synced);
        assert!(report.differences.is_empty());
    }

    #[test]
    fn a_container_may_match_multiple_services() {
        // Intentional: matching is evaluated independently per service.
        let compose = compose(
            r#"
services:
  cache:
    image: redis
  cache-backup:
    image: redis
"#,
        );
        let mut shared = container("default-cache-1", "redis:latest", ContainerState::Running);
        shared.name = "default-cache-backup-1".to_string();
        // Name prefix satisfies both "cache" and "cache-backup".
        let report = detect_drift(
            &compose,
            "compose.yml",
            &[shared.clone()],
            None,
            &catalog(),
        );
        assert!(report.untracked.is_empty());
        assert!(
            report
                .differences
                .iter()
                .all(|drift| drift.drift_type != DriftType::ExtraContainer)
        );
    }

    #[test]
    fn image_normalization_appends_latest() {
        assert!(image_matches("nginx", "nginx:latest"));
        assert!(image_matches("nginx:latest", "nginx"));
        assert!(!image_matches("nginx:1.24", "nginx:1.25"));
        assert!(!image_matches("nginx", "nginx:1.25"));
    }

    #[test]
    fn differences_follow_compose_document_order() {
        // "web" is declared before "api"; the report must not re-sort them.
        let compose = compose(
            r#"
services:
  web:
    image: web:1
  api:
    image: api:1
"#,
        );
        let report = detect_drift(&compose, "compose.yml", &[], None, &catalog());
        let names: Vec<&str> = report
            .differences
            .iter()
            .map(|drift| drift.service_name.as_str())
            .collect();
        assert_eq!(names, vec!["web", "api"]);
    }

    #[test]
    fn summary_tallies_by_drift_type() {
        let compose = compose(
            r#"
services:
  api:
    image: api:1
  web:
    image: web:1
"#,
        );
        let containers = vec![container("stray", "busybox", ContainerState::Running)];
        let report = detect_drift(&compose, "compose.yml", &containers, None, &catalog());
        assert_eq!(
            report.summary,
            "Drift detected: not_running: 2, extra_container: 1"
        );
    }

    #[test]
    fn drift_detection_is_idempotent_modulo_timestamp() {
        let compose = compose(
            r#"
services:
  web:
    image: nginx:1.25
"#,
        );
        let containers = vec![container("stray", "busybox", ContainerState::Running)];
        let first = detect_drift(&compose, "compose.yml", &containers, None, &catalog());
        let second = detect_drift(&compose, "compose.yml", &containers, None, &catalog());
        assert_eq!(first.differences, second.differences);
        assert_eq!(first.untracked, second.untracked);
        assert_eq!(first.status, second.status);
        assert_eq!(first.summary, second.summary);
    }
}
