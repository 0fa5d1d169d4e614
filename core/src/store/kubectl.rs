//! Kubernetes ConfigMaps as a config store, read through `kubectl`.
//!
//! Every list is a single `kubectl get configmaps -o json` call in the
//! watched namespace. The ConfigMap `resourceVersion` is the version token.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ConfigStore;
use crate::error::StoreError;
use crate::infrastructure::{CommandRunner, Invocation, ProcessRunner};
use crate::types::ConfigObject;

/// How kubectl authenticates against the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeCredentials {
    /// A kubeconfig file on local disk.
    Kubeconfig(PathBuf),
    /// The pod's service account; kubectl discovers it on its own.
    InCluster,
}

impl KubeCredentials {
    /// Prefer an explicit kubeconfig, then `<home>/.kube/config`, then
    /// in-cluster credentials. Paths that do not exist are skipped.
    pub fn resolve(explicit: Option<&Path>, home: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            if path.is_file() {
                return KubeCredentials::Kubeconfig(path.to_path_buf());
            }
            warn!(path = %path.display(), "kubeconfig not found");
        }
        if let Some(home) = home {
            let default = home.join(".kube").join("config");
            if default.is_file() {
                return KubeCredentials::Kubeconfig(default);
            }
            debug!(path = %default.display(), "no kubeconfig in home directory");
        }
        info!("attempting to use in-cluster configuration");
        KubeCredentials::InCluster
    }
}

/// Config store backed by ConfigMaps in one namespace.
pub struct KubectlStore<R: CommandRunner = ProcessRunner> {
    runner: R,
    kubectl: String,
    namespace: String,
    credentials: KubeCredentials,
    request_timeout: String,
}

impl KubectlStore<ProcessRunner> {
    pub fn new(kubectl: &str, namespace: &str, credentials: KubeCredentials) -> Self {
        Self::with_runner(ProcessRunner, kubectl, namespace, credentials)
    }
}

impl<R: CommandRunner> KubectlStore<R> {
    pub fn with_runner(
        runner: R,
        kubectl: &str,
        namespace: &str,
        credentials: KubeCredentials,
    ) -> Self {
        KubectlStore {
            runner,
            kubectl: kubectl.to_string(),
            namespace: namespace.to_string(),
            credentials,
            request_timeout: "30s".to_string(),
        }
    }

    /// Bound each API call, e.g. `"30s"`. `"0"` means no timeout.
    pub fn with_request_timeout(mut self, timeout: &str) -> Self {
        self.request_timeout = timeout.to_string();
        self
    }

    fn invocation(&self) -> Invocation {
        let mut inv = Invocation::new(&self.kubectl)
            .arg("get")
            .arg("configmaps")
            .arg("--namespace")
            .arg(&self.namespace)
            .arg("--output")
            .arg("json")
            .arg("--request-timeout")
            .arg(&self.request_timeout);
        if let KubeCredentials::Kubeconfig(path) = &self.credentials {
            inv = inv.arg("--kubeconfig").arg(&path.to_string_lossy());
        }
        inv
    }
}

impl<R: CommandRunner> ConfigStore for KubectlStore<R> {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ConfigObject>, StoreError> {
        let output = self.runner.run(&self.invocation())?;
        if !output.is_success() {
            return Err(StoreError::Kubectl {
                status: output.status_label(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        decode_config_maps(&output.stdout, prefix)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ConfigMapList {
    #[serde(default)]
    items: Vec<ConfigMapItem>,
}

#[derive(Debug, Deserialize)]
struct ConfigMapItem {
    metadata: ObjectMeta,
    #[serde(default)]
    data: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    resource_version: String,
}

/// Decode `kubectl get configmaps -o json` output, keeping objects whose
/// name starts with `prefix`.
pub fn decode_config_maps(json: &str, prefix: &str) -> Result<Vec<ConfigObject>, StoreError> {
    let list: ConfigMapList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .filter(|item| item.metadata.name.starts_with(prefix))
        .map(|item| ConfigObject {
            name: item.metadata.name,
            version: item.metadata.resource_version,
            data: item.data.unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{MockRunner, ProcessOutput};
    use serde_json::json;

    fn list_json() -> String {
        json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                {
                    "metadata": {"name": "scoped-config-a", "resourceVersion": "101"},
                    "data": {"scopes.json": "{\"scopes\":[\"r1\"]}"}
                },
                {
                    "metadata": {"name": "kube-root-ca.crt", "resourceVersion": "5"},
                    "data": {"ca.crt": "-----BEGIN CERTIFICATE-----"}
                },
                {
                    "metadata": {"name": "scoped-config-empty", "resourceVersion": "7"}
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn decode_filters_and_maps_fields() {
        let objects = decode_config_maps(&list_json(), "scoped-config-").unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "scoped-config-a");
        assert_eq!(objects[0].version, "101");
        assert_eq!(objects[0].data["scopes.json"], "{\"scopes\":[\"r1\"]}");
        assert_eq!(objects[1].name, "scoped-config-empty");
        assert!(objects[1].data.is_empty());
    }

    #[test]
    fn decode_empty_list() {
        let objects = decode_config_maps(r#"{"items":[]}"#, "scoped-config-").unwrap();
        assert!(objects.is_empty());
        assert!(decode_config_maps("{}", "").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_config_maps("error: the server doesn't have a resource type", ""),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn list_builds_kubectl_invocation() {
        let runner = MockRunner::with_responses(vec![Ok(ProcessOutput::success(&list_json()))]);
        let store = KubectlStore::with_runner(
            &runner,
            "kubectl",
            "default",
            KubeCredentials::Kubeconfig(PathBuf::from("/home/u/.kube/config")),
        )
        .with_request_timeout("15s");
        let objects = store.list_objects("scoped-config-").unwrap();
        assert_eq!(objects.len(), 2);

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].to_string(),
            "kubectl get configmaps --namespace default --output json --request-timeout 15s --kubeconfig /home/u/.kube/config"
        );
    }

    #[test]
    fn in_cluster_omits_kubeconfig_flag() {
        let runner = MockRunner::with_responses(vec![Ok(ProcessOutput::success("{}"))]);
        let store =
            KubectlStore::with_runner(&runner, "kubectl", "ratify", KubeCredentials::InCluster);
        store.list_objects("").unwrap();
        assert!(!runner.invocations()[0].args.contains(&"--kubeconfig".to_string()));
    }

    #[test]
    fn kubectl_failure_is_store_error() {
        let runner = MockRunner::with_responses(vec![Ok(ProcessOutput::failure(
            1,
            "",
            "Unable to connect to the server\n",
        ))]);
        let store = KubectlStore::with_runner(&runner, "kubectl", "default", KubeCredentials::InCluster);
        match store.list_objects("") {
            Err(StoreError::Kubectl { status, stderr }) => {
                assert_eq!(status, "exit code 1");
                assert_eq!(stderr, "Unable to connect to the server");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn missing_kubectl_is_runner_error() {
        let runner = MockRunner::with_responses(vec![Err("kubectl: not found".into())]);
        let store = KubectlStore::with_runner(&runner, "kubectl", "default", KubeCredentials::InCluster);
        assert!(matches!(store.list_objects(""), Err(StoreError::Runner(_))));
    }

    #[test]
    fn credentials_prefer_explicit_then_home() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit");
        std::fs::write(&explicit, "apiVersion: v1").unwrap();
        let home = dir.path().join("home");
        std::fs::create_dir_all(home.join(".kube")).unwrap();
        std::fs::write(home.join(".kube").join("config"), "apiVersion: v1").unwrap();

        assert_eq!(
            KubeCredentials::resolve(Some(&explicit), Some(&home)),
            KubeCredentials::Kubeconfig(explicit.clone())
        );
        assert_eq!(
            KubeCredentials::resolve(Some(&dir.path().join("missing")), Some(&home)),
            KubeCredentials::Kubeconfig(home.join(".kube").join("config"))
        );
        assert_eq!(
            KubeCredentials::resolve(None, Some(&dir.path().join("nohome"))),
            KubeCredentials::InCluster
        );
        assert_eq!(KubeCredentials::resolve(None, None), KubeCredentials::InCluster);
    }
}
