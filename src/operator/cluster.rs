use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret, Service};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::ByteString;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ObjectMeta, ResourceExt};
use kube::{Client, Config};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use super::utils::{
    created_or_existing, perform_cluster_get, perform_cluster_operation, perform_get,
    perform_list_all, perform_operation, Operation,
};
use crate::addon::IngressMappingRequest;
use crate::controller::Error;

/// A service as listed from the cluster, with every exposed port.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceSummary {
    pub namespace: String,
    pub name: String,
    pub ports: Vec<i32>,
}

/// Operations against the cluster selected by a profile name.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterFacade: Send + Sync {
    async fn namespace_exists(&self, profile: &str, namespace: &str) -> Result<bool, Error>;

    async fn create_namespace(&self, profile: &str, namespace: &str) -> Result<(), Error>;

    async fn secret_exists(
        &self,
        profile: &str,
        namespace: &str,
        secret_name: &str,
    ) -> Result<bool, Error>;

    /// Writes the secret with exactly `data`, replacing any prior contents.
    async fn create_secret(
        &self,
        profile: &str,
        namespace: &str,
        secret_name: &str,
        data: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), Error>;

    async fn list_services(&self, profile: &str) -> Result<Vec<ServiceSummary>, Error>;

    async fn create_ingress(
        &self,
        profile: &str,
        request: &IngressMappingRequest,
    ) -> Result<(), Error>;
}

/// kube-rs backed facade. The profile is used as the kubeconfig context.
pub struct KubeCluster {
    kubeconfig: Option<PathBuf>,
    clients: Mutex<BTreeMap<String, Client>>,
}

impl KubeCluster {
    pub fn new(kubeconfig: Option<PathBuf>) -> KubeCluster {
        KubeCluster {
            kubeconfig,
            clients: Mutex::new(BTreeMap::new()),
        }
    }

    async fn client(&self, profile: &str) -> Result<Client, Error> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(profile) {
            return Ok(client.clone());
        };

        let options = KubeConfigOptions {
            context: Some(profile.to_string()),
            ..Default::default()
        };
        let config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            None => Config::from_kubeconfig(&options).await?,
        };
        let client = Client::try_from(config)?;
        debug!("Connected client for profile {}", profile);

        clients.insert(profile.to_string(), client.clone());
        Ok(client)
    }
}

pub fn build_namespace(namespace: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn build_secret(
    namespace: &str,
    secret_name: &str,
    data: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> Secret {
    let encoded: BTreeMap<String, ByteString> = data
        .iter()
        .map(|(k, v)| (k.clone(), ByteString(v.clone().into_bytes())))
        .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(secret_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        type_: Some("Opaque".into()),
        data: Some(encoded),
        ..Default::default()
    }
}

/// Picks create or replace for a desired secret. A replace carries the
/// observed resourceVersion so the PUT swaps the whole object.
pub fn secret_write(existing: Option<&Secret>, mut desired: Secret) -> (Operation, Secret) {
    match existing {
        Some(current) => {
            desired.metadata.resource_version = current.resource_version();
            (Operation::Replace, desired)
        }
        None => (Operation::Create, desired),
    }
}

pub fn build_ingress(request: &IngressMappingRequest) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.namespace.clone()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some(request.ingress_class.clone()),
            rules: Some(vec![IngressRule {
                host: Some(request.domain.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".into()),
                        path_type: "Prefix".into(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: request.service_name.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(request.port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn summarize_service(service: &Service) -> ServiceSummary {
    let ports: Vec<i32> = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| ports.iter().map(|p| p.port).collect())
        .unwrap_or_default();

    ServiceSummary {
        namespace: service.namespace().unwrap_or("default".into()),
        name: service.name_any(),
        ports,
    }
}

#[async_trait]
impl ClusterFacade for KubeCluster {
    async fn namespace_exists(&self, profile: &str, namespace: &str) -> Result<bool, Error> {
        let client = self.client(profile).await?;
        let result: Option<Namespace> = perform_cluster_get(client, namespace).await?;
        Ok(result.is_some())
    }

    async fn create_namespace(&self, profile: &str, namespace: &str) -> Result<(), Error> {
        let client = self.client(profile).await?;
        let result =
            perform_cluster_operation(client, Operation::Create, &build_namespace(namespace)).await;
        if created_or_existing(result)? {
            info!("Namespace {} created", namespace);
        } else {
            debug!("Namespace {} already exists", namespace);
        };
        Ok(())
    }

    async fn secret_exists(
        &self,
        profile: &str,
        namespace: &str,
        secret_name: &str,
    ) -> Result<bool, Error> {
        let client = self.client(profile).await?;
        let result: Option<Secret> = perform_get(client, secret_name, namespace).await?;
        Ok(result.is_some())
    }

    async fn create_secret(
        &self,
        profile: &str,
        namespace: &str,
        secret_name: &str,
        data: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let client = self.client(profile).await?;
        let existing: Option<Secret> = perform_get(client.clone(), secret_name, namespace).await?;
        let (operation, secret) = secret_write(
            existing.as_ref(),
            build_secret(namespace, secret_name, data, labels),
        );
        perform_operation(client, operation, &secret).await?;
        info!("Secret {}/{} written ({:?})", namespace, secret_name, operation);
        Ok(())
    }

    async fn list_services(&self, profile: &str) -> Result<Vec<ServiceSummary>, Error> {
        let client = self.client(profile).await?;
        let services: Vec<Service> = perform_list_all(client).await?;
        Ok(services.iter().map(summarize_service).collect())
    }

    async fn create_ingress(
        &self,
        profile: &str,
        request: &IngressMappingRequest,
    ) -> Result<(), Error> {
        let client = self.client(profile).await?;
        let ingress = build_ingress(request);
        perform_operation(client, Operation::Create, &ingress).await?;
        info!(
            "Ingress {}/{} created for {}",
            request.namespace, request.name, request.domain
        );
        Ok(())
    }
}
