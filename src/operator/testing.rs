//! In-memory cluster used by wizard and mapper tests.

use async_trait::async_trait;
use kube::error::ErrorResponse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{ClusterFacade, ServiceSummary};
use crate::addon::IngressMappingRequest;
use crate::controller::Error;

pub fn api_error(code: u16, reason: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("{} from fake cluster", reason),
        reason: reason.into(),
        code,
    }))
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredSecret {
    pub data: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    namespaces: BTreeSet<String>,
    secrets: BTreeMap<(String, String), StoredSecret>,
    services: Vec<ServiceSummary>,
    ingresses: BTreeMap<(String, String), IngressMappingRequest>,
    writes: usize,
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
    pub unreachable: bool,
    pub fail_service_listing: bool,
    /// Ingress creates for this service name are rejected.
    pub reject_ingress_for: Option<String>,
}

impl FakeCluster {
    pub fn with_services(services: Vec<ServiceSummary>) -> FakeCluster {
        let cluster = FakeCluster::default();
        cluster.state.lock().unwrap().services = services;
        cluster
    }

    pub fn unreachable() -> FakeCluster {
        FakeCluster {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn failing_service_listing() -> FakeCluster {
        FakeCluster {
            fail_service_listing: true,
            ..Default::default()
        }
    }

    pub fn add_namespace(&self, namespace: &str) {
        self.state.lock().unwrap().namespaces.insert(namespace.to_string());
    }

    pub fn namespaces(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().namespaces.clone()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<StoredSecret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn ingresses(&self) -> Vec<IngressMappingRequest> {
        self.state.lock().unwrap().ingresses.values().cloned().collect()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    fn check_reachable(&self) -> Result<(), Error> {
        if self.unreachable {
            return Err(api_error(503, "ServiceUnavailable"));
        };
        Ok(())
    }
}

pub fn service(namespace: &str, name: &str, ports: &[i32]) -> ServiceSummary {
    ServiceSummary {
        namespace: namespace.to_string(),
        name: name.to_string(),
        ports: ports.to_vec(),
    }
}

#[async_trait]
impl ClusterFacade for FakeCluster {
    async fn namespace_exists(&self, _profile: &str, namespace: &str) -> Result<bool, Error> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().namespaces.contains(namespace))
    }

    async fn create_namespace(&self, _profile: &str, namespace: &str) -> Result<(), Error> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.insert(namespace.to_string()) {
            return Err(api_error(409, "AlreadyExists"));
        };
        state.writes += 1;
        Ok(())
    }

    async fn secret_exists(
        &self,
        _profile: &str,
        namespace: &str,
        secret_name: &str,
    ) -> Result<bool, Error> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .secrets
            .contains_key(&(namespace.to_string(), secret_name.to_string())))
    }

    async fn create_secret(
        &self,
        _profile: &str,
        namespace: &str,
        secret_name: &str,
        data: &BTreeMap<String, String>,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.contains(namespace) {
            return Err(api_error(404, "NotFound"));
        };
        state.secrets.insert(
            (namespace.to_string(), secret_name.to_string()),
            StoredSecret {
                data: data.clone(),
                labels: labels.clone(),
            },
        );
        state.writes += 1;
        Ok(())
    }

    async fn list_services(&self, _profile: &str) -> Result<Vec<ServiceSummary>, Error> {
        self.check_reachable()?;
        if self.fail_service_listing {
            return Err(api_error(403, "Forbidden"));
        };
        Ok(self.state.lock().unwrap().services.clone())
    }

    async fn create_ingress(
        &self,
        _profile: &str,
        request: &IngressMappingRequest,
    ) -> Result<(), Error> {
        self.check_reachable()?;
        if self.reject_ingress_for.as_deref() == Some(request.service_name.as_str()) {
            return Err(api_error(422, "Invalid"));
        };
        let mut state = self.state.lock().unwrap();
        let key = (request.namespace.clone(), request.name.clone());
        if state.ingresses.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists"));
        };
        state.ingresses.insert(key, request.clone());
        state.writes += 1;
        Ok(())
    }
}
