use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::controller::Error;

pub const DEFAULT_PROFILE: &str = "minikube";

/// Static settings of the ngrok ingress addon.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NgrokAddon {
    pub name: String,
    pub namespace: String,
    pub secret_name: String,
    pub labels: BTreeMap<String, String>,
    pub ingress_prefix: String,
    pub ingress_class: String,
    /// Answer that ends the policy module and service selection loops.
    pub sentinel: String,
}

impl Default for NgrokAddon {
    fn default() -> Self {
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        labels.insert("app".into(), "ngrok".into());
        labels.insert("cloud".into(), "ngrok".into());
        labels.insert("kubernetes.io/minikube-addons".into(), "ngrok".into());

        NgrokAddon {
            name: "ngrok".into(),
            namespace: "ngrok-ingress-controller".into(),
            secret_name: "ngrok-ingress-controller-credentials".into(),
            labels,
            ingress_prefix: "ngrok-ingress".into(),
            ingress_class: "ngrok".into(),
            sentinel: "none".into(),
        }
    }
}

impl NgrokAddon {
    pub fn ingress_name(&self, service_name: &str) -> String {
        format!("{}-{}", self.ingress_prefix, service_name)
    }

    /// Command an operator runs to create the credentials secret.
    pub fn configure_command(&self, profile: &str) -> String {
        if profile == DEFAULT_PROFILE {
            format!("ngrok-addon configure {}", self.name)
        } else {
            format!("ngrok-addon -p {} configure {}", profile, self.name)
        }
    }
}

/// The two credentials the ingress controller needs. Written to the
/// cluster as a whole, never key by key.
#[derive(Clone, PartialEq)]
pub struct CredentialBundle {
    pub authtoken: String,
    pub api_key: String,
}

impl CredentialBundle {
    pub fn new(authtoken: impl Into<String>, api_key: impl Into<String>) -> CredentialBundle {
        CredentialBundle {
            authtoken: authtoken.into(),
            api_key: api_key.into(),
        }
    }

    pub fn to_data(&self) -> BTreeMap<String, String> {
        let mut data: BTreeMap<String, String> = BTreeMap::new();
        data.insert("AUTHTOKEN".into(), self.authtoken.clone());
        data.insert("API_KEY".into(), self.api_key.clone());
        data
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("authtoken", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DomainStrategy {
    Single,
    Multiple,
}

impl DomainStrategy {
    pub const CHOICES: [&'static str; 2] = ["single", "multiple"];
}

impl std::fmt::Display for DomainStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DomainStrategy::Single => write!(f, "single"),
            DomainStrategy::Multiple => write!(f, "multiple"),
        }
    }
}

impl FromStr for DomainStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(DomainStrategy::Single),
            "multiple" => Ok(DomainStrategy::Multiple),
            other => Err(Error::InvalidAnswer(format!(
                "{} is not a domain strategy",
                other
            ))),
        }
    }
}

/// One exposed port of a cluster service, keyed by the full triple.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceReference {
    pub namespace: String,
    pub name: String,
    pub port: i32,
}

impl std::fmt::Display for ServiceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.name, self.port)
    }
}

impl FromStr for ServiceReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(3, ':').collect();
        if parts.len() < 3 {
            return Err(Error::MalformedSelection(s.to_string()));
        };
        let port = parts[2]
            .parse::<i32>()
            .map_err(|_| Error::InvalidPort(parts[2].to_string()))?;

        Ok(ServiceReference {
            namespace: parts[0].to_string(),
            name: parts[1].to_string(),
            port,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IngressMappingRequest {
    pub namespace: String,
    pub name: String,
    pub domain: String,
    pub service_name: String,
    pub port: i32,
    pub ingress_class: String,
}

impl IngressMappingRequest {
    pub fn for_service(
        addon: &NgrokAddon,
        service: &ServiceReference,
        domain: impl Into<String>,
    ) -> IngressMappingRequest {
        IngressMappingRequest {
            namespace: service.namespace.clone(),
            name: addon.ingress_name(&service.name),
            domain: domain.into(),
            service_name: service.name.clone(),
            port: service.port,
            ingress_class: addon.ingress_class.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicyModule {
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum CredentialAction {
    Kept,
    Set,
    Replaced,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    EnsureNamespace,
    ReconcileCredentials,
    ConfigureIngress,
    ChooseDomainStrategy,
    ConfigurePolicyModules,
    MapServices,
    End,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let message: String = match self {
            Stage::EnsureNamespace => "EnsureNamespace".into(),
            Stage::ReconcileCredentials => "ReconcileCredentials".into(),
            Stage::ConfigureIngress => "ConfigureIngress".into(),
            Stage::ChooseDomainStrategy => "ChooseDomainStrategy".into(),
            Stage::ConfigurePolicyModules => "ConfigurePolicyModules".into(),
            Stage::MapServices => "MapServices".into(),
            Stage::End => "End".into(),
        };
        write!(f, "{}", message)
    }
}

impl Stage {
    pub fn message(&self, addon: &NgrokAddon) -> String {
        match self {
            Stage::EnsureNamespace => format!("Ensuring namespace {}", addon.namespace),
            Stage::ReconcileCredentials => {
                format!("Reconciling secret {}", addon.secret_name)
            }
            Stage::ConfigureIngress => "Offering ingress for existing services".to_string(),
            Stage::ChooseDomainStrategy => "Choosing domain strategy".to_string(),
            Stage::ConfigurePolicyModules => "Loading policy modules".to_string(),
            Stage::MapServices => format!("Mapping services to {} ingress", addon.name),
            Stage::End => format!("{} configuration finished", addon.name),
        }
    }
}

/// What one wizard run did.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigureReport {
    pub credentials: CredentialAction,
    pub strategy: Option<DomainStrategy>,
    pub policy_modules: Vec<PolicyModule>,
    pub ingresses: Vec<IngressMappingRequest>,
    pub mapping_failures: usize,
}

impl ConfigureReport {
    pub fn new(credentials: CredentialAction) -> ConfigureReport {
        ConfigureReport {
            credentials,
            strategy: None,
            policy_modules: Vec::new(),
            ingresses: Vec::new(),
            mapping_failures: 0,
        }
    }
}
