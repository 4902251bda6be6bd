use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::addon::NgrokAddon;
use crate::admission::{can_activate, validate_before_enable, Admission};
use crate::operator::ClusterFacade;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to reach cluster: {0}")]
    Kube(#[from] kube::Error),
    #[error("Unable to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("UnableToSerializeObject: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Input closed while waiting for an answer")]
    PromptClosed,
    #[error("InvalidAnswer: {0}")]
    InvalidAnswer(String),
    #[error("Selection {0} is not in the format namespace:service:port")]
    MalformedSelection(String),
    #[error("Error converting port to int: {0}")]
    InvalidPort(String),
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
    #[error("Ingress {namespace}/{name} was already requested in this run")]
    IngressNameCollision { namespace: String, name: String },
    #[error("No shared domain was collected for the single domain strategy")]
    MissingSharedDomain,
    #[error("Error reading policy module file '{path}': {source}")]
    PolicyModuleUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing bool: {name}: {value}")]
    InvalidToggle { name: String, value: String },
    #[error("{0} has no available configuration options")]
    UnknownAddon(String),
    #[error("please run `{0}` to create your credentials before enabling")]
    CredentialsMissing(String),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Toggle {
    Enable,
    Disable,
}

/// Accepts the same spellings as Go's `strconv.ParseBool`.
pub fn parse_toggle(name: &str, value: &str) -> Result<Toggle, Error> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(Toggle::Enable),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(Toggle::Disable),
        _ => Err(Error::InvalidToggle {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

pub async fn enable_or_disable(
    cluster: &dyn ClusterFacade,
    profile: &str,
    addon: &NgrokAddon,
    name: &str,
    value: &str,
) -> Result<(), Error> {
    match parse_toggle(name, value)? {
        Toggle::Enable => {
            let allowed =
                can_activate(cluster, profile, &addon.namespace, &addon.secret_name).await?;
            if !allowed {
                return Err(Error::CredentialsMissing(addon.configure_command(profile)));
            };
            activate(profile, name);
            Ok(())
        }
        Toggle::Disable => {
            // Credentials survive a disable so re-enabling needs no new wizard run.
            info!(
                "Addon {} disabled for profile {}, secret {} left in place",
                name, profile, addon.secret_name
            );
            Ok(())
        }
    }
}

fn activate(profile: &str, name: &str) {
    info!("Addon {} enabled for profile {}", name, profile);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub enabled: Vec<String>,
    pub skipped: Vec<String>,
}

/// Enables each named addon in turn. A missing credential skips only that
/// addon; any other failure aborts the batch. The credential check runs once
/// per addon and its verdict is what gets acted on.
pub async fn enable_addons(
    cluster: &dyn ClusterFacade,
    profile: &str,
    addon: &NgrokAddon,
    names: &[String],
) -> Result<BatchReport, Error> {
    let mut report = BatchReport::default();

    for name in names {
        if name != &addon.name {
            return Err(Error::UnknownAddon(name.clone()));
        };

        match validate_before_enable(cluster, profile, addon).await? {
            Admission::Allow => {
                activate(profile, name);
                report.enabled.push(name.clone());
            }
            Admission::Skip { remediation } => {
                warn!("Skipping addon {}: {}", name, remediation);
                report.skipped.push(name.clone());
            }
        };
    }

    Ok(report)
}
