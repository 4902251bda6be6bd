use tracing::{debug, info};

use crate::addon::NgrokAddon;
use crate::controller::Error;
use crate::operator::ClusterFacade;

/// Outcome of gating an addon before activation. `Skip` is expected and
/// recoverable; callers keep processing the rest of their batch.
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    Allow,
    Skip { remediation: String },
}

/// True when the named secret exists. Only reads from the cluster.
pub async fn can_activate(
    cluster: &dyn ClusterFacade,
    profile: &str,
    namespace: &str,
    secret_name: &str,
) -> Result<bool, Error> {
    let exists = cluster.secret_exists(profile, namespace, secret_name).await?;
    debug!(
        "Secret {}/{} exists on {}: {}",
        namespace, secret_name, profile, exists
    );
    Ok(exists)
}

pub async fn validate_before_enable(
    cluster: &dyn ClusterFacade,
    profile: &str,
    addon: &NgrokAddon,
) -> Result<Admission, Error> {
    if can_activate(cluster, profile, &addon.namespace, &addon.secret_name).await? {
        return Ok(Admission::Allow);
    };

    let remediation = format!(
        "Please run `{}` to create your credentials before enabling the {} ingress addon",
        addon.configure_command(profile),
        addon.name
    );
    info!("{}", remediation);
    Ok(Admission::Skip { remediation })
}
