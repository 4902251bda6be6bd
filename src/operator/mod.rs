mod cluster;
mod policy;
mod prompt;
mod service;
#[cfg(test)]
pub mod testing;
mod utils;
mod wizard;

#[cfg(test)]
pub use cluster::MockClusterFacade;
pub use cluster::{ClusterFacade, KubeCluster, ServiceSummary};
pub use policy::load_policy_modules;
pub use prompt::{Prompter, ScriptedPrompt, TerminalPrompt};
pub use service::{MappingOutcome, ServiceMapper};
pub use wizard::ConfigurationWizard;
