//! Credential gate and interactive ingress configuration for the ngrok
//! ingress controller addon of a local Kubernetes cluster.

pub mod addon;
pub mod admission;
pub mod controller;
pub mod operator;

pub use addon::{NgrokAddon, DEFAULT_PROFILE};
pub use admission::{can_activate, validate_before_enable, Admission};
pub use controller::{enable_addons, enable_or_disable, Error};
