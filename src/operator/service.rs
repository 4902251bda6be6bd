use std::collections::BTreeSet;
use tracing::{error, info, warn};

use super::{ClusterFacade, Prompter};
use crate::addon::{DomainStrategy, IngressMappingRequest, NgrokAddon, ServiceReference};
use crate::controller::Error;

pub const DOMAIN_QUESTION: &str = "What domain would you like to use?";

/// Maps operator selections of discovered services onto ingress requests
/// for one wizard run.
pub struct ServiceMapper<'a> {
    cluster: &'a dyn ClusterFacade,
    profile: &'a str,
    addon: &'a NgrokAddon,
    services: Vec<ServiceReference>,
    issued: BTreeSet<(String, String)>,
}

/// Outcome of one `run` of the mapping loop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingOutcome {
    pub created: Vec<IngressMappingRequest>,
    pub failures: usize,
}

impl<'a> ServiceMapper<'a> {
    /// Lists every service port in the cluster, in listing order.
    pub async fn resolve(
        cluster: &'a dyn ClusterFacade,
        profile: &'a str,
        addon: &'a NgrokAddon,
    ) -> Result<ServiceMapper<'a>, Error> {
        let services: Vec<ServiceReference> = cluster
            .list_services(profile)
            .await?
            .into_iter()
            .flat_map(|summary| {
                summary
                    .ports
                    .into_iter()
                    .map(move |port| ServiceReference {
                        namespace: summary.namespace.clone(),
                        name: summary.name.clone(),
                        port,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        info!("Resolved {} service ports on {}", services.len(), profile);

        Ok(ServiceMapper {
            cluster,
            profile,
            addon,
            services,
            issued: BTreeSet::new(),
        })
    }

    #[cfg(test)]
    fn services(&self) -> &[ServiceReference] {
        &self.services
    }

    pub fn listing(&self) -> String {
        let mut listing = String::from("Services:\n");
        for service in &self.services {
            listing.push_str(&format!("{}\n", service));
        }
        listing
    }

    /// Parses `namespace:name:port` and requires the text to equal a listed
    /// entry exactly, so `053` does not select port 53.
    pub fn select(&self, selection: &str) -> Result<ServiceReference, Error> {
        selection.parse::<ServiceReference>()?;
        self.services
            .iter()
            .find(|s| s.to_string() == selection)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound(selection.to_string()))
    }

    pub async fn build_request(
        &self,
        selection: &str,
        strategy: DomainStrategy,
        shared_domain: Option<&str>,
        prompt: &mut dyn Prompter,
    ) -> Result<IngressMappingRequest, Error> {
        let service = self.select(selection)?;
        let domain = match strategy {
            DomainStrategy::Single => shared_domain
                .ok_or(Error::MissingSharedDomain)?
                .to_string(),
            DomainStrategy::Multiple => prompt.ask(DOMAIN_QUESTION).await?,
        };
        Ok(IngressMappingRequest::for_service(self.addon, &service, domain))
    }

    /// Reserves the request's namespaced name, rejecting a second claim.
    pub fn claim(&mut self, request: &IngressMappingRequest) -> Result<(), Error> {
        let key = (request.namespace.clone(), request.name.clone());
        if !self.issued.insert(key) {
            return Err(Error::IngressNameCollision {
                namespace: request.namespace.clone(),
                name: request.name.clone(),
            });
        };
        Ok(())
    }

    /// Claims the name, then creates. A failed create releases the claim so
    /// the same selection can be retried.
    async fn submit(&mut self, request: &IngressMappingRequest) -> Result<(), Error> {
        self.claim(request)?;
        if let Err(e) = self.cluster.create_ingress(self.profile, request).await {
            self.issued
                .remove(&(request.namespace.clone(), request.name.clone()));
            return Err(e);
        };
        Ok(())
    }

    /// Selection loop; ends on the sentinel. Individual failures are
    /// reported and counted, never propagated. Only a closed prompt stops
    /// the loop early.
    pub async fn run(
        &mut self,
        strategy: DomainStrategy,
        shared_domain: Option<&str>,
        prompt: &mut dyn Prompter,
    ) -> Result<MappingOutcome, Error> {
        let mut outcome = MappingOutcome::default();
        prompt.show(&self.listing());

        let question = format!(
            "What service would you like to add ingress for? Use the format namespace:service:port (type '{}' to exit):",
            self.addon.sentinel
        );

        loop {
            let selection = prompt.ask(&question).await?;
            if selection == self.addon.sentinel {
                break;
            };

            let request = match self
                .build_request(&selection, strategy, shared_domain, prompt)
                .await
            {
                Ok(r) => r,
                Err(Error::PromptClosed) => return Err(Error::PromptClosed),
                Err(e) => {
                    warn!("Rejected selection {}: {}", selection, e);
                    prompt.report_error(&e.to_string());
                    outcome.failures += 1;
                    continue;
                }
            };

            match self.submit(&request).await {
                Ok(_) => {
                    info!(
                        "Mapped {} to {} via {}/{}",
                        selection, request.domain, request.namespace, request.name
                    );
                    outcome.created.push(request);
                }
                Err(e) => {
                    error!("Error creating ingress {}: {}", request.name, e);
                    prompt.report_error(&format!("Error creating ingress: {}", e));
                    outcome.failures += 1;
                }
            };
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::testing::{api_error, service, FakeCluster};
    use crate::operator::{MockClusterFacade, ScriptedPrompt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cluster() -> FakeCluster {
        FakeCluster::with_services(vec![
            service("kube-system", "dns", &[53, 9153]),
            service("default", "web", &[80]),
            service("shop", "web", &[8080]),
        ])
    }

    #[tokio::test]
    async fn resolve_flattens_ports_in_listing_order() {
        let cluster = cluster();
        let addon = NgrokAddon::default();

        let mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();

        let listed: Vec<String> = mapper.services().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            listed,
            vec![
                "kube-system:dns:53",
                "kube-system:dns:9153",
                "default:web:80",
                "shop:web:8080",
            ]
        );
        assert_eq!(
            mapper.listing(),
            "Services:\nkube-system:dns:53\nkube-system:dns:9153\ndefault:web:80\nshop:web:8080\n"
        );
    }

    #[tokio::test]
    async fn select_requires_exact_triple() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();

        let found = mapper.select("kube-system:dns:53").unwrap();
        assert_eq!(found.port, 53);

        assert!(matches!(
            mapper.select("kube-system:dns:9999"),
            Err(Error::ServiceNotFound(_))
        ));
        assert!(matches!(
            mapper.select("default:dns:53"),
            Err(Error::ServiceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn select_rejects_non_canonical_port_spelling() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();

        for selection in ["kube-system:dns:053", "kube-system:dns:+53"] {
            assert!(matches!(
                mapper.select(selection),
                Err(Error::ServiceNotFound(s)) if s == selection
            ));
        }
    }

    #[tokio::test]
    async fn failed_create_can_be_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cluster = MockClusterFacade::new();
        cluster
            .expect_list_services()
            .returning(|_| Ok(vec![service("kube-system", "dns", &[53])]));
        let counter = calls.clone();
        cluster.expect_create_ingress().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(api_error(500, "InternalError"))
            } else {
                Ok(())
            }
        });
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(["kube-system:dns:53", "kube-system:dns:53", "none"]);

        let outcome = mapper
            .run(DomainStrategy::Single, Some("foo.ngrok.app"), &mut prompt)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].name, "ngrok-ingress-dns");
        assert_eq!(prompt.errors.len(), 1);
    }

    #[tokio::test]
    async fn single_strategy_reuses_shared_domain() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(["kube-system:dns:53", "default:web:80", "none"]);

        let outcome = mapper
            .run(DomainStrategy::Single, Some("foo.ngrok.app"), &mut prompt)
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.created.iter().all(|r| r.domain == "foo.ngrok.app"));
        assert!(!prompt.questions.iter().any(|q| q == DOMAIN_QUESTION));
        assert_eq!(cluster.ingresses().len(), 2);
    }

    #[tokio::test]
    async fn multiple_strategy_prompts_per_service() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new([
            "kube-system:dns:53",
            "a.ngrok.app",
            "default:web:80",
            "b.ngrok.app",
            "none",
        ]);

        let outcome = mapper
            .run(DomainStrategy::Multiple, None, &mut prompt)
            .await
            .unwrap();

        let domains: Vec<&str> = outcome.created.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(domains, vec!["a.ngrok.app", "b.ngrok.app"]);
        assert_eq!(outcome.created[0].name, "ngrok-ingress-dns");
        assert_eq!(outcome.created[1].name, "ngrok-ingress-web");
    }

    #[tokio::test]
    async fn wrong_port_is_not_found_and_creates_nothing() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(["kube-system:dns:9999", "none"]);

        let outcome = mapper
            .run(DomainStrategy::Single, Some("foo.ngrok.app"), &mut prompt)
            .await
            .unwrap();

        assert!(outcome.created.is_empty());
        assert_eq!(outcome.failures, 1);
        assert!(cluster.ingresses().is_empty());
        assert!(prompt.errors[0].contains("Service not found"));
    }

    #[tokio::test]
    async fn sentinel_ends_loop_without_create() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(["none"]);

        let outcome = mapper
            .run(DomainStrategy::Multiple, None, &mut prompt)
            .await
            .unwrap();

        assert_eq!(outcome, MappingOutcome::default());
        assert_eq!(cluster.writes(), 0);
    }

    #[tokio::test]
    async fn malformed_selections_do_not_stop_loop() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new([
            "dns",
            "kube-system:dns:fifty-three",
            "kube-system:dns:53",
            "none",
        ]);

        let outcome = mapper
            .run(DomainStrategy::Single, Some("foo.ngrok.app"), &mut prompt)
            .await
            .unwrap();

        assert_eq!(outcome.failures, 2);
        assert_eq!(outcome.created.len(), 1);
    }

    #[tokio::test]
    async fn repeated_selection_is_rejected_as_collision() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new([
            "default:web:80",
            "a.ngrok.app",
            "default:web:80",
            "b.ngrok.app",
            "none",
        ]);

        let outcome = mapper
            .run(DomainStrategy::Multiple, None, &mut prompt)
            .await
            .unwrap();

        // the domain is still asked for the repeat before the name clash is found
        assert_eq!(
            prompt.questions.iter().filter(|q| *q == DOMAIN_QUESTION).count(),
            2
        );
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.failures, 1);
        assert!(prompt.errors[0].contains("default/ngrok-ingress-web"));
    }

    #[tokio::test]
    async fn same_service_name_in_other_namespace_is_not_a_collision() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(["default:web:80", "shop:web:8080", "none"]);

        let outcome = mapper
            .run(DomainStrategy::Single, Some("foo.ngrok.app"), &mut prompt)
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.failures, 0);
    }

    #[tokio::test]
    async fn create_failure_is_reported_and_loop_continues() {
        let mut cluster = cluster();
        cluster.reject_ingress_for = Some("dns".into());
        let addon = NgrokAddon::default();
        let mut mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(["kube-system:dns:53", "default:web:80", "none"]);

        let outcome = mapper
            .run(DomainStrategy::Single, Some("foo.ngrok.app"), &mut prompt)
            .await
            .unwrap();

        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(cluster.ingresses()[0].service_name, "web");
        assert!(prompt.errors[0].starts_with("Error creating ingress"));
    }

    #[tokio::test]
    async fn single_strategy_without_domain_is_local_failure() {
        let cluster = cluster();
        let addon = NgrokAddon::default();
        let mapper = ServiceMapper::resolve(&cluster, "minikube", &addon)
            .await
            .unwrap();
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());

        let result = mapper
            .build_request("default:web:80", DomainStrategy::Single, None, &mut prompt)
            .await;
        assert!(matches!(result, Err(Error::MissingSharedDomain)));
    }
}
