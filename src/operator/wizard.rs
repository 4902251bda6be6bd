use tracing::{error, info};

use super::policy::load_policy_modules;
use super::service::{ServiceMapper, DOMAIN_QUESTION};
use super::{ClusterFacade, Prompter};
use crate::addon::{
    ConfigureReport, CredentialAction, CredentialBundle, DomainStrategy, NgrokAddon, Stage,
};
use crate::controller::Error;

/// Drives one interactive configuration run of the addon.
///
/// Namespace and credential steps are fatal on cluster failure; everything
/// after them reports problems and carries on.
pub struct ConfigurationWizard<'a> {
    cluster: &'a dyn ClusterFacade,
    prompt: &'a mut dyn Prompter,
    addon: &'a NgrokAddon,
    profile: &'a str,
    stages: Vec<Stage>,
}

impl<'a> ConfigurationWizard<'a> {
    pub fn new(
        cluster: &'a dyn ClusterFacade,
        prompt: &'a mut dyn Prompter,
        addon: &'a NgrokAddon,
        profile: &'a str,
    ) -> ConfigurationWizard<'a> {
        ConfigurationWizard {
            cluster,
            prompt,
            addon,
            profile,
            stages: Vec::new(),
        }
    }

    /// Stages entered so far, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn enter(&mut self, stage: Stage) {
        info!(stage = %stage, "{}", stage.message(self.addon));
        self.stages.push(stage);
    }

    pub async fn run(&mut self) -> Result<ConfigureReport, Error> {
        self.ensure_namespace().await?;
        let credentials = self.reconcile_credentials().await?;
        let mut report = ConfigureReport::new(credentials);

        self.enter(Stage::ConfigureIngress);
        let configure_ingress = self
            .prompt
            .confirm("Would you like to configure ingress for existing services in your cluster?")
            .await?;
        if !configure_ingress {
            self.finish();
            return Ok(report);
        };

        self.enter(Stage::ChooseDomainStrategy);
        let strategy = self.choose_domain_strategy().await?;
        report.strategy = Some(strategy);
        let shared_domain = match strategy {
            DomainStrategy::Single => Some(self.prompt.ask(DOMAIN_QUESTION).await?),
            DomainStrategy::Multiple => None,
        };

        let configure_policy = self
            .prompt
            .confirm("Would you like to create a policy module that can be used to secure ingress to services with authentication?")
            .await?;
        if configure_policy {
            self.enter(Stage::ConfigurePolicyModules);
            report.policy_modules = load_policy_modules(self.prompt, &self.addon.sentinel).await?;
        };

        let configure_services = self
            .prompt
            .confirm("Would you like to create ingress to existing services?")
            .await?;
        if configure_services {
            self.enter(Stage::MapServices);
            match ServiceMapper::resolve(self.cluster, self.profile, self.addon).await {
                Ok(mut mapper) => {
                    let outcome = mapper
                        .run(strategy, shared_domain.as_deref(), self.prompt)
                        .await?;
                    report.ingresses = outcome.created;
                    report.mapping_failures = outcome.failures;
                }
                Err(e) => {
                    error!("Error listing services: {}", e);
                    self.prompt
                        .report_error(&format!("Error listing services: {}", e));
                    report.mapping_failures += 1;
                }
            };
        };

        self.prompt.show(&format!(
            "Congrats, you have configured ingress with {} in your cluster.",
            self.addon.name
        ));
        self.finish();
        Ok(report)
    }

    fn finish(&mut self) {
        self.enter(Stage::End);
        self.prompt
            .show(&format!("{} was successfully configured", self.addon.name));
    }

    /// Creates the addon namespace when missing. Safe to repeat.
    pub async fn ensure_namespace(&mut self) -> Result<(), Error> {
        self.enter(Stage::EnsureNamespace);
        let namespace = &self.addon.namespace;
        if self.cluster.namespace_exists(self.profile, namespace).await? {
            return Ok(());
        };
        self.cluster.create_namespace(self.profile, namespace).await?;
        info!("Namespace {} created on {}", namespace, self.profile);
        Ok(())
    }

    /// Offers to set or replace the credentials secret. Declining leaves
    /// any existing secret as it is.
    pub async fn reconcile_credentials(&mut self) -> Result<CredentialAction, Error> {
        self.enter(Stage::ReconcileCredentials);
        let exists = self
            .cluster
            .secret_exists(self.profile, &self.addon.namespace, &self.addon.secret_name)
            .await?;

        let verb = if exists { "replace" } else { "set" };
        let question = format!("Would you like to {} {} credentials?", verb, self.addon.name);
        if !self.prompt.confirm(&question).await? {
            return Ok(CredentialAction::Kept);
        };

        let authtoken = self
            .prompt
            .ask(&format!("-- Enter {} authtoken:", self.addon.name))
            .await?;
        let api_key = self
            .prompt
            .ask(&format!("-- Enter {} apikey:", self.addon.name))
            .await?;
        self.write_credentials(&CredentialBundle::new(authtoken, api_key))
            .await?;

        Ok(if exists {
            CredentialAction::Replaced
        } else {
            CredentialAction::Set
        })
    }

    pub async fn write_credentials(&self, credentials: &CredentialBundle) -> Result<(), Error> {
        self.cluster
            .create_secret(
                self.profile,
                &self.addon.namespace,
                &self.addon.secret_name,
                &credentials.to_data(),
                &self.addon.labels,
            )
            .await?;
        info!(
            "Secret {}/{} written on {}",
            self.addon.namespace, self.addon.secret_name, self.profile
        );
        Ok(())
    }

    async fn choose_domain_strategy(&mut self) -> Result<DomainStrategy, Error> {
        let choice = self
            .prompt
            .choose(
                "Would you like to use a single domain for all services or a unique domain for each? Free accounts can only use a single domain.",
                &DomainStrategy::CHOICES,
            )
            .await?;
        choice.parse()
    }
}
