use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use ngrok_addon::operator::{
    ConfigurationWizard, KubeCluster, Prompter, ScriptedPrompt, TerminalPrompt,
};
use ngrok_addon::{
    enable_addons, enable_or_disable, validate_before_enable, Admission, Error, NgrokAddon,
    DEFAULT_PROFILE,
};

#[derive(Parser)]
#[command(name = "ngrok-addon")]
#[command(bin_name = "ngrok-addon")]
#[command(author, version, about, long_about = None)]
struct NgrokAddonCli {
    /// Cluster profile, used as the kubeconfig context
    #[arg(short, long, global = true, env = "MINIKUBE_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Kubeconfig file to read instead of the default location
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactively set credentials and map services to ingress
    Configure(ConfigureArgs),
    /// Enable one or more addons, skipping any without credentials
    Enable(EnableArgs),
    /// Disable an addon
    Disable(AddonArgs),
    /// Check whether an addon may be enabled
    Validate(AddonArgs),
}

#[derive(Args)]
struct ConfigureArgs {
    addon: String,

    /// JSON array of answers to use instead of the terminal
    #[arg(long)]
    answers: Option<PathBuf>,
}

#[derive(Args)]
struct EnableArgs {
    #[arg(required = true)]
    addons: Vec<String>,
}

#[derive(Args)]
struct AddonArgs {
    addon: String,
}

async fn configure(
    cluster: &KubeCluster,
    profile: &str,
    addon: &NgrokAddon,
    args: ConfigureArgs,
) -> Result<(), Error> {
    if args.addon != addon.name {
        return Err(Error::UnknownAddon(args.addon));
    };

    let mut prompt: Box<dyn Prompter> = match args.answers {
        Some(path) => Box::new(ScriptedPrompt::from_file(&path).await?),
        None => Box::new(TerminalPrompt::new()),
    };

    let report = ConfigurationWizard::new(cluster, prompt.as_mut(), addon, profile)
        .run()
        .await?;
    info!(
        "Configured {}: credentials {:?}, {} ingress created, {} mapping failures",
        addon.name,
        report.credentials,
        report.ingresses.len(),
        report.mapping_failures
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = NgrokAddonCli::parse();
    let cluster = KubeCluster::new(cli.kubeconfig);
    let addon = NgrokAddon::default();
    let profile = cli.profile.as_str();

    match cli.command {
        Command::Configure(args) => configure(&cluster, profile, &addon, args).await?,
        Command::Enable(args) => {
            let report = enable_addons(&cluster, profile, &addon, &args.addons).await?;
            for name in report.enabled {
                println!("{} was successfully enabled", name);
            }
            for name in report.skipped {
                println!("{} was skipped", name);
            }
        }
        Command::Disable(args) => {
            if args.addon != addon.name {
                return Err(Error::UnknownAddon(args.addon).into());
            };
            enable_or_disable(&cluster, profile, &addon, &args.addon, "false").await?;
            println!("{} was successfully disabled", args.addon);
        }
        Command::Validate(args) => {
            if args.addon != addon.name {
                return Err(Error::UnknownAddon(args.addon).into());
            };
            match validate_before_enable(&cluster, profile, &addon).await? {
                Admission::Allow => println!("{} may be enabled", args.addon),
                Admission::Skip { remediation } => println!("{}", remediation),
            };
        }
    };

    Ok(())
}
