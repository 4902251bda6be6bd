use std::path::PathBuf;
use tracing::{error, info};

use super::Prompter;
use crate::addon::PolicyModule;
use crate::controller::Error;

async fn read_policy_module(path: PathBuf) -> Result<PolicyModule, Error> {
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(PolicyModule { path, contents }),
        Err(source) => Err(Error::PolicyModuleUnreadable { path, source }),
    }
}

/// Prompts for policy module paths until `sentinel` is entered. Unreadable
/// files are reported and the loop keeps going.
pub async fn load_policy_modules(
    prompt: &mut dyn Prompter,
    sentinel: &str,
) -> Result<Vec<PolicyModule>, Error> {
    let mut modules: Vec<PolicyModule> = Vec::new();
    let question = format!("Give path to policy module file (type '{}' if done):", sentinel);

    loop {
        let answer = prompt.ask_optional(&question).await?;
        if answer == sentinel {
            break;
        };
        if answer.is_empty() {
            continue;
        };

        match read_policy_module(PathBuf::from(answer)).await {
            Ok(module) => {
                info!("Loaded policy module {}", module.path.display());
                modules.push(module);
            }
            Err(e) => {
                error!("{}", e);
                prompt.report_error(&e.to_string());
            }
        };
    }

    Ok(modules)
}
