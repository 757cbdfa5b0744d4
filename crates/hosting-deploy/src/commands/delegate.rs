use std::io::{self, Write};

use derive_more::{Display, Error, From};
use tracing::{error, info};

use crate::{
    commands::Delegate,
    config::DeployConfig,
    helper::{Helper, HelperError},
};

/// `delegate` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DelegateError {
    /// Hosting CLI failed.
    #[display(fmt = "Deployment failed: {}", _0)]
    Helper(HelperError),

    /// Unable to print the confirmation.
    Io(io::Error),
}

/// Arguments that make the hosting CLI deploy `site_id`.
fn deploy_args(site_id: &str) -> [&str; 5] {
    ["deploy", "--only", "hosting", "--project", site_id]
}

/// Delegated deployment flow entrypoint.
///
/// The hosting CLI packages and releases the project itself, using its own
/// configuration file in `project_dir`.
pub(crate) fn delegate(
    Delegate { site, project_dir }: Delegate,
    config: DeployConfig,
    out: &mut dyn Write,
) -> Result<(), DelegateError> {
    let site_id = site.unwrap_or(config.site_id);

    let helper = Helper::new(config.hosting_cli.program, config.hosting_cli.args)
        .with_args(deploy_args(&site_id));

    info!(site = %site_id, project_dir = %project_dir.display(), "delegating deployment");

    helper.run_in(&project_dir).map_err(|e| {
        error!(%e, "delegated deployment failed");
        e
    })?;

    writeln!(out, "Deployment successful!")?;

    Ok(())
}
