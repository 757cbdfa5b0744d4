use std::io::Write;

use derive_more::{Display, Error, From};
use indicatif::ProgressBar;
use tracing::{error, info};

use crate::{
    commands::Deploy,
    config::DeployConfig,
    credential::{CommandCredentialProvider, CredentialProvider, StaticCredentialProvider},
    hosting::{HostingClient, HostingError},
    pipeline::{DeployError, Deployment},
};

/// `deploy` subcommand errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum DeployCommandError {
    /// Unable to construct the hosting API client.
    #[display(fmt = "unable to create hosting client: {}", _0)]
    Client(HostingError),

    /// Deployment pipeline error.
    Deployment(DeployError),
}

/// Deployment flow entrypoint.
pub(crate) fn deploy(
    Deploy {
        site,
        build_dir,
        api_url,
    }: Deploy,
    mut config: DeployConfig,
    out: &mut dyn Write,
) -> Result<(), DeployCommandError> {
    if let Some(site) = site {
        config.site_id = site;
    }

    if let Some(build_dir) = build_dir {
        config.build_dir = build_dir;
    }

    if let Some(api_url) = api_url {
        config.api_url = api_url;
    }

    let credentials: Box<dyn CredentialProvider> = match &config.token {
        Some(token) => Box::new(StaticCredentialProvider::new(token.as_str())),
        None => Box::new(CommandCredentialProvider::new(
            config.credential_helper.program.as_str(),
            config.credential_helper.args.clone(),
        )),
    };

    let hosting = HostingClient::new(&config.api_url, config.request_timeout())?;

    let progress = ProgressBar::new_spinner();

    info!(site = %config.site_id, build_dir = %config.build_dir.display(), "starting deployment");

    let outcome = Deployment::new(&config)
        .run(credentials.as_ref(), &hosting, &progress, out)
        .map_err(|e| {
            progress.abandon();
            error!(stage = %e.stage(), %e, "deployment failed");
            e
        })?;

    info!(
        release = %outcome.release.name,
        entries = outcome.entries,
        size = outcome.archive_size,
        "deployment finished"
    );

    Ok(())
}
