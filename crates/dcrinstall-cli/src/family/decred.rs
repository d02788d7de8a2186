//! The Decred suite: node, wallet, lightning and helpers.

use std::path::Path;

use dcrinstall_core::install::create_private_dir;
use dcrinstall_core::template::Override;
use dcrinstall_schema::{Component, ConfigSpec};
use tracing::info;

use super::{Family, network_override};
use crate::ops::{InstallError, RunContext};
use crate::settings::{ManifestSource, Settings};

const CATALOGUE: &[Component] = &[
    Component::versioned("dcrctl").with_config(ConfigSpec::archived(
        "dcrctl.conf",
        "sample-dcrctl.conf",
    )),
    Component::versioned("dcrd").with_config(ConfigSpec::archived("dcrd.conf", "sample-dcrd.conf")),
    Component::versioned("dcrwallet").with_config(ConfigSpec::archived(
        "dcrwallet.conf",
        "sample-dcrwallet.conf",
    )),
    Component::versioned("dcrlnd").with_config(ConfigSpec::archived(
        "dcrlnd.conf",
        "sample-dcrlnd.conf",
    )),
    Component::versioned("dcrlncli"),
    Component::versioned("politeiavoter").with_config(ConfigSpec::archived(
        "politeiavoter.conf",
        "sample-politeiavoter.conf",
    )),
    Component::unversioned("promptsecret"),
    Component::unversioned("gencerts"),
];

#[derive(Debug, Clone, Copy)]
pub struct Decred;

impl Family for Decred {
    fn name(&self) -> &'static str {
        "decred"
    }

    fn catalogue(&self) -> &'static [Component] {
        CATALOGUE
    }

    fn manifest<'a>(&self, settings: &'a Settings) -> Option<&'a ManifestSource> {
        settings.decred.as_ref()
    }

    fn overrides(&self, ctx: &RunContext, component: &Component) -> Vec<Override> {
        let creds = &ctx.credentials;
        let (user, pass) = match component.name {
            "dcrwallet" => ("; username=", "; password="),
            "dcrlnd" => ("; dcrd.rpcuser=", "; dcrd.rpcpass="),
            _ => ("; rpcuser=", "; rpcpass="),
        };

        let mut overrides = vec![
            Override::new(user, &creds.username),
            Override::new(pass, &creds.password),
        ];
        overrides.extend(network_override(ctx.settings.network));
        overrides
    }

    fn after_configs(
        &self,
        ctx: &RunContext,
        bundle: &Path,
        notices: &mut Vec<String>,
    ) -> Result<(), InstallError> {
        client_certificates(ctx, bundle)?;
        create_wallet(ctx, bundle)?;

        let net = ctx.settings.network.data_dir_name();
        let channel_db = ctx
            .app_dirs
            .app_data_dir("dcrlnd", false)
            .join("data")
            .join("graph")
            .join(net)
            .join("channel.db");
        if !channel_db.exists() {
            let dcrlncli = ctx
                .settings
                .destination
                .join(ctx.settings.tuple.executable("dcrlncli"));
            notices.push(format!(
                "The lightning wallet could not be automatically created.\n\n\
                 To create a lightning wallet:\n\
                 * Start dcrlnd\n\
                 * Run '{} create'",
                dcrlncli.display()
            ));
        }
        Ok(())
    }
}

/// Give politeiavoter a client certificate that dcrwallet trusts.
fn client_certificates(ctx: &RunContext, bundle: &Path) -> Result<(), InstallError> {
    let wallet_dir = ctx.app_dirs.app_data_dir("dcrwallet", false);
    let voter_dir = ctx.app_dirs.app_data_dir("politeiavoter", false);
    let clients = wallet_dir.join("clients.pem");
    let cert = voter_dir.join("client.pem");
    let key = voter_dir.join("client-key.pem");

    let present = [&clients, &cert, &key]
        .iter()
        .filter(|p| p.exists())
        .count();
    match present {
        3 => {
            info!("client certificates already installed");
            Ok(())
        }
        0 => {
            create_private_dir(&voter_dir)?;
            create_private_dir(&wallet_dir)?;
            let gencerts = bundle.join(ctx.settings.tuple.executable("gencerts"));
            ctx.caps
                .provisioner
                .generate_client_cert(&gencerts, &cert, &key)?;
            std::fs::copy(&cert, &clients)?;
            info!(path = %clients.display(), "installed wallet client certificates");
            Ok(())
        }
        _ => Err(InstallError::context(
            "client certificates",
            "can't determine client certificate state, must perform manual upgrade",
        )),
    }
}

fn create_wallet(ctx: &RunContext, bundle: &Path) -> Result<(), InstallError> {
    let network = ctx.settings.network;
    let wallet_db = ctx
        .app_dirs
        .app_data_dir("dcrwallet", false)
        .join(network.data_dir_name())
        .join("wallet.db");
    if wallet_db.exists() {
        info!(path = %wallet_db.display(), "wallet already exists");
        return Ok(());
    }

    let dcrwallet = bundle.join(ctx.settings.tuple.executable("dcrwallet"));
    ctx.caps.provisioner.create_wallet(&dcrwallet, network)?;
    Ok(())
}
