//! The dcrdex exchange client.

use dcrinstall_core::template::Override;
use dcrinstall_schema::{Component, ConfigSpec};

use super::{Family, network_override};
use crate::ops::RunContext;
use crate::settings::{ManifestSource, Settings};

const DEXC_SAMPLE: &str = include_str!("../../samples/dexc.conf");
const DEXCCTL_SAMPLE: &str = include_str!("../../samples/dexcctl.conf");

const CATALOGUE: &[Component] = &[
    Component::versioned("dexcctl").with_config(ConfigSpec::embedded("dexcctl.conf", DEXCCTL_SAMPLE)),
    Component::versioned("dexc").with_config(ConfigSpec::embedded("dexc.conf", DEXC_SAMPLE)),
    Component::directory("site"),
];

#[derive(Debug, Clone, Copy)]
pub struct Dcrdex;

impl Family for Dcrdex {
    fn name(&self) -> &'static str {
        "dcrdex"
    }

    fn catalogue(&self) -> &'static [Component] {
        CATALOGUE
    }

    fn manifest<'a>(&self, settings: &'a Settings) -> Option<&'a ManifestSource> {
        settings.dcrdex.as_ref()
    }

    fn overrides(&self, ctx: &RunContext, _component: &Component) -> Vec<Override> {
        let mut overrides = vec![
            Override::new("; rpc=", "1"),
            Override::new("; rpcuser=", &ctx.credentials.username),
            Override::new("; rpcpass=", &ctx.credentials.password),
        ];
        overrides.extend(network_override(ctx.settings.network));
        overrides
    }

    fn notices(&self, _ctx: &RunContext) -> Vec<String> {
        vec![
            "DCRDEX:\n\n\
             * Start wallets (dcrd/dcrwallet and bitcoind) before starting dexc.\n\
             * Allow both wallets to synchronize completely.\n\n\
             Please read the release notes at https://github.com/decred/dcrdex/releases \
             for IMPORTANT NOTICES."
                .to_string(),
        ]
    }
}
