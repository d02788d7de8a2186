//! Manifest signing keys.
//!
//! Release keys are embedded at build time from `keys/<family>.asc` in this
//! crate. A family without an embedded key must be given one with
//! `--<family>-pubkey`, or run with `--skip-pgp`.

use std::path::Path;

use crate::ops::InstallError;

const DECRED: &str = include_str!(concat!(env!("OUT_DIR"), "/decred.asc"));
const DCRDEX: &str = include_str!(concat!(env!("OUT_DIR"), "/dcrdex.asc"));
const BITCOIN: &str = include_str!(concat!(env!("OUT_DIR"), "/bitcoin.asc"));

/// The key compiled in for `family`, if any.
pub fn built_in(family: &str) -> Option<&'static str> {
    let key = match family {
        "decred" => DECRED,
        "dcrdex" => DCRDEX,
        "bitcoin" => BITCOIN,
        _ => return None,
    };
    (!key.trim().is_empty()).then_some(key)
}

/// Armored key for `family`, preferring an operator-supplied file.
pub fn resolve(family: &'static str, override_file: Option<&Path>) -> Result<String, InstallError> {
    if let Some(path) = override_file {
        return std::fs::read_to_string(path).map_err(|e| {
            InstallError::context("read public key", format!("{}: {e}", path.display()))
        });
    }
    built_in(family).map(str::to_string).ok_or_else(|| {
        InstallError::Validation(format!(
            "no built-in {family} signing key: pass --{family}-pubkey FILE or --skip-pgp"
        ))
    })
}
