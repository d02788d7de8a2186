//! Release fixtures: tar.gz bundles of `#!/bin/sh` stand-ins and the
//! manifests that list them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dcrinstall_cli::ops::{Capabilities, RunContext};
use clap::Parser;
use dcrinstall_cli::{Cli, Settings};
use dcrinstall_core::process::ProbeError;
use dcrinstall_core::provision::ProvisionError;
use dcrinstall_core::{
    AppDirs, FetchError, Fetcher, HttpFetcher, ProcessProbe, Provisioner, SignatureVerifier,
    VerifyError,
};
use dcrinstall_schema::{Network, Tuple};
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

pub const DEX_VERSION: &str = "0.4.0";
pub const DECRED_VERSION: &str = "1.7.0";

/// A scratch world: release directory, destination and home.
pub struct Fixture {
    _dir: TempDir,
    pub release: PathBuf,
    pub dest: PathBuf,
    pub home: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let release = dir.path().join("release");
        let dest = dir.path().join("decred");
        let home = dir.path().join("home");
        fs::create_dir_all(&release).unwrap();
        fs::create_dir_all(&home).unwrap();
        Self {
            _dir: dir,
            release,
            dest,
            home,
        }
    }

    pub fn app_dirs(&self) -> AppDirs {
        AppDirs::with_home(&self.home)
    }

    pub fn uri(&self, filename: &str) -> String {
        format!("file://{}", self.release.join(filename).display())
    }

    /// Publish a dcrdex release for the running platform.
    pub fn dcrdex_release(&self) -> String {
        self.dcrdex_release_without(DEX_VERSION, &[])
    }

    /// Publish a dcrdex `version` whose archive lacks the `omitted` payloads.
    pub fn dcrdex_release_without(&self, version: &str, omitted: &[&str]) -> String {
        let tuple = Tuple::current();
        let bundle = format!("dexc-{tuple}-v{version}");
        let archive = format!("{bundle}.tar.gz");
        let files: Vec<_> = [
            versioned(&bundle, "dexcctl", version),
            versioned(&bundle, "dexc", version),
            (format!("{bundle}/site/index.html"), b"<html></html>".to_vec(), 0o644),
        ]
        .into_iter()
        .filter(|(path, _, _)| !omitted.iter().any(|name| path.ends_with(&format!("/{name}"))))
        .collect();
        let digest = write_tar_gz(&self.release.join(&archive), &files);

        let manifest = format!(
            "{}  dexc-windows-amd64-v{version}.zip\n{digest}  {archive}\n",
            "0".repeat(64)
        );
        self.publish("dexc-manifest.txt", &manifest)
    }

    /// Publish a Decred release for the running platform.
    pub fn decred_release(&self) -> String {
        let tuple = Tuple::current();
        let bundle = format!("decred-{tuple}-v{DECRED_VERSION}");
        let archive = format!("{bundle}.tar.gz");

        let mut files: Vec<_> = ["dcrctl", "dcrd", "dcrwallet", "dcrlnd", "dcrlncli", "politeiavoter"]
            .iter()
            .map(|name| versioned(&bundle, name, DECRED_VERSION))
            .collect();
        for name in ["promptsecret", "gencerts"] {
            files.push((format!("{bundle}/{name}"), b"#!/bin/sh\nexit 0\n".to_vec(), 0o755));
        }
        for name in ["dcrctl", "dcrd", "dcrwallet", "dcrlnd", "politeiavoter"] {
            let sample = "[Application Options]\n\n; username=\n; password=\n; rpcuser=\n; rpcpass=\n\
                          ; dcrd.rpcuser=\n; dcrd.rpcpass=\n; testnet=0\n; simnet=0\n";
            files.push((
                format!("{bundle}/sample-{name}.conf"),
                sample.as_bytes().to_vec(),
                0o644,
            ));
        }
        let digest = write_tar_gz(&self.release.join(&archive), &files);
        self.publish("decred-manifest.txt", &format!("{digest}  {archive}\n"))
    }

    /// Write a manifest and a placeholder detached signature; returns its URI.
    pub fn publish(&self, name: &str, manifest: &str) -> String {
        fs::write(self.release.join(name), manifest).unwrap();
        fs::write(self.release.join(format!("{name}.asc")), "signature").unwrap();
        self.uri(name)
    }

    /// A key file for `--<family>-pubkey`; the fake verifier ignores it.
    pub fn pubkey(&self) -> PathBuf {
        let path = self.release.join("key.asc");
        fs::write(&path, "public key").unwrap();
        path
    }

    pub fn settings(&self, args: &[&str]) -> Settings {
        let dest = self.dest.display().to_string();
        let argv = ["dcrinstall", "--dest", dest.as_str()]
            .into_iter()
            .chain(args.iter().copied());
        Settings::from_cli(Cli::try_parse_from(argv).unwrap()).unwrap()
    }

    pub fn context(&self, args: &[&str], fakes: &Fakes) -> RunContext {
        RunContext::with_capabilities(self.settings(args), self.app_dirs(), fakes.capabilities())
            .unwrap()
    }

    pub fn installed(&self, name: &str) -> PathBuf {
        self.dest.join(name)
    }

    pub fn config(&self, app: &str, file: &str, roaming: bool) -> PathBuf {
        self.app_dirs().app_data_dir(app, roaming).join(file)
    }
}

fn versioned(bundle: &str, name: &str, version: &str) -> (String, Vec<u8>, u32) {
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then\n  echo \"{name} version {version}+release\"\nfi\nexit 0\n"
    );
    (format!("{bundle}/{name}"), script.into_bytes(), 0o755)
}

/// Write a tar.gz holding `files` and return its SHA256.
pub fn write_tar_gz(path: &Path, files: &[(String, Vec<u8>, u32)]) -> String {
    let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(gz);
    for (name, data, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    sha256(path)
}

pub fn sha256(path: &Path) -> String {
    hex::encode(Sha256::digest(fs::read(path).unwrap()))
}

/// Copies local files like the real fetcher, counting every request.
#[derive(Default)]
pub struct CountingFetcher {
    inner: HttpFetcher,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingFetcher {
    pub fn count(&self, suffix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(uri, _)| uri.ends_with(suffix))
            .map(|(_, n)| n)
            .sum()
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<(), FetchError> {
        *self.calls.lock().unwrap().entry(uri.to_string()).or_default() += 1;
        self.inner.fetch(uri, dest).await
    }
}

/// Signature outcome the fake verifier reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
    Unsupported,
}

pub struct FakeVerifier(pub Verdict);

impl FakeVerifier {
    fn outcome(&self) -> Result<(), VerifyError> {
        match self.0 {
            Verdict::Good => Ok(()),
            Verdict::Bad => Err(VerifyError::BadSignature("bad signature".into())),
            Verdict::Unsupported => Err(VerifyError::Unsupported("unsupported curve".into())),
        }
    }
}

impl SignatureVerifier for FakeVerifier {
    fn verify_detached(&self, _: &[u8], _: &str, _: &str) -> Result<(), VerifyError> {
        self.outcome()
    }

    fn verify_attached(&self, _: &str, _: &str) -> Result<(), VerifyError> {
        self.outcome()
    }
}

/// Reports the listed names as running; versions come from the binaries.
#[derive(Default)]
pub struct FakeProbe {
    pub running: Vec<&'static str>,
}

impl ProcessProbe for FakeProbe {
    fn is_running(&self, name: &str) -> Result<bool, ProbeError> {
        Ok(self.running.contains(&name))
    }
}

/// Records provisioning calls and writes placeholder certificates.
#[derive(Default)]
pub struct RecordingProvisioner {
    pub certs: Mutex<Vec<PathBuf>>,
    pub wallets: Mutex<Vec<Network>>,
}

impl Provisioner for RecordingProvisioner {
    fn generate_client_cert(
        &self,
        _gencerts: &Path,
        cert: &Path,
        key: &Path,
    ) -> Result<(), ProvisionError> {
        fs::write(cert, "cert").unwrap();
        fs::write(key, "key").unwrap();
        self.certs.lock().unwrap().push(cert.to_path_buf());
        Ok(())
    }

    fn create_wallet(&self, _dcrwallet: &Path, network: Network) -> Result<(), ProvisionError> {
        self.wallets.lock().unwrap().push(network);
        Ok(())
    }
}

/// Shared fakes; keep them around to inspect after a run.
pub struct Fakes {
    pub fetcher: Arc<CountingFetcher>,
    pub verifier: Arc<FakeVerifier>,
    pub probe: Arc<FakeProbe>,
    pub provisioner: Arc<RecordingProvisioner>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self::with(Verdict::Good, FakeProbe::default())
    }
}

impl Fakes {
    pub fn with(verdict: Verdict, probe: FakeProbe) -> Self {
        Self {
            fetcher: Arc::new(CountingFetcher::default()),
            verifier: Arc::new(FakeVerifier(verdict)),
            probe: Arc::new(probe),
            provisioner: Arc::new(RecordingProvisioner::default()),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            fetcher: self.fetcher.clone(),
            verifier: self.verifier.clone(),
            probe: self.probe.clone(),
            provisioner: self.provisioner.clone(),
        }
    }
}
