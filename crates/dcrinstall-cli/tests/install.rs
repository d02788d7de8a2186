//! Orchestrator runs against local release fixtures with fake capabilities.
#![cfg(unix)]

mod common;

use std::fs;

use common::{DEX_VERSION, FakeProbe, Fakes, Fixture, Verdict};
use dcrinstall_cli::ops::{self, InstallError};
use dcrinstall_core::VerifyError;
use dcrinstall_core::precondition::PreconditionError;
use dcrinstall_schema::{ManifestError, Network, Tuple};

fn dex_args<'a>(manifest: &'a str, key: &'a str) -> Vec<&'a str> {
    vec![
        "--skip-decred",
        "--dcrdex",
        "--dcrdex-manifest",
        manifest,
        "--dcrdex-pubkey",
        key,
    ]
}

#[tokio::test]
async fn fresh_install_lays_down_binaries_and_configs() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();
    let ctx = fx.context(&dex_args(&manifest, &key), &fakes);

    let report = ops::run(&ctx).await.unwrap();

    assert!(fx.installed("dexc").is_file());
    assert!(fx.installed("dexcctl").is_file());
    assert!(fx.installed("site").join("index.html").is_file());
    assert_eq!(report.installed.len(), 3);

    let dexc_conf = fs::read_to_string(fx.config("dexc", "dexc.conf", false)).unwrap();
    assert!(dexc_conf.lines().any(|l| l == "rpc=1"));
    assert!(dexc_conf.contains(&format!("rpcuser={}\n", ctx.credentials.username)));
    assert!(dexc_conf.contains(&format!("rpcpass={}\n", ctx.credentials.password)));
    assert!(fx.config("dexcctl", "dexcctl.conf", false).is_file());
    assert_eq!(report.configs.len(), 2);

    assert!(report.notices.iter().any(|n| n.starts_with("DCRDEX")));
    assert_eq!(fakes.fetcher.count(".tar.gz"), 1);
    assert_eq!(fakes.fetcher.count("dexc-manifest.txt.asc"), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn configs_are_private() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();
    ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap();

    let conf = fx.config("dexc", "dexc.conf", false);
    let mode = fs::metadata(&conf).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    let dir_mode = fs::metadata(conf.parent().unwrap()).unwrap().permissions().mode();
    assert_eq!(dir_mode & 0o777, 0o700);
}

#[tokio::test]
async fn rerun_reuses_the_extracted_bundle() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();

    ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap();
    let first = fs::read(fx.installed("dexc")).unwrap();
    let conf = fs::read_to_string(fx.config("dexc", "dexc.conf", false)).unwrap();

    ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap();

    assert_eq!(fakes.fetcher.count(".tar.gz"), 1, "archive fetched again");
    assert_eq!(fs::read(fx.installed("dexc")).unwrap(), first);
    // Existing configs are never rewritten, so the first run's credentials stay.
    assert_eq!(
        fs::read_to_string(fx.config("dexc", "dexc.conf", false)).unwrap(),
        conf
    );
}

#[tokio::test]
async fn force_download_fetches_again() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();

    ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap();
    let mut args = dex_args(&manifest, &key);
    args.push("--force-download");
    ops::run(&fx.context(&args, &fakes)).await.unwrap();

    assert_eq!(fakes.fetcher.count(".tar.gz"), 2);
}

#[tokio::test]
async fn partial_install_is_refused_without_changes() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();

    ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap();
    fs::remove_file(fx.installed("dexc")).unwrap();
    let dexcctl = fs::read(fx.installed("dexcctl")).unwrap();

    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("dcrdex: check preconditions:"), "{message}");
    assert!(matches!(
        err.root(),
        InstallError::Precondition(PreconditionError::PartialBinaries { .. })
    ));
    assert!(message.contains(&fx.installed("dexcctl").display().to_string()));
    assert!(message.contains(&fx.installed("dexc").display().to_string()));
    assert!(!fx.installed("dexc").exists());
    assert_eq!(fs::read(fx.installed("dexcctl")).unwrap(), dexcctl);
}

#[tokio::test]
async fn corrupt_archive_is_rejected_before_extraction() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let archive = format!("dexc-{}-v{DEX_VERSION}.tar.gz", Tuple::current());
    fs::write(fx.release.join(&archive), b"tampered").unwrap();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();

    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();

    assert!(matches!(
        err.root(),
        InstallError::Verify(VerifyError::CorruptDigest { .. })
    ));
    assert!(!fx.dest.join(archive.trim_end_matches(".tar.gz")).exists());
    assert!(!fx.installed("dexc").exists());
}

#[tokio::test]
async fn missing_platform_is_not_found() {
    let fx = Fixture::new();
    let manifest = fx.publish(
        "dexc-manifest.txt",
        &format!("{}  dexc-plan9-mips-v{DEX_VERSION}.tar.gz\n", "1".repeat(64)),
    );
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();

    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("dcrdex: locate artifact:"));
    assert!(matches!(
        err.root(),
        InstallError::Manifest(ManifestError::NotFound { .. })
    ));
}

#[tokio::test]
async fn bad_signature_stops_the_run() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::with(Verdict::Bad, FakeProbe::default());

    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("dcrdex: verify manifest:"));
    assert_eq!(fakes.fetcher.count(".tar.gz"), 0);
}

#[tokio::test]
async fn unsupported_signature_is_fatal_for_detached_families() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::with(Verdict::Unsupported, FakeProbe::default());

    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), InstallError::Verify(e) if e.is_unsupported()));
}

#[tokio::test]
async fn manifest_pin_is_enforced() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let wrong = "f".repeat(64);
    let mut args = dex_args(&manifest, &key);
    args.extend(["--dcrdex-manifest-digest", wrong.as_str()]);
    let fakes = Fakes::default();

    let err = ops::run(&fx.context(&args, &fakes)).await.unwrap_err();
    assert!(matches!(
        err.root(),
        InstallError::Verify(VerifyError::CorruptDigest { .. })
    ));

    let pin = common::sha256(&fx.release.join("dexc-manifest.txt"));
    let mut args = dex_args(&manifest, &key);
    args.extend(["--dcrdex-manifest-digest", pin.as_str()]);
    ops::run(&fx.context(&args, &fakes)).await.unwrap();
}

#[tokio::test]
async fn running_daemons_block_the_install() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let probe = FakeProbe {
        running: vec!["dexc", "dexcctl"],
    };
    let fakes = Fakes::with(Verdict::Good, probe);

    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();
    match err.root() {
        InstallError::Precondition(PreconditionError::Running { names }) => {
            assert_eq!(names, &["dexcctl", "dexc"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut args = dex_args(&manifest, &key);
    args.push("--allow-running");
    ops::run(&fx.context(&args, &fakes)).await.unwrap();
}

#[tokio::test]
async fn download_only_keeps_verified_archives() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let downloads = fx.home.join("downloads");
    let downloads_arg = downloads.display().to_string();
    let mut args = dex_args(&manifest, &key);
    args.extend(["--download-only", "--path", downloads_arg.as_str()]);
    let fakes = Fakes::default();

    let report = ops::run(&fx.context(&args, &fakes)).await.unwrap();

    assert_eq!(report.downloads.len(), 1);
    assert!(report.downloads[0].starts_with(&downloads));
    assert!(report.downloads[0].is_file());
    assert!(downloads.join("dexc-manifest.txt").is_file());
    assert!(!fx.installed("dexc").exists());
    assert!(!fx.config("dexc", "dexc.conf", false).exists());
}

#[tokio::test]
async fn skip_download_reads_the_local_directory() {
    let fx = Fixture::new();
    fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let release = fx.release.display().to_string();
    let args = [
        "--skip-decred",
        "--dcrdex",
        "--dcrdex-manifest",
        "https://example.invalid/dexc-manifest.txt",
        "--dcrdex-pubkey",
        key.as_str(),
        "--skip-download",
        "--path",
        release.as_str(),
    ];
    let fakes = Fakes::default();

    ops::run(&fx.context(&args, &fakes)).await.unwrap();

    assert_eq!(fakes.fetcher.count(""), 0);
    assert!(fx.installed("dexc").is_file());
}

#[tokio::test]
async fn later_family_failure_leaves_earlier_families_untouched() {
    let fx = Fixture::new();
    let decred = fx.decred_release();
    let dex = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    // dcrdex partially installed: only dexcctl present
    fs::create_dir_all(&fx.dest).unwrap();
    let stub = "#!/bin/sh\necho \"dexcctl version 0.3.0\"\n";
    fs::write(fx.installed("dexcctl"), stub).unwrap();
    make_executable(&fx.installed("dexcctl"));

    let args = [
        "--dcrdex",
        "--decred-manifest",
        decred.as_str(),
        "--decred-pubkey",
        key.as_str(),
        "--dcrdex-manifest",
        dex.as_str(),
        "--dcrdex-pubkey",
        key.as_str(),
    ];
    let fakes = Fakes::default();
    let err = ops::run(&fx.context(&args, &fakes)).await.unwrap_err();

    assert!(err.to_string().starts_with("dcrdex: check preconditions:"));
    assert!(!fx.installed("dcrd").exists());
    assert!(!fx.config("dcrd", "dcrd.conf", false).exists());
    assert!(fakes.provisioner.wallets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn decred_provisions_certificates_and_wallet() {
    let fx = Fixture::new();
    let manifest = fx.decred_release();
    let key = fx.pubkey().display().to_string();
    let args = [
        "--net",
        "testnet",
        "--decred-manifest",
        manifest.as_str(),
        "--decred-pubkey",
        key.as_str(),
    ];
    let fakes = Fakes::default();
    let ctx = fx.context(&args, &fakes);

    let report = ops::run(&ctx).await.unwrap();

    for name in ["dcrd", "dcrwallet", "dcrlncli", "gencerts", "promptsecret"] {
        assert!(fx.installed(name).is_file(), "{name} not installed");
    }
    assert_eq!(report.configs.len(), 5);

    let wallet_conf = fs::read_to_string(fx.config("dcrwallet", "dcrwallet.conf", false)).unwrap();
    assert!(wallet_conf.contains(&format!("username={}\n", ctx.credentials.username)));
    assert!(wallet_conf.contains("testnet=1\n"));
    assert!(wallet_conf.contains("; rpcuser=\n"));
    let lnd_conf = fs::read_to_string(fx.config("dcrlnd", "dcrlnd.conf", false)).unwrap();
    assert!(lnd_conf.contains(&format!("dcrd.rpcpass={}\n", ctx.credentials.password)));

    assert_eq!(
        *fakes.provisioner.certs.lock().unwrap(),
        [fx.config("politeiavoter", "client.pem", false)]
    );
    assert_eq!(
        fs::read_to_string(fx.config("dcrwallet", "clients.pem", false)).unwrap(),
        "cert"
    );
    assert_eq!(*fakes.provisioner.wallets.lock().unwrap(), [Network::Testnet]);
    assert!(
        report
            .notices
            .iter()
            .any(|n| n.contains("lightning wallet could not be automatically created"))
    );
}

#[tokio::test]
async fn existing_wallet_and_certificates_are_kept() {
    let fx = Fixture::new();
    let manifest = fx.decred_release();
    let key = fx.pubkey().display().to_string();
    let args = [
        "--decred-manifest",
        manifest.as_str(),
        "--decred-pubkey",
        key.as_str(),
    ];
    for (app, file) in [
        ("dcrwallet", "clients.pem"),
        ("politeiavoter", "client.pem"),
        ("politeiavoter", "client-key.pem"),
    ] {
        let path = fx.config(app, file, false);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "existing").unwrap();
    }
    let wallet_db = fx
        .app_dirs()
        .app_data_dir("dcrwallet", false)
        .join("mainnet")
        .join("wallet.db");
    fs::create_dir_all(wallet_db.parent().unwrap()).unwrap();
    fs::write(&wallet_db, "db").unwrap();

    let fakes = Fakes::default();
    ops::run(&fx.context(&args, &fakes)).await.unwrap();

    assert!(fakes.provisioner.certs.lock().unwrap().is_empty());
    assert!(fakes.provisioner.wallets.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mixed_certificate_state_needs_a_human() {
    let fx = Fixture::new();
    let manifest = fx.decred_release();
    let key = fx.pubkey().display().to_string();
    let args = [
        "--decred-manifest",
        manifest.as_str(),
        "--decred-pubkey",
        key.as_str(),
    ];
    let cert = fx.config("politeiavoter", "client.pem", false);
    fs::create_dir_all(cert.parent().unwrap()).unwrap();
    fs::write(&cert, "orphan").unwrap();

    let fakes = Fakes::default();
    let err = ops::run(&fx.context(&args, &fakes)).await.unwrap_err();

    assert!(err.to_string().contains("manual upgrade"));
    assert!(!fx.installed("dcrd").exists());
}

#[tokio::test]
async fn foreign_tuple_installs_binaries_only() {
    let fx = Fixture::new();
    let foreign: Tuple = "plan9-mips".parse().unwrap();
    let bundle = format!("dexc-{foreign}-v{DEX_VERSION}");
    let files = vec![
        (format!("{bundle}/dexcctl"), b"dexcctl".to_vec(), 0o644),
        (format!("{bundle}/dexc"), b"dexc".to_vec(), 0o644),
        (format!("{bundle}/site/index.html"), b"<html/>".to_vec(), 0o644),
    ];
    let archive = format!("{bundle}.tar.gz");
    let digest = common::write_tar_gz(&fx.release.join(&archive), &files);
    let manifest = fx.publish("dexc-manifest.txt", &format!("{digest}  {archive}\n"));
    let key = fx.pubkey().display().to_string();
    let mut args = dex_args(&manifest, &key);
    args.extend(["--tuple", "plan9-mips"]);
    // A probe that would fail the run if consulted.
    let fakes = Fakes::with(
        Verdict::Good,
        FakeProbe {
            running: vec!["dexc"],
        },
    );

    ops::run(&fx.context(&args, &fakes)).await.unwrap();

    assert!(fx.installed("dexc").is_file());
    assert!(!fx.config("dexc", "dexc.conf", false).exists());
}

fn make_executable(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[tokio::test]
async fn bitcoin_tolerates_an_unverifiable_signature() {
    let alias = match Tuple::current().to_string().as_str() {
        "linux-amd64" => "x86_64-linux-gnu",
        "linux-arm64" => "aarch64-linux-gnu",
        "darwin-amd64" => "osx64",
        _ => return,
    };
    let fx = Fixture::new();
    let bundle = "bitcoin-0.20.1";
    let script = "#!/bin/sh\necho \"Bitcoin Core version v0.20.1\"\n";
    let files = vec![
        (format!("{bundle}/bin/bitcoin-cli"), script.as_bytes().to_vec(), 0o755),
        (format!("{bundle}/bin/bitcoind"), script.as_bytes().to_vec(), 0o755),
    ];
    let archive = format!("{bundle}-{alias}.tar.gz");
    let digest = common::write_tar_gz(&fx.release.join(&archive), &files);
    let sums = format!(
        "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\n\
         {digest}  {archive}\n\
         {}  {bundle}-{alias}-debug.tar.gz\n\
         -----BEGIN PGP SIGNATURE-----\n\nwsBcBAEB\n-----END PGP SIGNATURE-----\n",
        "9".repeat(64)
    );
    let manifest = fx.publish("SHA256SUMS.asc", &sums);
    let key = fx.pubkey().display().to_string();
    let args = [
        "--skip-decred",
        "--bitcoin",
        "--bitcoin-manifest",
        manifest.as_str(),
        "--bitcoin-pubkey",
        key.as_str(),
    ];
    let fakes = Fakes::with(Verdict::Unsupported, FakeProbe::default());
    let ctx = fx.context(&args, &fakes);

    let report = ops::run(&ctx).await.unwrap();

    assert!(fx.installed("bitcoind").is_file());
    assert!(fx.installed("bitcoin-cli").is_file());
    assert!(
        report
            .notices
            .iter()
            .any(|n| n.contains("bitcoin signature error that was logged is expected"))
    );
    let conf = fs::read_to_string(fx.config("bitcoin", "bitcoin.conf", true)).unwrap();
    assert!(conf.contains(&format!("rpcuser={}\n", ctx.credentials.username)));
    assert!(conf.contains("prune=550\n"));
}

#[tokio::test]
async fn incomplete_upgrade_archive_leaves_the_install_alone() {
    let fx = Fixture::new();
    let key = fx.pubkey().display().to_string();
    let fakes = Fakes::default();
    let manifest = fx.dcrdex_release();
    ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap();
    let dexc = fs::read(fx.installed("dexc")).unwrap();
    let dexcctl = fs::read(fx.installed("dexcctl")).unwrap();

    let manifest = fx.dcrdex_release_without("0.5.0", &["dexc"]);
    let err = ops::run(&fx.context(&dex_args(&manifest, &key), &fakes))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("dcrdex: extract artifact:"), "{message}");
    assert!(message.contains("missing dexc"), "{message}");
    assert_eq!(fs::read(fx.installed("dexc")).unwrap(), dexc);
    assert_eq!(fs::read(fx.installed("dexcctl")).unwrap(), dexcctl);

    // The broken bundle is never recorded as extracted.
    let bundle = format!("dexc-{}-v0.5.0", Tuple::current());
    assert!(!fx.dest.join(bundle).join(".dcrinstall-digest").exists());
}

#[tokio::test]
async fn download_dir_may_be_the_local_mirror() {
    let fx = Fixture::new();
    let manifest = fx.dcrdex_release();
    let key = fx.pubkey().display().to_string();
    let mirror = fx.release.display().to_string();
    let manifest_text = fs::read(fx.release.join("dexc-manifest.txt")).unwrap();
    let mut args = dex_args(&manifest, &key);
    args.extend(["--path", mirror.as_str()]);
    let fakes = Fakes::default();

    ops::run(&fx.context(&args, &fakes)).await.unwrap();

    assert!(fx.installed("dexc").is_file());
    assert_eq!(
        fs::read(fx.release.join("dexc-manifest.txt")).unwrap(),
        manifest_text
    );
    let archive = format!("dexc-{}-v{DEX_VERSION}.tar.gz", Tuple::current());
    assert!(fs::metadata(fx.release.join(archive)).unwrap().len() > 0);
}

#[tokio::test]
async fn notices_survive_a_failed_run() {
    let alias = match Tuple::current().to_string().as_str() {
        "linux-amd64" => "x86_64-linux-gnu",
        "linux-arm64" => "aarch64-linux-gnu",
        "darwin-amd64" => "osx64",
        _ => return,
    };
    let fx = Fixture::new();
    let bundle = "bitcoin-0.20.1";
    let files = vec![(
        format!("{bundle}/bin/bitcoind"),
        b"#!/bin/sh\n".to_vec(),
        0o755,
    )];
    let archive = format!("{bundle}-{alias}.tar.gz");
    let digest = common::write_tar_gz(&fx.release.join(&archive), &files);
    let sums = format!(
        "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA256\n\n\
         {digest}  {archive}\n\
         -----BEGIN PGP SIGNATURE-----\n\nwsBcBAEB\n-----END PGP SIGNATURE-----\n"
    );
    let manifest = fx.publish("SHA256SUMS.asc", &sums);
    let key = fx.pubkey().display().to_string();
    let args = [
        "--skip-decred",
        "--bitcoin",
        "--bitcoin-manifest",
        manifest.as_str(),
        "--bitcoin-pubkey",
        key.as_str(),
    ];
    let fakes = Fakes::with(Verdict::Unsupported, FakeProbe::default());
    let ctx = fx.context(&args, &fakes);

    let mut report = ops::RunReport::default();
    let err = ops::run_into(&ctx, &mut report).await.unwrap_err();

    assert!(
        err.to_string().starts_with("bitcoin: extract artifact:"),
        "{err}"
    );
    assert!(
        report
            .notices
            .iter()
            .any(|n| n.contains("bitcoin signature error that was logged is expected"))
    );
    assert!(report.installed.is_empty());
    assert!(!fx.installed("bitcoind").exists());
}
