mod common;

use std::fs;

use common::{Installation, RESTART, STATUS};
use webcert::config::{CertificateType, LOCAL_CONFIG_FILE};
use webcert::error::ErrorKind;
use webcert::process::{CommandOutput, mock::MockRunner};
use webcert::tls::SelfSignedBuilder;
use webcert::{CertGenOptions, Lifecycle};

fn self_signed_for(domain: &str) -> CertGenOptions {
    CertGenOptions {
        cert_type: Some("self-signed".to_string()),
        domain: Some(domain.to_string()),
        ..CertGenOptions::default()
    }
}

#[tokio::test]
async fn test_cert_gen_self_signed_with_https_enabled() {
    let installation = Installation::new();
    installation.link_fragments();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let outcome = lifecycle.cert_gen(self_signed_for("example.org")).await.unwrap();
    assert_eq!(outcome.message, "Certificate generated.");

    let key = installation.path("etc/www/self_signed/privkey.pem");
    let fullchain = installation.path("etc/www/self_signed/fullchain.pem");
    assert!(key.is_file());
    assert!(fullchain.is_file());
    assert_eq!(fs::read_link(installation.path("etc/www/ssl/privkey.pem")).unwrap(), key);
    assert_eq!(
        fs::read_link(installation.path("etc/www/ssl/fullchain.pem")).unwrap(),
        fullchain
    );

    // Exactly one restart and nothing else
    let calls = lifecycle.runner().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(lifecycle.runner().calls_to(RESTART), 1);
}

#[tokio::test]
async fn test_cert_gen_self_signed_with_https_disabled() {
    let installation = Installation::new();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let outcome = lifecycle.cert_gen(self_signed_for("example.org")).await.unwrap();
    assert_eq!(outcome.message, "Certificate generated.");
    assert!(
        outcome
            .notices
            .iter()
            .any(|notice| notice.contains("webcert enable-https"))
    );
    assert!(lifecycle.runner().calls().is_empty());
    assert!(installation.config().active_material().exists());
}

#[tokio::test]
async fn test_cert_gen_persists_options() {
    let installation = Installation::new();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("SELF_SIGNED".to_string()),
            domain: Some("example.org".to_string()),
            email: Some("admin@example.org".to_string()),
            config_only: true,
        })
        .await
        .unwrap();

    let config = installation.config();
    assert_eq!(config.cert_type, "self-signed");
    assert_eq!(config.domain.as_deref(), Some("example.org"));
    assert_eq!(config.email(), Some("admin@example.org"));

    // Configuration only, no material
    assert!(!installation.path("etc/www/self_signed").exists());
    assert!(!config.active_material().exists());
}

#[tokio::test]
async fn test_cert_gen_clears_core_email() {
    let installation = Installation::with_config("email = \"core@example.org\"");
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let outcome = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("self-signed".to_string()),
            domain: Some("example.org".to_string()),
            email: Some(String::new()),
            config_only: true,
        })
        .await
        .unwrap();

    assert!(
        outcome
            .notices
            .contains(&"Clearing the email setting...".to_string())
    );
    assert!(installation.config().email().is_none());
}

#[tokio::test]
async fn test_cert_gen_lets_encrypt_requires_email() {
    let installation = Installation::new();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let err = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("lets-encrypt".to_string()),
            ..CertGenOptions::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(err.to_string().contains("--email EMAIL"));
    assert!(lifecycle.runner().calls().is_empty());
    assert!(!installation.path(LOCAL_CONFIG_FILE).exists());
}

#[tokio::test]
async fn test_cert_gen_unknown_type_changes_nothing() {
    let installation = Installation::new();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let err = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("snakeoil".to_string()),
            domain: Some("example.org".to_string()),
            ..CertGenOptions::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(!installation.path(LOCAL_CONFIG_FILE).exists());
    assert!(lifecycle.runner().calls().is_empty());
}

#[tokio::test]
async fn test_cert_gen_defaults_domain_to_hostname() {
    let installation = Installation::new();
    let runner = MockRunner::new().respond("hostname", CommandOutput::ok("node01.cluster.local\n"));
    let lifecycle = Lifecycle::new(installation.store.clone(), runner);

    let outcome = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("self-signed".to_string()),
            ..CertGenOptions::default()
        })
        .await
        .unwrap();

    assert!(
        outcome
            .notices
            .contains(&"Reverting to the default domain: node01.cluster.local".to_string())
    );
    assert_eq!(
        installation.config().domain.as_deref(),
        Some("node01.cluster.local")
    );
    assert_eq!(lifecycle.runner().calls_to("hostname"), 1);
}

#[tokio::test]
async fn test_cert_gen_keeps_configured_domain() {
    let installation = Installation::with_config("domain = \"example.org\"");
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let outcome = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("self-signed".to_string()),
            ..CertGenOptions::default()
        })
        .await
        .unwrap();

    assert!(outcome.notices.iter().all(|notice| !notice.contains("Reverting")));
    assert_eq!(lifecycle.runner().calls_to("hostname"), 0);

    // The domain matches the core file, so it is not copied into the local file
    let local = fs::read_to_string(installation.path(LOCAL_CONFIG_FILE)).unwrap();
    assert!(!local.contains("domain"));
}

#[tokio::test]
async fn test_cert_gen_lets_encrypt() {
    let installation = Installation::new();
    // Stands in for the files the ACME client writes
    let (key, fullchain) = installation.write_material("etc/letsencrypt/live/example.org");
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("lets-encrypt".to_string()),
            domain: Some("example.org".to_string()),
            email: Some("admin@example.org".to_string()),
            config_only: false,
        })
        .await
        .unwrap();

    let calls = lifecycle.runner().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(lifecycle.runner().calls_to(STATUS), 1);
    let certbot = &calls[1];
    assert_eq!(certbot.program, "certbot");
    assert!(certbot.args.contains(&"--email".to_string()));
    assert!(certbot.args.contains(&"admin@example.org".to_string()));
    assert!(certbot.args.contains(&"--nginx".to_string()));

    let config = installation.config();
    assert_eq!(fs::read_link(&config.ssl_privkey).unwrap(), key);
    assert_eq!(fs::read_link(&config.ssl_fullchain).unwrap(), fullchain);
}

#[tokio::test]
async fn test_cert_gen_lets_encrypt_needs_running_server() {
    let installation = Installation::new();
    let runner = MockRunner::new().respond(STATUS, CommandOutput::failed(3, "inactive"));
    let lifecycle = Lifecycle::new(installation.store.clone(), runner);

    let err = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("lets-encrypt".to_string()),
            domain: Some("example.org".to_string()),
            email: Some("admin@example.org".to_string()),
            config_only: false,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert_eq!(lifecycle.runner().calls_to("certbot"), 0);
    assert!(fs::symlink_metadata(installation.config().ssl_privkey).is_err());
}

#[tokio::test]
async fn test_cert_gen_lets_encrypt_failure_is_not_linked() {
    let installation = Installation::new();
    installation.link_fragments();
    let runner = MockRunner::new().respond(
        "certbot",
        CommandOutput::failed(1, "Some challenges have failed."),
    );
    let lifecycle = Lifecycle::new(installation.store.clone(), runner);

    let err = lifecycle
        .cert_gen(CertGenOptions {
            cert_type: Some("lets-encrypt".to_string()),
            domain: Some("example.org".to_string()),
            email: Some("admin@example.org".to_string()),
            config_only: false,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
    assert!(err.to_string().contains("Some challenges have failed."));
    assert!(fs::symlink_metadata(installation.config().ssl_privkey).is_err());
    assert_eq!(lifecycle.runner().calls_to(RESTART), 0);
}

#[tokio::test]
async fn test_cert_gen_restart_failure_keeps_certificate() {
    let installation = Installation::new();
    installation.link_fragments();
    let runner = MockRunner::new().respond(RESTART, CommandOutput::failed(1, "failed"));
    let lifecycle = Lifecycle::new(installation.store.clone(), runner);

    let err = lifecycle
        .cert_gen(self_signed_for("example.org"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalProcess);
    assert!(installation.config().active_material().exists());
}

#[tokio::test]
async fn test_cert_gen_heals_unknown_stored_type() {
    let installation = Installation::with_config("cert_type = \"snakeoil\"\ndomain = \"example.org\"");
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let outcome = lifecycle.cert_gen(CertGenOptions::default()).await.unwrap();
    assert!(
        outcome
            .notices
            .contains(&"Unrecognized certificate type, reverted to self-signed".to_string())
    );

    let local = fs::read_to_string(installation.path(LOCAL_CONFIG_FILE)).unwrap();
    assert!(local.contains("cert_type = \"self-signed\""));
    assert!(installation.path("etc/www/self_signed/fullchain.pem").is_file());
}

#[tokio::test]
async fn test_cert_install() {
    let installation = Installation::new();
    let generated = SelfSignedBuilder::new("example.org", None).build().unwrap();
    let supplied = installation.path("supplied");
    fs::create_dir_all(&supplied).unwrap();
    fs::write(supplied.join("key.pem"), generated.private_key_pem()).unwrap();
    fs::write(supplied.join("chain.pem"), generated.fullchain_pem()).unwrap();

    installation.link_fragments();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let outcome = lifecycle
        .cert_install(&supplied.join("key.pem"), &supplied.join("chain.pem"))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Certificate installed.");

    let config = installation.config();
    assert_eq!(
        CertificateType::parse(&config.cert_type),
        Some(CertificateType::ExternallyIssued)
    );
    assert_eq!(
        fs::read_link(&config.ssl_privkey).unwrap(),
        supplied.join("key.pem").canonicalize().unwrap()
    );
    assert_eq!(lifecycle.runner().calls_to(STATUS), 1);
    assert_eq!(lifecycle.runner().calls_to(RESTART), 1);
}

#[tokio::test]
async fn test_cert_install_skips_restart_when_server_is_down() {
    let installation = Installation::new();
    let generated = SelfSignedBuilder::new("example.org", None).build().unwrap();
    let supplied = installation.path("supplied");
    fs::create_dir_all(&supplied).unwrap();
    fs::write(supplied.join("key.pem"), generated.private_key_pem()).unwrap();
    fs::write(supplied.join("chain.pem"), generated.fullchain_pem()).unwrap();

    installation.link_fragments();
    let runner = MockRunner::new().respond(STATUS, CommandOutput::failed(3, "inactive"));
    let lifecycle = Lifecycle::new(installation.store.clone(), runner);

    let outcome = lifecycle
        .cert_install(&supplied.join("key.pem"), &supplied.join("chain.pem"))
        .await
        .unwrap();
    assert_eq!(outcome.message, "Certificate installed.");
    assert_eq!(
        outcome.notices,
        vec!["The web server is not running and has not been restarted".to_string()]
    );
    assert_eq!(lifecycle.runner().calls_to(STATUS), 1);
    assert_eq!(lifecycle.runner().calls_to(RESTART), 0);

    let config = installation.config();
    assert_eq!(
        fs::read_link(&config.ssl_fullchain).unwrap(),
        supplied.join("chain.pem").canonicalize().unwrap()
    );
}

#[tokio::test]
async fn test_cert_install_rejects_invalid_files() {
    let installation = Installation::new();
    let (key, fullchain) = installation.write_material("supplied");
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let err = lifecycle.cert_install(&key, &fullchain).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(!installation.path(LOCAL_CONFIG_FILE).exists());
    assert!(fs::symlink_metadata(installation.config().ssl_privkey).is_err());
}

#[tokio::test]
async fn test_cron_renewal_disable_without_script() {
    let installation = Installation::new();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let err = lifecycle.cron_renewal(true).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(!installation.path("etc/cron").exists());
}

#[tokio::test]
async fn test_cron_renewal_round_trip() {
    let installation = Installation::new();
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());
    let script = installation.path("etc/cron/weekly/cert-renewal");

    let outcome = lifecycle.cron_renewal(false).await.unwrap();
    assert_eq!(outcome.message, "Automatic renewal has been enabled");
    let body = fs::read_to_string(&script).unwrap();
    let root = installation.temp_dir.path().display().to_string();
    assert!(body.contains(&format!("webcert --root '{root}' cert-gen")));

    let err = lifecycle.cron_renewal(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);

    let outcome = lifecycle.cron_renewal(true).await.unwrap();
    assert_eq!(outcome.message, "Automatic renewal has been disabled");
    assert!(!script.exists());
}

#[tokio::test]
async fn test_cron_renewal_self_signed() {
    let installation = Installation::with_config("cert_type = \"self-signed\"");
    let lifecycle = Lifecycle::new(installation.store.clone(), MockRunner::new());

    let err = lifecycle.cron_renewal(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(!installation.path("etc/cron").exists());
}
