use std::sync::Arc;

use ci_provision::certificates::{CertificateGenerator, GenerationHooks};
use ci_provision::errors::Error;
use ci_provision::platform::ResourceKind;
use ci_provision::provisioning::{CertificateSource, ProvisioningOrchestrator, SetupRequest};
use tempfile::TempDir;
use tokio::sync::OnceCell;

use crate::common::{Call, FakeGateway, CONSUMER_KEY, USERNAME, USER_ID};

static SUPPLIED_CERTIFICATE: OnceCell<String> = OnceCell::const_new();

/// Write a valid self-signed certificate into `dir`, generated once per test binary
async fn certificate_file(dir: &TempDir) -> std::path::PathBuf {
    struct Discard;
    impl GenerationHooks for Discard {}

    let pem = SUPPLIED_CERTIFICATE
        .get_or_init(|| async {
            CertificateGenerator::new()
                .generate(Some(&mut Discard))
                .await
                .unwrap()
                .certificate_pem
        })
        .await;
    let path = dir.path().join("supplied.crt");
    std::fs::write(&path, pem).unwrap();
    path
}

#[tokio::test]
async fn continuous_integration_end_to_end() {
    let output_dir = TempDir::new().unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let request = SetupRequest::new("Continuous Integration")
        .with_certificate(CertificateSource::Generate { output_dir: output_dir.path().into() });

    let result = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap();

    assert_eq!(result.identifier, "Continuous_Integration");
    assert_eq!(result.consumer_key, CONSUMER_KEY);
    assert_eq!(result.username, USERNAME);
    assert!(!result.replaced);

    // one key pair and certificate, persisted by the hooks
    let private_key_pem = result.private_key_pem.clone().expect("generated key");
    let key_path = output_dir.path().join("server.key");
    assert_eq!(result.private_key_path.as_deref(), Some(key_path.as_path()));
    assert_eq!(std::fs::read_to_string(&key_path).unwrap(), private_key_pem);
    assert_eq!(
        std::fs::read_to_string(output_dir.path().join("server.crt")).unwrap(),
        result.certificate_pem
    );

    let grants = gateway.creates(ResourceKind::PermissionSet);
    assert_eq!(grants.len(), 1);
    assert_eq!(
        grants[0]["description"],
        "Permission set for the Continuous Integration connected app"
    );

    let assignments = gateway.creates(ResourceKind::PermissionSetAssignment);
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0]["AssigneeId"], USER_ID);

    let apps = gateway.creates(ResourceKind::ConnectedApp);
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["oauthConfig"]["scopes"], serde_json::json!(["Api", "Web", "RefreshToken"]));
    assert_eq!(apps[0]["oauthPolicy"]["refreshTokenPolicy"], "infinite");
    assert_eq!(apps[0]["oauthConfig"]["certificate"], result.certificate_pem.as_str());
    assert_eq!(apps[0]["permissionSetName"], "Continuous_Integration");
}

#[tokio::test]
async fn grant_is_assigned_before_connected_app_is_created() {
    let output_dir = TempDir::new().unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let request = SetupRequest::new("CI")
        .with_certificate(CertificateSource::Supplied(certificate_file(&output_dir).await));

    ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap();

    let grant = gateway
        .position(|c| matches!(c, Call::MetadataCreate { kind: ResourceKind::PermissionSet, .. }))
        .unwrap();
    let assignment = gateway.position(|c| matches!(c, Call::RecordCreate { .. })).unwrap();
    let app = gateway
        .position(|c| matches!(c, Call::MetadataCreate { kind: ResourceKind::ConnectedApp, .. }))
        .unwrap();
    assert!(grant < assignment && assignment < app);
    assert_eq!(gateway.calls()[0], Call::MetadataRead {
        kind: ResourceKind::ConnectedApp,
        identifier: "CI".to_string()
    });
}

#[tokio::test]
async fn existing_connected_app_without_force_is_a_conflict() {
    let gateway = Arc::new(FakeGateway::new().with_connected_app("Continuous_Integration"));
    let request = SetupRequest::new("Continuous Integration");

    let error = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap_err();

    assert!(matches!(
        &error,
        Error::Conflict { identifier } if identifier == "Continuous_Integration"
    ));
    assert_eq!(
        error.to_string(),
        "Connected app \"Continuous_Integration\" already exists. Please choose a different name."
    );
    // only the existence probe was issued
    assert_eq!(gateway.calls().len(), 1);
    assert!(gateway.creates(ResourceKind::ConnectedApp).is_empty());
}

#[tokio::test]
async fn force_replaces_existing_connected_app() {
    let dir = TempDir::new().unwrap();
    let cert_path = certificate_file(&dir).await;
    let gateway = Arc::new(FakeGateway::new().with_connected_app("Continuous_Integration"));
    let request = SetupRequest::new("Continuous Integration")
        .with_certificate(CertificateSource::Supplied(cert_path))
        .with_force(true);

    let result = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap();

    assert!(result.replaced);
    assert_eq!(result.consumer_key, CONSUMER_KEY);
    let delete = gateway.position(|c| matches!(c, Call::MetadataDelete { .. })).unwrap();
    let create = gateway
        .position(|c| matches!(c, Call::MetadataCreate { kind: ResourceKind::ConnectedApp, .. }))
        .unwrap();
    assert!(delete < create);
}

#[tokio::test]
async fn force_without_existing_app_does_not_delete() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let request = SetupRequest::new("CI")
        .with_certificate(CertificateSource::Supplied(certificate_file(&dir).await))
        .with_force(true);

    let result = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap();

    assert!(!result.replaced);
    assert!(gateway.deletes(ResourceKind::ConnectedApp).is_empty());
}

#[tokio::test]
async fn supplied_certificate_is_used_verbatim() {
    let dir = TempDir::new().unwrap();
    let cert_path = certificate_file(&dir).await;
    let contents = std::fs::read_to_string(&cert_path).unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let request = SetupRequest::new("CI").with_certificate(CertificateSource::Supplied(cert_path));

    let result = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap();

    assert_eq!(result.certificate_pem, contents);
    assert!(result.private_key_pem.is_none());
    assert!(result.private_key_path.is_none());
    assert_eq!(
        gateway.creates(ResourceKind::ConnectedApp)[0]["oauthConfig"]["certificate"],
        contents.as_str()
    );
    assert!(!dir.path().join("server.key").exists());
}

#[tokio::test]
async fn invalid_supplied_certificate_stops_before_any_mutation() {
    let dir = TempDir::new().unwrap();
    let cert_path = dir.path().join("bad.crt");
    std::fs::write(&cert_path, "not a certificate").unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let request = SetupRequest::new("CI").with_certificate(CertificateSource::Supplied(cert_path));

    let error = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap_err();

    assert!(matches!(error, Error::InvalidCertificate { .. }));
    assert!(gateway.creates(ResourceKind::PermissionSet).is_empty());
    assert!(gateway.creates(ResourceKind::ConnectedApp).is_empty());
}

#[tokio::test]
async fn distinct_permission_set_label_is_bound_to_the_app() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(FakeGateway::new().with_permission_set("CI_Deployers"));
    let request = SetupRequest::new("Deploy Bot")
        .with_permission_set("CI Deployers")
        .with_certificate(CertificateSource::Supplied(certificate_file(&dir).await));

    let result = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap();

    assert_eq!(result.permission_set_identifier, "CI_Deployers");
    assert!(gateway.creates(ResourceKind::PermissionSet).is_empty());
    assert_eq!(gateway.creates(ResourceKind::ConnectedApp)[0]["permissionSetName"], "CI_Deployers");
}

#[tokio::test]
async fn rerun_with_existing_assignment_succeeds() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(
        FakeGateway::new().with_permission_set("CI").with_assignment("CI"),
    );
    let request = SetupRequest::new("CI")
        .with_certificate(CertificateSource::Supplied(certificate_file(&dir).await));

    let result = ProvisioningOrchestrator::new(gateway.clone()).run(request).await;

    assert!(result.is_ok());
    assert_eq!(gateway.assignment_count(), 1);
}

#[tokio::test]
async fn connected_app_failure_leaves_grant_in_place() {
    let dir = TempDir::new().unwrap();
    let gateway = Arc::new(FakeGateway::new().failing_connected_app_create(
        crate::common::remote_error("INVALID_FIELD", "bad callback"),
    ));
    let request = SetupRequest::new("CI")
        .with_certificate(CertificateSource::Supplied(certificate_file(&dir).await));

    let error = ProvisioningOrchestrator::new(gateway.clone()).run(request).await.unwrap_err();

    assert_eq!(error.remote_errors()[0].message, "bad callback");
    assert_eq!(gateway.creates(ResourceKind::PermissionSet).len(), 1);
    assert_eq!(gateway.assignment_count(), 1);
    assert!(gateway.deletes(ResourceKind::PermissionSet).is_empty());
}
