//! Gating tests for the action dispatcher, driven by a mocked backend so the
//! "no backend call" properties can be asserted directly.

use crate::core::infrastructure::backend::MockHypervisorBackend;
use crate::{
    ActionResponse, Confirmation, CreateVmSpec, FleetClient, FleetConfig, VirtdeckError,
    VirtualMachine, VmAction, VmStatus,
};
use std::sync::Arc;

fn vm(name: &str, status: VmStatus) -> VirtualMachine {
    VirtualMachine {
        name: name.to_string(),
        uuid: format!("uuid-{name}"),
        status,
        vcpu_count: 2,
        memory_mb: 2048,
    }
}

fn accepted(message: &str) -> ActionResponse {
    ActionResponse {
        success: true,
        message: Some(message.to_string()),
        error: None,
    }
}

fn rejected(message: &str) -> ActionResponse {
    ActionResponse {
        success: false,
        message: Some(message.to_string()),
        error: None,
    }
}

/// Builds a client whose observed set is seeded with the given VMs.
async fn seeded_client(
    mut mock: MockHypervisorBackend,
    vms: Vec<VirtualMachine>,
) -> FleetClient {
    let _ = env_logger::builder().is_test(true).try_init();
    mock.expect_list_vms().returning(move || Ok(vms.clone()));
    let client = FleetClient::with_backend(Arc::new(mock), FleetConfig::default());
    client.refresh_vms().await.unwrap();
    client
}

#[tokio::test]
async fn unknown_vm_fails_without_backend_call() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action().times(0);
    let client = seeded_client(mock, vec![vm("web01", VmStatus::Running)]).await;

    let result = client
        .dispatch("ghost", VmAction::Start, Confirmation::Unconfirmed)
        .await;
    assert!(matches!(result, Err(VirtdeckError::UnknownVm(name)) if name == "ghost"));
}

#[tokio::test]
async fn illegal_action_fails_without_backend_call() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action().times(0);
    let client = seeded_client(mock, vec![vm("web01", VmStatus::Running)]).await;

    let result = client
        .dispatch("web01", VmAction::Resume, Confirmation::Unconfirmed)
        .await;
    match result {
        Err(VirtdeckError::IllegalAction { vm, action, status }) => {
            assert_eq!(vm, "web01");
            assert_eq!(action, "resume");
            assert_eq!(status, "Running");
        }
        other => panic!("expected IllegalAction, got {other:?}"),
    }
}

#[tokio::test]
async fn destructive_action_requires_confirmation() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action().times(0);
    let client = seeded_client(mock, vec![vm("db02", VmStatus::Stopped)]).await;

    let result = client
        .dispatch("db02", VmAction::Delete, Confirmation::Unconfirmed)
        .await;
    match result {
        Err(VirtdeckError::ConfirmationRequired { vm, action, warning }) => {
            assert_eq!(vm, "db02");
            assert_eq!(action, "delete");
            assert!(warning.contains("disk image may remain"));
        }
        other => panic!("expected ConfirmationRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn confirmed_destructive_action_reaches_backend() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action()
        .withf(|name, action| name == "db02" && *action == VmAction::Delete)
        .times(1)
        .returning(|_, _| Ok(accepted("VM 'db02' deleted.")));
    let client = seeded_client(mock, vec![vm("db02", VmStatus::Stopped)]).await;

    let receipt = client
        .dispatch("db02", VmAction::Delete, Confirmation::Confirmed)
        .await
        .unwrap();
    assert_eq!(receipt.vm_name, "db02");
    assert_eq!(receipt.action, VmAction::Delete);
    assert_eq!(receipt.message, "VM 'db02' deleted.");
}

#[tokio::test]
async fn non_destructive_action_needs_no_confirmation() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action()
        .withf(|name, action| name == "web01" && *action == VmAction::Suspend)
        .times(1)
        .returning(|_, _| Ok(accepted("VM 'web01' suspended.")));
    let client = seeded_client(mock, vec![vm("web01", VmStatus::Running)]).await;

    let receipt = client
        .dispatch("web01", VmAction::Suspend, Confirmation::Unconfirmed)
        .await
        .unwrap();
    assert_eq!(receipt.message, "VM 'web01' suspended.");
}

#[tokio::test]
async fn backend_rejection_surfaces_message_verbatim() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action()
        .times(1)
        .returning(|_, _| Ok(rejected("VM 'web01' failed to shut down gracefully.")));
    let client = seeded_client(mock, vec![vm("web01", VmStatus::Running)]).await;

    let result = client
        .dispatch("web01", VmAction::Stop, Confirmation::Unconfirmed)
        .await;
    match result {
        Err(VirtdeckError::BackendRejected { vm, message }) => {
            assert_eq!(vm, "web01");
            assert_eq!(message, "VM 'web01' failed to shut down gracefully.");
        }
        other => panic!("expected BackendRejected, got {other:?}"),
    }

    // A rejection never updates the observed status.
    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.vm("web01").unwrap().status, VmStatus::Running);
}

#[tokio::test]
async fn transport_error_clears_pending_so_vm_is_not_locked() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action()
        .times(2)
        .returning(|_, _| Err(VirtdeckError::Transport("connection reset".to_string())));
    let client = seeded_client(mock, vec![vm("web01", VmStatus::Running)]).await;

    let first = client
        .dispatch("web01", VmAction::Stop, Confirmation::Unconfirmed)
        .await;
    assert!(matches!(first, Err(VirtdeckError::Transport(_))));
    assert!(!client.is_pending("web01").await);

    // The gate is open again: the retry reaches the backend.
    let second = client
        .dispatch("web01", VmAction::Stop, Confirmation::Unconfirmed)
        .await;
    assert!(matches!(second, Err(VirtdeckError::Transport(_))));
}

#[tokio::test]
async fn dispatches_for_distinct_vms_are_independent() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action()
        .times(2)
        .returning(|name, _| Ok(accepted(&format!("VM '{name}' acted on."))));
    let client = seeded_client(
        mock,
        vec![vm("web01", VmStatus::Running), vm("db02", VmStatus::Running)],
    )
    .await;

    let (a, b) = tokio::join!(
        client.dispatch("web01", VmAction::Stop, Confirmation::Unconfirmed),
        client.dispatch("db02", VmAction::Suspend, Confirmation::Unconfirmed),
    );
    a.unwrap();
    b.unwrap();
}

#[tokio::test]
async fn legal_actions_view_matches_dispatch_enforcement() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_vm_action().times(0);
    let client = seeded_client(mock, vec![vm("web01", VmStatus::Paused)]).await;

    let legal = client.legal_actions("web01").await.unwrap();
    let actions: Vec<VmAction> = legal.iter().map(|l| l.action).collect();
    assert_eq!(actions, vec![VmAction::Destroy, VmAction::Resume]);

    // Everything the view does not offer is refused by dispatch.
    for action in [VmAction::Start, VmAction::Stop, VmAction::Suspend, VmAction::Delete] {
        let result = client
            .dispatch("web01", action, Confirmation::Confirmed)
            .await;
        assert!(matches!(result, Err(VirtdeckError::IllegalAction { .. })), "{action}");
    }
}

#[tokio::test]
async fn create_validates_name_locally() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_create_vm().times(0);
    mock.expect_list_vms().returning(|| Ok(Vec::new()));
    let client = FleetClient::with_backend(Arc::new(mock), FleetConfig::default());

    let result = client.create(&CreateVmSpec::named("has space")).await;
    assert!(matches!(result, Err(VirtdeckError::Validation(_))));
}

#[tokio::test]
async fn create_success_triggers_vm_refresh() {
    let mut mock = MockHypervisorBackend::new();
    mock.expect_create_vm()
        .times(1)
        .returning(|_| Ok(accepted("VM 'new-vm' created successfully!")));
    // The post-create refresh is the only list call expected.
    mock.expect_list_vms()
        .times(1)
        .returning(|| Ok(vec![vm("new-vm", VmStatus::Stopped)]));
    let client = FleetClient::with_backend(Arc::new(mock), FleetConfig::default());

    let message = client.create(&CreateVmSpec::named("new-vm")).await.unwrap();
    assert_eq!(message, "VM 'new-vm' created successfully!");
    assert!(client.snapshot().await.vm("new-vm").is_some());
}
