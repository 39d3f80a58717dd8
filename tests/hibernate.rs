//! Hibernation coordinator tests.

mod common;

use common::*;
use dormant::collaborators::{ObjectDeleter, RecordedStateProbe};
use dormant::context::{CancelFlag, InterruptReason, PassContext};
use dormant::core::error::{HibernationError, ObjectError};
use dormant::resources::{Cluster, Instance, ManagedResources, Volume};
use dormant::{HibernationCoordinator, HibernationOutcome, HibernationPhase, WaitReason};

// ============================================================================
// Gate A: instances stopped
// ============================================================================

#[test]
fn running_instances_wait_without_deleting() {
    let probe = ScriptedProbe::running();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));

    assert_eq!(
        outcome,
        HibernationOutcome::Waiting(WaitReason::InstancesNotStopped)
    );
    assert!(outcome.must_wait_longer());
    assert!(deleter.calls().is_empty());
}

#[test]
fn probe_sees_every_instance_in_order() {
    let probe = ScriptedProbe::running();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let _ = coordinator.advance(&ctx(), &pg1(), &pg1_ready());

    assert_eq!(probe.calls(), vec![vec!["A".to_string(), "B".to_string()]]);
}

#[test]
fn probe_error_is_fatal_and_deletes_nothing() {
    let probe = ScriptedProbe::failing("instance manager unreachable");
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let err = assert_err(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));

    match err {
        HibernationError::Observation { message } => {
            assert_eq!(message, "instance manager unreachable");
        }
        other => panic!("Expected Observation error, got {:?}", other),
    }
    assert!(deleter.calls().is_empty());
}

#[test]
fn volume_state_is_not_consulted_while_instances_run() {
    // Even with every volume ready, a running instance blocks deletion.
    let probe = ScriptedProbe::running();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let resources = ManagedResources::new(vec![running("A")], vec![ready_volume("V1", "A")]);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &resources));
    assert_eq!(outcome.phase(), HibernationPhase::InstancesStopping);
    assert!(deleter.calls().is_empty());
}

// ============================================================================
// Gate B: volumes detached and captured
// ============================================================================

#[test]
fn pending_volume_waits_without_deleting() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_waiting_on_v2()));

    match outcome {
        HibernationOutcome::Waiting(WaitReason::VolumesNotReady { pending }) => {
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].name, "V2");
            assert_eq!(pending[0].status, "pending");
            assert!(!pending[0].readiness.detached);
        }
        other => panic!("Expected VolumesNotReady, got {:?}", other),
    }
    assert!(deleter.calls().is_empty());
}

#[test]
fn each_missing_marker_blocks_deletion() {
    let partial = [
        Volume::new("V1")
            .with_manifest("{}")
            .with_control_data(""),
        Volume::new("V1")
            .with_status("detached")
            .with_control_data(""),
        Volume::new("V1").with_status("detached").with_manifest("{}"),
        Volume::new("V1")
            .with_status("attached")
            .with_manifest("{}")
            .with_control_data(""),
    ];

    for volume in partial {
        let probe = ScriptedProbe::stopped();
        let deleter = RecordingDeleter::new();
        let coordinator = HibernationCoordinator::new(&probe, &deleter);
        let resources = ManagedResources::new(vec![stopped("A")], vec![volume.clone()]);

        let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &resources));

        assert!(outcome.must_wait_longer(), "volume {:?} must block", volume);
        assert_eq!(outcome.phase(), HibernationPhase::VolumesDetaching);
        assert!(deleter.calls().is_empty());
    }
}

#[test]
fn every_pending_volume_is_reported() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let resources = ManagedResources::new(
        vec![stopped("A"), stopped("B"), stopped("C")],
        vec![
            pending_volume("V1", "A"),
            ready_volume("V2", "B"),
            Volume::new("V3").bound_to("C"),
        ],
    );

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &resources));

    match outcome {
        HibernationOutcome::Waiting(WaitReason::VolumesNotReady { pending }) => {
            let names: Vec<_> = pending.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, vec!["V1", "V3"]);
            assert_eq!(pending[1].status, "");
            assert_eq!(
                pending[1].readiness.missing(),
                vec!["detached", "manifest", "control-data"]
            );
        }
        other => panic!("Expected VolumesNotReady, got {:?}", other),
    }
}

// ============================================================================
// Gate C: delete instances
// ============================================================================

#[test]
fn ready_cluster_deletes_every_instance_once() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));

    assert_eq!(
        outcome,
        HibernationOutcome::Hibernated {
            deleted: vec!["A".to_string(), "B".to_string()],
            already_gone: vec![],
        }
    );
    assert!(!outcome.must_wait_longer());
    assert_eq!(deleter.calls(), vec!["A", "B"]);
}

#[test]
fn scenario_pg1_converges_once_v2_is_detached() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let first = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_waiting_on_v2()));
    assert!(first.must_wait_longer());
    assert!(deleter.calls().is_empty());

    let second = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));
    assert!(!second.must_wait_longer());
    assert_eq!(deleter.calls(), vec!["A", "B"]);
}

#[test]
fn repeated_pass_is_idempotent() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let first = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));
    let second = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));

    assert!(!first.must_wait_longer());
    assert_eq!(
        second,
        HibernationOutcome::Hibernated {
            deleted: vec![],
            already_gone: vec!["A".to_string(), "B".to_string()],
        }
    );
    assert_eq!(deleter.calls(), vec!["A", "B", "A", "B"]);
}

#[test]
fn not_found_is_treated_as_deleted() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new().already_gone("A");
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));

    assert_eq!(
        outcome,
        HibernationOutcome::Hibernated {
            deleted: vec!["B".to_string()],
            already_gone: vec!["A".to_string()],
        }
    );
}

#[test]
fn delete_failure_aborts_without_rollback() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new().failing_on("B", "etcdserver: request timed out");
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let resources = ManagedResources::new(
        vec![stopped("A"), stopped("B"), stopped("C")],
        vec![
            ready_volume("V1", "A"),
            ready_volume("V2", "B"),
            ready_volume("V3", "C"),
        ],
    );

    let err = assert_err(coordinator.advance(&ctx(), &pg1(), &resources));

    assert_eq!(err.instance(), Some("B"));
    match &err {
        HibernationError::DeleteFailed { instance, source } => {
            assert_eq!(instance, "B");
            assert_eq!(source, &ObjectError::api("etcdserver: request timed out"));
        }
        other => panic!("Expected DeleteFailed, got {:?}", other),
    }
    assert!(err.to_string().contains("cannot delete instance B"));
    assert!(err.to_string().contains("request timed out"));
    // A was deleted and stays deleted; C was never attempted.
    assert_eq!(deleter.calls(), vec!["A", "B"]);
}

#[test]
fn retry_after_delete_failure_completes() {
    let probe = ScriptedProbe::stopped();
    let failing = RecordingDeleter::new().failing_on("B", "conflict");
    let coordinator = HibernationCoordinator::new(&probe, &failing);
    assert!(coordinator.advance(&ctx(), &pg1(), &pg1_ready()).is_err());

    // Next pass: A is gone, B now deletes.
    let deleter = RecordingDeleter::new().already_gone("A");
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));

    assert_eq!(
        outcome,
        HibernationOutcome::Hibernated {
            deleted: vec!["B".to_string()],
            already_gone: vec!["A".to_string()],
        }
    );
}

#[test]
fn empty_instance_list_is_hibernated() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let resources = ManagedResources::new(vec![], vec![ready_volume("V1", "A")]);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &resources));

    assert_eq!(outcome.phase(), HibernationPhase::Hibernated);
    assert!(deleter.calls().is_empty());
}

// ============================================================================
// Cancellation and deadline
// ============================================================================

#[test]
fn cancelled_pass_issues_no_deletions() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let flag = CancelFlag::new();
    flag.cancel();
    let ctx = PassContext::new("pg1", 1).with_cancel(flag);

    let outcome = assert_ok(coordinator.advance(&ctx, &pg1(), &pg1_ready()));

    assert_eq!(
        outcome,
        HibernationOutcome::Waiting(WaitReason::Interrupted {
            reason: InterruptReason::Cancelled,
            deleted: vec![],
        })
    );
    assert!(deleter.calls().is_empty());
}

/// Cancels the shared flag after its first successful deletion.
struct CancelAfterFirst {
    inner: RecordingDeleter,
    flag: CancelFlag,
}

impl ObjectDeleter for CancelAfterFirst {
    fn delete(&self, ctx: &PassContext, instance: &Instance) -> Result<(), ObjectError> {
        let result = self.inner.delete(ctx, instance);
        self.flag.cancel();
        result
    }
}

#[test]
fn cancellation_mid_phase_keeps_issued_deletions() {
    let probe = ScriptedProbe::stopped();
    let flag = CancelFlag::new();
    let deleter = CancelAfterFirst {
        inner: RecordingDeleter::new(),
        flag: flag.clone(),
    };
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let ctx = PassContext::new("pg1", 1).with_cancel(flag);

    let outcome = assert_ok(coordinator.advance(&ctx, &pg1(), &pg1_ready()));

    assert_eq!(
        outcome,
        HibernationOutcome::Waiting(WaitReason::Interrupted {
            reason: InterruptReason::Cancelled,
            deleted: vec!["A".to_string()],
        })
    );
    assert_eq!(outcome.deletions(), 1);
    assert_eq!(deleter.inner.calls(), vec!["A"]);
}

#[test]
fn expired_deadline_stops_before_deleting() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);
    let ctx = PassContext::new("pg1", 1).with_deadline(std::time::Instant::now());

    let outcome = assert_ok(coordinator.advance(&ctx, &pg1(), &pg1_ready()));

    match outcome {
        HibernationOutcome::Waiting(WaitReason::Interrupted { reason, .. }) => {
            assert_eq!(reason, InterruptReason::DeadlineExceeded);
        }
        other => panic!("Expected Interrupted, got {:?}", other),
    }
    assert!(deleter.calls().is_empty());
}

// ============================================================================
// Intent and observation
// ============================================================================

#[test]
fn reconcile_ignores_clusters_without_intent() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let outcome = assert_ok(coordinator.reconcile(&ctx(), &Cluster::new("pg1"), &pg1_ready()));

    assert_eq!(outcome, HibernationOutcome::Waiting(WaitReason::NotRequested));
    assert!(probe.calls().is_empty());
    assert!(deleter.calls().is_empty());
}

#[test]
fn reconcile_with_intent_advances() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    let outcome = assert_ok(coordinator.reconcile(&ctx(), &pg1(), &pg1_ready()));

    assert_eq!(outcome.phase(), HibernationPhase::Hibernated);
    assert_eq!(deleter.calls(), vec!["A", "B"]);
}

#[test]
fn observe_reports_phase_without_deleting() {
    let deleter = RecordingDeleter::new();

    let running_probe = ScriptedProbe::running();
    let coordinator = HibernationCoordinator::new(&running_probe, &deleter);
    assert_eq!(
        assert_ok(coordinator.observe(&ctx(), &pg1(), &pg1_ready())),
        HibernationPhase::InstancesStopping
    );
    assert_eq!(
        assert_ok(coordinator.observe(&ctx(), &Cluster::new("pg1"), &pg1_ready())),
        HibernationPhase::Running
    );

    let stopped_probe = ScriptedProbe::stopped();
    let coordinator = HibernationCoordinator::new(&stopped_probe, &deleter);
    assert_eq!(
        assert_ok(coordinator.observe(&ctx(), &pg1(), &pg1_waiting_on_v2())),
        HibernationPhase::VolumesDetaching
    );
    assert_eq!(
        assert_ok(coordinator.observe(&ctx(), &pg1(), &pg1_ready())),
        HibernationPhase::Deleting
    );
    assert_eq!(
        assert_ok(coordinator.observe(
            &ctx(),
            &pg1(),
            &ManagedResources::new(vec![], vec![ready_volume("V1", "A")])
        )),
        HibernationPhase::Hibernated
    );

    assert!(deleter.calls().is_empty());
}

#[test]
fn recorded_state_probe_trusts_instance_state() {
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(RecordedStateProbe, &deleter);

    let resources = ManagedResources::new(
        vec![stopped("A"), running("B")],
        vec![ready_volume("V1", "A"), ready_volume("V2", "B")],
    );
    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &resources));
    assert_eq!(outcome.phase(), HibernationPhase::InstancesStopping);

    let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &pg1_ready()));
    assert_eq!(outcome.phase(), HibernationPhase::Hibernated);
    assert_eq!(deleter.calls(), vec!["A", "B"]);
}

#[test]
fn observe_matches_advance_without_instances() {
    let probe = ScriptedProbe::stopped();
    let deleter = RecordingDeleter::new();
    let coordinator = HibernationCoordinator::new(&probe, &deleter);

    for resources in [
        ManagedResources::new(vec![], vec![pending_volume("V1", "A")]),
        ManagedResources::new(vec![], vec![ready_volume("V1", "A")]),
        ManagedResources::new(vec![], vec![]),
    ] {
        let observed = assert_ok(coordinator.observe(&ctx(), &pg1(), &resources));
        let outcome = assert_ok(coordinator.advance(&ctx(), &pg1(), &resources));
        assert_eq!(observed, outcome.phase(), "resources: {:?}", resources);
    }
    assert!(deleter.calls().is_empty());
}

#[test]
fn inspect_reports_pending_volumes_only_after_instances_stop() {
    let deleter = RecordingDeleter::new();

    let running_probe = ScriptedProbe::running();
    let coordinator = HibernationCoordinator::new(&running_probe, &deleter);
    let observation = assert_ok(coordinator.inspect(&ctx(), &pg1(), &pg1_waiting_on_v2()));
    assert_eq!(observation.phase, HibernationPhase::InstancesStopping);
    assert!(observation.pending.is_empty());

    let stopped_probe = ScriptedProbe::stopped();
    let coordinator = HibernationCoordinator::new(&stopped_probe, &deleter);
    let observation = assert_ok(coordinator.inspect(&ctx(), &pg1(), &pg1_waiting_on_v2()));
    assert_eq!(observation.phase, HibernationPhase::VolumesDetaching);
    let names: Vec<_> = observation.pending.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["V2"]);
}
