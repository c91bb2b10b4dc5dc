use anyhow::Result;
use passcount_gpu::backend::{CallbackId, CounterGroups};
use passcount_gpu::sim::{SimCall, SimulatedDevice};
use passcount_gpu::{
    LaunchCallback, LaunchSite, PassKind, ProfilerError, Session, SessionConfig, KERNEL_LAUNCH,
};
use passcount_shared::{ContextId, MetricValue};

fn session(events: &[&str], metrics: &[&str]) -> Result<Session<SimulatedDevice>> {
    let config = SessionConfig::new(events.iter().copied(), metrics.iter().copied());
    Ok(Session::new(SimulatedDevice::default(), &config)?)
}

fn kernel(device: &mut SimulatedDevice) {
    device.run_kernel();
}

#[test]
fn test_single_event_single_pass() -> Result<()> {
    let mut session = session(&["fb_read_sectors"], &[])?;
    assert_eq!(session.required_pass_count(), 1);

    session.launch(kernel)?;
    session.finalize()?;

    assert_eq!(session.event_values(), &[900]);
    assert!(session.metric_values().is_empty());
    Ok(())
}

#[test]
fn test_pass_count_is_metric_plus_event_passes() -> Result<()> {
    let session = session(&["inst_executed"], &["ipc", "sm_efficiency"])?;

    let schedule = session.schedule();
    assert_eq!(schedule.metric_passes(), 2);
    assert_eq!(schedule.event_passes(), 1);
    assert_eq!(session.required_pass_count(), 3);
    Ok(())
}

#[test]
fn test_metric_passes_run_first() -> Result<()> {
    let session = session(&["inst_executed", "l2_read_hit"], &["ipc", "l2_hit_rate"])?;

    let kinds: Vec<PassKind> = session.schedule().iter().map(|p| p.kind).collect();
    let first_event = kinds
        .iter()
        .position(|k| *k == PassKind::Event)
        .unwrap();

    assert!(kinds[..first_event].iter().all(|k| *k == PassKind::Metric));
    assert!(kinds[first_event..].iter().all(|k| *k == PassKind::Event));
    for (i, pass) in session.schedule().iter().enumerate() {
        assert_eq!(pass.index, i);
        assert_eq!(pass.total_events, pass.event_ids.len());
    }
    Ok(())
}

#[test]
fn test_end_to_end_values() -> Result<()> {
    let mut session = session(
        &["inst_executed", "l2_read_hit"],
        &["ipc", "sm_efficiency", "dram_read_throughput"],
    )?;

    session.run_passes(kernel)?;
    assert!(session.is_collection_complete());

    let results = session.finalize()?;

    // sm: 2 of 4 instances sampled, l2: every instance sampled
    assert_eq!(results.event("inst_executed"), Some(4400));
    assert_eq!(results.event("l2_read_hit"), Some(1280));
    assert_eq!(
        results.metric("ipc"),
        Some(MetricValue::Double(4400.0 / 20400.0))
    );
    match results.metric("sm_efficiency") {
        Some(MetricValue::Percent(p)) => assert!((p - 63.75).abs() < 1e-9),
        other => panic!("unexpected sm_efficiency: {:?}", other),
    }
    assert_eq!(
        results.metric("dram_read_throughput"),
        Some(MetricValue::Throughput(900 * 32))
    );
    Ok(())
}

#[test]
fn test_results_follow_request_order() -> Result<()> {
    let mut session = session(
        &["fb_write_sectors", "inst_executed", "fb_read_sectors"],
        &["dram_write_transactions", "inst_replay"],
    )?;

    session.run_passes(kernel)?;
    session.finalize()?;

    assert_eq!(session.event_values(), &[450, 4400, 900]);
    assert_eq!(
        session.metric_values(),
        &[MetricValue::Uint64(450), MetricValue::Int64(400)]
    );
    Ok(())
}

#[test]
fn test_extra_launches_are_ignored() -> Result<()> {
    let mut session = session(&["inst_executed"], &["ipc", "sm_efficiency"])?;
    let passes = session.required_pass_count();

    for i in 0..passes {
        session.launch(kernel)?;
        assert_eq!(session.cursor(), i + 1);
    }

    let snapshot: Vec<_> = (0..passes)
        .map(|i| session.pass_state(i).unwrap().pairs().collect::<Vec<_>>())
        .collect();

    session.launch(kernel)?;
    session.launch(kernel)?;

    assert_eq!(session.cursor(), passes);
    for (i, expected) in snapshot.iter().enumerate() {
        let pairs: Vec<_> = session.pass_state(i).unwrap().pairs().collect();
        assert_eq!(&pairs, expected);
    }
    assert!(session.backend().enabled_groups().is_empty());
    Ok(())
}

#[test]
fn test_finalize_is_idempotent() -> Result<()> {
    let mut session = session(&["inst_executed"], &["ipc"])?;
    session.run_passes(kernel)?;

    let first = session.finalize()?.clone();
    assert!(session.is_finalized());
    assert_eq!(session.backend().active_subscriptions(), 0);

    let second = session.finalize()?.clone();
    assert_eq!(first, second);

    let kernels = session.backend().kernels();
    session.launch(kernel)?;
    assert_eq!(session.backend().kernels(), kernels + 1);
    assert_eq!(session.finalize()?, &first);
    Ok(())
}

#[test]
fn test_under_collection_reports_zero() -> Result<()> {
    let mut session = session(&[], &["ipc", "sm_efficiency"])?;
    assert_eq!(session.required_pass_count(), 2);

    session.launch(kernel)?;
    session.finalize()?;

    // elapsed_cycles_sm was never read, so sm_efficiency divides by zero
    assert_eq!(
        session.metric_values(),
        &[
            MetricValue::Double(4400.0 / 20400.0),
            MetricValue::Percent(0.0)
        ]
    );
    Ok(())
}

#[test]
fn test_under_collection_without_launch() -> Result<()> {
    let mut session = session(&["fb_read_sectors", "l2_read_miss"], &[])?;

    session.finalize()?;

    assert_eq!(session.event_values(), &[0, 0]);
    Ok(())
}

#[test]
fn test_strict_under_collection_fails() -> Result<()> {
    let config = SessionConfig::new(Vec::<String>::new(), ["ipc", "sm_efficiency"]).with_strict(true);
    let mut session = Session::new(SimulatedDevice::default(), &config)?;

    session.launch(kernel)?;
    let err = session.finalize().unwrap_err();

    assert!(matches!(
        err,
        ProfilerError::UnderCollected {
            pass: 1,
            expected: 1,
            collected: 0
        }
    ));
    assert!(!session.is_finalized());

    session.launch(kernel)?;
    session.finalize()?;
    assert_eq!(session.metric_values().len(), 2);
    Ok(())
}

#[test]
fn test_unknown_names_fail_before_collection() {
    let err = session(&["no_such_event"], &[]).err().unwrap();
    match err.downcast_ref::<ProfilerError>() {
        Some(ProfilerError::UnknownEvent { name, device }) => {
            assert_eq!(name, "no_such_event");
            assert_eq!(*device, 0);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = session(&[], &["no_such_metric"]).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<ProfilerError>(),
        Some(ProfilerError::UnknownMetric { .. })
    ));
}

#[test]
fn test_empty_request_rejected() {
    let err = session(&[], &[]).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<ProfilerError>(),
        Some(ProfilerError::EmptyRequest)
    ));
}

#[test]
fn test_no_device() {
    let config = SessionConfig::new(["inst_executed"], Vec::<String>::new());

    let err = Session::new(SimulatedDevice::default().with_device_count(0), &config)
        .err()
        .unwrap();
    assert!(matches!(err, ProfilerError::NoDevice));

    let err = Session::new(SimulatedDevice::default(), &config.with_device(3))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ProfilerError::DeviceOutOfRange { index: 3, count: 1 }
    ));
}

#[test]
fn test_second_device() -> Result<()> {
    let config = SessionConfig::new(["fb_read_sectors"], Vec::<String>::new()).with_device(1);
    let mut session = Session::new(SimulatedDevice::default().with_device_count(2), &config)?;

    session.run_passes(kernel)?;

    assert_eq!(session.report()?.device, 1);
    assert_eq!(session.event_values(), &[900]);
    Ok(())
}

#[test]
fn test_unexpected_callback_is_fatal() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;

    let err = session
        .on_callback(LaunchCallback::enter(CallbackId(99)))
        .unwrap_err();

    assert!(matches!(
        err,
        ProfilerError::UnexpectedCallback {
            got: 99,
            expected: 13
        }
    ));
    assert_eq!(session.cursor(), 0);
    Ok(())
}

#[test]
fn test_callbacks_drive_passes() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;

    session.on_callback(LaunchCallback::enter(KERNEL_LAUNCH))?;
    session.backend_mut().run_kernel();
    session.on_callback(LaunchCallback::exit(KERNEL_LAUNCH))?;

    assert_eq!(session.cursor(), 1);
    assert_eq!(session.finalize()?.event("inst_executed"), Some(4400));
    Ok(())
}

#[test]
fn test_unbalanced_launches() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;

    let err = session.on_launch_exit().unwrap_err();
    assert!(matches!(
        err,
        ProfilerError::UnbalancedLaunch {
            pass: 0,
            site: LaunchSite::Exit
        }
    ));

    session.on_launch_enter()?;
    let err = session.on_launch_enter().unwrap_err();
    assert!(matches!(
        err,
        ProfilerError::UnbalancedLaunch {
            pass: 0,
            site: LaunchSite::Enter
        }
    ));
    Ok(())
}

#[test]
fn test_launch_protocol_order() -> Result<()> {
    let mut session = session(&["fb_read_sectors"], &[])?;
    let group = session.schedule().get(0).unwrap().groups[0];
    let event = session.events()[0].id;
    session.backend_mut().clear_calls();

    session.launch(kernel)?;

    assert_eq!(
        session.backend().calls(),
        &[
            SimCall::Synchronize,
            SimCall::KernelCollectionMode(ContextId(0)),
            SimCall::ProfileAllInstances(group),
            SimCall::Enable(group),
            SimCall::Kernel,
            SimCall::Synchronize,
            SimCall::Read(group, event),
            SimCall::Disable(group),
        ]
    );
    Ok(())
}

#[test]
fn test_backend_failure_during_pass() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;
    session.backend_mut().fail_on("read event");

    let err = session.launch(kernel).unwrap_err();

    assert!(matches!(
        err,
        ProfilerError::Backend {
            operation: "read event",
            ..
        }
    ));
    assert_eq!(session.cursor(), 0);
    Ok(())
}

#[test]
fn test_planner_failure_fails_session() {
    let mut device = SimulatedDevice::default();
    device.fail_on("metric pass sets");

    let err = Session::new(device, &SessionConfig::new(Vec::<String>::new(), ["ipc"]))
        .err()
        .unwrap();

    assert!(matches!(err, ProfilerError::Backend { .. }));
}

#[test]
fn test_sessions_are_independent() -> Result<()> {
    let mut first = session(&["fb_read_sectors"], &[])?;
    let mut second = session(&["l2_read_miss"], &["sm_utilization"])?;

    second.launch(kernel)?;
    first.launch(kernel)?;
    second.launch(kernel)?;

    assert_eq!(first.finalize()?.event_values(), &[900]);
    let results = second.finalize()?;
    assert_eq!(results.event("l2_read_miss"), Some(100));
    assert_eq!(
        results.metric("sm_utilization"),
        Some(MetricValue::UtilizationLevel(6))
    );
    Ok(())
}

#[test]
fn test_report_serializes() -> Result<()> {
    let mut session = session(&["inst_executed"], &["ipc"])?;
    session.run_passes(kernel)?;

    let report = session.report()?;
    assert!(report.is_complete());
    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.passes[0].kind, "metric");
    assert_eq!(report.event("inst_executed").map(|e| e.value), Some(4400));

    let json = serde_json::to_string(&report)?;
    assert!(json.contains("\"inst_executed\""));
    assert!(json.contains("\"ipc\""));
    Ok(())
}

#[test]
fn test_finalize_disables_groups_of_open_launch() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;

    session.on_launch_enter()?;
    session.backend_mut().run_kernel();
    assert!(!session.backend().enabled_groups().is_empty());

    session.finalize()?;

    assert!(session.backend().enabled_groups().is_empty());
    assert_eq!(session.event_values(), &[0]);
    assert_eq!(session.pass_state(0).unwrap().len(), 0);
    Ok(())
}

#[test]
fn test_failed_exit_can_be_retried() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;
    let expected = session.schedule().get(0).unwrap().total_events;

    session.on_launch_enter()?;
    session.backend_mut().run_kernel();
    session.backend_mut().fail_on("disable group");
    assert!(session.on_launch_exit().is_err());
    assert!(session.pass_state(0).unwrap().is_empty());
    assert_eq!(session.cursor(), 0);

    session.backend_mut().clear_failures();
    session.on_launch_exit()?;

    let state = session.pass_state(0).unwrap();
    assert_eq!(state.len(), expected);
    assert_eq!(state.values(), &[4400]);
    assert_eq!(session.cursor(), 1);
    assert_eq!(session.finalize()?.event_values(), &[4400]);
    Ok(())
}

#[test]
fn test_failed_enter_disables_groups_it_enabled() -> Result<()> {
    // l2 group and first sm group share pass 0, second sm group runs alone
    let mut session = session(
        &["l2_read_hit", "inst_executed", "inst_issued", "active_cycles"],
        &[],
    )?;
    let first = session.schedule().get(0).unwrap().groups.clone();
    let blocker = session.schedule().get(1).unwrap().groups[0];
    assert_eq!(first.len(), 2);

    session.backend_mut().enable_group(blocker)?;
    assert!(session.on_launch_enter().is_err());
    assert_eq!(session.backend().enabled_groups(), vec![blocker]);

    session.backend_mut().disable_group(blocker)?;
    session.run_passes(kernel)?;
    assert_eq!(session.finalize()?.event("l2_read_hit"), Some(1280));
    Ok(())
}

#[test]
fn test_wrong_callback_after_finalize_is_reported() -> Result<()> {
    let mut session = session(&["inst_executed"], &[])?;
    session.run_passes(kernel)?;
    session.finalize()?;

    session.on_callback(LaunchCallback::enter(KERNEL_LAUNCH))?;
    session.on_callback(LaunchCallback::exit(KERNEL_LAUNCH))?;

    let err = session
        .on_callback(LaunchCallback::exit(CallbackId(7)))
        .unwrap_err();
    assert!(matches!(
        err,
        ProfilerError::UnexpectedCallback {
            got: 7,
            expected: 13
        }
    ));
    Ok(())
}
