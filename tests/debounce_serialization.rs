mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{Call, MockControl};
use watchsup::control::ProcessState;
use watchsup::restart::{CoordinatorOptions, RestartCoordinator, RestartTarget};

fn coordinator(
    control: Arc<MockControl>,
    debounce: Duration,
) -> Arc<RestartCoordinator> {
    Arc::new(RestartCoordinator::new(
        control,
        CoordinatorOptions {
            target: RestartTarget::Any,
            reload_before_restart: false,
            own_pid: 999_999,
            debounce,
            poll_interval: Duration::from_millis(10),
        },
    ))
}

async fn fire_signals(coordinator: &Arc<RestartCoordinator>, count: usize) {
    let handles: Vec<_> = (0..count)
        .map(|_| {
            let coordinator = Arc::clone(coordinator);
            tokio::spawn(async move { coordinator.on_change_signal().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_of_signals_runs_exactly_one_cycle() {
    let control = Arc::new(
        MockControl::new().with_process("web", "web", ProcessState::Running, 42),
    );
    let coordinator = coordinator(Arc::clone(&control), Duration::from_millis(100));

    fire_signals(&coordinator, 5).await;

    assert_eq!(control.count(|c| *c == Call::ListAll), 1);
    assert_eq!(
        control.count(|c| matches!(c, Call::Stop(_, _))),
        1,
        "a burst within the debounce window must collapse into one cycle"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn signal_during_execution_seeds_exactly_one_follow_up_cycle() {
    let control = Arc::new(
        MockControl::new()
            .with_process("web", "web", ProcessState::Running, 42)
            .with_list_delay(Duration::from_millis(200)),
    );
    let coordinator = coordinator(Arc::clone(&control), Duration::from_millis(20));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.on_change_signal().await })
    };

    // Let the first cycle get past its debounce and into execution, then
    // fire two more signals while it is still listing processes.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fire_signals(&coordinator, 2).await;
    first.await.unwrap().unwrap();

    assert_eq!(
        control.count(|c| *c == Call::ListAll),
        2,
        "changes during an executing cycle must become exactly one follow-up cycle"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cycles_never_interleave_their_control_calls() {
    let control = Arc::new(
        MockControl::new()
            .with_process("alpha", "svc", ProcessState::Running, 11)
            .with_process("beta", "svc", ProcessState::Running, 12)
            .with_process("gamma", "svc", ProcessState::Running, 13)
            .with_list_delay(Duration::from_millis(150)),
    );
    let coordinator = coordinator(Arc::clone(&control), Duration::from_millis(20));

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.on_change_signal().await })
    };
    tokio::time::sleep(Duration::from_millis(80)).await;
    fire_signals(&coordinator, 1).await;
    first.await.unwrap().unwrap();

    let calls = control.calls();
    let list_positions: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Call::ListAll)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(list_positions.len(), 2, "expected exactly two cycles");

    // Every stop and start of the first cycle must land before the second
    // cycle's process listing.
    let first_cycle = &calls[list_positions[0]..list_positions[1]];
    let stops = first_cycle
        .iter()
        .filter(|c| matches!(c, Call::Stop(_, _)))
        .count();
    let starts = first_cycle
        .iter()
        .filter(|c| matches!(c, Call::Start(_, _)))
        .count();
    assert_eq!(stops, 3);
    assert_eq!(starts, 3);

    let second_cycle = &calls[list_positions[1]..];
    let stops = second_cycle
        .iter()
        .filter(|c| matches!(c, Call::Stop(_, _)))
        .count();
    assert_eq!(stops, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_rapid_signals_stop_each_process_once() {
    let control = Arc::new(
        MockControl::new()
            .with_process("one", "apps", ProcessState::Running, 21)
            .with_process("two", "apps", ProcessState::Running, 22)
            .with_process("three", "apps", ProcessState::Running, 23),
    );
    let coordinator = coordinator(Arc::clone(&control), Duration::from_millis(100));

    fire_signals(&coordinator, 2).await;

    assert_eq!(
        control.count(|c| matches!(c, Call::Stop(_, _))),
        3,
        "three running processes get exactly one stop each, not one per signal"
    );
}
