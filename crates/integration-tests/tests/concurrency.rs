//! Concurrent invocations share nothing

#![cfg(unix)]

use std::sync::Arc;

use forkexec_core::application::executor::recv_result;
use forkexec_core::{ExecutionCoordinator, InvocationRequest};
use forkexec_infra_system::TokioProcessSpawner;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_same_command_twice_concurrently() {
    let coordinator = ExecutionCoordinator::new(Arc::new(TokioProcessSpawner::new()));
    let request = InvocationRequest::argv(["echo", "hello", "world"]);

    let (a, b) = tokio::join!(
        coordinator.execute(request.clone()),
        coordinator.execute(request)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a, b);
    assert_eq!(a.stdout, "hello world\n");
    assert!(a.error.is_none());
}

#[tokio::test]
async fn test_many_invocations_keep_output_separate() {
    let coordinator = ExecutionCoordinator::new(Arc::new(TokioProcessSpawner::new()));
    let mut set = JoinSet::new();

    for i in 0..20 {
        let coordinator = coordinator.clone();
        set.spawn(async move {
            let result = coordinator
                .execute(InvocationRequest::shell(format!("echo out-{i}; echo err-{i} >&2")))
                .await
                .unwrap();
            (i, result)
        });
    }

    while let Some(joined) = set.join_next().await {
        let (i, result) = joined.unwrap();
        assert_eq!(result.stdout, format!("out-{i}\n"));
        assert_eq!(result.stderr, format!("err-{i}\n"));
        assert_eq!(result.status, Some(0));
    }
}

#[tokio::test]
async fn test_spawn_execute_channel_delivery() {
    let coordinator = ExecutionCoordinator::new(Arc::new(TokioProcessSpawner::new()));

    let rx = coordinator
        .spawn_execute(InvocationRequest::shell("exit 4"))
        .unwrap();
    let result = recv_result(rx).await.unwrap();

    assert_eq!(result.status, Some(4));
    assert_eq!(result.error.clone().unwrap().status(), Some(4));
}
