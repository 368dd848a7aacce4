//! In-flight mutations observed and released one step at a time.

use std::sync::Arc;
use std::time::Duration;

use super::helpers::{
    BoardTracker, GatedPersistence, id_of, lane_titles, server, server_lane_titles, task,
    tracker_for,
};
use eyre::{Result, bail, ensure, eyre};
use rstest::rstest;
use taskboard::board::{
    adapters::memory::{InMemoryTaskPersistence, RecordingNotifier},
    domain::{
        Assignee, BoardDomainError, NewTask, OperationKind, TaskId, TaskPatch, TaskPriority,
        TaskStatus, Tracked, is_optimistic,
    },
    ports::PersistenceError,
    services::TrackerError,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

async fn next_call(calls: &mut UnboundedReceiver<Option<TaskId>>) -> Result<Option<TaskId>> {
    timeout(Duration::from_secs(5), calls.recv())
        .await?
        .ok_or_else(|| eyre!("gated server dropped"))
}

/// Id of the placeholder shown while a creation is in flight.
fn placeholder_id(tracker: &BoardTracker<GatedPersistence>) -> Result<TaskId> {
    let snapshot = tracker.store().snapshot()?;
    let Some(placeholder) = snapshot
        .entries()
        .find(|entry| entry.pending_operation().map(|op| op.kind) == Some(OperationKind::Create))
    else {
        bail!("placeholder should be on the board while the creation is in flight");
    };
    Ok(placeholder.value().id())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pending_move_is_visible_until_confirmed(server: InMemoryTaskPersistence) -> Result<()> {
    let (gated, mut calls) = GatedPersistence::new(server.clone());
    let notifier = RecordingNotifier::new();
    let tracker = tracker_for(Arc::new(gated.clone()), &notifier, server.tasks()?)?;
    let mut view = tracker.column_view();
    let a = id_of(&tracker, "A")?;

    let in_flight = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.move_task(a, TaskStatus::Doing).await }
    });
    ensure!(next_call(&mut calls).await? == Some(a));

    let doing = view.tasks_for(TaskStatus::Doing).to_vec();
    ensure!(doing.iter().map(|entry| entry.value().title()).eq(["D", "A"]));
    ensure!(doing.last().is_some_and(is_optimistic), "A is shown attenuated");
    ensure!(server.get(a)?.map(|task| task.status()) == Some(TaskStatus::Todo));

    gated.release(Some(a));
    in_flight.await??;

    let entry = tracker.store().get(a)?;
    ensure!(matches!(entry, Some(Tracked::Confirmed { .. })));
    ensure!(!view.tasks_for(TaskStatus::Doing).iter().any(is_optimistic));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mutations_on_different_tasks_resolve_independently(
    server: InMemoryTaskPersistence,
) -> Result<()> {
    let (gated, mut calls) = GatedPersistence::new(server.clone());
    let notifier = RecordingNotifier::new();
    let tracker = tracker_for(Arc::new(gated.clone()), &notifier, server.tasks()?)?;
    let a = id_of(&tracker, "A")?;
    let d = id_of(&tracker, "D")?;

    let move_a = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.move_task(a, TaskStatus::Review).await }
    });
    let move_d = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.move_task(d, TaskStatus::Done).await }
    });
    let mut entered = vec![next_call(&mut calls).await?, next_call(&mut calls).await?];
    entered.sort();
    let mut expected = vec![Some(a), Some(d)];
    expected.sort();
    ensure!(entered == expected, "both calls are in flight at once");

    server.fail_next(PersistenceError::transport(std::io::Error::other("timeout")))?;
    gated.release(Some(a));
    let failed = move_a.await?;
    ensure!(matches!(failed, Err(TrackerError::TransportFailure { .. })));
    ensure!(lane_titles(&tracker, TaskStatus::Todo)? == ["A", "B", "C"]);
    ensure!(
        tracker
            .store()
            .get(d)?
            .is_some_and(|entry| entry.is_optimistic()),
        "D stays pending while A is rolled back"
    );

    gated.release(Some(d));
    move_d.await??;
    ensure!(lane_titles(&tracker, TaskStatus::Done)? == ["D"]);
    ensure!(notifier.notices().len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mutations_on_same_task_are_serialized(server: InMemoryTaskPersistence) -> Result<()> {
    let (gated, mut calls) = GatedPersistence::new(server.clone());
    let notifier = RecordingNotifier::new();
    let tracker = tracker_for(Arc::new(gated.clone()), &notifier, server.tasks()?)?;
    let b = id_of(&tracker, "B")?;

    let first = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.move_task(b, TaskStatus::Doing).await }
    });
    ensure!(next_call(&mut calls).await? == Some(b));
    let second = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.reorder_task(b, TaskStatus::Doing, 0).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    ensure!(calls.try_recv().is_err(), "second call waits for the first");

    gated.release(Some(b));
    first.await??;
    ensure!(next_call(&mut calls).await? == Some(b));
    gated.release(Some(b));
    second.await??;

    ensure!(lane_titles(&tracker, TaskStatus::Doing)? == ["B", "D"]);
    let server_b = server.get(b)?.ok_or_else(|| eyre!("B missing on server"))?;
    let local_b = tracker.store().get(b)?.ok_or_else(|| eyre!("B missing locally"))?;
    ensure!(local_b == Tracked::confirmed(server_b));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_queued_behind_creation_follows_server_id(
    server: InMemoryTaskPersistence,
) -> Result<()> {
    let (gated, mut calls) = GatedPersistence::new(server.clone());
    let notifier = RecordingNotifier::new();
    let tracker = tracker_for(Arc::new(gated.clone()), &notifier, server.tasks()?)?;

    let create = tokio::spawn({
        let tracker = tracker.clone();
        async move {
            tracker
                .create_task(NewTask::new(TaskStatus::Todo, "Draft"))
                .await
        }
    });
    ensure!(next_call(&mut calls).await?.is_none());

    let temp_id = placeholder_id(&tracker)?;
    ensure!(lane_titles(&tracker, TaskStatus::Todo)? == ["A", "B", "C", "Draft"]);

    let rename = tokio::spawn({
        let tracker = tracker.clone();
        async move {
            tracker
                .update_task(temp_id, TaskPatch::new().with_title("Final"))
                .await
        }
    });
    // Let the rename queue behind the creation.
    tokio::time::sleep(Duration::from_millis(50)).await;
    gated.release(None);
    let created = create.await??;
    ensure!(created.id() != temp_id);

    ensure!(next_call(&mut calls).await? == Some(created.id()));
    gated.release(Some(created.id()));
    let renamed = rename.await??;

    ensure!(renamed.id() == created.id());
    ensure!(tracker.store().get(temp_id)?.is_none());
    ensure!(server.get(created.id())?.is_some_and(|task| task.title() == "Final"));
    ensure!(lane_titles(&tracker, TaskStatus::Todo)? == ["A", "B", "C", "Final"]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn temporary_id_is_forgotten_once_creation_settles(
    server: InMemoryTaskPersistence,
) -> Result<()> {
    let (gated, mut calls) = GatedPersistence::new(server.clone());
    let notifier = RecordingNotifier::new();
    let tracker = tracker_for(Arc::new(gated.clone()), &notifier, server.tasks()?)?;

    let create = tokio::spawn({
        let tracker = tracker.clone();
        async move {
            tracker
                .create_task(NewTask::new(TaskStatus::Todo, "Draft"))
                .await
        }
    });
    ensure!(next_call(&mut calls).await?.is_none());
    let temp_id = placeholder_id(&tracker)?;
    gated.release(None);
    let created = create.await??;

    let late = tracker
        .update_task(temp_id, TaskPatch::new().with_title("Late"))
        .await;

    ensure!(
        matches!(
            late,
            Err(TrackerError::Domain(BoardDomainError::TaskNotFound(id))) if id == temp_id
        ),
        "settled temporary ids no longer resolve, got {late:?}"
    );
    ensure!(server.get(created.id())?.is_some_and(|task| task.title() == "Draft"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_update_keeps_keys_renormalized_while_in_flight() -> Result<()> {
    let server = InMemoryTaskPersistence::new().with_tasks([
        task(TaskStatus::Todo, (-100.0_f64).next_down(), "A"),
        task(TaskStatus::Todo, -100.0, "B"),
        task(TaskStatus::Todo, 1.0, "C"),
    ]);
    let (gated, mut calls) = GatedPersistence::new(server.clone());
    let notifier = RecordingNotifier::new();
    let tracker = tracker_for(Arc::new(gated.clone()), &notifier, server.tasks()?)?;
    let b = id_of(&tracker, "B")?;
    let c = id_of(&tracker, "C")?;

    let reprioritize = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.change_priority(b, TaskPriority::High).await }
    });
    ensure!(next_call(&mut calls).await? == Some(b));

    // No key fits between A and B, so the lane is renormalized under B.
    let reorder = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.reorder_task(c, TaskStatus::Todo, 1).await }
    });
    ensure!(next_call(&mut calls).await? == Some(c));
    ensure!(lane_titles(&tracker, TaskStatus::Todo)? == ["A", "C", "B"]);
    gated.release(Some(c));
    reorder.await??;

    server.fail_next(PersistenceError::validation("priority is locked"))?;
    gated.release(Some(b));
    let rejected = reprioritize.await?;
    ensure!(matches!(rejected, Err(TrackerError::ValidationRejected { .. })));

    let local_b = tracker.store().get(b)?.ok_or_else(|| eyre!("B missing locally"))?;
    ensure!(!local_b.is_optimistic());
    ensure!(local_b.value().priority() == TaskPriority::Medium);
    ensure!(lane_titles(&tracker, TaskStatus::Todo)? == ["A", "C", "B"]);
    ensure!(server_lane_titles(&server, TaskStatus::Todo)? == ["A", "C", "B"]);

    gated.release(Some(b));
    tracker.change_assignee(b, Assignee::archon()).await?;
    ensure!(lane_titles(&tracker, TaskStatus::Todo)? == ["A", "C", "B"]);
    Ok(())
}
