//! Then steps for board drag BDD scenarios.

use super::world::{BoardWorld, id_by_title, titles};
use rstest_bdd_macros::then;
use taskboard::board::{domain::TaskStatus, ports::NoticeKind, services::TrackerError};

fn shown_titles(world: &mut BoardWorld, lane: TaskStatus) -> Result<Vec<String>, eyre::Report> {
    Ok(world
        .tracker()?
        .store()
        .snapshot()?
        .lane(lane)
        .iter()
        .map(|entry| entry.value().title().to_owned())
        .collect())
}

#[then(r#"lane "{status}" shows "{list}""#)]
fn lane_shows(world: &mut BoardWorld, status: String, list: String) -> Result<(), eyre::Report> {
    let lane = TaskStatus::try_from(status.as_str())?;
    let shown = shown_titles(world, lane)?;
    let expected = titles(&list);
    if shown != expected {
        return Err(eyre::eyre!("lane {lane} shows {shown:?}, expected {expected:?}"));
    }
    Ok(())
}

#[then(r#"lane "{status}" is empty"#)]
fn lane_is_empty(world: &mut BoardWorld, status: String) -> Result<(), eyre::Report> {
    let lane = TaskStatus::try_from(status.as_str())?;
    let shown = shown_titles(world, lane)?;
    if !shown.is_empty() {
        return Err(eyre::eyre!("lane {lane} should be empty, shows {shown:?}"));
    }
    Ok(())
}

#[then(r#"the server lane "{status}" holds "{list}""#)]
fn server_lane_holds(world: &BoardWorld, status: String, list: String) -> Result<(), eyre::Report> {
    let lane = TaskStatus::try_from(status.as_str())?;
    let held: Vec<String> = world
        .server
        .tasks()?
        .iter()
        .filter(|task| task.status() == lane)
        .map(|task| task.title().to_owned())
        .collect();
    let expected = titles(&list);
    if held != expected {
        return Err(eyre::eyre!("server lane {lane} holds {held:?}, expected {expected:?}"));
    }
    Ok(())
}

#[then("the server received no calls")]
fn server_received_no_calls(world: &BoardWorld) -> Result<(), eyre::Report> {
    let calls = world.server.call_count()?;
    if calls != 0 {
        return Err(eyre::eyre!("expected no server calls, got {calls}"));
    }
    Ok(())
}

#[then("the change is rejected")]
fn change_is_rejected(world: &BoardWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no change was attempted"))?;
    if !matches!(result, Err(TrackerError::ValidationRejected { .. })) {
        return Err(eyre::eyre!("expected a validation rejection, got {result:?}"));
    }
    Ok(())
}

#[then(r#"a rejection notice is raised for "{title}""#)]
fn rejection_notice_raised(world: &mut BoardWorld, title: String) -> Result<(), eyre::Report> {
    let board = world.tracker()?.store().tasks()?;
    let task_id = id_by_title(&board, &title)?;
    let notices = world.notifier.notices();
    let raised = notices
        .iter()
        .any(|notice| notice.task_id == task_id && notice.kind == NoticeKind::ValidationRejected);
    if !raised {
        return Err(eyre::eyre!("no rejection notice for {title}: {notices:?}"));
    }
    Ok(())
}
