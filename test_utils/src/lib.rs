//! Utility helpers for tests.

use bevy::prelude::{App, On, ResMut, Resource};

use tandem::{
    BridgeIssue, CommandCompleted, CommandOutcome, ScriptFinished, TandemPlugin, Ticket,
};

/// An app with the full stack installed and the capture observers wired up.
#[must_use]
pub fn build_app() -> App {
    let mut app = App::new();
    app.add_plugins(TandemPlugin);
    install_issue_observer(&mut app);
    install_completion_observer(&mut app);
    install_finish_observer(&mut app);
    app
}

/// Runs the schedule `ticks` times.
pub fn run_ticks(app: &mut App, ticks: u32) {
    for _ in 0..ticks {
        app.update();
    }
}

/// Bridge issues captured during a test, as `(context, detail)` strings.
#[derive(Resource, Default, Debug)]
pub struct CapturedIssues(pub Vec<(String, String)>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_issue(event: On<BridgeIssue>, mut issues: ResMut<CapturedIssues>) {
    let issue = event.event();
    issues.0.push((issue.context.to_owned(), issue.detail.clone()));
}

/// Installs the issue-capturing observer and resource on the provided app.
pub fn install_issue_observer(app: &mut App) {
    app.insert_resource(CapturedIssues::default());
    app.world_mut().add_observer(record_issue);
}

/// Command completions captured in flush order.
#[derive(Resource, Default, Debug)]
pub struct CapturedCompletions(pub Vec<(Ticket, CommandOutcome)>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_completion(event: On<CommandCompleted>, mut completions: ResMut<CapturedCompletions>) {
    let completed = event.event();
    completions.0.push((completed.ticket, completed.outcome.clone()));
}

/// Installs the completion-capturing observer and resource on the provided
/// app.
pub fn install_completion_observer(app: &mut App) {
    app.insert_resource(CapturedCompletions::default());
    app.world_mut().add_observer(record_completion);
}

/// Script finishes captured in flush order.
#[derive(Resource, Default, Debug)]
pub struct CapturedFinishes(pub Vec<ScriptFinished>);

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_finish(event: On<ScriptFinished>, mut finishes: ResMut<CapturedFinishes>) {
    finishes.0.push(event.event().clone());
}

/// Installs the finish-capturing observer and resource on the provided app.
pub fn install_finish_observer(app: &mut App) {
    app.insert_resource(CapturedFinishes::default());
    app.world_mut().add_observer(record_finish);
}
