//! Integration tests for first-build and first-deployment date propagation.
//!
//! Every scenario runs over the same history:
//!
//! ```text
//! a → b → c → e → f
//!       ↘ d ↗     ↑
//!                 g
//! ```
//!
//! `d`, `e` and `f` arrive already stamped with an older date. `g` is a
//! side branch that no event reaches.

#![cfg(feature = "sqlite")]

use bitsync::sync::{SyncOptions, propagate_build_dates, propagate_deployment_dates};
use bitsync::{
    BuildState, BuildStatusModel, CommitModel, DatePatch, DocumentStore, GitRefModel, RefKind,
    RepositoryModel,
};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

const REPO: &str = "r-1";
const FULL_NAME: &str = "acme/widgets";

async fn setup_store() -> DocumentStore {
    let store = DocumentStore::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    store.setup().await.expect("setup should succeed");
    store
}

fn date(year: i32, month: u32, day: u32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .fixed_offset()
}

fn old_date() -> DateTime<FixedOffset> {
    date(2010, 2, 1)
}

fn repository() -> RepositoryModel {
    RepositoryModel {
        id: REPO.to_string(),
        slug: "widgets".to_string(),
        name: Some("Widgets".to_string()),
        full_name: Some(FULL_NAME.to_string()),
        owner: Some("acme".to_string()),
        project: Some("CORE".to_string()),
        mainbranch: Some("main".to_string()),
        description: None,
        language: None,
        is_private: Some(true),
        size: None,
        created_on: None,
        updated_on: date(2024, 1, 1),
        first_successful_build_date: None,
        first_successful_deployment_date: None,
        synced_at: date(2024, 1, 1),
    }
}

fn commit(hash: &str, parents: &[&str]) -> CommitModel {
    CommitModel {
        hash: hash.to_string(),
        repository_id: REPO.to_string(),
        repository_full_name: Some(FULL_NAME.to_string()),
        date: date(2024, 1, 1),
        message: None,
        author_raw: Some("Dev <dev@acme.test>".to_string()),
        author_uuid: None,
        author_display_name: None,
        parents: serde_json::json!(parents),
        first_successful_build_date: None,
        first_successful_deployment_date: None,
    }
}

/// The shared history, with `d`, `e` and `f` stamped through `stamp`.
fn history(stamp: impl Fn(&mut CommitModel)) -> Vec<CommitModel> {
    let mut commits = vec![
        commit("a", &["b"]),
        commit("b", &["c", "d"]),
        commit("c", &["e"]),
        commit("d", &["e"]),
        commit("e", &["f"]),
        commit("f", &[]),
        commit("g", &["f"]),
    ];
    for c in commits.iter_mut().filter(|c| matches!(c.hash.as_str(), "d" | "e" | "f")) {
        stamp(c);
    }
    commits
}

fn status(hash: &str, state: BuildState, updated_on: DateTime<FixedOffset>) -> BuildStatusModel {
    keyed_status(hash, "pipeline", state, updated_on)
}

fn keyed_status(
    hash: &str,
    key: &str,
    state: BuildState,
    updated_on: DateTime<FixedOffset>,
) -> BuildStatusModel {
    BuildStatusModel {
        id: BuildStatusModel::make_id(hash, key),
        repository_id: REPO.to_string(),
        commit_hash: hash.to_string(),
        key: key.to_string(),
        state,
        name: Some("Pipeline".to_string()),
        url: None,
        description: None,
        created_on: None,
        updated_on,
    }
}

fn git_ref(kind: RefKind, name: &str, target: &str, date: Option<DateTime<FixedOffset>>) -> GitRefModel {
    GitRefModel {
        id: GitRefModel::make_id(FULL_NAME, name),
        repository_id: REPO.to_string(),
        kind,
        name: name.to_string(),
        target_hash: Some(target.to_string()),
        target_date: None,
        date,
        tagger_raw: Some("Release Bot <bot@acme.test>".to_string()),
        message: None,
    }
}

async fn build_dates(store: &DocumentStore) -> Vec<(String, Option<DateTime<FixedOffset>>)> {
    let mut commits = store.get_commits(REPO).await.unwrap();
    commits.sort_by(|a, b| a.hash.cmp(&b.hash));
    commits
        .into_iter()
        .map(|c| (c.hash, c.first_successful_build_date))
        .collect()
}

async fn deployment_dates(store: &DocumentStore) -> Vec<(String, Option<DateTime<FixedOffset>>)> {
    let mut commits = store.get_commits(REPO).await.unwrap();
    commits.sort_by(|a, b| a.hash.cmp(&b.hash));
    commits
        .into_iter()
        .map(|c| (c.hash, c.first_successful_deployment_date))
        .collect()
}

fn expected(
    new: Option<DateTime<FixedOffset>>,
    b_and_c: Option<DateTime<FixedOffset>>,
) -> Vec<(String, Option<DateTime<FixedOffset>>)> {
    let old = Some(old_date());
    [
        ("a", new),
        ("b", b_and_c),
        ("c", b_and_c),
        ("d", old),
        ("e", old),
        ("f", old),
        ("g", None),
    ]
    .into_iter()
    .map(|(hash, date)| (hash.to_string(), date))
    .collect()
}

fn deployment_pattern() -> regex::Regex {
    SyncOptions::default().deployment_tags
}

// ─── Build Date Tests ────────────────────────────────────────────────────────

async fn seed_build_scenario() -> (DocumentStore, DateTime<FixedOffset>) {
    let store = setup_store().await;
    let built = date(2024, 3, 2);
    store.save_repositories(vec![repository()]).await.unwrap();
    store
        .save_commits(history(|c| c.first_successful_build_date = Some(old_date())))
        .await
        .unwrap();
    store
        .save_statuses(vec![status("a", BuildState::Successful, built)])
        .await
        .unwrap();
    (store, built)
}

#[tokio::test]
async fn test_build_date_reaches_unstamped_ancestors_only() {
    let (store, built) = seed_build_scenario().await;

    let outcome = propagate_build_dates(&store, REPO).await.unwrap();

    assert_eq!(outcome.events, 1);
    assert_eq!(outcome.stamped, 3);
    assert_eq!(build_dates(&store).await, expected(Some(built), Some(built)));
}

#[tokio::test]
async fn test_build_date_is_set_on_the_repository() {
    let (store, built) = seed_build_scenario().await;

    propagate_build_dates(&store, REPO).await.unwrap();

    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_build_date, Some(built));
    assert_eq!(repo.first_successful_deployment_date, None);
}

#[tokio::test]
async fn test_repository_build_date_already_set_is_kept() {
    let (store, _) = seed_build_scenario().await;
    store
        .update_repositories(&[REPO.to_string()], &DatePatch::build(date(2001, 2, 1)))
        .await
        .unwrap();

    propagate_build_dates(&store, REPO).await.unwrap();

    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_build_date, Some(date(2001, 2, 1)));
}

#[tokio::test]
async fn test_failed_and_in_progress_builds_are_ignored() {
    let store = setup_store().await;
    store.save_repositories(vec![repository()]).await.unwrap();
    store
        .save_commits(history(|c| c.first_successful_build_date = Some(old_date())))
        .await
        .unwrap();
    store
        .save_statuses(vec![
            status("a", BuildState::Failed, date(2024, 3, 1)),
            status("g", BuildState::InProgress, date(2024, 3, 1)),
        ])
        .await
        .unwrap();

    let outcome = propagate_build_dates(&store, REPO).await.unwrap();

    assert_eq!(outcome.events, 0);
    assert_eq!(build_dates(&store).await, expected(None, None));
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_build_date, None);
}

#[tokio::test]
async fn test_earliest_build_claims_shared_history() {
    let store = setup_store().await;
    store.save_repositories(vec![repository()]).await.unwrap();
    store.save_commits(history(|_| {})).await.unwrap();
    // Delivered newest first; the pass must still walk oldest first.
    store
        .save_statuses(vec![
            status("a", BuildState::Successful, date(2024, 5, 1)),
            status("c", BuildState::Successful, date(2024, 4, 1)),
        ])
        .await
        .unwrap();

    propagate_build_dates(&store, REPO).await.unwrap();

    let dates = build_dates(&store).await;
    let of = |hash: &str| dates.iter().find(|(h, _)| h == hash).and_then(|(_, d)| *d);
    assert_eq!(of("c"), Some(date(2024, 4, 1)));
    assert_eq!(of("e"), Some(date(2024, 4, 1)));
    assert_eq!(of("a"), Some(date(2024, 5, 1)));
    assert_eq!(of("d"), Some(date(2024, 5, 1)));
    assert_eq!(of("g"), None);

    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_build_date, Some(date(2024, 4, 1)));
}

#[tokio::test]
async fn test_build_propagation_is_idempotent() {
    let (store, built) = seed_build_scenario().await;

    propagate_build_dates(&store, REPO).await.unwrap();
    let again = propagate_build_dates(&store, REPO).await.unwrap();

    assert_eq!(again.stamped, 0);
    assert_eq!(build_dates(&store).await, expected(Some(built), Some(built)));
}

// ─── Deployment Date Tests ───────────────────────────────────────────────────

async fn seed_deployment_scenario(refs: Vec<GitRefModel>) -> DocumentStore {
    let store = setup_store().await;
    store.save_repositories(vec![repository()]).await.unwrap();
    store
        .save_commits(history(|c| {
            c.first_successful_deployment_date = Some(old_date());
        }))
        .await
        .unwrap();
    store.save_refs(refs).await.unwrap();
    store
}

#[tokio::test]
async fn test_matching_tag_stamps_unstamped_ancestors() {
    let released = date(2024, 3, 1);
    let store = seed_deployment_scenario(vec![
        git_ref(RefKind::Branch, "main", "a", None),
        git_ref(RefKind::Tag, "v0.0.1", "a", Some(released)),
    ])
    .await;

    let outcome = propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(outcome.events, 1);
    assert_eq!(outcome.stamped, 3);
    assert_eq!(
        deployment_dates(&store).await,
        expected(Some(released), Some(released))
    );
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_deployment_date, Some(released));
}

#[tokio::test]
async fn test_matching_tag_records_a_deployment() {
    let released = date(2024, 3, 1);
    let store = seed_deployment_scenario(vec![git_ref(
        RefKind::Tag,
        "v0.0.1",
        "a",
        Some(released),
    )])
    .await;

    propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();
    // A second pass replaces the same deployment.
    propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    let deployments = store.get_deployments(REPO).await.unwrap();
    assert_eq!(deployments.len(), 1);
    let deployment = &deployments[0];
    assert_eq!(deployment.tag_name, "v0.0.1");
    assert_eq!(deployment.commit_hash, "a");
    assert_eq!(deployment.date, released);
    assert_eq!(deployment.project.as_deref(), Some("CORE"));
    assert_eq!(deployment.author.as_deref(), Some("Release Bot <bot@acme.test>"));
    assert_eq!(deployment.repository["slug"], "widgets");
}

#[tokio::test]
async fn test_repository_deployment_date_already_set_is_kept() {
    let store = seed_deployment_scenario(vec![git_ref(
        RefKind::Tag,
        "v0.0.1",
        "a",
        Some(date(2024, 3, 1)),
    )])
    .await;
    store
        .update_repositories(&[REPO.to_string()], &DatePatch::deployment(date(2001, 2, 1)))
        .await
        .unwrap();

    propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_deployment_date, Some(date(2001, 2, 1)));
}

#[tokio::test]
async fn test_non_matching_tag_changes_nothing() {
    let store = seed_deployment_scenario(vec![
        git_ref(RefKind::Branch, "main", "a", None),
        git_ref(RefKind::Tag, "###not-matching-name###", "a", Some(date(2024, 3, 1))),
    ])
    .await;

    let outcome = propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(outcome.events, 0);
    assert_eq!(deployment_dates(&store).await, expected(None, None));
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_deployment_date, None);
    assert!(store.get_deployments(REPO).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_branch_named_like_a_release_is_not_a_deployment() {
    let store = seed_deployment_scenario(vec![git_ref(
        RefKind::Branch,
        "v0.0.1",
        "a",
        Some(date(2024, 3, 1)),
    )])
    .await;

    propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(deployment_dates(&store).await, expected(None, None));
    assert!(store.get_deployments(REPO).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undated_tag_is_skipped() {
    let store =
        seed_deployment_scenario(vec![git_ref(RefKind::Tag, "v0.0.1", "a", None)]).await;

    let outcome = propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(outcome.events, 0);
    assert_eq!(deployment_dates(&store).await, expected(None, None));
}

#[tokio::test]
async fn test_older_tag_wins_over_newer_tag() {
    let first = date(2010, 2, 1);
    let second = date(2012, 11, 10);
    let store = seed_deployment_scenario(vec![
        git_ref(RefKind::Tag, "v2.0.0", "a", Some(second)),
        git_ref(RefKind::Tag, "v1.0.0", "b", Some(first)),
    ])
    .await;

    let outcome = propagate_deployment_dates(&store, REPO, &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(outcome.events, 2);
    assert_eq!(
        deployment_dates(&store).await,
        expected(Some(second), Some(first))
    );
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_deployment_date, Some(first));

    let deployments = store.get_deployments(REPO).await.unwrap();
    let tags: Vec<&str> = deployments.iter().map(|d| d.tag_name.as_str()).collect();
    assert_eq!(tags, vec!["v1.0.0", "v2.0.0"]);
}

#[tokio::test]
async fn test_custom_pattern_selects_tags() {
    let store = seed_deployment_scenario(vec![
        git_ref(RefKind::Tag, "v0.0.1", "b", Some(date(2024, 3, 1))),
        git_ref(RefKind::Tag, "release-7", "a", Some(date(2024, 4, 1))),
    ])
    .await;
    let options = SyncOptions::default()
        .with_deployment_tags("^release-\\d+$")
        .unwrap();

    propagate_deployment_dates(&store, REPO, &options.deployment_tags)
        .await
        .unwrap();

    let released = Some(date(2024, 4, 1));
    assert_eq!(deployment_dates(&store).await, expected(released, released));
}

#[tokio::test]
async fn test_unknown_repository_is_skipped() {
    let store = setup_store().await;

    let outcome = propagate_deployment_dates(&store, "nope", &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(outcome, Default::default());
}

// ─── Scan Ceiling Tests ──────────────────────────────────────────────────────

/// Only the newest events fall past the ceiling, so the earliest build still
/// claims shared history. Failed statuses do not count against the ceiling.
#[tokio::test]
async fn test_build_scan_ceiling_keeps_oldest_successful_statuses() {
    let store = setup_store().await;
    let (april, may, june) = (date(2024, 4, 1), date(2024, 5, 1), date(2024, 6, 1));
    store.save_repositories(vec![repository()]).await.unwrap();
    store
        .save_commits(history(|c| c.first_successful_build_date = Some(old_date())))
        .await
        .unwrap();
    store
        .save_statuses(vec![
            keyed_status("a", "ci", BuildState::Successful, may),
            keyed_status("a", "lint", BuildState::Failed, may),
            keyed_status("a", "release", BuildState::Successful, june),
            keyed_status("c", "ci", BuildState::Successful, april),
        ])
        .await
        .unwrap();

    let capped = store.clone().with_scan_limit(2);
    let outcome = propagate_build_dates(&capped, REPO).await.unwrap();

    assert_eq!(outcome.events, 2);
    let mut want = expected(Some(may), Some(may));
    want[2].1 = Some(april);
    assert_eq!(build_dates(&store).await, want);
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_build_date, Some(april));
}

/// Branches and undated tags do not count against the ceiling, and tags are
/// read in date order rather than by name.
#[tokio::test]
async fn test_deployment_scan_ceiling_keeps_oldest_dated_tags() {
    let store = setup_store().await;
    let (april, june) = (date(2024, 4, 1), date(2024, 6, 1));
    store.save_repositories(vec![repository()]).await.unwrap();
    store
        .save_commits(history(|c| c.first_successful_deployment_date = Some(old_date())))
        .await
        .unwrap();
    store
        .save_refs(vec![
            git_ref(RefKind::Branch, "main", "a", None),
            git_ref(RefKind::Tag, "v0.9.0", "a", None),
            git_ref(RefKind::Tag, "v1.0.0", "c", Some(april)),
            git_ref(RefKind::Tag, "v2.0.0", "a", Some(june)),
        ])
        .await
        .unwrap();

    let capped = store.clone().with_scan_limit(2);
    let outcome = propagate_deployment_dates(&capped, REPO, &deployment_pattern())
        .await
        .unwrap();

    assert_eq!(outcome.events, 2);
    let mut want = expected(Some(june), Some(june));
    want[2].1 = Some(april);
    assert_eq!(deployment_dates(&store).await, want);
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_deployment_date, Some(april));
}

// ─── Known Limitations ───────────────────────────────────────────────────────

/// A build that arrives in a later run with an earlier date than one already
/// propagated cannot reclaim commits: stamps are set once.
#[tokio::test]
async fn test_late_backfilled_build_does_not_rewrite_stamps() {
    let store = setup_store().await;
    store.save_repositories(vec![repository()]).await.unwrap();
    store.save_commits(history(|_| {})).await.unwrap();
    store
        .save_statuses(vec![status("a", BuildState::Successful, date(2024, 5, 1))])
        .await
        .unwrap();
    propagate_build_dates(&store, REPO).await.unwrap();

    store
        .save_statuses(vec![status("c", BuildState::Successful, date(2024, 4, 1))])
        .await
        .unwrap();
    propagate_build_dates(&store, REPO).await.unwrap();

    let dates = build_dates(&store).await;
    let of = |hash: &str| dates.iter().find(|(h, _)| h == hash).and_then(|(_, d)| *d);
    assert_eq!(of("c"), Some(date(2024, 5, 1)));
    let repo = store.get_repository(REPO).await.unwrap().unwrap();
    assert_eq!(repo.first_successful_build_date, Some(date(2024, 5, 1)));
}
