//! Whole runs: catalog resolution, per-collection tasks, one save.

mod common;

use std::time::Duration;

use common::*;
use reel_core::{
    CollectionId, JsonFileStore, MemoryStore, MetadataRefresh, OrderCheck, Snapshot,
    SnapshotStore, SyncTarget,
};
use reel_sync::{run, CollectionStatus, RunOptions, SyncError};
use tempfile::TempDir;

fn options() -> RunOptions {
    RunOptions {
        page_size: 50,
        order_check: OrderCheck::Verify,
        metadata_refresh: MetadataRefresh::Always,
        prune_removed: false,
        dry_run: false,
        started_at: run_started(),
    }
}

fn channel() -> SyncTarget {
    SyncTarget::Channel("@fake".to_string())
}

fn two_playlists() -> std::sync::Arc<FakeRemote> {
    let remote = FakeRemote::new();
    remote.with_collection(meta("PL1", "Misa Harian"), descending(5));
    remote.with_collection(meta("PL2", "Renungan"), descending(3));
    remote
}

fn status_of<'a>(report: &'a reel_sync::RunReport, id: &str) -> &'a CollectionStatus {
    &report
        .collections
        .iter()
        .find(|c| c.id.0 == id)
        .unwrap_or_else(|| panic!("no report for {id}"))
        .status
}

#[tokio::test]
async fn channel_sync_stores_every_playlist() {
    let remote = two_playlists();
    let store = MemoryStore::default();

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert!(report.snapshot_written);
    assert_eq!(report.synced(), 2);
    assert_eq!(report.new_items(), 8);
    assert_eq!(store.save_count(), 1);

    let saved = store.current().unwrap();
    let pl1 = saved.get(&CollectionId::from("PL1")).unwrap();
    assert_eq!(pl1.item_count, 5);
    assert_eq!(pl1.title, "Misa Harian");
    assert_eq!(pl1.last_updated, Some(run_started()));
    assert!(pl1.last_error.is_none());
}

#[tokio::test]
async fn second_run_without_new_items_is_identical() {
    let remote = two_playlists();
    let store = MemoryStore::default();

    run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();
    let first = store.current().unwrap();
    remote.reset_counters();

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();
    let second = store.current().unwrap();

    assert_eq!(first, second);
    assert_eq!(report.new_items(), 0);
    assert!(remote.detail_calls().is_empty());
    assert_eq!(remote.page_calls("PL1"), 1);
    assert_eq!(remote.page_calls("PL2"), 1);
}

#[tokio::test]
async fn first_page_failure_keeps_stored_items() {
    let remote = two_playlists();
    remote.fail_page("PL1", 0);
    let mut seeded = Snapshot::default();
    let prior_items: Vec<_> = (0..4).rev().map(|i| stored_item(&format!("v{i}"), at(i))).collect();
    seeded.insert(stored_collection(meta("PL1", "Misa Harian"), prior_items.clone()));
    let store = MemoryStore::with_snapshot(seeded);

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();

    assert!(matches!(status_of(&report, "PL1"), CollectionStatus::Degraded { .. }));
    assert_eq!(status_of(&report, "PL2"), &CollectionStatus::Synced);
    assert!(!report.is_clean());

    let saved = store.current().unwrap();
    let pl1 = saved.get(&CollectionId::from("PL1")).unwrap();
    assert_eq!(pl1.items, prior_items);
    assert!(pl1.last_error.as_deref().unwrap().contains("quotaExceeded"));
    assert_eq!(saved.get(&CollectionId::from("PL2")).unwrap().item_count, 3);
}

#[tokio::test]
async fn failed_save_is_fatal_and_leaves_store_untouched() {
    let remote = two_playlists();
    let mut seeded = Snapshot::default();
    seeded.insert(stored_collection(meta("PL1", "Misa Harian"), vec![stored_item("v0", at(0))]));
    let store = MemoryStore::with_snapshot(seeded.clone());
    store.fail_saves(true);

    let err = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Snapshot(_)));
    assert_eq!(store.current().unwrap(), seeded);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn dry_run_reports_without_saving() {
    let remote = two_playlists();
    let store = MemoryStore::default();
    let options = RunOptions {
        dry_run: true,
        ..options()
    };

    let report = run(&store, &remote.sources(), &channel(), &options)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert!(!report.snapshot_written);
    assert_eq!(report.synced(), 2);
    assert_eq!(store.save_count(), 0);
    assert!(store.current().is_none());
}

#[tokio::test]
async fn catalog_failure_skips_everything() {
    let remote = two_playlists();
    remote.catalog_down(true);
    let mut seeded = Snapshot::default();
    seeded.insert(stored_collection(meta("PL1", "Misa Harian"), vec![stored_item("v0", at(0))]));
    let store = MemoryStore::with_snapshot(seeded.clone());

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();

    assert!(report.catalog_error.as_deref().unwrap().contains("dns failure"));
    assert_eq!(report.skipped(), 1);
    match status_of(&report, "PL1") {
        CollectionStatus::Skipped { reason } => assert!(reason.starts_with("catalog unavailable")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(report.collections[0].total_items, 1);
    assert_eq!(store.current().unwrap(), seeded);
    assert_eq!(store.save_count(), 0);
    assert_eq!(remote.page_calls("PL1"), 0);
}

#[tokio::test]
async fn unknown_playlist_is_skipped_and_others_sync() {
    let remote = two_playlists();
    let store = MemoryStore::default();
    let target = SyncTarget::Playlists(vec![
        CollectionId::from("PL2"),
        CollectionId::from("PLgone"),
        CollectionId::from("PL2"),
    ]);

    let report = run(&store, &remote.sources(), &target, &options())
        .await
        .unwrap();

    assert_eq!(report.collections.len(), 2);
    assert_eq!(report.collections[0].id, CollectionId::from("PL2"));
    assert_eq!(
        status_of(&report, "PLgone"),
        &CollectionStatus::Skipped {
            reason: "not found remotely".to_string()
        }
    );
    let saved = store.current().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(remote.page_calls("PL1"), 0);
}

#[tokio::test]
async fn removed_collections_are_kept_unless_pruning() {
    let remote = two_playlists();
    let mut seeded = Snapshot::default();
    seeded.insert(stored_collection(meta("PLold", "Arsip"), vec![stored_item("x", at(0))]));

    let keep = MemoryStore::with_snapshot(seeded.clone());
    let report = run(&keep, &remote.sources(), &channel(), &options())
        .await
        .unwrap();
    assert!(report.pruned.is_empty());
    assert_eq!(keep.current().unwrap().len(), 3);

    let prune = MemoryStore::with_snapshot(seeded);
    let options = RunOptions {
        prune_removed: true,
        ..options()
    };
    let report = run(&prune, &remote.sources(), &channel(), &options)
        .await
        .unwrap();
    assert_eq!(report.pruned, vec![CollectionId::from("PLold")]);
    let saved = prune.current().unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.get(&CollectionId::from("PLold")).is_none());
}

#[tokio::test]
async fn metadata_is_refreshed_per_policy() {
    let remote = FakeRemote::new();
    remote.with_collection(meta("PL1", "New title"), descending(2));
    let mut seeded = Snapshot::default();
    let items: Vec<_> = (0..2).rev().map(|i| stored_item(&format!("v{i}"), at(i))).collect();
    seeded.insert(stored_collection(meta("PL1", "Old title"), items));

    let when_changed = MemoryStore::with_snapshot(seeded.clone());
    let options_when_changed = RunOptions {
        metadata_refresh: MetadataRefresh::WhenChanged,
        ..options()
    };
    run(&when_changed, &remote.sources(), &channel(), &options_when_changed)
        .await
        .unwrap();
    let kept = when_changed.current().unwrap();
    assert_eq!(kept.get(&CollectionId::from("PL1")).unwrap().title, "Old title");

    let always = MemoryStore::with_snapshot(seeded);
    run(&always, &remote.sources(), &channel(), &options())
        .await
        .unwrap();
    let refreshed = always.current().unwrap();
    assert_eq!(refreshed.get(&CollectionId::from("PL1")).unwrap().title, "New title");
}

#[tokio::test]
async fn panicking_task_is_skipped_and_keeps_prior() {
    let remote = two_playlists();
    remote.panic_on_pages("PL1");
    let mut seeded = Snapshot::default();
    seeded.insert(stored_collection(meta("PL1", "Misa Harian"), vec![stored_item("v0", at(0))]));
    let store = MemoryStore::with_snapshot(seeded.clone());

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();

    match status_of(&report, "PL1") {
        CollectionStatus::Skipped { reason } => assert!(reason.contains("sync task failed")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(status_of(&report, "PL2"), &CollectionStatus::Synced);
    let saved = store.current().unwrap();
    assert_eq!(
        saved.get(&CollectionId::from("PL1")),
        seeded.get(&CollectionId::from("PL1"))
    );
}

#[tokio::test(start_paused = true)]
async fn slow_collection_degrades_without_blocking_others() {
    let remote = two_playlists();
    remote.slow_pages("PL2", Duration::from_secs(120));
    let store = MemoryStore::default();

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();

    assert_eq!(status_of(&report, "PL1"), &CollectionStatus::Synced);
    match status_of(&report, "PL2") {
        CollectionStatus::Degraded { note } => assert!(note.contains("timed out")),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(report.snapshot_written);
}

#[tokio::test]
async fn json_file_store_round_trips_a_run() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path().join("data").join("playlists.json"));
    let remote = two_playlists();

    run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();
    let first = store.read().unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert!(!store.tmp_path().exists());

    run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();
    assert_eq!(store.load(), first);
}

#[tokio::test]
async fn legacy_snapshot_is_saved_sorted_when_first_page_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("playlists.json");
    std::fs::write(
        &path,
        r#"[{"id": "PL1", "title": "Misa Harian", "videos": [
            {"id": "v0", "publishedAt": "2024-01-01T00:00:00Z", "viewCount": "5"},
            {"id": "v2", "publishedAt": "2024-01-03T00:00:00Z"},
            {"id": "v1", "publishedAt": "2024-01-02T00:00:00Z", "duration": "PT9M"}
        ]}]"#,
    )
    .unwrap();
    let store = JsonFileStore::new(&path);
    let remote = FakeRemote::new();
    remote.with_collection(meta("PL1", "Misa Harian"), descending(4));
    remote.fail_page("PL1", 0);

    let report = run(&store, &remote.sources(), &channel(), &options())
        .await
        .unwrap();

    assert!(matches!(status_of(&report, "PL1"), CollectionStatus::Degraded { .. }));
    let saved = store.read().unwrap().unwrap();
    let pl1 = saved.get(&CollectionId::from("PL1")).unwrap();
    let ids: Vec<&str> = pl1.items.iter().map(|i| i.id.0.as_str()).collect();
    assert_eq!(ids, vec!["v2", "v1", "v0"]);
    for pair in pl1.items.windows(2) {
        assert!(pair[0].published_at >= pair[1].published_at);
    }
    assert_eq!(pl1.items[2].details.as_ref().unwrap().view_count, Some(5));
    assert_eq!(
        pl1.items[1].details.as_ref().unwrap().duration.as_deref(),
        Some("PT9M")
    );
}
