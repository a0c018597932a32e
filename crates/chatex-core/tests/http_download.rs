//! End-to-end export of a chat's media over HTTP: archive JSON, job
//! extraction, batch orchestration and libcurl transfers against a local
//! server.

mod common;

use chatex_core::archive::{ChatArchive, ChatSelector, FetchMode};
use chatex_core::media::extract_jobs;
use chatex_core::scheduler::{run_batch, BatchOptions, JobOutcome, TracingSink};
use chatex_core::transfer::CurlOptions;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

fn body(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_add(seed)).collect()
}

fn archive_json(base: &str) -> String {
    format!(
        r#"{{
        "chats": [
            {{ "id": 1, "name": "Photos", "messages": [
                {{ "id": 10, "date": "2024-03-01T10:00:00Z", "text": "big",
                   "media": {{ "url": "{base}/big.bin", "file_name": "big.bin", "size": 65536 }} }},
                {{ "id": 11, "date": "2024-03-01T10:01:00Z", "text": "first a",
                   "media": {{ "url": "{base}/a1.jpg", "file_name": "a.jpg", "size": 100 }} }},
                {{ "id": 12, "date": "2024-03-01T10:02:00Z", "text": "second a",
                   "media": {{ "url": "{base}/a2.jpg", "file_name": "a.jpg", "size": 200 }} }},
                {{ "id": 13, "date": "2024-03-01T10:03:00Z", "text": "gone",
                   "media": {{ "url": "{base}/missing.png", "ext": ".png", "size": 5 }} }},
                {{ "id": 14, "date": "2024-03-01T10:04:00Z", "text": "no media" }}
            ] }}
        ]
    }}"#
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exports_chat_media_with_isolated_failures() {
    let big = body(65_536, 1);
    let a1 = body(100, 2);
    let a2 = body(200, 3);
    let mut routes = HashMap::new();
    routes.insert("/big.bin".to_string(), big.clone());
    routes.insert("/a1.jpg".to_string(), a1.clone());
    routes.insert("/a2.jpg".to_string(), a2.clone());
    let base = common::media_server::start(routes);

    let archive = ChatArchive::from_json(&archive_json(&base)).unwrap();
    let chat = archive.find_chat(ChatSelector::Index(1)).unwrap();
    let fetched = chat.fetch(FetchMode::Earliest, &CurlOptions::default());
    assert_eq!(fetched.records.len(), 5);

    let jobs = extract_jobs(&fetched.media);
    assert_eq!(jobs.len(), 4);

    let dir = tempfile::tempdir().unwrap();
    let download_dir = dir.path().join("media");
    let options = BatchOptions {
        max_concurrent: 2,
        download_dir: download_dir.clone(),
    };
    let result = run_batch(jobs, &options, Arc::new(TracingSink)).await.unwrap();

    assert_eq!(result.len(), 4);
    let summary = result.summary();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures, vec![(13, "HTTP 404".to_string())]);

    match result.outcome_for(10) {
        Some(JobOutcome::Success { path, .. }) => {
            assert_eq!(path, &download_dir.join("big.bin"));
            assert_eq!(fs::read(path).unwrap(), big);
        }
        other => panic!("expected big.bin to download, got {:?}", other),
    }

    // Both "a.jpg" jobs land on disk under distinct names.
    let mut saved: Vec<Vec<u8>> = [11, 12]
        .iter()
        .map(|id| match result.outcome_for(*id) {
            Some(JobOutcome::Success { path, .. }) => fs::read(path).unwrap(),
            other => panic!("expected job {} to succeed, got {:?}", id, other),
        })
        .collect();
    saved.sort_by_key(Vec::len);
    assert_eq!(saved, vec![a1, a2]);
    assert!(download_dir.join("a.jpg").exists());
    assert!(download_dir.join("a (1).jpg").exists());
}

#[tokio::test]
async fn latest_mode_limits_downloaded_media() {
    let mut routes = HashMap::new();
    routes.insert("/big.bin".to_string(), body(10, 0));
    routes.insert("/a1.jpg".to_string(), body(10, 0));
    routes.insert("/a2.jpg".to_string(), body(10, 0));
    let base = common::media_server::start(routes);

    let archive = ChatArchive::from_json(&archive_json(&base)).unwrap();
    let chat = archive.find_chat(ChatSelector::Id(1)).unwrap();
    // Newest two messages: 14 (no media) and 13 (missing on server).
    let fetched = chat.fetch(FetchMode::Latest(2), &CurlOptions::default());
    let jobs = extract_jobs(&fetched.media);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].file_name(), "13.png");

    let dir = tempfile::tempdir().unwrap();
    let options = BatchOptions {
        max_concurrent: 1,
        download_dir: dir.path().to_path_buf(),
    };
    let result = run_batch(jobs, &options, Arc::new(TracingSink)).await.unwrap();
    assert_eq!(result.summary().failed, 1);
}
