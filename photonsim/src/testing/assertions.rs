//! Test assertions for runs, artifacts and events.

use std::path::PathBuf;

use crate::core::StageStatus;
use crate::events::CollectingEventSink;
use crate::pipeline::RunReport;

/// Asserts that every path is a regular file (links followed).
pub fn assert_files_exist(paths: &[PathBuf]) {
    for path in paths {
        assert!(path.is_file(), "Expected file at {}", path.display());
    }
}

/// Asserts that every path is a directory (links followed).
pub fn assert_dirs_exist(paths: &[PathBuf]) {
    for path in paths {
        assert!(path.is_dir(), "Expected directory at {}", path.display());
    }
}

/// Asserts that every path is a symbolic link.
pub fn assert_links_exist(paths: &[PathBuf]) {
    for path in paths {
        let is_link = std::fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        assert!(is_link, "Expected symbolic link at {}", path.display());
    }
}

/// Asserts that nothing exists at any of the paths.
pub fn assert_absent(paths: &[PathBuf]) {
    for path in paths {
        assert!(
            std::fs::symlink_metadata(path).is_err(),
            "Expected nothing at {}",
            path.display()
        );
    }
}

/// Asserts the per-stage statuses of a run, in order.
pub fn assert_stage_statuses(report: &RunReport, expected: &[StageStatus]) {
    let actual: Vec<StageStatus> = report.records.iter().map(|r| r.status).collect();
    assert_eq!(
        actual, expected,
        "Expected statuses {:?}, got {:?}",
        expected, actual
    );
}

/// Asserts the sequence of emitted event types.
pub fn assert_event_types(sink: &CollectingEventSink, expected: &[&str]) {
    let actual = sink.event_types();
    assert_eq!(
        actual, expected,
        "Expected events {:?}, got {:?}",
        expected, actual
    );
}
