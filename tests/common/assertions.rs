//! Custom test assertions for integration tests

use std::path::Path;
use nessus_export::Event;
use tokio::sync::broadcast::Receiver;

/// Drain every event already sitting in the channel
pub fn drain_events(events: &mut Receiver<Event>) -> Vec<Event> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

/// Assert that `path` holds exactly `expected`
pub fn assert_file_bytes(path: &Path, expected: &[u8]) {
    let actual = std::fs::read(path)
        .unwrap_or_else(|e| panic!("expected file at {}: {}", path.display(), e));
    assert_eq!(actual, expected, "unexpected content in {}", path.display());
}

/// Assert that no `.part` leftovers exist anywhere under `root`
pub fn assert_no_partials(root: &Path) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            assert_no_partials(&path);
        } else {
            assert!(
                path.extension().is_none_or(|ext| ext != "part"),
                "leftover partial file {}",
                path.display()
            );
        }
    }
}
