//! Tests for Log
//!
//! These tests verify:
//! - Append / read round trips and offset assignment
//! - Lowest / highest offsets
//! - Segment rotation on store and index thresholds
//! - Rebuilding from an existing directory
//! - Truncation, close, remove and reset
//! - Concurrent readers alongside a writer

use std::fs;
use std::sync::Arc;
use std::thread;

use commitlog::storage::ENTRY_WIDTH;
use commitlog::{Config, Log, LogError, Record};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, Log) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(1024 * 1024)
        .max_index_bytes(1024 * 1024)
        .build();
    let log = Log::open(config).unwrap();
    (temp_dir, log)
}

/// "hello world" frames are 35 bytes, so a 64-byte store rotates every
/// second record
fn setup_temp_log_with_small_store() -> (TempDir, Log) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(64)
        .max_index_bytes(1024)
        .build();
    let log = Log::open(config).unwrap();
    (temp_dir, log)
}

fn hello() -> Record {
    Record::new(b"hello world".to_vec())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_log_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mylog");

    let config = Config::builder().data_dir(&data_dir).build();
    let log = Log::open(config).unwrap();

    assert!(data_dir.is_dir());
    assert!(data_dir.join("0.store").exists());
    assert!(data_dir.join("0.index").exists());
    assert_eq!(log.dir(), data_dir.as_path());
    assert_eq!(log.segment_count(), 1);
}

#[test]
fn test_log_append_read() {
    let (_temp, log) = setup_temp_log();

    let offset = log.append(hello()).unwrap();
    assert_eq!(offset, 0);

    let record = log.read(offset).unwrap();
    assert_eq!(record.value, b"hello world");
    assert_eq!(record.offset, offset);
}

#[test]
fn test_log_read_out_of_range() {
    let (_temp, log) = setup_temp_log();
    log.append(hello()).unwrap();

    let err = log.read(1).unwrap_err();
    assert!(matches!(err, LogError::OffsetOutOfRange(1)));
    assert_eq!(err.to_string(), "offset out of range: 1");
}

#[test]
fn test_log_read_empty_log() {
    let (_temp, log) = setup_temp_log();

    assert!(matches!(log.read(0), Err(LogError::OffsetOutOfRange(0))));
}

#[test]
fn test_log_offsets() {
    let (_temp, log) = setup_temp_log();

    for i in 0..3 {
        assert_eq!(log.append(hello()).unwrap(), i);
    }

    assert_eq!(log.lowest_offset().unwrap(), 0);
    assert_eq!(log.highest_offset().unwrap(), 2);
}

#[test]
fn test_log_empty_offsets() {
    let (_temp, log) = setup_temp_log();

    assert_eq!(log.lowest_offset().unwrap(), 0);
    assert_eq!(log.highest_offset().unwrap(), 0);
}

#[test]
fn test_log_initial_offset() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .initial_offset(100)
        .build();
    let log = Log::open(config).unwrap();

    assert_eq!(log.lowest_offset().unwrap(), 100);
    assert_eq!(log.highest_offset().unwrap(), 99);

    assert_eq!(log.append(hello()).unwrap(), 100);
    assert_eq!(log.highest_offset().unwrap(), 100);
    assert!(temp_dir.path().join("100.store").exists());
}

// =============================================================================
// Rotation Tests
// =============================================================================

#[test]
fn test_log_rotates_on_store_size() {
    let (_temp, log) = setup_temp_log_with_small_store();

    assert_eq!(log.append(hello()).unwrap(), 0);
    assert_eq!(log.segment_count(), 1);

    let offset = log.append(hello()).unwrap();
    assert_eq!(log.segment_count(), 2);
    assert_eq!(log.base_offsets(), vec![0, offset + 1]);

    // Next record lands in the new segment
    assert_eq!(log.append(hello()).unwrap(), 2);
    assert_eq!(log.read(2).unwrap().offset, 2);
    assert_eq!(log.read(1).unwrap().offset, 1);
}

#[test]
fn test_log_rotates_on_index_size() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(1024 * 1024)
        .max_index_bytes(ENTRY_WIDTH * 2)
        .build();
    let log = Log::open(config).unwrap();

    for _ in 0..5 {
        log.append(hello()).unwrap();
    }

    assert_eq!(log.base_offsets(), vec![0, 2, 4]);
}

#[test]
fn test_log_rotates_when_index_capacity_not_entry_aligned() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(1024 * 1024)
        .max_index_bytes(30)
        .build();
    let log = Log::open(config).unwrap();

    // 30 bytes fit two entries; the log must rotate instead of failing
    for i in 0..6 {
        assert_eq!(log.append(hello()).unwrap(), i);
    }
    assert_eq!(log.base_offsets(), vec![0, 2, 4, 6]);
}

#[test]
fn test_log_offsets_unique_across_rotations() {
    let (_temp, log) = setup_temp_log_with_small_store();

    for i in 0..20u64 {
        let offset = log.append(Record::new(format!("record-{}", i))).unwrap();
        assert_eq!(offset, i);
    }

    assert!(log.segment_count() > 1);
    for i in 0..20u64 {
        let record = log.read(i).unwrap();
        assert_eq!(record.offset, i);
        assert_eq!(record.value, format!("record-{}", i).into_bytes());
    }
    assert_eq!(log.highest_offset().unwrap(), 19);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_log_reopen_existing() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(64)
        .build();

    {
        let log = Log::open(config.clone()).unwrap();
        for _ in 0..3 {
            log.append(hello()).unwrap();
        }
        log.close().unwrap();
    }

    let log = Log::open(config).unwrap();
    assert_eq!(log.base_offsets(), vec![0, 2]);
    assert_eq!(log.lowest_offset().unwrap(), 0);
    assert_eq!(log.highest_offset().unwrap(), 2);
    for i in 0..3 {
        assert_eq!(log.read(i).unwrap().value, b"hello world");
    }

    // Appends continue on the last segment
    assert_eq!(log.append(hello()).unwrap(), 3);
}

#[test]
fn test_log_recovers_without_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let log = Log::open_path(temp_dir.path()).unwrap();
        for _ in 0..5 {
            log.append(hello()).unwrap();
        }
        // Dropped without close
    }

    let log = Log::open_path(temp_dir.path()).unwrap();
    assert_eq!(log.highest_offset().unwrap(), 4);
    for i in 0..5 {
        assert_eq!(log.read(i).unwrap().offset, i);
    }
    assert_eq!(log.append(hello()).unwrap(), 5);
}

#[test]
fn test_log_ignores_foreign_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("README.txt"), b"notes").unwrap();
    fs::write(temp_dir.path().join("abc.store"), b"").unwrap();
    fs::create_dir(temp_dir.path().join("7.index")).unwrap();

    let log = Log::open_path(temp_dir.path()).unwrap();

    assert_eq!(log.base_offsets(), vec![0]);
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_log_truncate() {
    let (temp, log) = setup_temp_log_with_small_store();
    for _ in 0..3 {
        log.append(hello()).unwrap();
    }
    assert_eq!(log.base_offsets(), vec![0, 2]);

    log.truncate(1).unwrap();

    assert_eq!(log.base_offsets(), vec![2]);
    assert_eq!(log.lowest_offset().unwrap(), 2);
    assert!(matches!(log.read(0), Err(LogError::OffsetOutOfRange(0))));
    assert_eq!(log.read(2).unwrap().offset, 2);
    assert!(!temp.path().join("0.store").exists());
    assert!(!temp.path().join("0.index").exists());
}

#[test]
fn test_log_truncate_keeps_segment_with_retained_offsets() {
    let (_temp, log) = setup_temp_log_with_small_store();
    for _ in 0..3 {
        log.append(hello()).unwrap();
    }

    // Offset 1 is still wanted, so segment [0, 2) stays
    log.truncate(0).unwrap();

    assert_eq!(log.base_offsets(), vec![0, 2]);
    assert_eq!(log.read(1).unwrap().offset, 1);
}

#[test]
fn test_log_truncate_everything_restarts_at_next_offset() {
    let (_temp, log) = setup_temp_log_with_small_store();
    for _ in 0..4 {
        log.append(hello()).unwrap();
    }
    assert_eq!(log.base_offsets(), vec![0, 2, 4]);

    log.truncate(10).unwrap();

    assert_eq!(log.base_offsets(), vec![4]);
    assert_eq!(log.lowest_offset().unwrap(), 4);
    assert_eq!(log.append(hello()).unwrap(), 4);
}

#[test]
fn test_log_truncate_failure_keeps_log_usable() {
    let (temp, log) = setup_temp_log_with_small_store();
    for _ in 0..4 {
        log.append(hello()).unwrap();
    }
    assert_eq!(log.base_offsets(), vec![0, 2, 4]);

    // Deleting the active segment fails once its files are already gone
    fs::remove_file(temp.path().join("4.store")).unwrap();
    fs::remove_file(temp.path().join("4.index")).unwrap();

    assert!(matches!(log.truncate(10), Err(LogError::Io(_))));

    assert_eq!(log.base_offsets(), vec![4]);
    assert_eq!(log.lowest_offset().unwrap(), 4);
    assert_eq!(log.append(hello()).unwrap(), 4);
    assert_eq!(log.read(4).unwrap().offset, 4);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_log_operations_after_close() {
    let (_temp, log) = setup_temp_log();
    log.append(hello()).unwrap();

    log.close().unwrap();

    assert!(matches!(log.append(hello()), Err(LogError::Closed)));
    assert!(matches!(log.lowest_offset(), Err(LogError::Closed)));
    assert!(matches!(log.highest_offset(), Err(LogError::Closed)));
    assert!(matches!(log.truncate(0), Err(LogError::Closed)));
    assert!(matches!(log.read(0), Err(LogError::OffsetOutOfRange(0))));
    assert_eq!(log.segment_count(), 0);
}

#[test]
fn test_log_close_truncates_index_files() {
    let (temp, log) = setup_temp_log();
    log.append(hello()).unwrap();
    log.append(hello()).unwrap();

    log.close().unwrap();

    let index_len = fs::metadata(temp.path().join("0.index")).unwrap().len();
    assert_eq!(index_len, 2 * ENTRY_WIDTH);
}

#[test]
fn test_log_open_failure_closes_opened_segments() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();

    {
        let log = Log::open(config.clone()).unwrap();
        log.append(hello()).unwrap();
        log.append(hello()).unwrap();
        log.close().unwrap();
    }

    // A later segment whose store cannot be opened
    fs::write(temp_dir.path().join("9.index"), b"").unwrap();
    fs::create_dir(temp_dir.path().join("9.store")).unwrap();

    assert!(matches!(Log::open(config), Err(LogError::Io(_))));

    // Segment 0 was opened first and closed again, not left pre-grown
    let index_len = fs::metadata(temp_dir.path().join("0.index")).unwrap().len();
    assert_eq!(index_len, 2 * ENTRY_WIDTH);
}

#[test]
fn test_log_remove() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("log");
    let log = Log::open_path(&data_dir).unwrap();
    log.append(hello()).unwrap();

    log.remove().unwrap();

    assert!(!data_dir.exists());
}

#[test]
fn test_log_reset() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path().join("log"))
        .max_store_bytes(64)
        .initial_offset(7)
        .build();
    let log = Log::open(config).unwrap();
    for _ in 0..5 {
        log.append(hello()).unwrap();
    }

    log.reset().unwrap();

    assert!(log.dir().is_dir());
    assert_eq!(log.base_offsets(), vec![7]);
    assert_eq!(log.lowest_offset().unwrap(), 7);
    assert!(matches!(log.read(8), Err(LogError::OffsetOutOfRange(8))));
    assert_eq!(log.append(hello()).unwrap(), 7);
}

#[test]
fn test_log_reset_after_close() {
    let (_temp, log) = setup_temp_log();
    log.append(hello()).unwrap();
    log.close().unwrap();

    log.reset().unwrap();

    assert_eq!(log.append(hello()).unwrap(), 0);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_log_zero_thresholds_use_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(0)
        .max_index_bytes(0)
        .build();

    let log = Log::open(config).unwrap();

    assert_eq!(log.config().segment.max_store_bytes, 1024);
    assert_eq!(log.config().segment.max_index_bytes, 1024);
}

#[test]
fn test_log_index_smaller_than_entry_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_index_bytes(ENTRY_WIDTH - 1)
        .build();

    assert!(matches!(Log::open(config), Err(LogError::Config(_))));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_log_concurrent_readers_with_writer() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_store_bytes(512)
        .build();
    let log = Arc::new(Log::open(config).unwrap());

    for i in 0..100u64 {
        log.append(Record::new(i.to_be_bytes().to_vec())).unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for _ in 0..5 {
                    for i in 0..100u64 {
                        let record = log.read(i).unwrap();
                        assert_eq!(record.value, i.to_be_bytes().to_vec());
                    }
                }
            })
        })
        .collect();

    let writer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for i in 100..200u64 {
                let offset = log.append(Record::new(i.to_be_bytes().to_vec())).unwrap();
                assert_eq!(offset, i);
            }
        })
    };

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();

    assert_eq!(log.highest_offset().unwrap(), 199);
    for i in 0..200u64 {
        assert_eq!(log.read(i).unwrap().value, i.to_be_bytes().to_vec());
    }
}
