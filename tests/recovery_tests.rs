//! Tests for Index Verification
//!
//! These tests verify:
//! - Verification of a clean index
//! - Detection of a torn tail
//! - Verification never modifies the file

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use needlemap::index::{IndexRecord, IndexRecovery, RecoveryResult};
use tempfile::TempDir;

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("test.idx");
    (temp_dir, index_path)
}

fn write_raw(path: &PathBuf, records: &[IndexRecord], tail: &[u8]) {
    let mut file = File::create(path).unwrap();
    for record in records {
        file.write_all(&record.encode()).unwrap();
    }
    file.write_all(tail).unwrap();
    file.sync_all().unwrap();
}

#[test]
fn test_verify_empty_file() {
    let (_temp, index_path) = setup_temp_index();
    File::create(&index_path).unwrap();

    let result = IndexRecovery::verify(&index_path).unwrap();
    assert_eq!(result, RecoveryResult::default());
}

#[test]
fn test_verify_clean_index() {
    let (_temp, index_path) = setup_temp_index();
    write_raw(
        &index_path,
        &[
            IndexRecord::new(1, 1, 10),
            IndexRecord::new(8, 2, 20),
            IndexRecord::tombstone(1),
        ],
        &[],
    );

    let result = IndexRecovery::verify(&index_path).unwrap();

    assert_eq!(result.records, 3);
    assert_eq!(result.live_records, 2);
    assert_eq!(result.tombstones, 1);
    assert_eq!(result.max_key, 8);
    assert_eq!(result.trailing_bytes, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_verify_detects_torn_tail() {
    let (_temp, index_path) = setup_temp_index();
    write_raw(&index_path, &[IndexRecord::new(1, 1, 10)], &[0xEE; 6]);

    let result = IndexRecovery::verify(&index_path).unwrap();

    assert_eq!(result.records, 1);
    assert_eq!(result.trailing_bytes, 6);
    assert!(result.was_truncated);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, index_path) = setup_temp_index();
    write_raw(&index_path, &[IndexRecord::new(1, 1, 10)], &[1, 2, 3]);
    let before = fs::read(&index_path).unwrap();

    IndexRecovery::verify(&index_path).unwrap();

    assert_eq!(fs::read(&index_path).unwrap(), before);
}

#[test]
fn test_verify_in_memory_source() {
    let data: Vec<u8> = (0..10u64)
        .flat_map(|k| IndexRecord::new(k, (k % 2) as u32, 1).encode())
        .collect();

    let result = IndexRecovery::verify_source(&data, 4).unwrap();

    assert_eq!(result.records, 10);
    assert_eq!(result.tombstones, 5);
    assert_eq!(result.max_key, 9);
}

#[test]
fn test_verify_missing_file_fails() {
    let (_temp, index_path) = setup_temp_index();
    assert!(IndexRecovery::verify(&index_path).is_err());
}
