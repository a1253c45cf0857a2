use std::fs;

use sorter_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_previous_artifact() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("output"));

    let first = writer
        .write("predictions.csv", b"productName,class\nboots,shoes\n")
        .unwrap();
    assert_eq!(first.file_name().unwrap(), "predictions.csv");
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        "productName,class\nboots,shoes\n"
    );

    let second = writer.write("predictions.csv", b"productName,class\n").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "productName,class\n");
    assert_eq!(fs::read_dir(writer.dir()).unwrap().count(), 1);
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("predictions.csv", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("predictions.csv").exists());
}

#[test]
fn rejects_file_names_with_separators() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    assert!(matches!(
        writer.write("../escape.csv", b"x"),
        Err(PersistError::InvalidFileName(_))
    ));
}
