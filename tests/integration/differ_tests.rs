use super::common::{write_tree, RecordingProgress};
use archive_dedup::duplicates::{
    diff_by_hash, hash_tree, DiffError, HashConfig, MissingReason, Outcome, PairedDiffer,
    TreeDiffer,
};
use archive_dedup::progress::NoProgress;
use archive_dedup::scanner::Tree;
use tempfile::tempdir;

#[test]
fn test_target_directory_is_not_a_file() {
    let reference = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(reference.path(), &[("docs", b"a file here")]);
    write_tree(target.path(), &[("docs/inner.txt", b"a directory there")]);

    let report = PairedDiffer::default()
        .diff(reference.path(), target.path(), &NoProgress)
        .unwrap();

    assert!(report.duplicates.is_empty());
    assert_eq!(
        report.results[0].outcome,
        Outcome::Missing(MissingReason::NotAFile)
    );
    assert_eq!(report.missing_count(), 1);
}

#[test]
fn test_target_only_files_are_ignored() {
    let reference = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(reference.path(), &[("a.txt", b"same")]);
    write_tree(
        target.path(),
        &[("a.txt", b"same"), ("new/b.txt", b"b"), ("c.txt", b"c")],
    );

    let report = PairedDiffer::default()
        .diff(reference.path(), target.path(), &NoProgress)
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.duplicates.paths(), ["a.txt"]);
}

#[test]
fn test_phase_reports_reference_file_count() {
    let reference = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(
        reference.path(),
        &[("a", b"1"), ("b/c", b"2"), ("b/d/e", b"3")],
    );
    write_tree(target.path(), &[]);
    let progress = RecordingProgress::new();

    let report = PairedDiffer::default()
        .diff(reference.path(), target.path(), &progress)
        .unwrap();

    assert_eq!(report.missing_count(), 3);
    assert_eq!(
        progress.phases.lock().unwrap().clone(),
        vec![("compare".to_string(), 3)]
    );
}

#[test]
fn test_missing_reference_root_is_walk_error() {
    let target = tempdir().unwrap();
    let err = PairedDiffer::default()
        .diff(&target.path().join("absent"), target.path(), &NoProgress)
        .unwrap_err();
    assert!(matches!(
        err,
        DiffError::Walk {
            tree: Tree::Reference,
            ..
        }
    ));
}

#[test]
fn test_hash_tree_progress_covers_whole_tree() {
    let root = tempdir().unwrap();
    write_tree(
        root.path(),
        &[("a.bin", &[1u8; 100]), ("b.bin", &[2u8; 300])],
    );
    let progress = RecordingProgress::new();

    let map = hash_tree(
        root.path(),
        Tree::Reference,
        &HashConfig::default().with_chunk_size(50),
        &progress,
    )
    .unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.bytes_hashed(), 400);
    let fractions = progress.fractions_for("Hashing reference tree");
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.last(), Some(&1.0));
    assert_eq!(fractions.iter().filter(|f| **f >= 1.0).count(), 1);
}

#[test]
fn test_diff_by_hash_matches_paired_differ() {
    let reference = tempdir().unwrap();
    let target = tempdir().unwrap();
    write_tree(
        reference.path(),
        &[("same", b"x"), ("diff", b"y"), ("only-ref", b"z")],
    );
    write_tree(
        target.path(),
        &[("same", b"x"), ("diff", b"Y"), ("only-target", b"z")],
    );
    let config = HashConfig::default();

    let ref_map = hash_tree(reference.path(), Tree::Reference, &config, &NoProgress).unwrap();
    let target_map = hash_tree(target.path(), Tree::Target, &config, &NoProgress).unwrap();
    let hashed = diff_by_hash(&ref_map, &target_map);
    let paired = PairedDiffer::default()
        .diff(reference.path(), target.path(), &NoProgress)
        .unwrap();

    assert_eq!(hashed.duplicates, paired.duplicates);
    assert_eq!(hashed.duplicates.paths(), ["same"]);
    let outcomes: Vec<_> = hashed.results.iter().map(|r| r.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        vec![
            Outcome::Unequal,
            Outcome::Missing(MissingReason::NotInTarget),
            Outcome::Equal,
        ]
    );
}
