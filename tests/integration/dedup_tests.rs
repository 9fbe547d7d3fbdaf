use super::common::{FailingSource, RecordingProgress, Workspace};
use archive_dedup::archive::CleanupPolicy;
use archive_dedup::dedup::{DedupConfig, DedupError, Deduplicator, Strategy};
use archive_dedup::duplicates::DiffError;
use archive_dedup::progress::NoProgress;
use archive_dedup::scanner::FileSource;
use std::path::Path;
use std::sync::Arc;

fn config(ws: &Workspace) -> DedupConfig {
    DedupConfig::default().with_scratch_root(&ws.scratch_root)
}

#[test]
fn test_basic_run_deletes_only_identical_files() {
    let ws = Workspace::new(
        &[("a.txt", b"hello"), ("b.txt", b"world")],
        &[("a.txt", b"hello"), ("b.txt", b"WORLD"), ("c.txt", b"new")],
    );
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws));

    let report = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    assert_eq!(report.duplicates.paths(), ["a.txt"]);
    assert!(report.deleted);
    assert_eq!(report.removed_count(), 1);
    assert_eq!(report.files_examined, 2);
    assert_eq!(report.unequal, 1);
    assert_eq!(
        tool.deletions(),
        vec![(ws.target_archive.clone(), vec!["a.txt".to_string()])]
    );
    assert_eq!(ws.scratch_leftovers(), 0);
}

#[test]
fn test_empty_reference_issues_no_deletion() {
    let ws = Workspace::new(&[], &[("a.txt", b"hello")]);
    let tool = ws.tool();
    let progress = RecordingProgress::new();
    let dedup = Deduplicator::new(&tool, config(&ws));

    let report = dedup
        .run(&ws.reference_archive, &ws.target_archive, &progress)
        .unwrap();

    assert!(report.duplicates.is_empty());
    assert!(!report.deleted);
    assert_eq!(report.bytes_processed, 0);
    assert!(tool.deletions().is_empty());
    assert!(progress.events().is_empty());
}

#[test]
fn test_length_mismatch_reports_full_progress_and_keeps_file() {
    let ws = Workspace::new(
        &[("x/y.bin", &[0u8; 1000])],
        &[("x/y.bin", &[0u8; 999])],
    );
    let tool = ws.tool();
    let progress = RecordingProgress::new();
    let dedup = Deduplicator::new(&tool, config(&ws));

    let report = dedup
        .run(&ws.reference_archive, &ws.target_archive, &progress)
        .unwrap();

    assert!(report.duplicates.is_empty());
    assert_eq!(report.unequal, 1);
    assert_eq!(progress.fractions_for("x/y.bin"), vec![1.0]);
    assert!(tool.deletions().is_empty());
}

#[test]
fn test_large_file_progress_is_monotonic() {
    let content = vec![0x5au8; 10 * 1024 * 1024];
    let ws = Workspace::new(&[("big.bin", &content)], &[("big.bin", &content)]);
    let tool = ws.tool();
    let progress = RecordingProgress::new();
    let dedup = Deduplicator::new(&tool, config(&ws));

    let report = dedup
        .run(&ws.reference_archive, &ws.target_archive, &progress)
        .unwrap();
    assert_eq!(report.duplicates.paths(), ["big.bin"]);

    let events = progress.events();
    assert_eq!(events.len(), 11);
    assert!(events.iter().all(|(id, _)| id == "big.bin (1 / 1)"));
    let fractions: Vec<f64> = events.iter().map(|(_, f)| *f).collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(fractions.first(), Some(&0.0));
    assert_eq!(fractions.last(), Some(&1.0));
    assert_eq!(fractions.iter().filter(|f| **f >= 1.0).count(), 1);
}

#[test]
fn test_target_extraction_failure_cleans_up() {
    let ws = Workspace::new(&[("a.txt", b"hello")], &[("a.txt", b"hello")]);
    let tool = ws.tool().failing_extract(&ws.target_archive);
    let dedup = Deduplicator::new(&tool, config(&ws));

    let err = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap_err();

    match err {
        DedupError::ExtractionFailed { archive, .. } => assert_eq!(archive, ws.target_archive),
        other => panic!("Expected ExtractionFailed, got {other:?}"),
    }
    assert!(tool.deletions().is_empty());
    assert_eq!(ws.scratch_leftovers(), 0);
}

#[test]
fn test_missing_input_fails_before_extraction() {
    let ws = Workspace::new(&[("a.txt", b"hello")], &[("a.txt", b"hello")]);
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws));
    let missing = ws.dir.path().join("nope.rar");

    let err = dedup
        .run(&ws.reference_archive, &missing, &NoProgress)
        .unwrap_err();

    assert!(matches!(err, DedupError::InputNotFound(ref p) if p == &missing));
    assert!(tool.extractions().is_empty());
}

#[test]
fn test_dry_run_computes_set_without_deleting() {
    let ws = Workspace::new(
        &[("a.txt", b"same"), ("b.txt", b"same")],
        &[("a.txt", b"same"), ("b.txt", b"same")],
    );
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws).with_dry_run(true));

    let report = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    assert_eq!(report.duplicates.paths(), ["a.txt", "b.txt"]);
    assert!(!report.deleted);
    assert_eq!(report.removed_count(), 0);
    assert!(tool.deletions().is_empty());
}

#[test]
fn test_deletion_failure_keeps_duplicate_set() {
    let ws = Workspace::new(&[("a.txt", b"same")], &[("a.txt", b"same")]);
    let tool = ws.tool().failing_delete();
    let dedup = Deduplicator::new(&tool, config(&ws));

    let err = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap_err();

    match err {
        DedupError::ArchiveDeletionFailed { duplicates, .. } => {
            assert_eq!(duplicates.paths(), ["a.txt"]);
        }
        other => panic!("Expected ArchiveDeletionFailed, got {other:?}"),
    }
    assert_eq!(tool.deletions().len(), 1);
    assert_eq!(ws.scratch_leftovers(), 0);
}

#[test]
fn test_single_deletion_call_in_walk_order() {
    let ws = Workspace::new(
        &[("z.txt", b"1"), ("a/b.txt", b"2"), ("a.txt", b"3"), ("m.txt", b"4")],
        &[("z.txt", b"1"), ("a/b.txt", b"2"), ("a.txt", b"3"), ("m.txt", b"x")],
    );
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws));

    dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    let deletions = tool.deletions();
    assert_eq!(deletions.len(), 1);
    assert_eq!(deletions[0].1, vec!["a/b.txt", "a.txt", "z.txt"]);
}

#[test]
fn test_hash_strategy_extracts_one_archive_at_a_time() {
    let ws = Workspace::new(
        &[("a.txt", b"hello"), ("b.txt", b"world")],
        &[("a.txt", b"hello"), ("b.txt", b"WORLD")],
    );
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws).with_strategy(Strategy::Hash));

    let report = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    assert_eq!(report.strategy, Strategy::Hash);
    assert_eq!(report.duplicates.paths(), ["a.txt"]);
    let extractions = tool.extractions();
    assert_eq!(extractions.len(), 2);
    assert!(extractions.iter().all(|e| e.live_dirs == 1));
    assert_eq!(ws.scratch_leftovers(), 0);
}

#[test]
fn test_compare_strategy_holds_both_trees() {
    let ws = Workspace::new(&[("a.txt", b"hello")], &[("a.txt", b"hello")]);
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws));

    dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    let live: Vec<usize> = tool.extractions().iter().map(|e| e.live_dirs).collect();
    assert_eq!(live, vec![1, 2]);
}

#[test]
fn test_strategies_agree() {
    let reference: &[(&str, &[u8])] = &[
        ("docs/readme.md", b"# readme"),
        ("docs/changed.md", b"old"),
        ("bin/tool", &[1, 2, 3, 4]),
        ("gone.txt", b"only here"),
        ("empty", b""),
    ];
    let target: &[(&str, &[u8])] = &[
        ("docs/readme.md", b"# readme"),
        ("docs/changed.md", b"new"),
        ("bin/tool", &[1, 2, 3, 4]),
        ("empty", b""),
        ("extra.txt", b"only there"),
    ];

    let mut sets = Vec::new();
    for strategy in [Strategy::Compare, Strategy::Hash] {
        let ws = Workspace::new(reference, target);
        let tool = ws.tool();
        let dedup = Deduplicator::new(
            &tool,
            config(&ws).with_strategy(strategy).with_dry_run(true),
        );
        let report = dedup
            .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
            .unwrap();
        sets.push(report.duplicates.into_paths());
    }

    assert_eq!(sets[0], vec!["bin/tool", "docs/readme.md", "empty"]);
    assert_eq!(sets[0], sets[1]);
}

#[test]
fn test_runs_are_deterministic() {
    let ws = Workspace::new(
        &[("b.txt", b"1"), ("a.txt", b"2"), ("c/d.txt", b"3")],
        &[("b.txt", b"1"), ("a.txt", b"2"), ("c/d.txt", b"3")],
    );
    let tool = ws.tool();
    let dedup = Deduplicator::new(&tool, config(&ws).with_dry_run(true));

    let first = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();
    let second = dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    assert_eq!(first.duplicates, second.duplicates);
    assert_eq!(first.duplicates.paths(), ["a.txt", "b.txt", "c/d.txt"]);
}

#[test]
fn test_keep_policy_leaves_extracted_trees() {
    let ws = Workspace::new(&[("a.txt", b"hello")], &[("a.txt", b"hello")]);
    let tool = ws.tool();
    let dedup = Deduplicator::new(
        &tool,
        config(&ws).with_cleanup(CleanupPolicy::Keep).with_dry_run(true),
    );

    dedup
        .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
        .unwrap();

    assert_eq!(ws.scratch_leftovers(), 2);
    for extraction in tool.extractions() {
        assert!(Path::new(&extraction.dest).join("a.txt").is_file());
    }
}

#[test]
fn test_unreadable_member_skipped_or_fatal() {
    let ws = Workspace::new(
        &[("locked.bin", b"secret"), ("open.bin", b"public")],
        &[("locked.bin", b"secret"), ("open.bin", b"public")],
    );
    let source: Arc<dyn FileSource> = Arc::new(FailingSource::new(&["locked.bin"]));

    for strategy in [Strategy::Compare, Strategy::Hash] {
        let tool = ws.tool();
        let dedup = Deduplicator::new(&tool, config(&ws).with_strategy(strategy))
            .with_source(Arc::clone(&source));
        let report = dedup
            .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
            .unwrap();
        assert_eq!(report.duplicates.paths(), ["open.bin"]);
        assert_eq!(report.unreadable, 1);
        assert_eq!(tool.deletions(), [(ws.target_archive.clone(), vec!["open.bin".to_string()])]);

        let tool = ws.tool();
        let dedup = Deduplicator::new(
            &tool,
            config(&ws).with_strategy(strategy).with_fail_fast(true),
        )
        .with_source(Arc::clone(&source));
        let err = dedup
            .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
            .unwrap_err();
        assert!(matches!(
            err,
            DedupError::Diff(DiffError::IoReadFailed { ref path, .. }) if path == "locked.bin"
        ));
        assert!(tool.deletions().is_empty());
        assert_eq!(ws.scratch_leftovers(), 0);
    }
}

#[test]
fn test_target_file_shadowing_reference_directory() {
    let ws = Workspace::new(
        &[("a/b", b"nested"), ("c", b"same")],
        &[("a", b"plain file"), ("c", b"same")],
    );

    for strategy in [Strategy::Compare, Strategy::Hash] {
        let tool = ws.tool();
        let dedup = Deduplicator::new(
            &tool,
            config(&ws).with_strategy(strategy).with_fail_fast(true),
        );
        let report = dedup
            .run(&ws.reference_archive, &ws.target_archive, &NoProgress)
            .unwrap();

        assert_eq!(report.duplicates.paths(), ["c"]);
        assert_eq!(report.missing, 1);
        assert_eq!(report.unreadable, 0);
        assert_eq!(tool.deletions(), [(ws.target_archive.clone(), vec!["c".to_string()])]);
    }
}
