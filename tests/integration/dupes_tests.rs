use super::common::{checkerboard, landscape, save, stripes, MoveWatchDecoder, StagedDecoder};
use image::RgbImage;
use picsift::cache::HashCache;
use picsift::config::CACHE_FILE_NAME;
use picsift::duplicates::{DuplicateFinder, FinderConfig};
use picsift::logging::RunLog;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

fn open(workdir: &std::path::Path) -> (HashCache, RunLog) {
    let cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    let log = RunLog::open(workdir).unwrap();
    (cache, log)
}

#[test]
fn test_identical_images_move_second_copy() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let img = landscape(96, 64);
    save(&img, &workdir.join("a.png"));
    save(&img, &workdir.join("b.png"));

    let (mut cache, mut log) = open(workdir);
    let finder = DuplicateFinder::new(FinderConfig::default().with_jobs(2));
    let summary = finder.run(workdir, &mut cache, &mut log).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.hashed, 2);
    assert_eq!(summary.groups.len(), 1);
    assert_eq!(summary.groups[0].members, vec!["a.png", "b.png"]);
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.move_errors, 0);

    // Equal sharpness keeps the seed.
    assert!(workdir.join("a.png").exists());
    assert!(!workdir.join("b.png").exists());
    assert!(workdir.join("duplicates").join("b.png").exists());

    let kept = cache.get("a.png").unwrap().unwrap();
    let moved = cache.get("duplicates/b.png").unwrap().unwrap();
    assert_eq!(kept.fingerprint, moved.fingerprint);
    assert!(cache.get("b.png").unwrap().is_none());

    drop(log);
    let journal = std::fs::read_to_string(workdir.join("picsift.log")).unwrap();
    assert!(journal.contains("Starting duplicate scan. threshold=6"));
    assert!(journal.contains("Hashing 2 files (workers=2)"));
    assert!(journal.contains("MOVED: b.png -> duplicates/b.png (kept: a.png)"));
    assert!(journal.contains("Scan complete. groups=1, moved=1"));
}

#[test]
fn test_second_run_ignores_moved_files() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let img = landscape(96, 64);
    save(&img, &workdir.join("a.png"));
    save(&img, &workdir.join("b.png"));

    let (mut cache, mut log) = open(workdir);
    let finder = DuplicateFinder::new(FinderConfig::default());
    finder.run(workdir, &mut cache, &mut log).unwrap();

    let summary = finder.run(workdir, &mut cache, &mut log).unwrap();
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.cache_hits, 1);
    assert_eq!(summary.hashed, 0);
    assert!(summary.groups.is_empty());
    assert_eq!(summary.moved, 0);

    drop(log);
    let journal = std::fs::read_to_string(workdir.join("picsift.log")).unwrap();
    assert!(journal.contains("No files needed hashing (cache up-to-date)."));
}

#[test]
fn test_sharpest_member_is_kept() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    for name in ["a.png", "b.png", "c.png"] {
        std::fs::write(workdir.join(name), b"placeholder").unwrap();
    }

    let mut later = HashMap::new();
    later.insert("a.png".to_string(), RgbImage::new(32, 32));
    later.insert("b.png".to_string(), checkerboard(32, 32, 2));
    later.insert("c.png".to_string(), checkerboard(32, 32, 8));
    let decoder = Arc::new(StagedDecoder::new(landscape(64, 64), later));

    let (mut cache, mut log) = open(workdir);
    let finder = DuplicateFinder::new(FinderConfig::default().with_jobs(1)).with_decoder(decoder);
    let summary = finder.run(workdir, &mut cache, &mut log).unwrap();

    assert_eq!(summary.groups.len(), 1);
    assert_eq!(summary.moved, 2);
    assert!(workdir.join("b.png").exists());
    assert!(workdir.join("duplicates").join("a.png").exists());
    assert!(workdir.join("duplicates").join("c.png").exists());
}

#[test]
fn test_unreadable_file_is_recorded_not_grouped() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    std::fs::write(workdir.join("broken.jpg"), b"not an image at all").unwrap();
    save(&landscape(64, 64), &workdir.join("ok.png"));

    let (mut cache, mut log) = open(workdir);
    let summary = DuplicateFinder::new(FinderConfig::default())
        .run(workdir, &mut cache, &mut log)
        .unwrap();

    assert_eq!(summary.unreadable, 1);
    assert!(summary.groups.is_empty());
    let record = cache.get("broken.jpg").unwrap().unwrap();
    assert!(record.fingerprint.is_none());
    assert_eq!(record.method.as_str(), "fail");

    drop(log);
    let journal = std::fs::read_to_string(workdir.join("picsift.log")).unwrap();
    assert!(journal.contains("UNREADABLE: broken.jpg"));
    assert!(journal.contains("READ: ok.png via extension"));
}

#[test]
fn test_nested_duplicates_land_beside_their_source() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let img = landscape(96, 64);
    save(&img, &workdir.join("a.png"));
    save(&img, &workdir.join("trip").join("b.png"));

    let (mut cache, mut log) = open(workdir);
    let summary = DuplicateFinder::new(FinderConfig::default().with_max_depth(2))
        .run(workdir, &mut cache, &mut log)
        .unwrap();

    assert_eq!(summary.moved, 1);
    assert!(workdir.join("trip").join("duplicates").join("b.png").exists());
    assert!(cache.get("trip/duplicates/b.png").unwrap().is_some());
}

#[test]
fn test_flat_layout_uses_root_duplicates_folder() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let img = landscape(96, 64);
    save(&img, &workdir.join("a.png"));
    save(&img, &workdir.join("b.png"));
    save(&img, &workdir.join("deep").join("c.png"));

    let (mut cache, mut log) = open(workdir);
    let summary = DuplicateFinder::new(FinderConfig::default().with_max_depth(0))
        .run(workdir, &mut cache, &mut log)
        .unwrap();

    // Depth 0 never sees the subfolder.
    assert_eq!(summary.total_files, 2);
    assert!(workdir.join("duplicates").join("b.png").exists());
    assert!(workdir.join("deep").join("c.png").exists());
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let (mut cache, mut log) = open(dir.path());
    let summary = DuplicateFinder::new(FinderConfig::default())
        .run(dir.path(), &mut cache, &mut log)
        .unwrap();

    assert_eq!(summary.total_files, 0);
    assert!(summary.groups.is_empty());

    drop(log);
    let journal = std::fs::read_to_string(dir.path().join("picsift.log")).unwrap();
    assert!(journal.contains("No image entries found after scanning."));
}

#[test]
fn test_every_group_ranked_before_any_move() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let fixtures = [
        ("a", landscape(96, 64), 2),
        ("b", checkerboard(96, 64, 16), 3),
        ("c", stripes(96, 64, 12), 2),
    ];
    for (prefix, img, copies) in &fixtures {
        for n in 1..=*copies {
            save(img, &workdir.join(format!("{prefix}{n}.png")));
        }
    }

    let decoder = Arc::new(MoveWatchDecoder::new(workdir.join("duplicates")));
    let (mut cache, mut log) = open(workdir);
    let summary = DuplicateFinder::new(FinderConfig::default().with_threshold(0).with_jobs(2))
        .with_decoder(decoder.clone())
        .run(workdir, &mut cache, &mut log)
        .unwrap();

    assert_eq!(summary.groups.len(), 3);
    assert_eq!(summary.moved, 4);
    assert_eq!(decoder.late_decodes(), 0, "no decode may follow a move");

    for keeper in ["a1.png", "b1.png", "c1.png"] {
        assert!(workdir.join(keeper).exists(), "{keeper} should stay");
    }
    for moved in ["a2.png", "b2.png", "b3.png", "c2.png"] {
        assert!(!workdir.join(moved).exists());
        assert!(workdir.join("duplicates").join(moved).exists(), "{moved} should be moved");
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_normalization_twins_keep_first_and_journal_second() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let nfc = workdir.join("caf\u{e9}.png");
    let nfd = workdir.join("cafe\u{301}.png");
    save(&landscape(64, 64), &nfc);
    save(&checkerboard(64, 64, 8), &nfd);

    let (mut cache, mut log) = open(workdir);
    let summary = DuplicateFinder::new(FinderConfig::default())
        .run(workdir, &mut cache, &mut log)
        .unwrap();

    assert_eq!(summary.key_collisions, 1);
    assert_eq!(summary.total_files, 1);
    assert_eq!(cache.len().unwrap(), 1);
    assert!(nfc.exists());
    assert!(nfd.exists());

    drop(log);
    let journal = std::fs::read_to_string(workdir.join("picsift.log")).unwrap();
    assert!(journal.contains("SKIPPED:"));
}
