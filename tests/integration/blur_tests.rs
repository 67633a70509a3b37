use super::common::{checkerboard, flat, landscape, save, sharp_top_band};
use picsift::blur::{
    assess, BlurDetector, BlurThresholds, BlurVerdict, DetectorConfig, Severity, SharpnessAssessment,
    SharpnessParams,
};
use picsift::cache::{HashCache, ImageRecord};
use picsift::config::CACHE_FILE_NAME;
use picsift::logging::RunLog;
use picsift::scanner::{FileEntry, ReadMethod};
use tempfile::tempdir;

#[test]
fn test_flat_image_moves_to_blurry() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&flat(64, 64), &workdir.join("soft.png"));
    save(&checkerboard(64, 64, 4), &workdir.join("crisp.png"));

    let mut log = RunLog::open(workdir).unwrap();
    let summary = BlurDetector::new(DetectorConfig::default().with_jobs(2))
        .run(workdir, None, &mut log)
        .unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.flagged, vec![("soft.png".to_string(), BlurVerdict::Blurry)]);
    assert!(workdir.join("blurry").join("soft.png").exists());
    assert!(workdir.join("crisp.png").exists());

    drop(log);
    let journal = std::fs::read_to_string(workdir.join("picsift.log")).unwrap();
    assert!(journal.contains("split_image=false"));
    assert!(journal.contains("MOVED blurry file: soft.png -> blurry/soft.png"));
    assert!(journal.contains("Blur scan complete. scanned=2, flagged=1, moved=1"));
}

#[test]
fn test_split_mode_sorts_by_severity() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&sharp_top_band(90, 90), &workdir.join("band.png"));
    save(&flat(90, 90), &workdir.join("fog.png"));
    save(&checkerboard(90, 90, 3), &workdir.join("crisp.png"));

    let mut log = RunLog::open(workdir).unwrap();
    let summary = BlurDetector::new(DetectorConfig::default().with_split_image(true))
        .run(workdir, None, &mut log)
        .unwrap();

    assert_eq!(summary.moved, 2);
    assert_eq!(summary.count_at(Severity::Mostly), 1);
    assert_eq!(summary.count_at(Severity::Completely), 1);
    assert_eq!(summary.count_at(Severity::Partially), 0);
    assert!(workdir
        .join("blurry")
        .join("mostly_blurry")
        .join("band.png")
        .exists());
    assert!(workdir
        .join("blurry")
        .join("completely_blurry")
        .join("fog.png")
        .exists());
    assert!(workdir.join("crisp.png").exists());
}

#[test]
fn test_blurry_files_collect_at_root_from_subfolders() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&flat(32, 32), &workdir.join("a").join("x.png"));
    save(&flat(32, 32), &workdir.join("b").join("x.png"));

    let mut log = RunLog::open(workdir).unwrap();
    let summary = BlurDetector::new(DetectorConfig::default())
        .run(workdir, None, &mut log)
        .unwrap();

    assert_eq!(summary.moved, 2);
    assert!(workdir.join("blurry").join("x.png").exists());
    assert!(workdir.join("blurry").join("x_1.png").exists());
}

#[test]
fn test_lowered_thresholds_keep_soft_images() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&landscape(64, 64), &workdir.join("scene.png"));

    let mut log = RunLog::open(workdir).unwrap();
    let config = DetectorConfig::default().with_thresholds(BlurThresholds {
        laplacian: 0.0,
        tenengrad: 0.0,
    });
    let summary = BlurDetector::new(config).run(workdir, None, &mut log).unwrap();

    // Nothing scores strictly below zero.
    assert_eq!(summary.moved, 0);
    assert!(workdir.join("scene.png").exists());
}

#[test]
fn test_unreadable_file_is_logged_and_left_alone() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    std::fs::write(workdir.join("junk.jpg"), b"definitely not jpeg").unwrap();

    let mut log = RunLog::open(workdir).unwrap();
    let summary = BlurDetector::new(DetectorConfig::default())
        .run(workdir, None, &mut log)
        .unwrap();

    assert_eq!(summary.unreadable, 1);
    assert_eq!(summary.moved, 0);
    assert!(workdir.join("junk.jpg").exists());

    drop(log);
    let journal = std::fs::read_to_string(workdir.join("picsift.log")).unwrap();
    assert!(journal.contains("UNREADABLE: junk.jpg"));
}

#[test]
fn test_existing_cache_row_follows_blurry_file() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let path = workdir.join("soft.png");
    save(&flat(48, 48), &path);

    let mut cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    let meta = std::fs::metadata(&path).unwrap();
    let entry = FileEntry::new(
        path.clone(),
        "soft.png".to_string(),
        meta.len(),
        picsift::scanner::mtime_seconds(&meta),
    );
    cache
        .upsert(&[ImageRecord::hashed(
            &entry,
            "00ff00ff00ff00ff".to_string(),
            ReadMethod::Extension,
        )])
        .unwrap();

    let mut log = RunLog::open(workdir).unwrap();
    BlurDetector::new(DetectorConfig::default())
        .run(workdir, Some(&mut cache), &mut log)
        .unwrap();

    assert!(cache.get("soft.png").unwrap().is_none());
    let moved = cache.get("blurry/soft.png").unwrap().unwrap();
    assert_eq!(moved.fingerprint.as_deref(), Some("00ff00ff00ff00ff"));
}

fn run_with(workdir: &std::path::Path, thresholds: BlurThresholds, split: bool) -> usize {
    let mut log = RunLog::open(workdir).unwrap();
    BlurDetector::new(
        DetectorConfig::default()
            .with_thresholds(thresholds)
            .with_split_image(split),
    )
    .run(workdir, None, &mut log)
    .unwrap()
    .moved
}

#[test]
fn test_whole_image_needs_both_scores_below_threshold() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let img = landscape(64, 64);
    save(&img, &workdir.join("scene.png"));

    let SharpnessAssessment::Whole(score) = assess(&img, &SharpnessParams::default(), false) else {
        panic!("expected a whole-image score");
    };
    let (lap, ten) = (score.laplacian_variance, score.tenengrad);

    // Only the Laplacian variance is below its threshold.
    let only_lap = BlurThresholds {
        laplacian: lap + 1.0,
        tenengrad: ten,
    };
    assert_eq!(run_with(workdir, only_lap, false), 0);
    assert!(workdir.join("scene.png").exists());

    // Only the Tenengrad score is below its threshold.
    let only_ten = BlurThresholds {
        laplacian: lap,
        tenengrad: ten + 1.0,
    };
    assert_eq!(run_with(workdir, only_ten, false), 0);
    assert!(workdir.join("scene.png").exists());

    let both = BlurThresholds {
        laplacian: lap + 1.0,
        tenengrad: ten + 1.0,
    };
    assert_eq!(run_with(workdir, both, false), 1);
    assert!(workdir.join("blurry").join("scene.png").exists());
}

#[test]
fn test_tiles_need_both_scores_below_threshold() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let img = landscape(90, 90);
    save(&img, &workdir.join("scene.png"));

    let SharpnessAssessment::Tiled(tiles) = assess(&img, &SharpnessParams::default(), true) else {
        panic!("expected tile scores");
    };
    let max_lap = tiles.iter().map(|t| t.laplacian_variance).fold(f64::MIN, f64::max);
    let min_lap = tiles.iter().map(|t| t.laplacian_variance).fold(f64::MAX, f64::min);
    let max_ten = tiles.iter().map(|t| t.tenengrad).fold(f64::MIN, f64::max);
    let min_ten = tiles.iter().map(|t| t.tenengrad).fold(f64::MAX, f64::min);

    // Every tile passes the Laplacian test and none passes the Tenengrad test.
    let only_lap = BlurThresholds {
        laplacian: max_lap + 1.0,
        tenengrad: min_ten,
    };
    assert_eq!(run_with(workdir, only_lap, true), 0);
    assert!(workdir.join("scene.png").exists());

    let only_ten = BlurThresholds {
        laplacian: min_lap,
        tenengrad: max_ten + 1.0,
    };
    assert_eq!(run_with(workdir, only_ten, true), 0);
    assert!(workdir.join("scene.png").exists());

    let both = BlurThresholds {
        laplacian: max_lap + 1.0,
        tenengrad: max_ten + 1.0,
    };
    assert_eq!(run_with(workdir, both, true), 1);
    assert!(workdir
        .join("blurry")
        .join("completely_blurry")
        .join("scene.png")
        .exists());
}
