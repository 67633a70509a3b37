use super::common::{landscape, save, CountingDecoder};
use filetime::{set_file_mtime, FileTime};
use picsift::cache::HashCache;
use picsift::config::CACHE_FILE_NAME;
use picsift::duplicates::{DuplicateFinder, FinderConfig};
use picsift::logging::RunLog;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_cache_initial_scan_and_rescan() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&landscape(64, 48), &workdir.join("only.png"));

    let decoder = Arc::new(CountingDecoder::default());
    let finder = DuplicateFinder::new(FinderConfig::default()).with_decoder(decoder.clone());
    let mut cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    let mut log = RunLog::open(workdir).unwrap();

    let first = finder.run(workdir, &mut cache, &mut log).unwrap();
    assert_eq!(first.cache_hits, 0);
    assert_eq!(first.hashed, 1);
    assert_eq!(decoder.calls(), 1);

    let second = finder.run(workdir, &mut cache, &mut log).unwrap();
    assert_eq!(second.cache_hits, 1);
    assert_eq!(second.hashed, 0);
    assert_eq!(decoder.calls(), 1, "fresh files must not be decoded again");
}

#[test]
fn test_cache_invalidation_on_mtime_change() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let path = workdir.join("only.png");
    save(&landscape(64, 48), &path);

    let decoder = Arc::new(CountingDecoder::default());
    let finder = DuplicateFinder::new(FinderConfig::default()).with_decoder(decoder.clone());
    let mut cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    let mut log = RunLog::open(workdir).unwrap();
    finder.run(workdir, &mut cache, &mut log).unwrap();

    set_file_mtime(&path, FileTime::from_unix_time(1_500_000_000, 0)).unwrap();
    let summary = finder.run(workdir, &mut cache, &mut log).unwrap();

    assert_eq!(summary.hashed, 1);
    assert_eq!(decoder.calls(), 2);
    let record = cache.get("only.png").unwrap().unwrap();
    assert!((record.mtime - 1_500_000_000.0).abs() < 1e-6);
}

#[test]
fn test_cache_invalidation_on_size_change() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    let path = workdir.join("only.png");
    save(&landscape(64, 48), &path);
    let original_mtime = FileTime::from_last_modification_time(&std::fs::metadata(&path).unwrap());

    let finder = DuplicateFinder::new(FinderConfig::default());
    let mut cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    let mut log = RunLog::open(workdir).unwrap();
    finder.run(workdir, &mut cache, &mut log).unwrap();

    // Same mtime, different content length.
    save(&landscape(128, 96), &path);
    set_file_mtime(&path, original_mtime).unwrap();

    let summary = finder.run(workdir, &mut cache, &mut log).unwrap();
    assert_eq!(summary.hashed, 1);
    assert_eq!(summary.cache_hits, 0);
}

#[test]
fn test_force_rescan_rehashes_everything() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&landscape(64, 48), &workdir.join("only.png"));

    let decoder = Arc::new(CountingDecoder::default());
    let mut cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    let mut log = RunLog::open(workdir).unwrap();

    DuplicateFinder::new(FinderConfig::default())
        .with_decoder(decoder.clone())
        .run(workdir, &mut cache, &mut log)
        .unwrap();
    let summary = DuplicateFinder::new(FinderConfig::default().with_force_rescan(true))
        .with_decoder(decoder.clone())
        .run(workdir, &mut cache, &mut log)
        .unwrap();

    assert_eq!(summary.cache_hits, 0);
    assert_eq!(summary.hashed, 1);
    assert_eq!(decoder.calls(), 2);
}

#[test]
fn test_cache_survives_reopen() {
    let dir = tempdir().unwrap();
    let workdir = dir.path();
    save(&landscape(64, 48), &workdir.join("only.png"));

    {
        let mut cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
        let mut log = RunLog::open(workdir).unwrap();
        DuplicateFinder::new(FinderConfig::default())
            .run(workdir, &mut cache, &mut log)
            .unwrap();
    }

    let cache = HashCache::open(&workdir.join(CACHE_FILE_NAME)).unwrap();
    assert_eq!(cache.len().unwrap(), 1);
    let record = cache.get("only.png").unwrap().unwrap();
    assert_eq!(record.fingerprint.map(|f| f.len()), Some(16));
}
