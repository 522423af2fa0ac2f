use litrec::{RefreshOutcome, RefreshState, Refresher, Snapshot, UnseenPolicy};
use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Writes a roster of `n` agents spread over a few genres and cities
fn write_roster(path: &Path, n: usize, city_prefix: &str) {
    let genres = ["Fantasy", "Romance", "Sci-Fi", "Horror", "Mystery"];
    let mut csv = String::from("name,agency,location,genres,website\n");
    for i in 0..n {
        csv.push_str(&format!(
            "agent_{i},Agency {a},{city_prefix} {c},\"{g1}, {g2}\",https://agent{i}.example\n",
            a = i % 7,
            c = i % 4,
            g1 = genres[i % genres.len()],
            g2 = genres[(i / 2) % genres.len()],
        ));
    }
    fs::write(path, csv).unwrap();
}

fn make_stale(source: &Path, artifact: &Path) {
    let source_time = fs::metadata(source).unwrap().modified().unwrap();
    File::options()
        .write(true)
        .open(artifact)
        .unwrap()
        .set_modified(source_time - Duration::from_secs(10))
        .unwrap();
}

#[test]
fn test_restart_reuses_fresh_artifact() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("agents.csv");
    let artifact = dir.path().join("model.bin");
    write_roster(&source, 40, "City");

    let first = Refresher::new(&source, &artifact, ',');
    let built = first.load_or_build().unwrap();
    let built_time = fs::metadata(&artifact).unwrap().modified().unwrap();

    // A new process sees a fresh artifact and just loads it
    let second = Refresher::new(&source, &artifact, ',');
    assert_eq!(second.state(), RefreshState::Fresh);
    let loaded = second.load_or_build().unwrap();

    assert_eq!(*built, *loaded);
    assert_eq!(fs::metadata(&artifact).unwrap().modified().unwrap(), built_time);
}

#[test]
fn test_readers_always_see_consistent_snapshots() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("agents.csv");
    let artifact = dir.path().join("model.bin");
    write_roster(&source, 30, "Old");

    let refresher = Refresher::new(&source, &artifact, ',');
    let handle = Arc::new(refresher.open_handle().unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let handle = Arc::clone(&handle);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let genres = vec!["Fantasy".to_string()];
                let mut reads = 0;
                while !done.load(Ordering::Relaxed) || reads == 0 {
                    let snapshot = handle.snapshot();
                    let n = snapshot.roster().len();
                    assert_eq!(snapshot.matrix().rows(), n);
                    assert_eq!(snapshot.matrix().dimension(), snapshot.encoder().dimension());

                    // Every agent's location belongs to the same generation as the roster size
                    let prefix = if n == 30 { "Old" } else { "New" };
                    let results = snapshot.recommend(&genres, &format!("{} 1", prefix), n, UnseenPolicy::Reject).unwrap();
                    assert_eq!(results.len(), n);
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    write_roster(&source, 50, "New");
    make_stale(&source, &artifact);
    assert!(refresher.refresh_into(&handle).unwrap());
    thread::sleep(Duration::from_millis(20));
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(handle.snapshot().roster().len(), 50);
}

#[test]
fn test_interrupted_rebuild_leaves_previous_model() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("agents.csv");
    let artifact = dir.path().join("model.bin");
    write_roster(&source, 10, "City");

    let refresher = Refresher::new(&source, &artifact, ',');
    let handle = refresher.open_handle().unwrap();
    let before = handle.snapshot();

    // Broken roster: a row with no location
    fs::write(&source, "name,agency,location,genres,website\nghost,Nowhere,,Fantasy,\n").unwrap();
    make_stale(&source, &artifact);

    assert!(refresher.refresh_into(&handle).is_err());
    assert_eq!(refresher.state(), RefreshState::Stale);
    assert!(Arc::ptr_eq(&before, &handle.snapshot()));
    assert_eq!(Snapshot::load(&artifact).unwrap(), *before);

    // Fixing the source lets the next refresh through
    write_roster(&source, 12, "City");
    match refresher.refresh().unwrap() {
        RefreshOutcome::Rebuilt(snapshot) => assert_eq!(snapshot.roster().len(), 12),
        RefreshOutcome::UpToDate => panic!("expected a rebuild"),
    }
}

#[test]
fn test_server_handle_follows_out_of_band_build() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("agents.csv");
    let artifact = dir.path().join("model.bin");
    write_roster(&source, 10, "City");

    let refresher = Refresher::new(&source, &artifact, ',');
    let handle = refresher.open_handle().unwrap();
    assert!(!refresher.refresh_into(&handle).unwrap());

    // A second refresher stands in for `litrec build` run elsewhere
    write_roster(&source, 15, "City");
    make_stale(&source, &artifact);
    let other = Refresher::new(&source, &artifact, ',');
    assert!(matches!(other.refresh().unwrap(), RefreshOutcome::Rebuilt(_)));
    let served_time = handle.artifact_time().unwrap();
    if fs::metadata(&artifact).unwrap().modified().unwrap() == served_time {
        File::options()
            .write(true)
            .open(&artifact)
            .unwrap()
            .set_modified(served_time + Duration::from_secs(10))
            .unwrap();
    }

    assert_eq!(refresher.served_state(&handle), RefreshState::Stale);
    assert!(refresher.refresh_into(&handle).unwrap());
    assert_eq!(handle.snapshot().roster().len(), 15);
    assert_eq!(refresher.served_state(&handle), RefreshState::Fresh);
}

#[test]
fn test_every_agent_ranks_itself_first() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("agents.csv");
    write_roster(&source, 20, "City");

    let roster = litrec::load_roster(&source, ',').unwrap();
    let snapshot = Snapshot::build(roster).unwrap();

    for agent in snapshot.roster() {
        let results = snapshot
            .recommend(&agent.genres, &agent.location, 1, UnseenPolicy::Reject)
            .unwrap();
        assert!((results[0].1 - 1.0).abs() < 1e-6, "agent {} scored {}", agent.name, results[0].1);
        // Top match is the agent itself or one with identical features
        let mut expected = agent.genres.clone();
        let mut found = results[0].0.genres.clone();
        expected.sort();
        found.sort();
        assert_eq!(found, expected);
        assert_eq!(results[0].0.location, agent.location);
    }
}
