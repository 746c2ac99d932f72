use quickcheck::{quickcheck, TestResult};
use random_image_api::selector::{content_type_for, ALLOWED_EXTENSIONS};
use random_image_api::stats::StatsStore;
use tempfile::TempDir;

/// For any sequence of recorded serves, the total equals the sequence
/// length and the per-image counts sum to the same value.
#[test]
fn prop_total_equals_sum_of_counts() {
    fn property(serves: Vec<u8>) -> TestResult {
        if serves.len() > 200 {
            return TestResult::discard();
        }

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(_) => return TestResult::discard(),
        };

        runtime.block_on(async {
            let temp_dir = match TempDir::new() {
                Ok(dir) => dir,
                Err(_) => return TestResult::discard(),
            };
            let store = StatsStore::new(temp_dir.path().join("data.json"));
            store.load().await;

            // Map arbitrary bytes onto a small pool of image names so
            // collisions exercise the per-image accumulation
            for serve in &serves {
                let name = format!("img-{}.png", serve % 7);
                store.record(&name).await;
            }

            let snapshot = store.snapshot().await;
            if snapshot.total_requests != serves.len() as u64 {
                return TestResult::error(format!(
                    "total_requests {} != serves {}",
                    snapshot.total_requests,
                    serves.len()
                ));
            }

            let sum: u64 = snapshot.image_counts.values().sum();
            if sum != serves.len() as u64 {
                return TestResult::error(format!("count sum {} != serves {}", sum, serves.len()));
            }

            TestResult::passed()
        })
    }

    quickcheck(property as fn(Vec<u8>) -> TestResult);
}

/// Round-tripping any reachable stats state through the persisted format is
/// lossless.
#[test]
fn prop_persist_round_trip_is_lossless() {
    fn property(serves: Vec<u8>) -> TestResult {
        if serves.len() > 100 {
            return TestResult::discard();
        }

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(_) => return TestResult::discard(),
        };

        runtime.block_on(async {
            let temp_dir = match TempDir::new() {
                Ok(dir) => dir,
                Err(_) => return TestResult::discard(),
            };
            let store = StatsStore::new(temp_dir.path().join("data.json"));
            store.load().await;
            for serve in &serves {
                store.record(&format!("img-{}.jpeg", serve % 5)).await;
            }
            if store.persist().await.is_err() {
                return TestResult::discard();
            }
            let before = store.snapshot().await;

            let reloaded = StatsStore::new(store.data_file().to_path_buf());
            reloaded.load().await;
            let after = reloaded.snapshot().await;

            if before != after {
                return TestResult::error("reloaded stats differ from persisted stats");
            }
            TestResult::passed()
        })
    }

    quickcheck(property as fn(Vec<u8>) -> TestResult);
}

/// The content-type mapping is total: every allow-listed extension maps to
/// an image type, every other name falls back to the generic binary type.
#[test]
fn prop_content_type_mapping_is_total() {
    fn property(stem: String) -> TestResult {
        // Names containing an allowed extension mid-string would legitimately
        // match the suffix rule once the extension is appended, so only the
        // fallback check needs a clean stem.
        for ext in ALLOWED_EXTENSIONS {
            let name = format!("{}{}", stem, ext);
            let content_type = content_type_for(&name);
            if !content_type.starts_with("image/") {
                return TestResult::error(format!("{} mapped to {}", name, content_type));
            }
        }

        if ALLOWED_EXTENSIONS.iter().any(|ext| stem.ends_with(ext)) {
            return TestResult::discard();
        }
        if content_type_for(&stem) != "application/octet-stream" {
            return TestResult::error(format!("{} did not fall back", stem));
        }

        TestResult::passed()
    }

    quickcheck(property as fn(String) -> TestResult);
}
