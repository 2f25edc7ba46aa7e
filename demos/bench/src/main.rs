//! Illustrative stress-test harness mirroring the original SDK's
//! `examples/benchmark/main.go`: loads a datafile, builds a snapshot, and
//! repeatedly runs a feature decision for one user. Not a supported tool --
//! there is no CPU/mem profiling integration here, just the hot-path loop.

use std::{
    env,
    fs,
    path::Path,
    sync::Arc,
    time::Instant,
};

use optimizely_sdk::{
    parse_datafile,
    types::{
        Options,
        UserContext,
    },
    CompositeFeatureService,
    ForcedVariationService,
};

const RUN_NUMBER: u32 = 50;

fn load_datafile() -> Vec<u8> {
    let dir = env::var("DATAFILES_DIR").unwrap_or_default();
    let path = Path::new(&dir).join("100_entities.json");
    match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "falling back to an embedded sample datafile");
            sample_datafile()
        },
    }
}

fn sample_datafile() -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "version": "4",
        "revision": "1",
        "accountId": "acct",
        "projectId": "proj",
        "experiments": [],
        "featureFlags": [{
            "id": "feat5",
            "key": "feature_5",
            "rolloutId": "",
            "experimentIds": [],
            "variables": []
        }],
        "audiences": [],
        "groups": [],
        "rollouts": [],
        "attributes": [{"id": "attr5", "key": "attr_5"}],
        "events": []
    }))
    .expect("embedded sample datafile is valid JSON")
}

fn main() {
    tracing_subscriber::fmt::init();

    let bytes = load_datafile();
    let config = match parse_datafile(&bytes) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "datafile failed to parse; aborting stress test");
            return;
        },
    };

    let user = UserContext::new("test_user_1").with_attribute("attr_5", "testvalue");
    let feature_service = CompositeFeatureService::new(Arc::new(ForcedVariationService::new()));
    let Some(feature) = config.feature("feature_5") else {
        tracing::error!("datafile has no \"feature_5\" flag; aborting stress test");
        return;
    };

    let started = Instant::now();
    for _ in 0..RUN_NUMBER {
        let mut reasons = optimizely_sdk::types::DecisionReasons::new(&Options::default());
        let decision = feature_service.decide(&config, feature, &user, &Options::default(), &mut reasons);
        std::hint::black_box(decision);
    }
    tracing::info!(runs = RUN_NUMBER, elapsed = ?started.elapsed(), "stress test complete");
}
