use std::path::Path;

use tod_analyzer::{config::load_config_path, resolution::Resolution};

#[test]
fn shipped_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/tod_analyzer.toml");
    let cfg = load_config_path(&path).unwrap();
    assert!(cfg.universe.instruments.len() > 90);
    assert_eq!(cfg.universe.instruments.first().map(|(t, _)| t.as_str()), Some("PLS.AX"));
    assert_eq!(cfg.universe.instruments["BHP.AX"], "BHP Billiton");
    let lookback = |res: Resolution| {
        cfg.fetch
            .resolutions
            .iter()
            .find(|r| r.interval == res)
            .map(|r| r.lookback_days)
    };
    assert_eq!(lookback(Resolution::OneMinute), Some(7));
    assert_eq!(lookback(Resolution::SixtyMinute), Some(730));
    let session = cfg.session().unwrap();
    assert_eq!(cfg.window_set(&session).len(), 21);
    let buckets = cfg.day_buckets(&session);
    assert_eq!(buckets.morning, vec![10, 11]);
    assert_eq!(buckets.afternoon, vec![12, 13]);
}
