use std::collections::HashMap;
use std::num::NonZeroUsize;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use quillpress::application::thumbnails::{
    THUMBNAIL_CACHE_HIT, THUMBNAIL_CACHE_MISS, ThumbnailResolver,
};

#[test]
fn thumbnail_resolution_counts_hits_and_misses() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let resolver = ThumbnailResolver::new(
        "https://cdn.example.com/storage/",
        "post_thumbnail",
        NonZeroUsize::new(1).expect("non-zero"),
    );

    assert_eq!(
        resolver.resolve(Some("2026/01/a.png")).as_deref(),
        Some("https://cdn.example.com/storage/post_thumbnail/2026/01/a.png")
    );
    resolver.resolve(Some("2026/01/a.png"));
    // Capacity one: resolving `b` evicts `a`.
    resolver.resolve(Some("2026/01/b.png"));
    resolver.resolve(Some("2026/01/a.png"));
    // Unusable keys never touch the cache.
    assert_eq!(resolver.resolve(Some("../etc/passwd")), None);
    assert_eq!(resolver.resolve(None), None);

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    assert_eq!(counters.get(THUMBNAIL_CACHE_HIT), Some(&1));
    assert_eq!(counters.get(THUMBNAIL_CACHE_MISS), Some(&3));
    assert_eq!(resolver.cached_len(), 1);
}
