use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::sync::Arc;
use std::thread;
use stayfinder_client::cache::{CacheConfig, SearchCache};
use stayfinder_client::filters::{FilterState, FilterUpdate};
use stayfinder_client::models::{ListingPage, Pagination};

fn empty_page() -> ListingPage {
    ListingPage {
        listings: Vec::new(),
        pagination: Pagination {
            current_page: 1,
            total_pages: 1,
            total_listings: 0,
            has_next_page: false,
            has_prev_page: false,
        },
    }
}

// Keys are the same query-string projections the client caches under.
fn query_keys() -> Vec<String> {
    let cities = ["Austin", "Boise", "Dallas", "Miami", "Reno", "Seattle"];
    let mut keys = Vec::new();
    for city in cities {
        for guests in 1..=8u32 {
            for page in 1..=5u32 {
                let mut filters = FilterState::default();
                filters.update(FilterUpdate::City(city.to_string()));
                filters.update(FilterUpdate::Guests(guests));
                filters.set_page(page);
                keys.push(filters.to_query_string());
            }
        }
    }
    keys
}

pub fn cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_cache");

    for max_entries in [64usize, 256, 1024].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(max_entries),
            max_entries,
            |b, &max_entries| {
                b.iter(|| {
                    let cache = Arc::new(SearchCache::new(CacheConfig {
                        max_entries,
                        ..CacheConfig::default()
                    }));
                    let keys = query_keys();

                    // Concurrent readers and writers, read-heavy like a
                    // browsing session.
                    let mut handles = vec![];
                    for _ in 0..4 {
                        let cache = Arc::clone(&cache);
                        let keys = keys.clone();

                        let handle = thread::spawn(move || {
                            let mut rng = thread_rng();
                            for _ in 0..250 {
                                let key = keys.choose(&mut rng).unwrap();
                                if rng.gen_bool(0.3) {
                                    cache.store(key, empty_page(), None);
                                } else {
                                    let _ = cache.get(key);
                                }
                            }
                        });

                        handles.push(handle);
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }

                    black_box(cache.stats())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, cache_benchmark);
criterion_main!(benches);
