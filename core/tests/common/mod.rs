//! Common test utilities and helpers for integration tests

use copairs_common::JobConfig;
use copairs_core::types::{ItemId, Score, UserId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type RatingRow = (UserId, ItemId, Score);

/// Create a test configuration with a fixed shape and a small thread pool
pub fn test_config(map_tasks: usize, reducers: u32) -> JobConfig {
    JobConfig {
        app_name: "copairs-test".to_string(),
        num_map_tasks: map_tasks,
        num_reducers: reducers,
        num_threads: Some(2),
        ..Default::default()
    }
}

/// Render ratings as input lines joined by `separator`
pub fn rating_lines(rows: &[RatingRow], separator: &str) -> Vec<String> {
    rows.iter()
        .map(|(user, item, score)| format!("{user}{separator}{item}{separator}{score}"))
        .collect()
}

/// Deterministic pseudo-random ratings, grouped by user
pub fn synthetic_ratings(users: u64, items: u64, per_user: usize, seed: u64) -> Vec<RatingRow> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state >> 33
    };
    let mut rows = Vec::new();
    for user in 1..=users {
        for _ in 0..per_user {
            let item = next() % items + 1;
            let score = (next() % 5 + 1) as Score;
            rows.push((user, item, score));
        }
    }
    rows
}

/// Pair counts computed directly from per-user qualifying sets
#[allow(dead_code)]
pub fn reference_counts(rows: &[RatingRow], threshold: Score) -> BTreeMap<(ItemId, ItemId), u64> {
    let mut sets: HashMap<UserId, BTreeSet<ItemId>> = HashMap::new();
    for &(user, item, score) in rows {
        if score > threshold {
            sets.entry(user).or_default().insert(item);
        }
    }

    let mut counts = BTreeMap::new();
    for items in sets.values() {
        let items: Vec<_> = items.iter().copied().collect();
        for (i, &low) in items.iter().enumerate() {
            for &high in &items[i + 1..] {
                *counts.entry((low, high)).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Split rows into `n` chunks without separating any user's ratings
#[allow(dead_code)]
pub fn split_by_user(rows: &[RatingRow], n: usize, separator: &str) -> Vec<Vec<String>> {
    let mut splits = vec![Vec::new(); n];
    for row in rows {
        splits[(row.0 as usize) % n].extend(rating_lines(&[*row], separator));
    }
    splits
}

/// Reorder rows so each user's ratings are scattered through the input
#[allow(dead_code)]
pub fn interleaved(rows: &[RatingRow]) -> Vec<RatingRow> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(|&(user, item, score)| ((item * 31 + user * 17 + score as u64) % 97, user));
    rows
}
