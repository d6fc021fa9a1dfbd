//! Seeded holdout split for offline evaluation.

use data_loader::Rating;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle the ratings with a seeded RNG and split off `test_fraction`
/// as the held-out set.
///
/// Returns `(train, test)`. The same seed always produces the same split;
/// the fraction is clamped to [0, 1].
pub fn holdout_split(ratings: &[Rating], test_fraction: f64, seed: u64) -> (Vec<Rating>, Vec<Rating>) {
    let mut shuffled: Vec<Rating> = ratings.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let fraction = test_fraction.clamp(0.0, 1.0);
    let test_size = (shuffled.len() as f64 * fraction).round() as usize;
    let train = shuffled.split_off(test_size);
    (train, shuffled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(n: u32) -> Vec<Rating> {
        (0..n)
            .map(|i| Rating {
                user_id: i,
                movie_id: i,
                rating: 3.0,
                timestamp: i as i64,
            })
            .collect()
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = holdout_split(&ratings(100), 0.2, 42);
        assert_eq!(test.len(), 20);
        assert_eq!(train.len(), 80);
    }

    #[test]
    fn test_split_is_deterministic() {
        let data = ratings(50);
        let (train_a, test_a) = holdout_split(&data, 0.2, 7);
        let (train_b, test_b) = holdout_split(&data, 0.2, 7);

        let ids = |rs: &[Rating]| rs.iter().map(|r| r.user_id).collect::<Vec<_>>();
        assert_eq!(ids(&train_a), ids(&train_b));
        assert_eq!(ids(&test_a), ids(&test_b));
    }

    #[test]
    fn test_split_partitions_without_overlap() {
        let data = ratings(30);
        let (train, test) = holdout_split(&data, 0.5, 1);

        let mut all: Vec<u32> = train.iter().chain(test.iter()).map(|r| r.user_id).collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).collect::<Vec<_>>());
    }
}
