//! Temporal analysis over rating timestamps.
//!
//! Descriptive statistics grouped by calendar period, popularity trends
//! split at a one-year recency cutoff, and the exponential time-decay
//! weighting of a user's rating history. The decay weights are computed
//! and exposed but not yet fed back into the predictors.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use data_loader::{MovieId, Rating, UserId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;

/// Default decay factor for time-weighted averages
pub const DEFAULT_DECAY_FACTOR: f64 = 0.1;

const SECONDS_PER_DAY: i64 = 86_400;
const RECENT_WINDOW_DAYS: i64 = 365;
/// Minimum trailing-year ratings for the "recently popular" list
const TRENDING_MIN_RATINGS: u64 = 10;

/// Per-period aggregate: mean, count, and (where meaningful) sample std
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodStats {
    /// The period key: year, month (1-12), day of week (0 = Monday),
    /// hour (0-23), or quarter (1-4)
    pub period: u32,
    pub mean: f64,
    pub count: u64,
    /// Sample standard deviation; None for singleton groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
}

/// Rating trends grouped by calendar period
#[derive(Debug, Clone, Serialize)]
pub struct RatingTrends {
    pub yearly: Vec<PeriodStats>,
    pub monthly: Vec<PeriodStats>,
    pub day_of_week: Vec<PeriodStats>,
}

/// Seasonal breakdown: quarters, hours, and the busiest hour
#[derive(Debug, Clone, Serialize)]
pub struct SeasonalPatterns {
    pub quarterly: Vec<PeriodStats>,
    pub hourly: Vec<PeriodStats>,
    /// Hour with the most rating activity; None for an empty dataset
    pub peak_hour: Option<u32>,
}

/// A movie trending in the trailing-year window
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrendingMovie {
    pub movie_id: MovieId,
    pub avg_rating: f64,
    pub rating_count: u64,
}

/// A movie whose recent mean rating improved over its older mean
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RisingStar {
    pub movie_id: MovieId,
    pub old_avg_rating: f64,
    pub avg_rating: f64,
    pub rating_count: u64,
    pub rating_change: f64,
}

/// Output of the popularity-trend split
#[derive(Debug, Clone, Serialize)]
pub struct PopularityTrends {
    pub recent_popular: Vec<TrendingMovie>,
    pub rising_stars: Vec<RisingStar>,
}

/// Time-decay weighting of one user's rating history
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserTimeWeights {
    pub user_id: UserId,
    pub time_weighted_avg: f64,
    pub traditional_avg: f64,
    /// time_weighted_avg - traditional_avg
    pub adjustment: f64,
    pub rating_count: usize,
}

/// One rating with its derived calendar fields
#[derive(Debug, Clone, Copy)]
struct StampedRating {
    rating: Rating,
    year: i32,
    month: u32,
    /// 0 = Monday .. 6 = Sunday
    day_of_week: u32,
    hour: u32,
    quarter: u32,
}

/// Read-only analyzer over the full rating set.
#[derive(Debug)]
pub struct TemporalAnalyzer {
    stamped: Vec<StampedRating>,
    /// Ratings per user, input order (for the decay weighting)
    by_user: HashMap<UserId, Vec<Rating>>,
    max_timestamp: Option<i64>,
}

impl TemporalAnalyzer {
    /// Derive calendar fields (UTC) for every rating.
    ///
    /// Ratings with timestamps outside the representable datetime range
    /// are dropped from the period tables.
    pub fn new(ratings: &[Rating]) -> Self {
        let stamped: Vec<StampedRating> = ratings
            .iter()
            .filter_map(|&rating| {
                let dt: DateTime<Utc> = DateTime::from_timestamp(rating.timestamp, 0)?;
                Some(StampedRating {
                    rating,
                    year: dt.year(),
                    month: dt.month(),
                    day_of_week: dt.weekday().num_days_from_monday(),
                    hour: dt.hour(),
                    quarter: (dt.month() - 1) / 3 + 1,
                })
            })
            .collect();

        let mut by_user: HashMap<UserId, Vec<Rating>> = HashMap::new();
        for rating in ratings {
            by_user.entry(rating.user_id).or_default().push(*rating);
        }

        let max_timestamp = ratings.iter().map(|r| r.timestamp).max();

        Self {
            stamped,
            by_user,
            max_timestamp,
        }
    }

    /// Mean/count/std of ratings grouped by year, month, and day of week.
    #[instrument(skip(self))]
    pub fn rating_trends(&self) -> RatingTrends {
        RatingTrends {
            yearly: group_stats(&self.stamped, |s| s.year as u32),
            monthly: group_stats(&self.stamped, |s| s.month),
            day_of_week: group_stats(&self.stamped, |s| s.day_of_week),
        }
    }

    /// Quarterly and hourly aggregates plus the peak activity hour.
    #[instrument(skip(self))]
    pub fn seasonal_patterns(&self) -> SeasonalPatterns {
        let hourly = group_stats(&self.stamped, |s| s.hour);
        // Max count; lowest hour wins ties
        let peak_hour = hourly
            .iter()
            .max_by(|a, b| a.count.cmp(&b.count).then(b.period.cmp(&a.period)))
            .map(|s| s.period);

        SeasonalPatterns {
            quarterly: group_stats(&self.stamped, |s| s.quarter),
            hourly,
            peak_hour,
        }
    }

    /// Split the history one year before the newest rating and compare
    /// windows: movies with at least ten trailing-year ratings ranked by
    /// count, and movies present in both windows ranked by mean-rating
    /// improvement.
    #[instrument(skip(self))]
    pub fn popularity_trends(&self, top_n: usize) -> PopularityTrends {
        let Some(max_ts) = self.max_timestamp else {
            return PopularityTrends {
                recent_popular: Vec::new(),
                rising_stars: Vec::new(),
            };
        };
        let cutoff = max_ts - RECENT_WINDOW_DAYS * SECONDS_PER_DAY;

        let mut recent: HashMap<MovieId, (f64, u64)> = HashMap::new();
        let mut old: HashMap<MovieId, (f64, u64)> = HashMap::new();
        for stamped in &self.stamped {
            let rating = stamped.rating;
            let bucket = if rating.timestamp >= cutoff {
                &mut recent
            } else {
                &mut old
            };
            let entry = bucket.entry(rating.movie_id).or_insert((0.0, 0));
            entry.0 += rating.rating as f64;
            entry.1 += 1;
        }

        let mut recent_popular: Vec<TrendingMovie> = recent
            .iter()
            .filter(|&(_, &(_, count))| count >= TRENDING_MIN_RATINGS)
            .map(|(&movie_id, &(sum, count))| TrendingMovie {
                movie_id,
                avg_rating: sum / count as f64,
                rating_count: count,
            })
            .collect();
        recent_popular.sort_by(|a, b| {
            b.rating_count
                .cmp(&a.rating_count)
                .then(a.movie_id.cmp(&b.movie_id))
        });

        // Rising stars: trending movies that also have an older history
        let mut rising_stars: Vec<RisingStar> = recent_popular
            .iter()
            .filter_map(|trending| {
                let &(old_sum, old_count) = old.get(&trending.movie_id)?;
                let old_avg_rating = old_sum / old_count as f64;
                Some(RisingStar {
                    movie_id: trending.movie_id,
                    old_avg_rating,
                    avg_rating: trending.avg_rating,
                    rating_count: trending.rating_count,
                    rating_change: trending.avg_rating - old_avg_rating,
                })
            })
            .collect();
        rising_stars.sort_by(|a, b| {
            b.rating_change
                .partial_cmp(&a.rating_change)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.movie_id.cmp(&b.movie_id))
        });

        recent_popular.truncate(top_n);
        rising_stars.truncate(top_n);
        PopularityTrends {
            recent_popular,
            rising_stars,
        }
    }

    /// Exponential time-decay weights over one user's history:
    /// `weight = exp(-decay * days_since_most_recent / 365)`.
    ///
    /// Days are whole days relative to the user's own newest rating, so
    /// the most recent rating always carries weight 1.0.
    #[instrument(skip(self))]
    pub fn user_time_weights(
        &self,
        user_id: UserId,
        decay_factor: f64,
    ) -> Result<UserTimeWeights> {
        let history = self
            .by_user
            .get(&user_id)
            .filter(|h| !h.is_empty())
            .ok_or(EngineError::UnknownUser(user_id))?;

        // Safe: history is non-empty
        let newest = history.iter().map(|r| r.timestamp).max().unwrap_or(0);

        let mut weighted_sum = 0.0f64;
        let mut weight_sum = 0.0f64;
        let mut plain_sum = 0.0f64;
        for rating in history {
            let days_ago = ((newest - rating.timestamp) / SECONDS_PER_DAY) as f64;
            let weight = (-decay_factor * days_ago / 365.0).exp();
            weighted_sum += rating.rating as f64 * weight;
            weight_sum += weight;
            plain_sum += rating.rating as f64;
        }

        let time_weighted_avg = weighted_sum / weight_sum;
        let traditional_avg = plain_sum / history.len() as f64;

        Ok(UserTimeWeights {
            user_id,
            time_weighted_avg,
            traditional_avg,
            adjustment: time_weighted_avg - traditional_avg,
            rating_count: history.len(),
        })
    }

    /// Plain-text temporal report: dataset overview, yearly trends,
    /// seasonal patterns, key insights.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(80);
        let thin = "-".repeat(80);

        out.push_str(&rule);
        out.push_str("\nTEMPORAL ANALYSIS REPORT\nMovie Recommendation System\n");
        out.push_str(&rule);
        out.push_str("\n\n1. DATASET TEMPORAL OVERVIEW\n");
        out.push_str(&thin);
        out.push('\n');
        out.push_str(&format!("Total Ratings: {}\n", self.stamped.len()));
        if let (Some(min), Some(max)) = (
            self.stamped.iter().map(|s| s.rating.timestamp).min(),
            self.max_timestamp,
        ) {
            let span_days = (max - min) / SECONDS_PER_DAY;
            out.push_str(&format!(
                "Date Range: {} to {}\n",
                format_timestamp(min),
                format_timestamp(max)
            ));
            out.push_str(&format!("Time Span: {span_days} days\n"));
        }

        let trends = self.rating_trends();
        out.push_str("\n2. RATING TRENDS OVER TIME\n");
        out.push_str(&thin);
        out.push('\n');
        out.push_str("year    mean    count   std\n");
        for stats in &trends.yearly {
            out.push_str(&format_stats_row(stats));
        }

        let seasonal = self.seasonal_patterns();
        out.push_str("\n3. SEASONAL PATTERNS\n");
        out.push_str(&thin);
        out.push('\n');
        out.push_str("quarter mean    count   std\n");
        for stats in &seasonal.quarterly {
            out.push_str(&format_stats_row(stats));
        }
        if let Some(peak) = seasonal.peak_hour {
            out.push_str(&format!("\nPeak Activity Hour: {peak}:00\n"));
        }

        out.push_str("\n4. KEY INSIGHTS\n");
        out.push_str(&thin);
        out.push('\n');
        out.push_str("* Rating patterns show temporal dependencies\n");
        out.push_str("* Recent ratings should have higher weights in recommendations\n");
        out.push_str("* User preferences evolve over time\n");
        out.push_str("* Seasonal trends affect movie popularity\n");

        out
    }
}

/// Group the stamped ratings by a period key and compute mean/count/std
/// (sample std, None for singleton groups). Output sorted by period.
fn group_stats<F>(stamped: &[StampedRating], key: F) -> Vec<PeriodStats>
where
    F: Fn(&StampedRating) -> u32,
{
    let mut groups: HashMap<u32, Vec<f64>> = HashMap::new();
    for s in stamped {
        groups.entry(key(s)).or_default().push(s.rating.rating as f64);
    }

    let mut out: Vec<PeriodStats> = groups
        .into_iter()
        .map(|(period, values)| {
            let count = values.len() as u64;
            let mean = values.iter().sum::<f64>() / count as f64;
            let std = if count > 1 {
                let variance = values
                    .iter()
                    .map(|v| (v - mean).powi(2))
                    .sum::<f64>()
                    / (count - 1) as f64;
                Some(variance.sqrt())
            } else {
                None
            };
            PeriodStats {
                period,
                mean,
                count,
                std,
            }
        })
        .collect();
    out.sort_by_key(|s| s.period);
    out
}

fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_stats_row(stats: &PeriodStats) -> String {
    let std = stats
        .std
        .map(|s| format!("{s:.3}"))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "{:<7} {:<7.3} {:<7} {}\n",
        stats.period, stats.mean, stats.count, std
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user_id: UserId, movie_id: MovieId, value: f32, timestamp: i64) -> Rating {
        Rating {
            user_id,
            movie_id,
            rating: value,
            timestamp,
        }
    }

    // 2015-06-01 12:00:00 UTC (a Monday)
    const MONDAY_NOON: i64 = 1_433_160_000;

    #[test]
    fn test_calendar_derivation() {
        let analyzer = TemporalAnalyzer::new(&[rating(1, 1, 4.0, MONDAY_NOON)]);
        let stamped = &analyzer.stamped[0];
        assert_eq!(stamped.year, 2015);
        assert_eq!(stamped.month, 6);
        assert_eq!(stamped.day_of_week, 0); // Monday
        assert_eq!(stamped.hour, 12);
        assert_eq!(stamped.quarter, 2);
    }

    #[test]
    fn test_rating_trends_grouping() {
        let ratings = vec![
            rating(1, 1, 4.0, MONDAY_NOON),
            rating(2, 1, 2.0, MONDAY_NOON + 3600),
            rating(3, 1, 3.0, MONDAY_NOON + 366 * SECONDS_PER_DAY),
        ];
        let analyzer = TemporalAnalyzer::new(&ratings);
        let trends = analyzer.rating_trends();

        assert_eq!(trends.yearly.len(), 2);
        let y2015 = &trends.yearly[0];
        assert_eq!(y2015.period, 2015);
        assert_eq!(y2015.count, 2);
        assert!((y2015.mean - 3.0).abs() < 1e-9);
        // Sample std of {4, 2} = sqrt(2)
        assert!((y2015.std.unwrap() - 2.0f64.sqrt()).abs() < 1e-9);

        let y2016 = &trends.yearly[1];
        assert_eq!(y2016.count, 1);
        assert!(y2016.std.is_none());
    }

    #[test]
    fn test_peak_hour() {
        let ratings = vec![
            rating(1, 1, 4.0, MONDAY_NOON),          // 12:00
            rating(2, 1, 3.0, MONDAY_NOON + 60),     // 12:01
            rating(3, 1, 5.0, MONDAY_NOON + 3600),   // 13:00
        ];
        let analyzer = TemporalAnalyzer::new(&ratings);
        assert_eq!(analyzer.seasonal_patterns().peak_hour, Some(12));
    }

    #[test]
    fn test_popularity_trends_window_split() {
        let newest = MONDAY_NOON + 400 * SECONDS_PER_DAY;
        let mut ratings = Vec::new();
        // Movie 1: 10 recent ratings at 4.0, older history at 3.0
        for i in 0..10 {
            ratings.push(rating(i, 1, 4.0, newest - i as i64 * SECONDS_PER_DAY));
        }
        ratings.push(rating(99, 1, 3.0, MONDAY_NOON));
        // Movie 2: only 5 recent ratings, below the trending floor
        for i in 0..5 {
            ratings.push(rating(i, 2, 5.0, newest - i as i64 * SECONDS_PER_DAY));
        }

        let analyzer = TemporalAnalyzer::new(&ratings);
        let trends = analyzer.popularity_trends(20);

        assert_eq!(trends.recent_popular.len(), 1);
        assert_eq!(trends.recent_popular[0].movie_id, 1);
        assert_eq!(trends.recent_popular[0].rating_count, 10);

        assert_eq!(trends.rising_stars.len(), 1);
        let star = &trends.rising_stars[0];
        assert_eq!(star.movie_id, 1);
        assert!((star.old_avg_rating - 3.0).abs() < 1e-9);
        assert!((star.rating_change - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_user_time_weights_decay() {
        let ratings = vec![
            rating(1, 1, 5.0, MONDAY_NOON + 365 * SECONDS_PER_DAY), // newest
            rating(1, 2, 1.0, MONDAY_NOON),                         // a year older
        ];
        let analyzer = TemporalAnalyzer::new(&ratings);
        let weights = analyzer.user_time_weights(1, 0.1).unwrap();

        // Newest rating weight 1.0; year-old rating weight e^-0.1
        let old_weight = (-0.1f64).exp();
        let expected = (5.0 + 1.0 * old_weight) / (1.0 + old_weight);
        assert!((weights.time_weighted_avg - expected).abs() < 1e-9);
        assert!((weights.traditional_avg - 3.0).abs() < 1e-9);
        assert!((weights.adjustment - (expected - 3.0)).abs() < 1e-9);
        // Recent 5.0 outweighs old 1.0
        assert!(weights.adjustment > 0.0);
    }

    #[test]
    fn test_user_time_weights_unknown_user() {
        let analyzer = TemporalAnalyzer::new(&[]);
        assert!(matches!(
            analyzer.user_time_weights(42, DEFAULT_DECAY_FACTOR),
            Err(EngineError::UnknownUser(42))
        ));
    }

    #[test]
    fn test_report_sections() {
        let analyzer = TemporalAnalyzer::new(&[rating(1, 1, 4.0, MONDAY_NOON)]);
        let report = analyzer.render_report();
        assert!(report.contains("1. DATASET TEMPORAL OVERVIEW"));
        assert!(report.contains("2. RATING TRENDS OVER TIME"));
        assert!(report.contains("3. SEASONAL PATTERNS"));
        assert!(report.contains("4. KEY INSIGHTS"));
    }
}
