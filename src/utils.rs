//! Utility functions for the scrim service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique ready-check ID
pub fn generate_ready_check_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Integer-rounded average of a non-empty rating slice
pub fn average_rating(ratings: &[i64]) -> i64 {
    let sum: i64 = ratings.iter().sum();
    let len = ratings.len() as f64;
    (sum as f64 / len).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_ready_check_id();
        let id2 = generate_ready_check_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[1000, 1000, 1000]), 1000);
        assert_eq!(average_rating(&[1000, 1001]), 1001); // rounds half up
        assert_eq!(average_rating(&[990, 1010, 1000, 1000, 1000]), 1000);
    }
}
