//! Side payload generation for completed readings.
//!
//! The relay treats the payload as opaque extension fields on the done
//! frame. The default source draws five lucky numbers below 100.

use rand::Rng;
use serde_json::Value;

use crate::frame::SidePayload;

const DEFAULT_LUCKY_COUNT: usize = 5;
const DEFAULT_LUCKY_UPPER: u32 = 100;

/// Produces the extension fields attached to a done frame.
pub trait SidePayloadSource: Send + Sync {
    fn generate(&self) -> SidePayload;
}

/// Uniformly random integers in `0..upper` under `luckyNumbers`.
#[derive(Debug, Clone, Copy)]
pub struct LuckyNumbers {
    count: usize,
    upper: u32,
}

impl LuckyNumbers {
    #[must_use]
    pub fn new(count: usize, upper: u32) -> Self {
        Self { count, upper: upper.max(1) }
    }
}

impl Default for LuckyNumbers {
    fn default() -> Self {
        Self::new(DEFAULT_LUCKY_COUNT, DEFAULT_LUCKY_UPPER)
    }
}

impl SidePayloadSource for LuckyNumbers {
    fn generate(&self) -> SidePayload {
        let mut rng = rand::rng();
        let numbers: Vec<Value> = (0..self.count)
            .map(|_| Value::from(rng.random_range(0..self.upper)))
            .collect();
        let mut payload = SidePayload::new();
        payload.insert(frames::FIELD_LUCKY_NUMBERS.to_owned(), Value::Array(numbers));
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draws_five_numbers_below_one_hundred() {
        for _ in 0..50 {
            let payload = LuckyNumbers::default().generate();
            let numbers = payload[frames::FIELD_LUCKY_NUMBERS].as_array().expect("array");
            assert_eq!(numbers.len(), 5);
            assert!(numbers.iter().all(|n| n.as_u64().is_some_and(|n| n < 100)));
        }
    }

    #[test]
    fn payload_has_only_lucky_numbers_field() {
        let payload = LuckyNumbers::new(3, 10).generate();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[frames::FIELD_LUCKY_NUMBERS].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn zero_upper_bound_is_clamped() {
        let payload = LuckyNumbers::new(2, 0).generate();
        assert_eq!(payload[frames::FIELD_LUCKY_NUMBERS], serde_json::json!([0, 0]));
    }
}
