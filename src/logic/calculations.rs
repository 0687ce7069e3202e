/// Round to the nearest whole number, with .5 rounding up.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Round to one decimal place, halves away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Streaming mean for grouped aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    sum: f64,
    count: u32,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn push_present(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn value(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / f64::from(self.count))
        }
    }
}

/// First element of an ordered sequence satisfying `predicate`.
///
/// Every earliest-qualifying-date search goes through here so that the
/// soil-threshold and heat-ceiling searches share one tie-break rule: the
/// first element in sequence order wins.
pub fn first_match<'a, T, P>(sequence: &'a [T], predicate: P) -> Option<&'a T>
where
    P: Fn(&T) -> bool,
{
    sequence.iter().find(|item| predicate(item))
}
