//! Statistical kernel
//!
//! Seeded, deterministic sampling primitives shared by every generator:
//! Poisson arrival counts, lognormal size/duration draws, weighted choice,
//! sigmoid-based Bernoulli outcomes and the working-hours clip. All
//! randomness flows through one `StdRng` so an identical (seed, rng_seed)
//! pair replays an identical corpus.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use codetel_shared::{UsageKind, WorkingHours};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Poisson};

/// Logistic function used by the binary quality-outcome models
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Event-type mix for AI interaction streams
pub const EVENT_TYPE_MIX: [(UsageKind, f64); 6] = [
    (UsageKind::TabShown, 0.40),
    (UsageKind::Chat, 0.25),
    (UsageKind::CmdK, 0.15),
    (UsageKind::Composer, 0.10),
    (UsageKind::Agent, 0.05),
    (UsageKind::Bugbot, 0.05),
];

/// Deterministic pseudo-random source for the generators
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Poisson arrival count for one interval at rate `lambda`
    pub fn poisson_count(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        let dist = Poisson::new(lambda).expect("positive lambda");
        dist.sample(&mut self.rng) as u64
    }

    /// Lognormal draw parameterized by the desired median and a shape factor
    pub fn lognormal(&mut self, median: f64, sigma: f64) -> f64 {
        if median <= 0.0 {
            return 0.0;
        }
        let dist = LogNormal::new(median.ln(), sigma.max(0.01)).expect("finite parameters");
        dist.sample(&mut self.rng)
    }

    /// Uniform draw in `[low, high)`
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    pub fn range_u64(&mut self, low: u64, high_inclusive: u64) -> u64 {
        if low >= high_inclusive {
            return low;
        }
        self.rng.gen_range(low..=high_inclusive)
    }

    /// Bernoulli draw with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Bernoulli draw with probability `sigmoid(x)`
    pub fn sigmoid_bernoulli(&mut self, x: f64) -> bool {
        self.chance(sigmoid(x))
    }

    /// Weighted choice over `(value, weight)` pairs
    pub fn weighted_choice<'a, T>(&mut self, choices: &'a [(T, f64)]) -> &'a T {
        let total: f64 = choices.iter().map(|(_, w)| w).sum();
        let mut draw = self.uniform(0.0, total.max(f64::MIN_POSITIVE));
        for (value, weight) in choices {
            if draw < *weight {
                return value;
            }
            draw -= weight;
        }
        &choices[choices.len() - 1].0
    }

    /// Uniform pick from a non-empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = self.rng.gen_range(0..items.len());
        &items[idx]
    }

    /// Deterministic v4-shaped UUID drawn from the seeded stream
    pub fn uuid(&mut self) -> uuid::Uuid {
        let mut bytes = [0u8; 16];
        self.rng.fill(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Fresh 40-hex commit hash
    pub fn commit_hash(&mut self) -> String {
        let mut hash = String::with_capacity(40);
        for _ in 0..5 {
            hash.push_str(&format!("{:08x}", self.rng.gen::<u32>()));
        }
        hash
    }

    /// Day-of-week rate weight: weekends are damped to 0.2, Fridays to 0.8
    pub fn day_weight(date: NaiveDate) -> f64 {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => 0.2,
            Weekday::Fri => 0.8,
            _ => 1.0,
        }
    }

    /// Acceptance side of the working-hours clip: a candidate on a damped day
    /// survives with the day's weight, otherwise the caller resamples.
    pub fn accept_day(&mut self, date: NaiveDate) -> bool {
        self.chance(Self::day_weight(date))
    }

    /// Sample a local-hours timestamp for `date` inside the developer's
    /// working band and convert to UTC. 90% of draws land in the band (peak
    /// hours doubled), the rest spread over the full day.
    pub fn working_timestamp(&mut self, date: NaiveDate, hours: &WorkingHours) -> DateTime<Utc> {
        let local_hour = if self.chance(0.90) {
            let band: Vec<(u8, f64)> = (hours.start_hour..hours.end_hour)
                .map(|h| {
                    let weight = if hours.peak_hours.contains(&h) { 2.0 } else { 1.0 };
                    (h, weight)
                })
                .collect();
            *self.weighted_choice(&band)
        } else {
            self.rng.gen_range(0..24) as u8
        };
        let minute = self.rng.gen_range(0..60) as u32;
        let second = self.rng.gen_range(0..60) as u32;
        let local = date
            .and_hms_opt(u32::from(local_hour), minute, second)
            .expect("valid wall clock");
        let shifted = local - chrono::Duration::hours(i64::from(hours.timezone_offset_hours));
        Utc.from_utc_datetime(&shifted)
    }

    /// Whether a UTC timestamp falls in the developer's local working band
    pub fn in_working_band(ts: DateTime<Utc>, hours: &WorkingHours) -> bool {
        let local = ts + chrono::Duration::hours(i64::from(hours.timezone_offset_hours));
        let hour = local.hour() as u8;
        hour >= hours.start_hour && hour < hours.end_hour
    }
}
