//! Sample-count based resolution detection for yearly series.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SizingError};

/// Supported sampling intervals of a yearly series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Hourly,
    ThirtyMinutes,
    FifteenMinutes,
    TenMinutes,
    FiveMinutes,
    OneMinute,
}

impl Resolution {
    /// All supported intervals, coarsest first.
    pub const ALL: [Resolution; 6] = [
        Resolution::Hourly,
        Resolution::ThirtyMinutes,
        Resolution::FifteenMinutes,
        Resolution::TenMinutes,
        Resolution::FiveMinutes,
        Resolution::OneMinute,
    ];

    /// Number of samples per hour.
    pub fn samples_per_hour(self) -> usize {
        match self {
            Resolution::Hourly => 1,
            Resolution::ThirtyMinutes => 2,
            Resolution::FifteenMinutes => 4,
            Resolution::TenMinutes => 6,
            Resolution::FiveMinutes => 12,
            Resolution::OneMinute => 60,
        }
    }

    /// Interval length in hours.
    pub fn interval_hours(self) -> f64 {
        1.0 / self.samples_per_hour() as f64
    }

    /// Sample count of a 365-day year.
    pub fn periods_normal(self) -> usize {
        8760 * self.samples_per_hour()
    }

    /// Sample count of a 366-day year.
    pub fn periods_leap(self) -> usize {
        8784 * self.samples_per_hour()
    }
}

/// A resolution together with its year length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedResolution {
    pub resolution: Resolution,
    pub leap_year: bool,
}

impl DetectedResolution {
    pub fn new(resolution: Resolution, leap_year: bool) -> Self {
        Self {
            resolution,
            leap_year,
        }
    }

    /// Classifies a sample count against the supported table.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::UnsupportedResolution`] carrying `periods` when
    /// the count matches no entry. Nothing is resampled here.
    pub fn detect(periods: usize) -> Result<Self> {
        Resolution::ALL
            .iter()
            .find_map(|&resolution| {
                if periods == resolution.periods_normal() {
                    Some(Self::new(resolution, false))
                } else if periods == resolution.periods_leap() {
                    Some(Self::new(resolution, true))
                } else {
                    None
                }
            })
            .ok_or(SizingError::UnsupportedResolution { periods })
    }

    /// Validates that an explicitly carried resolution matches `periods`.
    ///
    /// # Errors
    ///
    /// Returns [`SizingError::ResolutionMismatch`] on disagreement.
    pub fn check(&self, periods: usize) -> Result<()> {
        let expected = self.periods();
        if periods == expected {
            Ok(())
        } else {
            Err(SizingError::ResolutionMismatch {
                tag: self.tag(),
                expected,
                actual: periods,
            })
        }
    }

    /// Expected sample count.
    pub fn periods(&self) -> usize {
        if self.leap_year {
            self.resolution.periods_leap()
        } else {
            self.resolution.periods_normal()
        }
    }

    pub fn interval_hours(&self) -> f64 {
        self.resolution.interval_hours()
    }

    pub fn seconds_per_sample(&self) -> u32 {
        3600 / self.resolution.samples_per_hour() as u32
    }

    /// Stable tag used in reports, e.g. `15min_leap_year`.
    pub fn tag(&self) -> &'static str {
        match (self.resolution, self.leap_year) {
            (Resolution::Hourly, false) => "hourly",
            (Resolution::Hourly, true) => "hourly_leap_year",
            (Resolution::ThirtyMinutes, false) => "30min",
            (Resolution::ThirtyMinutes, true) => "30min_leap_year",
            (Resolution::FifteenMinutes, false) => "15min",
            (Resolution::FifteenMinutes, true) => "15min_leap_year",
            (Resolution::TenMinutes, false) => "10min",
            (Resolution::TenMinutes, true) => "10min_leap_year",
            (Resolution::FiveMinutes, false) => "5min",
            (Resolution::FiveMinutes, true) => "5min_leap_year",
            (Resolution::OneMinute, false) => "1min",
            (Resolution::OneMinute, true) => "1min_leap_year",
        }
    }
}

impl fmt::Display for DetectedResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
