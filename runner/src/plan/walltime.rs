use super::PlanError;
use itertools::Itertools;
use std::{fmt, str::FromStr};

/// Wall clock limit of a job in `hh:mm:ss`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walltime {
    hours: u32,
    minutes: u8,
    seconds: u8,
}

impl Walltime {
    pub fn new(hours: u32, minutes: u8, seconds: u8) -> Result<Self, PlanError> {
        if minutes >= 60 || seconds >= 60 || (hours, minutes, seconds) == (0, 0, 0) {
            return Err(PlanError::InvalidWalltime(format!(
                "{hours:02}:{minutes:02}:{seconds:02}"
            )));
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }

    pub fn as_secs(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

impl Default for Walltime {
    fn default() -> Self {
        Self {
            hours: 12,
            minutes: 0,
            seconds: 0,
        }
    }
}

impl FromStr for Walltime {
    type Err = PlanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || PlanError::InvalidWalltime(value.to_owned());
        let fields = value.trim().split(':').collect_vec();

        // every field must be plain digits, `parse` alone would let a leading '+' through
        if fields.len() != 3
            || fields
                .iter()
                .any(|field| field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(invalid());
        }

        let hours = fields[0].parse::<u32>().map_err(|_| invalid())?;
        let minutes = fields[1].parse::<u8>().map_err(|_| invalid())?;
        let seconds = fields[2].parse::<u8>().map_err(|_| invalid())?;

        Self::new(hours, minutes, seconds).map_err(|_| invalid())
    }
}

impl fmt::Display for Walltime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}
