//! The lazy integer range type.

use crate::exception::{ExcType, RunResult};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    pub fn new(start: i64, stop: i64, step: i64) -> RunResult<Self> {
        if step == 0 {
            return Err(ExcType::value_error("range() arg 3 must not be zero"));
        }
        Ok(Self { start, stop, step })
    }

    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let step = self.step.unsigned_abs();
        ((span as u64).div_ceil(step)) as usize
    }

    pub fn get(&self, index: i64) -> Option<i64> {
        let resolved = super::list::resolve_index(index, self.len())?;
        Some(self.start + self.step * resolved as i64)
    }

    pub fn contains(&self, value: i64) -> bool {
        if self.step > 0 {
            value >= self.start && value < self.stop && (value - self.start) % self.step == 0
        } else {
            value <= self.start && value > self.stop && (self.start - value) % (-self.step) == 0
        }
    }
}
