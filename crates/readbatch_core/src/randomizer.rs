//! Correlated reading-parameter randomizer.
//!
//! Independent uniform draws would let a three-minute session report 100%
//! read. Reading time is instead drawn from a window centred on the time that
//! tracks the chosen percentage linearly, so the pair stays loosely
//! proportional while remaining random.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ReadingRanges;

/// Width of the correlation window as a fraction of the time range.
pub const CORRELATION_WINDOW: f64 = 0.3;

/// Concrete values submitted with a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingTargets {
    pub read_time: u32,
    pub read_percentage: u32,
    pub max_questions: u32,
}

/// Draws a correlated `(time, percentage, questions)` triple.
///
/// `ranges` is expected to have passed [`ReadingRanges::validate`]; inverted
/// bounds collapse to their minimum instead of panicking.
pub fn randomize<R: Rng + ?Sized>(ranges: &ReadingRanges, rng: &mut R) -> ReadingTargets {
    let read_percentage = uniform(rng, ranges.min_percent, ranges.max_percent);
    let read_time = correlated_time(ranges, read_percentage, rng);
    let max_questions = uniform(rng, ranges.min_questions, ranges.max_questions);

    ReadingTargets {
        read_time,
        read_percentage,
        max_questions,
    }
}

/// Draws a reading time for an already chosen percentage.
pub fn correlated_time<R: Rng + ?Sized>(
    ranges: &ReadingRanges,
    read_percentage: u32,
    rng: &mut R,
) -> u32 {
    let min_time = f64::from(ranges.min_time);
    let max_time = f64::from(ranges.max_time.max(ranges.min_time));
    let time_span = max_time - min_time;

    let percent_span = ranges.max_percent.saturating_sub(ranges.min_percent);
    let relative_position = if percent_span == 0 {
        0.5
    } else {
        f64::from(read_percentage.saturating_sub(ranges.min_percent)) / f64::from(percent_span)
    };
    let target_time = min_time + relative_position * time_span;

    let half_window = time_span * CORRELATION_WINDOW / 2.0;
    let lower = (target_time - half_window).max(min_time).ceil() as u32;
    let upper = ((target_time + half_window).min(max_time).floor() as u32).max(lower);

    let drawn = uniform(rng, lower, upper);
    drawn.clamp(ranges.min_time, ranges.max_time.max(ranges.min_time))
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, low: u32, high: u32) -> u32 {
    if high <= low {
        low
    } else {
        rng.gen_range(low..=high)
    }
}
