//! Year-by-year playback of the changes scatter
//!
//! Playback is a bounded loop: one frame per year after the selected year up to the
//! last year of the data, with a fixed delay between frames. The renderer stops it
//! early by returning [`ControlFlow::Break`] from its sink.

use crate::changes::{changes_frame, ChangesFrame, ClipRange};
use ghgdash_core::normalize::NormalizedTable;
use ghgdash_core::observation::Year;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Delay between two frames in milliseconds
    ///
    /// Default: 500
    pub delay_ms: u64,
    /// Range of the growth axis, see [`ClipRange`]
    ///
    /// Default: [-100, 100]
    pub clip_range: [f64; 2],
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            clip_range: [-100.0, 100.0],
        }
    }
}

impl AnimationSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Years shown by an animation started at `from`
#[derive(Debug, Clone)]
pub struct YearAnimation {
    next: Year,
    end: Year,
}

impl YearAnimation {
    pub fn new(from: Year, end: Year) -> Self {
        Self {
            next: from + 1,
            end,
        }
    }
}

impl Iterator for YearAnimation {
    type Item = Year;

    fn next(&mut self) -> Option<Year> {
        if self.next > self.end {
            return None;
        }
        let year = self.next;
        self.next += 1;
        Some(year)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next + 1).unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for YearAnimation {}

/// Changes frames for each year of an animation
pub fn changes_frames(
    table: &NormalizedTable,
    from: Year,
    end: Year,
    range: Option<ClipRange>,
) -> impl Iterator<Item = ChangesFrame> + '_ {
    YearAnimation::new(from, end).map(move |year| changes_frame(table, year, range))
}

/// Hand each frame to `sink`, waiting `delay` before every frame.
///
/// Returns the number of frames the sink accepted.
pub fn play<T>(
    frames: impl IntoIterator<Item = T>,
    delay: Duration,
    mut sink: impl FnMut(T) -> ControlFlow<()>,
) -> usize {
    let mut shown = 0;
    for frame in frames {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        if sink(frame).is_break() {
            debug!(shown, "Animation stopped by the renderer");
            return shown;
        }
        shown += 1;
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years_after_start() {
        let years: Vec<Year> = YearAnimation::new(2015, 2019).collect();
        assert_eq!(years, vec![2016, 2017, 2018, 2019]);
        assert_eq!(YearAnimation::new(2015, 2019).len(), 4);
    }

    #[test]
    fn nothing_to_play_at_last_year() {
        assert_eq!(YearAnimation::new(2019, 2019).count(), 0);
        assert_eq!(YearAnimation::new(2020, 2019).size_hint(), (0, Some(0)));
    }

    #[test]
    fn plays_to_completion() {
        let mut seen = vec![];
        let shown = play(YearAnimation::new(2000, 2003), Duration::ZERO, |year| {
            seen.push(year);
            ControlFlow::Continue(())
        });
        assert_eq!(shown, 3);
        assert_eq!(seen, vec![2001, 2002, 2003]);
    }

    #[test]
    fn renderer_can_stop_playback() {
        let mut seen = vec![];
        let shown = play(YearAnimation::new(2000, 2010), Duration::ZERO, |year| {
            if year == 2003 {
                return ControlFlow::Break(());
            }
            seen.push(year);
            ControlFlow::Continue(())
        });
        assert_eq!(shown, 2);
        assert_eq!(seen, vec![2001, 2002]);
    }

    #[test]
    fn default_settings() {
        let settings = AnimationSettings::default();
        assert_eq!(settings.delay(), Duration::from_millis(500));
        assert!(ClipRange::new(settings.clip_range[0], settings.clip_range[1]).is_ok());
    }
}
