use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("window start {start} is not before end {end}")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },

    #[error("time arithmetic crossed midnight")]
    MidnightWrap,
}

/// Half-open time interval `[start, end)` within a single day.
///
/// All conflict semantics in the reservation core reduce to the overlap
/// test on these windows: two windows conflict iff they share any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window starting at `start` and lasting `minutes`. Fails on a window
    /// that would cross midnight; schedules here are same-day by contract.
    pub fn from_start(start: NaiveTime, minutes: u32) -> Result<Self, WindowError> {
        let end = add_minutes(start, minutes).ok_or(WindowError::MidnightWrap)?;
        Self::new(start, end)
    }

    /// Half-open overlap: `start_a < end_b && start_b < end_a`.
    /// Back-to-back windows (one ending where the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `other` fits entirely inside `self`, boundaries included.
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Coalesce a busy list into disjoint windows, merging overlapping and
    /// back-to-back entries.
    pub fn merge(mut windows: Vec<TimeWindow>) -> Vec<TimeWindow> {
        if windows.is_empty() {
            return windows;
        }
        windows.sort_by_key(|w| (w.start, w.end));

        let mut merged: Vec<TimeWindow> = Vec::with_capacity(windows.len());
        for w in windows {
            match merged.last_mut() {
                Some(last) if w.start <= last.end => {
                    if w.end > last.end {
                        last.end = w.end;
                    }
                }
                _ => merged.push(w),
            }
        }
        merged
    }

    /// Free portions of `self` after removing every window in `busy`.
    /// Result is sorted and disjoint; busy time outside `self` is ignored.
    pub fn subtract_all(&self, busy: &[TimeWindow]) -> Vec<TimeWindow> {
        let mut free = Vec::new();
        let mut cursor = self.start;

        for b in Self::merge(busy.to_vec()) {
            if b.end <= cursor {
                continue;
            }
            if b.start >= self.end {
                break;
            }
            if b.start > cursor {
                free.push(TimeWindow { start: cursor, end: b.start });
            }
            cursor = cursor.max(b.end);
            if cursor >= self.end {
                return free;
            }
        }

        if cursor < self.end {
            free.push(TimeWindow { start: cursor, end: self.end });
        }
        free
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// `t + minutes`, refusing to wrap past midnight.
pub fn add_minutes(t: NaiveTime, minutes: u32) -> Option<NaiveTime> {
    let (shifted, wrapped) = t.overflowing_add_signed(Duration::minutes(minutes as i64));
    if wrapped != 0 {
        None
    } else {
        Some(shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn w(sh: u32, sm: u32, eh: u32, em: u32) -> TimeWindow {
        TimeWindow::new(t(sh, sm), t(eh, em)).unwrap()
    }

    #[test]
    fn test_rejects_empty_window() {
        assert!(TimeWindow::new(t(10, 0), t(10, 0)).is_err());
        assert!(TimeWindow::new(t(11, 0), t(10, 0)).is_err());
    }

    #[test]
    fn test_half_open_overlap() {
        let a = w(9, 0, 10, 0);
        let b = w(9, 30, 10, 30);
        let c = w(10, 0, 11, 0);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Back-to-back is not a conflict.
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_contains_allows_exact_fit() {
        let day = w(9, 0, 18, 0);
        assert!(day.contains(&w(9, 0, 18, 0)));
        assert!(day.contains(&w(17, 0, 18, 0)));
        assert!(!day.contains(&w(17, 30, 18, 30)));
    }

    #[test]
    fn test_merge_coalesces_overlap_and_adjacency() {
        let merged = TimeWindow::merge(vec![
            w(11, 0, 12, 0),
            w(10, 0, 11, 30),
            w(12, 0, 12, 30),
            w(14, 0, 15, 0),
        ]);
        assert_eq!(merged, vec![w(10, 0, 12, 30), w(14, 0, 15, 0)]);
    }

    #[test]
    fn test_subtract_single_busy_block() {
        // Window 08:00-17:00 minus 10:00-11:00 leaves two gaps.
        let free = w(8, 0, 17, 0).subtract_all(&[w(10, 0, 11, 0)]);
        assert_eq!(free, vec![w(8, 0, 10, 0), w(11, 0, 17, 0)]);
        assert_eq!(free[0].duration_minutes(), 120);
        assert_eq!(free[1].duration_minutes(), 360);
    }

    #[test]
    fn test_subtract_merges_overlapping_busy() {
        // 10:00-11:30 and 11:00-12:00 act as one busy block.
        let free = w(8, 0, 17, 0).subtract_all(&[w(10, 0, 11, 30), w(11, 0, 12, 0)]);
        assert_eq!(free, vec![w(8, 0, 10, 0), w(12, 0, 17, 0)]);
    }

    #[test]
    fn test_subtract_nothing_leaves_whole_window() {
        let free = w(8, 0, 17, 0).subtract_all(&[]);
        assert_eq!(free, vec![w(8, 0, 17, 0)]);
    }

    #[test]
    fn test_subtract_full_cover_leaves_nothing() {
        let free = w(9, 0, 12, 0).subtract_all(&[w(9, 0, 12, 0)]);
        assert!(free.is_empty());

        let free = w(9, 0, 12, 0).subtract_all(&[w(8, 0, 13, 0)]);
        assert!(free.is_empty());
    }

    #[test]
    fn test_subtract_ignores_busy_outside_window() {
        let free = w(9, 0, 12, 0).subtract_all(&[w(7, 0, 8, 0), w(13, 0, 14, 0)]);
        assert_eq!(free, vec![w(9, 0, 12, 0)]);
    }

    #[test]
    fn test_subtract_busy_straddling_edges() {
        let free = w(9, 0, 12, 0).subtract_all(&[w(8, 0, 9, 30), w(11, 30, 13, 0)]);
        assert_eq!(free, vec![w(9, 30, 11, 30)]);
    }

    #[test]
    fn test_add_minutes_refuses_midnight_wrap() {
        assert_eq!(add_minutes(t(23, 30), 30), None);
        assert_eq!(add_minutes(t(23, 30), 29), Some(t(23, 59)));
        assert_eq!(add_minutes(t(9, 0), 90), Some(t(10, 30)));
    }
}
