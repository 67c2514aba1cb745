/// Frame sequence bookkeeping for one session.
///
/// Media delivery is best-effort, so a gap in the producer's per-frame index sequence is the
///  consumer's only loss signal. Out-of-order and duplicate arrivals are counted but never
///  reordered - a late frame has already been superseded on screen.
#[derive(Debug, Default)]
pub struct SequenceTracker {
    last_index: Option<u64>,
    frames_received: u64,
    frames_missing: u64,
    gaps: u64,
    out_of_order: u64,
}

impl SequenceTracker {
    pub fn new() -> SequenceTracker {
        Default::default()
    }

    /// Records a received frame index, returning how many frames were newly detected as
    ///  missing (0 for in-order, duplicate and late arrivals).
    pub fn on_frame(&mut self, index: u64) -> u64 {
        self.frames_received += 1;

        let newly_missing = match self.last_index {
            // the producer counts from 0, so a first frame with a higher index means loss
            None => index,
            Some(last) if index > last => index - last - 1,
            Some(_) => {
                self.out_of_order += 1;
                0
            }
        };

        if newly_missing > 0 {
            self.gaps += 1;
            self.frames_missing += newly_missing;
        }
        if self.last_index.map_or(true, |last| index > last) {
            self.last_index = Some(index);
        }

        newly_missing
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn frames_missing(&self) -> u64 {
        self.frames_missing
    }

    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use super::*;

    #[rstest]
    #[case::in_order(vec![0, 1, 2, 3], 0, 0, 0)]
    #[case::single_gap(vec![0, 1, 2, 4, 5], 1, 1, 0)]
    #[case::wide_gap(vec![0, 5], 1, 4, 0)]
    #[case::two_gaps(vec![0, 2, 4], 2, 2, 0)]
    #[case::head_loss(vec![3, 4], 1, 3, 0)]
    #[case::late_arrival(vec![0, 2, 1, 3], 1, 1, 1)]
    #[case::duplicate(vec![0, 0, 1], 0, 0, 1)]
    #[case::empty(vec![], 0, 0, 0)]
    fn test_gap_detection(
        #[case] indices: Vec<u64>,
        #[case] expected_gaps: u64,
        #[case] expected_missing: u64,
        #[case] expected_out_of_order: u64,
    ) {
        let mut tracker = SequenceTracker::new();
        for index in &indices {
            tracker.on_frame(*index);
        }

        assert_eq!(tracker.gaps(), expected_gaps);
        assert_eq!(tracker.frames_missing(), expected_missing);
        assert_eq!(tracker.out_of_order(), expected_out_of_order);
        assert_eq!(tracker.frames_received(), indices.len() as u64);
    }

    #[rstest]
    fn test_newly_missing_is_reported_per_frame() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.on_frame(0), 0);
        assert_eq!(tracker.on_frame(1), 0);
        assert_eq!(tracker.on_frame(4), 2);
        assert_eq!(tracker.on_frame(5), 0);
        // frame 2 arrives late: already counted as missing, stays counted
        assert_eq!(tracker.on_frame(2), 0);
        assert_eq!(tracker.frames_missing(), 2);
    }
}
