/// Counters kept by a [`PredictedMover`](crate::PredictedMover).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Ticks simulated locally ahead of the authority.
    pub predicted: u64,
    /// Ticks simulated from received replicate data.
    pub replicated: u64,
    /// Reconciles accepted, whether they confirmed the prediction or corrected it.
    pub reconciled: u64,
    /// Reconciles that diverged from the prediction beyond the snap tolerance.
    pub snaps: u64,
    /// Ticks re-simulated after a reconcile.
    pub replayed: u64,
    /// Stale or duplicate ticks ignored.
    pub stale_dropped: u64,
}

impl std::fmt::Display for DriverStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "predicted={} replicated={} reconciled={} snaps={} replayed={} stale={}",
            self.predicted,
            self.replicated,
            self.reconciled,
            self.snaps,
            self.replayed,
            self.stale_dropped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_every_counter() {
        let stats = DriverStats {
            predicted: 3,
            stale_dropped: 1,
            ..DriverStats::default()
        };
        let text = stats.to_string();
        assert!(text.contains("predicted=3"));
        assert!(text.contains("stale=1"));
        assert!(text.contains("snaps=0"));
    }
}
