//! Circular TX IQ buffer between the network path and the output sink.
//!
//! The network side appends 126 samples per control/IQ frame and never
//! blocks; the output side drains one burst at a time, oldest first. A
//! drained slot is zeroed, so a reader that runs ahead of the writer reads
//! silence rather than replaying stale IQ.

use hpsdr_core::{Error, IqSample, Result};

/// Default number of bursts the ring holds.
pub const DEFAULT_RING_BURSTS: usize = 10;

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    /// Bursts completed by the writer.
    pub completed_bursts: u64,
    /// Bursts handed to the reader.
    pub consumed_bursts: u64,
    /// Reads that found no completed burst pending.
    pub underruns: u64,
    /// Times the writer lapped the reader.
    pub overruns: u64,
}

/// Fixed-capacity ring of `bursts x burst_len` samples.
#[derive(Debug)]
pub struct IqRingBuffer {
    samples: Vec<IqSample>,
    burst_len: usize,
    bursts: usize,
    write_pos: usize,
    read_burst: usize,
    stats: RingStats,
}

impl IqRingBuffer {
    /// Create a ring of `bursts` bursts of `burst_len` samples, all silent.
    pub fn new(bursts: usize, burst_len: usize) -> Result<Self> {
        if bursts < 2 {
            return Err(Error::InvalidParameter(format!(
                "ring needs at least 2 bursts, got {bursts}"
            )));
        }
        if burst_len == 0 {
            return Err(Error::InvalidParameter("burst length must be > 0".into()));
        }
        Ok(Self {
            samples: vec![IqSample::SILENCE; bursts * burst_len],
            burst_len,
            bursts,
            write_pos: 0,
            read_burst: 0,
            stats: RingStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn burst_len(&self) -> usize {
        self.burst_len
    }

    pub fn write_position(&self) -> usize {
        self.write_pos
    }

    pub fn stats(&self) -> RingStats {
        self.stats
    }

    /// Completed bursts not yet handed to the reader.
    pub fn pending_bursts(&self) -> u64 {
        self.stats
            .completed_bursts
            .saturating_sub(self.stats.consumed_bursts)
    }

    /// Append samples, wrapping to the start at capacity.
    pub fn write(&mut self, samples: &[IqSample]) {
        let capacity = self.samples.len();
        for &sample in samples {
            self.samples[self.write_pos] = sample;
            self.write_pos += 1;
            if self.write_pos >= capacity {
                self.write_pos = 0;
            }
            if self.write_pos % self.burst_len == 0 {
                self.stats.completed_bursts += 1;
                if self.pending_bursts() > self.bursts as u64 {
                    // The oldest surviving burst is the one the writer fills next.
                    self.stats.overruns += 1;
                    self.stats.consumed_bursts = self.stats.completed_bursts - self.bursts as u64;
                    self.read_burst = self.write_pos / self.burst_len;
                }
            }
        }
    }

    /// Drain the burst at the read cursor into `out`, replacing its contents.
    ///
    /// The reader always advances; if the writer has not completed a burst
    /// since the last read, an underrun is counted and whatever the slot holds
    /// (silence, or a partially written burst) is returned.
    pub fn read_burst(&mut self, out: &mut Vec<IqSample>) {
        let start = self.read_burst * self.burst_len;
        let slot = &mut self.samples[start..start + self.burst_len];
        out.clear();
        out.extend_from_slice(slot);
        slot.fill(IqSample::SILENCE);

        if self.pending_bursts() > 0 {
            self.stats.consumed_bursts += 1;
        } else {
            self.stats.underruns += 1;
        }
        self.read_burst = (self.read_burst + 1) % self.bursts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, start: f32) -> Vec<IqSample> {
        (0..n)
            .map(|k| IqSample::new(start + k as f32, -(start + k as f32)))
            .collect()
    }

    #[test]
    fn rejects_degenerate_shapes() {
        assert!(IqRingBuffer::new(1, 100).is_err());
        assert!(IqRingBuffer::new(10, 0).is_err());
    }

    #[test]
    fn unwritten_ring_reads_silence() {
        let mut ring = IqRingBuffer::new(DEFAULT_RING_BURSTS, 8).unwrap();
        let mut out = Vec::new();
        ring.read_burst(&mut out);
        assert_eq!(out.len(), 8);
        assert!(out.iter().all(|s| *s == IqSample::SILENCE));
        assert_eq!(ring.stats().underruns, 1);
    }

    #[test]
    fn bursts_drain_in_write_order() {
        let mut ring = IqRingBuffer::new(4, 4).unwrap();
        ring.write(&ramp(8, 1.0));
        assert_eq!(ring.stats().completed_bursts, 2);

        let mut out = Vec::new();
        ring.read_burst(&mut out);
        assert_eq!(out[0].i, 1.0);
        assert_eq!(out[3].i, 4.0);
        ring.read_burst(&mut out);
        assert_eq!(out[0].i, 5.0);
        assert_eq!(ring.stats().consumed_bursts, 2);
        assert_eq!(ring.stats().underruns, 0);
    }

    #[test]
    fn write_wraps_at_capacity() {
        let mut ring = IqRingBuffer::new(2, 4).unwrap();
        ring.write(&ramp(8, 0.0));
        assert_eq!(ring.write_position(), 0);
        ring.write(&ramp(1, 100.0));
        assert_eq!(ring.write_position(), 1);

        let mut out = Vec::new();
        ring.read_burst(&mut out);
        assert_eq!(out[0].i, 100.0);
        assert_eq!(out[1].i, 1.0);
    }

    #[test]
    fn drained_slots_are_zeroed() {
        let mut ring = IqRingBuffer::new(2, 2).unwrap();
        ring.write(&ramp(2, 1.0));
        let mut out = Vec::new();
        ring.read_burst(&mut out);
        ring.read_burst(&mut out);
        ring.read_burst(&mut out);
        assert!(out.iter().all(|s| *s == IqSample::SILENCE));
    }

    #[test]
    fn lapping_writer_counts_overrun() {
        let mut ring = IqRingBuffer::new(2, 2).unwrap();
        ring.write(&ramp(6, 0.0));
        let stats = ring.stats();
        assert_eq!(stats.completed_bursts, 3);
        assert_eq!(stats.overruns, 1);
        assert_eq!(ring.pending_bursts(), 2);
    }

    #[test]
    fn overrun_drains_oldest_surviving_burst_first() {
        let mut ring = IqRingBuffer::new(2, 2).unwrap();
        ring.write(&ramp(6, 0.0));

        let mut out = Vec::new();
        ring.read_burst(&mut out);
        assert_eq!(out[0].i, 2.0);
        assert_eq!(out[1].i, 3.0);
        ring.read_burst(&mut out);
        assert_eq!(out[0].i, 4.0);
        assert_eq!(out[1].i, 5.0);
        assert_eq!(ring.stats().underruns, 0);
        assert_eq!(ring.pending_bursts(), 0);
    }

    #[test]
    fn overrun_after_partial_drain_keeps_order() {
        let mut ring = IqRingBuffer::new(3, 2).unwrap();
        let mut out = Vec::new();
        ring.write(&ramp(2, 0.0));
        ring.read_burst(&mut out);
        assert_eq!(out[0].i, 0.0);

        // Four more bursts into three slots: the burst starting at 2 is lost.
        ring.write(&ramp(8, 2.0));
        assert_eq!(ring.stats().overruns, 1);
        for expected in [4.0, 6.0, 8.0] {
            ring.read_burst(&mut out);
            assert_eq!(out[0].i, expected);
        }
        assert_eq!(ring.stats().underruns, 0);
    }

    #[test]
    fn burst_counter_tracks_frames() {
        let mut ring = IqRingBuffer::new(DEFAULT_RING_BURSTS, 126).unwrap();
        for _ in 0..5 {
            ring.write(&ramp(126, 0.0));
        }
        assert_eq!(ring.stats().completed_bursts, 5);
        assert_eq!(ring.write_position(), 5 * 126);
    }
}
