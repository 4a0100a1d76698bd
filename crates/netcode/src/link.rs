//! Deterministic stand-in for an unreliable datagram channel.

use tracing::trace;

/// Behaviour of a [`LossyLink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    /// Ticks every packet spends in flight.
    pub latency_ticks: u32,
    /// Up to this many extra ticks of delay, picked per packet. Nonzero
    /// jitter reorders packets.
    pub jitter_ticks: u32,
    /// Probability in [0, 1] that a packet is lost.
    pub drop_chance: f32,
    pub seed: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            latency_ticks: 0,
            jitter_ticks: 0,
            drop_chance: 0.0,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    deliver_at: u64,
    sequence: u64,
    payload: Vec<u8>,
}

/// One-way packet channel with latency, jitter and loss, driven by a seeded RNG
/// so runs repeat exactly.
#[derive(Debug, Clone)]
pub struct LossyLink {
    config: LinkConfig,
    rng: u64,
    now: u64,
    sequence: u64,
    in_flight: Vec<InFlight>,
    sent: u64,
    dropped: u64,
}

impl LossyLink {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            rng: config.seed,
            now: 0,
            sequence: 0,
            in_flight: Vec::new(),
            sent: 0,
            dropped: 0,
        }
    }

    /// A link that delivers everything on the next tick, in order.
    pub fn perfect() -> Self {
        Self::new(LinkConfig::default())
    }

    /// Queue a packet. Returns `false` if it was lost.
    pub fn send(&mut self, payload: Vec<u8>) -> bool {
        self.sent += 1;
        if self.config.drop_chance > 0.0 && self.roll() < self.config.drop_chance {
            self.dropped += 1;
            trace!(sequence = self.sequence, "packet dropped");
            return false;
        }
        let jitter = if self.config.jitter_ticks > 0 {
            self.next_u64() % (u64::from(self.config.jitter_ticks) + 1)
        } else {
            0
        };
        self.in_flight.push(InFlight {
            deliver_at: self.now + 1 + u64::from(self.config.latency_ticks) + jitter,
            sequence: self.sequence,
            payload,
        });
        self.sequence += 1;
        true
    }

    /// Advance one tick and return the packets that arrive, in arrival order.
    pub fn advance(&mut self) -> Vec<Vec<u8>> {
        self.now += 1;
        let now = self.now;
        let (mut arrived, waiting): (Vec<InFlight>, Vec<InFlight>) = self
            .in_flight
            .drain(..)
            .partition(|p| p.deliver_at <= now);
        self.in_flight = waiting;
        arrived.sort_by_key(|p| (p.deliver_at, p.sequence));
        arrived.into_iter().map(|p| p.payload).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn next_u64(&mut self) -> u64 {
        self.rng = splitmix64(self.rng);
        self.rng
    }

    /// Uniform in [0, 1).
    fn roll(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
