//! Module: record
//!
//! Purpose: EventRecord type for captured edges. One record is one validated
//! transition of one monitored clock line at a specific millisecond.
//!
//! Architecture:
//! - Compact 8-byte structure (4096 records fit in 32 KB of DRAM)
//! - Constructed only by the edge detector after debounce validation
//! - Copy type, never mutated once it is in the queue
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Number of monitored signal lines.
pub const SIGNAL_COUNT: usize = 4;

/// Identifier of a monitored clock line.
///
/// The discriminant doubles as the index into every per-signal table.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalId {
    /// Periodic radio reference signal (duty-cycled).
    Rf = 0,
    /// Minute-unit tick.
    Mu = 1,
    /// Auxiliary binary-state line BR.
    Br = 2,
    /// Auxiliary binary-state line BA.
    Ba = 3,
}

impl SignalId {
    /// All signals in index order.
    pub const ALL: [SignalId; SIGNAL_COUNT] = [SignalId::Rf, SignalId::Mu, SignalId::Br, SignalId::Ba];

    /// Table index of this signal.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a signal by table index.
    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SignalId::Rf),
            1 => Some(SignalId::Mu),
            2 => Some(SignalId::Br),
            3 => Some(SignalId::Ba),
            _ => None,
        }
    }

    /// Code written to the persisted log.
    pub const fn code(self) -> &'static str {
        match self {
            SignalId::Rf => "RF",
            SignalId::Mu => "MU",
            SignalId::Br => "BR",
            SignalId::Ba => "BA",
        }
    }
}

impl core::fmt::Display for SignalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Logic level observed on an input pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Level read back from a raw pin value (non-zero is high).
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        if raw != 0 {
            Level::High
        } else {
            Level::Low
        }
    }

    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Edge that ends at this level.
    ///
    /// HIGH is the active state, so arriving at it is a rising edge.
    #[inline]
    pub const fn arriving_edge(self) -> Edge {
        match self {
            Level::High => Edge::Rising,
            Level::Low => Edge::Falling,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Direction of a transition.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising = 0,
    Falling = 1,
}

impl Edge {
    /// Code written to the persisted log.
    pub const fn code(self) -> &'static str {
        match self {
            Edge::Rising => "R",
            Edge::Falling => "F",
        }
    }
}

/// A single captured edge.
///
/// Memory layout:
/// ```text
/// [signal:1][edge:1][reserved:2][timestamp_ms:4] = 8 bytes
/// ```
///
/// `timestamp_ms` is the wrapping millisecond counter at detection time.
/// Consumers must treat wraparound as valid.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub signal: SignalId,
    pub edge: Edge,
    /// Always zero. Kept for forward compatibility.
    pub reserved: u16,
    pub timestamp_ms: u32,
}

impl EventRecord {
    /// Placeholder used to initialise storage arrays.
    pub const EMPTY: Self = Self::new(SignalId::Rf, Edge::Rising, 0);

    /// Create a record with the reserved slot cleared.
    #[inline]
    pub const fn new(signal: SignalId, edge: Edge, timestamp_ms: u32) -> Self {
        Self {
            signal,
            edge,
            reserved: 0,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_size() {
        assert_eq!(core::mem::size_of::<EventRecord>(), 8);
    }

    #[test]
    fn test_signal_index_table() {
        for (i, signal) in SignalId::ALL.iter().enumerate() {
            assert_eq!(signal.index(), i);
            assert_eq!(SignalId::from_index(i), Some(*signal));
        }
        assert_eq!(SignalId::from_index(SIGNAL_COUNT), None);
    }

    #[test]
    fn test_codes() {
        assert_eq!(SignalId::Rf.code(), "RF");
        assert_eq!(SignalId::Mu.code(), "MU");
        assert_eq!(SignalId::Br.code(), "BR");
        assert_eq!(SignalId::Ba.code(), "BA");
        assert_eq!(Edge::Rising.code(), "R");
        assert_eq!(Edge::Falling.code(), "F");
    }

    #[test]
    fn test_level_edge_mapping() {
        assert_eq!(Level::High.arriving_edge(), Edge::Rising);
        assert_eq!(Level::Low.arriving_edge(), Edge::Falling);
        assert_eq!(Level::from_raw(1), Level::High);
        assert_eq!(Level::from_raw(0), Level::Low);
        assert_eq!(Level::from(true), Level::High);
    }

    #[test]
    fn test_new_clears_reserved() {
        let record = EventRecord::new(SignalId::Ba, Edge::Falling, 42);
        assert_eq!(record.reserved, 0);
        assert_eq!(record.timestamp_ms, 42);
    }
}
