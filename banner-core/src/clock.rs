use std::{
    fmt::Debug,
    sync::{Arc, RwLock},
    time::SystemTime,
};

/// Defines the behavior of a wall clock.
///
/// # Remarks
///
/// Store implementations read `created_at`/`updated_at` timestamps through this
/// trait rather than calling `SystemTime::now()` directly so tests can observe
/// retention and ordering behavior deterministically.
pub trait Clock: Debug + Send + Sync {
    /// Gets the clock's current [date and time](SystemTime).
    fn now(&self) -> SystemTime;
}

/// Represents a wall [clock](Clock) backed by [`SystemTime::now`].
#[derive(Copy, Clone, Debug, Default)]
pub struct WallClock;

impl WallClock {
    /// Initializes a new [`WallClock`].
    pub fn new() -> Self {
        Self
    }
}

impl Clock for WallClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Represents a virtual [clock](Clock) that can be wound forward for tests.
#[derive(Clone)]
pub struct VirtualClock(Arc<RwLock<SystemTime>>);

impl VirtualClock {
    /// Initializes a new [`VirtualClock`] pinned to the current time.
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(SystemTime::now())))
    }

    /// Sets the clock to a specific date and time.
    pub fn set(&self, when: SystemTime) {
        *self.0.write().unwrap() = when;
    }

    /// Winds the clock forward by the given duration.
    pub fn advance(&self, by: std::time::Duration) {
        let mut guard = self.0.write().unwrap();
        *guard += by;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> SystemTime {
        *self.0.read().unwrap()
    }
}

impl Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("VirtualClock").field(&self.now()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn advancing_virtual_clock_moves_now_forward() {
        let clock = VirtualClock::new();
        let before = clock.now();

        clock.advance(Duration::from_secs(3600));

        assert_eq!(clock.now(), before + Duration::from_secs(3600));
    }

    #[test]
    fn wall_clock_tracks_real_time() {
        let clock = WallClock::new();
        let before = SystemTime::now();
        let observed = clock.now();

        assert!(observed >= before);
    }
}
