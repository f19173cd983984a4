use jiff::Timestamp;

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
    /// Block until the clock reaches the target time.
    fn wait_until(&self, target: Timestamp);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn wait_until(&self, target: Timestamp) {
        // Callers only ever wait for the next millisecond, which is shorter
        // than any sleep the OS would honour, so spin instead.
        while Timestamp::now() < target {
            std::thread::yield_now();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use crate::clock::Clock;
    use jiff::Timestamp;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    pub(crate) struct TestClock {
        inner: Arc<Mutex<TestClockState>>,
    }

    struct TestClockState {
        now: Timestamp,
        waits: usize,
    }

    impl TestClock {
        pub(crate) fn from_millis(millis: i64) -> Self {
            let now = Timestamp::from_millisecond(millis).expect("valid test timestamp");
            Self {
                inner: Arc::new(Mutex::new(TestClockState { now, waits: 0 })),
            }
        }

        /// Moves the clock to an arbitrary time, including backwards.
        pub(crate) fn set_millis(&self, millis: i64) {
            let mut state = self.inner.lock().expect("test clock lock should not be poisoned");
            state.now = Timestamp::from_millisecond(millis).expect("valid test timestamp");
        }

        /// Number of times a caller had to wait for the clock.
        pub(crate) fn waits(&self) -> usize {
            self.inner
                .lock()
                .expect("test clock lock should not be poisoned")
                .waits
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            self.inner
                .lock()
                .expect("test clock lock should not be poisoned")
                .now
        }

        fn wait_until(&self, target: Timestamp) {
            let mut state = self
                .inner
                .lock()
                .expect("test clock lock should not be poisoned");
            // jump straight to the target; tests never need to block
            state.waits += 1;
            if target > state.now {
                state.now = target;
            }
        }
    }

    #[test]
    fn test_clock_works() {
        let clock = TestClock::from_millis(1_000);
        assert_eq!(clock.now().as_millisecond(), 1_000);

        clock.wait_until(Timestamp::from_millisecond(1_001).unwrap());
        assert_eq!(clock.now().as_millisecond(), 1_001);
        assert_eq!(clock.waits(), 1);

        clock.set_millis(900);
        assert_eq!(clock.now().as_millisecond(), 900);
    }

    #[test]
    fn system_clock_waits_past_target() {
        let clock = super::SystemClock;
        let target = Timestamp::from_millisecond(clock.now().as_millisecond() + 2).unwrap();
        clock.wait_until(target);
        assert!(clock.now() >= target);
    }
}
