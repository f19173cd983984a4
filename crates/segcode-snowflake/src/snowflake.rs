use crate::{
    clock::{Clock, SystemClock},
    error::Error,
    snowflake_id::{MAX_DATACENTER_ID, MAX_SEQUENCE, MAX_TIMESTAMP, MAX_WORKER_ID},
    SnowflakeId,
};
use jiff::Timestamp;
use std::sync::Mutex;
use tracing::{error, trace};
use typed_builder::TypedBuilder;

/// Default epoch, 2010-11-04T01:42:54.657Z.
pub const DEFAULT_EPOCH: Timestamp = Timestamp::constant(1_288_834_974, 657_000_000);

/// Configures a Snowflake generator instance.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SnowflakeSettings {
    /// Worker index in the range `[0, 31]`, unique within the datacenter.
    pub worker_id: u8,
    /// Datacenter index in the range `[0, 31]`.
    pub datacenter_id: u8,
    /// Zero point of the 41-bit millisecond timestamp field.
    #[builder(default = DEFAULT_EPOCH)]
    pub epoch: Timestamp,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_millis: Option<i64>,
    sequence: u16,
}

/// Snowflake id generator.
///
/// Within one millisecond the sequence counts up; once it wraps the
/// generator waits for the next millisecond. A clock that moves backwards
/// is reported as [`Error::ClockRegression`] instead of risking duplicates.
pub struct Snowflake<C: Clock = SystemClock> {
    epoch: Timestamp,
    epoch_ms: i64,
    worker_id: u8,
    datacenter_id: u8,
    clock: C,
    state: Mutex<GeneratorState>,
}

impl Snowflake<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(settings: SnowflakeSettings) -> Result<Self, Error> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Snowflake<C> {
    pub fn with_clock(settings: SnowflakeSettings, clock: C) -> Result<Self, Error> {
        if settings.worker_id > MAX_WORKER_ID {
            return Err(Error::InvalidWorkerId {
                worker_id: settings.worker_id,
                max: MAX_WORKER_ID,
            });
        }
        if settings.datacenter_id > MAX_DATACENTER_ID {
            return Err(Error::InvalidDatacenterId {
                datacenter_id: settings.datacenter_id,
                max: MAX_DATACENTER_ID,
            });
        }

        let epoch_ms = settings.epoch.as_millisecond();
        let now_ms = clock.now().as_millisecond();
        if epoch_ms > now_ms {
            return Err(Error::EpochAhead { epoch_ms, now_ms });
        }

        Ok(Self {
            epoch: settings.epoch,
            epoch_ms,
            worker_id: settings.worker_id,
            datacenter_id: settings.datacenter_id,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn epoch(&self) -> Timestamp {
        self.epoch
    }

    pub fn worker_id(&self) -> u8 {
        self.worker_id
    }

    pub fn datacenter_id(&self) -> u8 {
        self.datacenter_id
    }

    /// Generates the next unique id.
    pub fn next_id(&self) -> Result<SnowflakeId, Error> {
        let mut state = self.state.lock().map_err(|_| Error::StatePoisoned)?;

        let mut now_ms = self.clock.now().as_millisecond();

        match state.last_millis {
            None => state.sequence = 0,
            Some(last_ms) if now_ms < last_ms => {
                error!(last_ms, now_ms, "clock moved backwards");
                return Err(Error::ClockRegression { last_ms, now_ms });
            }
            Some(last_ms) if now_ms == last_ms => {
                state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
                if state.sequence == 0 {
                    trace!(last_ms, "sequence exhausted, waiting for next millisecond");
                    now_ms = self.wait_past(last_ms)?;
                }
            }
            Some(_) => state.sequence = 0,
        }

        let elapsed = now_ms - self.epoch_ms;
        if elapsed < 0 {
            return Err(Error::EpochAhead {
                epoch_ms: self.epoch_ms,
                now_ms,
            });
        }
        if elapsed as u64 > MAX_TIMESTAMP {
            return Err(Error::OverTimeLimit);
        }

        let id = SnowflakeId::new()
            .with_timestamp(elapsed as u64)
            .with_datacenter_id(self.datacenter_id)
            .with_worker_id(self.worker_id)
            .with_sequence(state.sequence);

        state.last_millis = Some(now_ms);

        Ok(id)
    }

    /// Waits until the clock reads a millisecond later than `last_ms`.
    fn wait_past(&self, last_ms: i64) -> Result<i64, Error> {
        let target = Timestamp::from_millisecond(last_ms + 1).map_err(|_| Error::OverTimeLimit)?;
        loop {
            self.clock.wait_until(target);
            let now_ms = self.clock.now().as_millisecond();
            if now_ms > last_ms {
                return Ok(now_ms);
            }
        }
    }
}
