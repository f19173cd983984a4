use crate::error::Result;
use crate::Generator;
use async_trait::async_trait;
use segcode_core::base62::MAX_CODE_LENGTH;
use segcode_core::{Base62Codec, ShortCode};
use segcode_snowflake::{Clock, Snowflake, SnowflakeId, SystemClock};

/// Eleven base62 digits hold any `u64`.
pub const SNOWFLAKE_CODE_LENGTH: usize = MAX_CODE_LENGTH;

/// Snowflake ids rendered as fixed-width base62.
///
/// Needs no store, at the cost of longer codes than the segment pipeline.
pub struct SnowflakeShortCodeGenerator<C: Clock = SystemClock> {
    snowflake: Snowflake<C>,
    codec: Base62Codec,
}

impl<C: Clock> SnowflakeShortCodeGenerator<C> {
    pub fn new(snowflake: Snowflake<C>) -> Result<Self> {
        Ok(Self {
            snowflake,
            codec: Base62Codec::new(SNOWFLAKE_CODE_LENGTH)?,
        })
    }

    pub fn generate_short_code(&self) -> Result<ShortCode> {
        let id = self.snowflake.next_id()?;
        Ok(self.codec.encode(id.as_u64())?)
    }

    pub fn decode(&self, code: &str) -> Result<SnowflakeId> {
        Ok(SnowflakeId::from_u64(self.codec.decode(code)?))
    }

    pub fn snowflake(&self) -> &Snowflake<C> {
        &self.snowflake
    }
}

/// Runs [`Snowflake::next_id`] inline on the calling task. When a
/// millisecond's sequence is used up that call spins on the clock until the
/// next millisecond, so a worker thread can be held for up to a millisecond.
#[async_trait]
impl<C: Clock + 'static> Generator for SnowflakeShortCodeGenerator<C> {
    async fn generate(&self) -> Result<ShortCode> {
        self.generate_short_code()
    }
}
