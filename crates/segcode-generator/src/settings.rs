use segcode_core::{ConfigError, DEFAULT_BUSINESS_KEY, MAX_BUSINESS_KEY_LEN};
use std::fmt::{Display, Formatter};
use typed_builder::TypedBuilder;

/// What `next_id` does when called before the window has been initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupPolicy {
    /// Perform (or join) initialization and then serve the id.
    #[default]
    Block,
    /// Fail with [`GeneratorError::NotInitialized`](crate::GeneratorError::NotInitialized)
    /// until `ensure_initialized` has completed.
    FailFast,
}

impl Display for StartupPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupPolicy::Block => write!(f, "block"),
            StartupPolicy::FailFast => write!(f, "fail-fast"),
        }
    }
}

/// Configures a segment window and its counter.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct SegmentSettings {
    /// Namespace of the counter row.
    #[builder(default = DEFAULT_BUSINESS_KEY.to_string(), setter(into))]
    pub business_key: String,
    /// `current_max` of a freshly created counter; the first id is one above it.
    #[builder(default = 0)]
    pub initial_value: u64,
    /// Number of ids per segment.
    #[builder(default = 1000)]
    pub step: u64,
    /// Prefetch starts once this many ids or fewer remain in the current segment.
    #[builder(default = 100)]
    pub prefetch_threshold: u64,
    #[builder(default)]
    pub startup: StartupPolicy,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SegmentSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.business_key.is_empty() {
            return Err(ConfigError::EmptyBusinessKey);
        }
        let len = self.business_key.chars().count();
        if len > MAX_BUSINESS_KEY_LEN {
            return Err(ConfigError::BusinessKeyTooLong {
                len,
                max: MAX_BUSINESS_KEY_LEN,
            });
        }
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = SegmentSettings::default();
        assert_eq!(settings.business_key, "short_link");
        assert_eq!(settings.step, 1000);
        assert_eq!(settings.prefetch_threshold, 100);
        assert_eq!(settings.startup, StartupPolicy::Block);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_settings() {
        let settings = SegmentSettings::builder().step(0).build();
        assert_eq!(settings.validate(), Err(ConfigError::ZeroStep));

        let settings = SegmentSettings::builder().business_key("").build();
        assert_eq!(settings.validate(), Err(ConfigError::EmptyBusinessKey));
    }

    #[test]
    fn business_key_must_fit_the_counter_column() {
        let longest = "k".repeat(MAX_BUSINESS_KEY_LEN);
        let settings = SegmentSettings::builder().business_key(longest).build();
        assert!(settings.validate().is_ok());

        let too_long = "k".repeat(MAX_BUSINESS_KEY_LEN + 1);
        let settings = SegmentSettings::builder().business_key(too_long).build();
        assert_eq!(
            settings.validate(),
            Err(ConfigError::BusinessKeyTooLong { len: 65, max: 64 })
        );
    }
}
