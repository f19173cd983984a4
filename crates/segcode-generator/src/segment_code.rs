use crate::error::Result;
use crate::obfuscator::{Obfuscator, ObfuscatorSettings};
use crate::settings::SegmentSettings;
use crate::window::SegmentWindow;
use crate::Generator;
use async_trait::async_trait;
use segcode_core::{Base62Codec, SegmentStore, ShortCode};
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// Seven base62 digits cover the default modulus of 62^7.
pub const DEFAULT_CODE_LENGTH: usize = 7;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortCodeSettings {
    #[builder(default)]
    pub segment: SegmentSettings,
    #[builder(default)]
    pub obfuscator: ObfuscatorSettings,
    #[builder(default = DEFAULT_CODE_LENGTH)]
    pub code_length: usize,
}

impl Default for ShortCodeSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Segment ids, obfuscated and rendered as fixed-width base62.
///
/// Codes are unique for as long as the counter stays below the obfuscation
/// modulus. Past that point generation fails with
/// [`GeneratorError::IdOutOfRange`](crate::GeneratorError::IdOutOfRange).
pub struct SegmentShortCodeGenerator<S> {
    window: SegmentWindow<S>,
    obfuscator: Obfuscator,
    codec: Base62Codec,
}

impl<S: SegmentStore> SegmentShortCodeGenerator<S> {
    /// Validates every setting up front; nothing touches the store yet.
    pub fn new(store: Arc<S>, settings: ShortCodeSettings) -> Result<Self> {
        let obfuscator = Obfuscator::new(settings.obfuscator)?;
        let codec = Base62Codec::new(settings.code_length)?;
        codec.ensure_fits(obfuscator.modulus())?;
        let window = SegmentWindow::new(store, settings.segment)?;

        Ok(Self {
            window,
            obfuscator,
            codec,
        })
    }

    pub async fn ensure_initialized(&self) -> Result<()> {
        self.window.ensure_initialized().await
    }

    pub async fn generate_short_code(&self) -> Result<ShortCode> {
        let id = self.window.next_id().await?;
        let obfuscated = self.obfuscator.transform(id)?;
        Ok(self.codec.encode(obfuscated)?)
    }

    /// Recovers the raw segment id a code was generated from.
    pub fn decode(&self, code: &str) -> Result<u64> {
        let obfuscated = self.codec.decode(code)?;
        self.obfuscator.invert(obfuscated)
    }

    pub fn window(&self) -> &SegmentWindow<S> {
        &self.window
    }

    pub fn obfuscator(&self) -> &Obfuscator {
        &self.obfuscator
    }

    pub fn codec(&self) -> &Base62Codec {
        &self.codec
    }
}

#[async_trait]
impl<S: SegmentStore> Generator for SegmentShortCodeGenerator<S> {
    async fn generate(&self) -> Result<ShortCode> {
        self.generate_short_code().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorError;
    use segcode_core::{CodecError, ConfigError};
    use segcode_storage::InMemorySegmentStore;
    use std::collections::HashSet;

    fn generator(settings: ShortCodeSettings) -> SegmentShortCodeGenerator<InMemorySegmentStore> {
        SegmentShortCodeGenerator::new(Arc::new(InMemorySegmentStore::new()), settings).unwrap()
    }

    #[tokio::test]
    async fn codes_are_fixed_width_unique_and_reversible() {
        let generator = generator(
            ShortCodeSettings::builder()
                .segment(SegmentSettings::builder().step(100).prefetch_threshold(10).build())
                .build(),
        );

        let mut seen = HashSet::new();
        for expected_id in 1..=1000 {
            let code = generator.generate_short_code().await.unwrap();
            assert_eq!(code.as_str().len(), DEFAULT_CODE_LENGTH);
            assert_eq!(generator.decode(code.as_str()).unwrap(), expected_id);
            assert!(seen.insert(code));
        }
    }

    #[tokio::test]
    async fn consecutive_ids_do_not_give_consecutive_codes() {
        let generator = generator(ShortCodeSettings::default());

        let first = generator.generate_short_code().await.unwrap();
        let second = generator.generate_short_code().await.unwrap();

        let codec = generator.codec();
        let a = codec.decode(first.as_str()).unwrap();
        let b = codec.decode(second.as_str()).unwrap();
        assert_ne!(a.abs_diff(b), 1);
        assert_eq!(first.as_str(), "01ive1d");
    }

    #[tokio::test]
    async fn ids_past_the_modulus_are_rejected() {
        let settings = ShortCodeSettings::builder()
            .segment(SegmentSettings::builder().initial_value(60).step(10).build())
            .obfuscator(ObfuscatorSettings::builder().prime(7).modulus(62).build())
            .code_length(1)
            .build();
        let generator = generator(settings);

        let code = generator.generate_short_code().await.unwrap();
        assert_eq!(generator.decode(code.as_str()).unwrap(), 61);

        let err = generator.generate_short_code().await.unwrap_err();
        assert_eq!(err, GeneratorError::IdOutOfRange { id: 62, modulus: 62 });
    }

    #[test]
    fn rejects_modulus_larger_than_code_space() {
        let settings = ShortCodeSettings::builder().code_length(6).build();
        let result = SegmentShortCodeGenerator::new(Arc::new(InMemorySegmentStore::new()), settings);
        assert!(matches!(
            result,
            Err(GeneratorError::Configuration(ConfigError::ModulusExceedsCodeSpace { .. }))
        ));
    }

    #[test]
    fn rejects_non_coprime_prime() {
        let settings = ShortCodeSettings::builder()
            .obfuscator(ObfuscatorSettings::builder().prime(62).build())
            .build();
        let result = SegmentShortCodeGenerator::new(Arc::new(InMemorySegmentStore::new()), settings);
        assert!(matches!(
            result,
            Err(GeneratorError::Configuration(ConfigError::NotCoprime { .. }))
        ));
    }

    #[test]
    fn decode_rejects_malformed_codes() {
        let generator = generator(ShortCodeSettings::default());

        assert_eq!(
            generator.decode("abc"),
            Err(GeneratorError::Codec(CodecError::InvalidLength {
                expected: 7,
                actual: 3
            }))
        );
        assert!(matches!(
            generator.decode("abc-def"),
            Err(GeneratorError::Codec(CodecError::InvalidCharacter { character: '-', position: 3 }))
        ));
        // "zzzzzzz" is 62^7 - 1, the last value below the modulus.
        assert!(generator.decode("zzzzzzz").is_ok());
    }

    #[tokio::test]
    async fn works_as_a_generator_trait_object() {
        let generator: Box<dyn Generator> = Box::new(generator(ShortCodeSettings::default()));
        let first = generator.generate().await.unwrap();
        let second = generator.generate().await.unwrap();
        assert_ne!(first, second);
    }
}
