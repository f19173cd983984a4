use crate::error::{GeneratorError, Result};
use segcode_core::ConfigError;
use typed_builder::TypedBuilder;

/// 62^7, the size of the seven-character base62 code space.
pub const DEFAULT_MODULUS: u64 = 3_521_614_606_208;
/// A prime coprime with [`DEFAULT_MODULUS`].
pub const DEFAULT_PRIME: u64 = 1_580_030_173;

/// Parameters of the modular-multiplication transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct ObfuscatorSettings {
    #[builder(default = DEFAULT_PRIME)]
    pub prime: u64,
    /// Must exceed the largest id the generator will ever produce.
    #[builder(default = DEFAULT_MODULUS)]
    pub modulus: u64,
}

impl Default for ObfuscatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A reversible transform that decorrelates sequential ids.
///
/// `transform(id) = id * prime mod modulus` is a bijection over
/// `[0, modulus)` whenever `gcd(prime, modulus) = 1`, and `invert`
/// multiplies by the modular inverse of `prime` to undo it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obfuscator {
    prime: u64,
    modulus: u64,
    inverse: u64,
}

impl Obfuscator {
    pub fn new(settings: ObfuscatorSettings) -> std::result::Result<Self, ConfigError> {
        let ObfuscatorSettings { prime, modulus } = settings;
        if modulus < 2 {
            return Err(ConfigError::ModulusTooSmall);
        }
        if prime == 0 || prime >= modulus {
            return Err(ConfigError::PrimeOutOfRange { prime, modulus });
        }
        let inverse =
            mod_inverse(prime, modulus).ok_or(ConfigError::NotCoprime { prime, modulus })?;

        Ok(Self {
            prime,
            modulus,
            inverse,
        })
    }

    pub fn prime(&self) -> u64 {
        self.prime
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// The multiplicative inverse of `prime` modulo `modulus`.
    pub fn inverse(&self) -> u64 {
        self.inverse
    }

    pub fn transform(&self, id: u64) -> Result<u64> {
        self.ensure_in_range(id)?;
        Ok(mul_mod(id, self.prime, self.modulus))
    }

    pub fn invert(&self, obfuscated: u64) -> Result<u64> {
        self.ensure_in_range(obfuscated)?;
        Ok(mul_mod(obfuscated, self.inverse, self.modulus))
    }

    fn ensure_in_range(&self, value: u64) -> Result<()> {
        // Reducing an out-of-range id would collide with a smaller one.
        if value >= self.modulus {
            return Err(GeneratorError::IdOutOfRange {
                id: value,
                modulus: self.modulus,
            });
        }
        Ok(())
    }
}

fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

/// Extended Euclid. Returns `None` when `gcd(a, m) != 1`.
fn mod_inverse(a: u64, m: u64) -> Option<u64> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1_i128, 0_i128);

    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }

    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn gcd(a: u64, b: u64) -> u64 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }

    fn obfuscator(prime: u64, modulus: u64) -> Obfuscator {
        Obfuscator::new(ObfuscatorSettings { prime, modulus }).unwrap()
    }

    #[test]
    fn default_settings_are_valid() {
        let obfuscator = Obfuscator::new(ObfuscatorSettings::default()).unwrap();
        assert_eq!(obfuscator.modulus(), 62_u64.pow(7));
        assert_eq!(
            mul_mod(obfuscator.prime(), obfuscator.inverse(), obfuscator.modulus()),
            1
        );
    }

    #[test]
    fn bijection_for_every_coprime_pair_of_small_moduli() {
        for modulus in 2..=64_u64 {
            for prime in (1..modulus).filter(|p| gcd(*p, modulus) == 1) {
                let obfuscator = obfuscator(prime, modulus);
                let mut images = HashSet::new();

                for id in 0..modulus {
                    let obfuscated = obfuscator.transform(id).unwrap();
                    assert!(obfuscated < modulus);
                    assert!(images.insert(obfuscated), "collision at {prime}/{modulus}");
                    assert_eq!(obfuscator.invert(obfuscated).unwrap(), id);
                }
                assert_eq!(images.len() as u64, modulus);
            }
        }
    }

    #[test]
    fn bijection_over_two_character_code_space() {
        let obfuscator = obfuscator(1013, 3844);
        let images: HashSet<u64> = (0..3844)
            .map(|id| obfuscator.transform(id).unwrap())
            .collect();
        assert_eq!(images.len(), 3844);
    }

    #[test]
    fn round_trips_sampled_production_ids() {
        let obfuscator = Obfuscator::new(ObfuscatorSettings::default()).unwrap();
        let last = obfuscator.modulus() - 1;

        for id in (0..200_000).chain(last - 1000..=last).chain([1 << 40, 987_654_321_012]) {
            let obfuscated = obfuscator.transform(id).unwrap();
            assert_eq!(obfuscator.invert(obfuscated).unwrap(), id);
        }
    }

    #[test]
    fn consecutive_ids_are_not_consecutive_after_transform() {
        let obfuscator = Obfuscator::new(ObfuscatorSettings::default()).unwrap();
        for id in 1001..1100 {
            let a = obfuscator.transform(id).unwrap();
            let b = obfuscator.transform(id + 1).unwrap();
            assert_ne!(b.wrapping_sub(a), 1);
        }
    }

    #[test]
    fn rejects_non_coprime_prime() {
        let err = Obfuscator::new(ObfuscatorSettings {
            prime: 62,
            modulus: 3844,
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotCoprime {
                prime: 62,
                modulus: 3844
            }
        );
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert_eq!(
            Obfuscator::new(ObfuscatorSettings {
                prime: 1,
                modulus: 1
            }),
            Err(ConfigError::ModulusTooSmall)
        );
        assert_eq!(
            Obfuscator::new(ObfuscatorSettings {
                prime: 0,
                modulus: 10
            }),
            Err(ConfigError::PrimeOutOfRange {
                prime: 0,
                modulus: 10
            })
        );
        assert_eq!(
            Obfuscator::new(ObfuscatorSettings {
                prime: 11,
                modulus: 10
            }),
            Err(ConfigError::PrimeOutOfRange {
                prime: 11,
                modulus: 10
            })
        );
    }

    #[test]
    fn ids_outside_modulus_are_rejected() {
        let obfuscator = obfuscator(7, 100);
        assert_eq!(
            obfuscator.transform(100),
            Err(GeneratorError::IdOutOfRange {
                id: 100,
                modulus: 100
            })
        );
    }
}
