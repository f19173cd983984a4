use crate::error::{CodecError, ConfigError};
use crate::shortcode::ShortCode;
use smol_str::SmolStr;

/// Digits, then uppercase, then lowercase. `'0'` is the zero digit used for padding.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: u64 = 62;

/// The widest code that is still useful: 62^11 is the first power above `u64::MAX`.
pub const MAX_CODE_LENGTH: usize = 11;

/// A fixed-width base62 codec.
///
/// Every value below `62^code_length` maps to exactly one code of exactly
/// `code_length` characters, most significant digit first. Short encodings
/// are left-padded with the zero digit, so [`decode`](Self::decode) is the
/// exact inverse of [`encode`](Self::encode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base62Codec {
    code_length: usize,
    capacity: u128,
}

impl Base62Codec {
    pub fn new(code_length: usize) -> Result<Self, ConfigError> {
        if code_length == 0 {
            return Err(ConfigError::ZeroCodeLength);
        }
        if code_length > MAX_CODE_LENGTH {
            return Err(ConfigError::CodeLengthTooLong {
                code_length,
                max: MAX_CODE_LENGTH,
            });
        }

        Ok(Self {
            code_length,
            capacity: (BASE as u128).pow(code_length as u32),
        })
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    /// Number of distinct codes, `62^code_length`.
    pub fn capacity(&self) -> u128 {
        self.capacity
    }

    /// Checks that every value in `[0, modulus)` has a code of this width.
    pub fn ensure_fits(&self, modulus: u64) -> Result<(), ConfigError> {
        if modulus as u128 > self.capacity {
            return Err(ConfigError::ModulusExceedsCodeSpace {
                modulus,
                code_length: self.code_length,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn encode(&self, value: u64) -> Result<ShortCode, CodecError> {
        if value as u128 >= self.capacity {
            return Err(CodecError::OutOfRange {
                value: value as u128,
                code_length: self.code_length,
            });
        }

        let mut digits = [ALPHABET[0]; MAX_CODE_LENGTH];
        let mut rest = value;
        for slot in digits[..self.code_length].iter_mut().rev() {
            *slot = ALPHABET[(rest % BASE) as usize];
            rest /= BASE;
            if rest == 0 {
                break;
            }
        }

        let code: SmolStr = digits[..self.code_length]
            .iter()
            .map(|&b| char::from(b))
            .collect();
        Ok(ShortCode::new_unchecked(code))
    }

    pub fn decode(&self, code: &str) -> Result<u64, CodecError> {
        let actual = code.chars().count();
        if actual != self.code_length {
            return Err(CodecError::InvalidLength {
                expected: self.code_length,
                actual,
            });
        }

        let mut value: u128 = 0;
        for (position, character) in code.chars().enumerate() {
            let digit = digit_value(character)
                .ok_or(CodecError::InvalidCharacter { character, position })?;
            value = value * BASE as u128 + digit as u128;
        }

        u64::try_from(value).map_err(|_| CodecError::OutOfRange {
            value,
            code_length: self.code_length,
        })
    }
}

fn digit_value(c: char) -> Option<u64> {
    let digit = match c {
        '0'..='9' => c as u64 - '0' as u64,
        'A'..='Z' => c as u64 - 'A' as u64 + 10,
        'a'..='z' => c as u64 - 'a' as u64 + 36,
        _ => return None,
    };
    Some(digit)
}
