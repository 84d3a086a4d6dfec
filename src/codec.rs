//! Generic bit-packing text codec.
//!
//! [`BaseN`] maps bytes onto an alphabet of `2^g` symbols by consuming the
//! input `g` bits at a time, most significant bit first. The final symbol is
//! zero-filled on the right when the input does not divide evenly. Decoding
//! reverses the process and silently drops any incomplete trailing bits, so
//! `decode(encode(x)) == x` for every byte string.
//!
//! The production instance is [`BASE32_HEX`]: lowercase base32-hex with five
//! bits per symbol and padding to multiples of eight symbols.

use thiserror::Error;

/// Character appended by [`BaseN::encode_padded`].
pub const PAD_CHAR: char = '=';

/// Lowercase base32-hex: `0-9a-v`, 5 bits per symbol, padded to 8 symbols.
pub const BASE32_HEX: BaseN = BaseN {
    alphabet: "0123456789abcdefghijklmnopqrstuv",
    bits: 5,
    pad_multiple: 8,
};

/// Errors raised while constructing a codec or decoding text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A character outside the alphabet was found.
    #[error("symbol {symbol:?} at position {position} is outside the alphabet")]
    InvalidSymbol { symbol: char, position: usize },
    /// The alphabet size does not equal `2^bits`.
    #[error("alphabet of {len} symbols does not match {bits} bits per symbol")]
    InvalidAlphabet { len: usize, bits: u32 },
}

/// Bit-packing codec parameterized by alphabet, group size and padding unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaseN {
    alphabet: &'static str,
    bits: u32,
    pad_multiple: usize,
}

impl BaseN {
    /// Build a codec, checking that `alphabet` holds exactly `2^bits` distinct
    /// ASCII symbols and that `bits` lies in `1..=8`.
    pub fn new(
        alphabet: &'static str,
        bits: u32,
        pad_multiple: usize,
    ) -> Result<Self, DecodeError> {
        let invalid = DecodeError::InvalidAlphabet {
            len: alphabet.len(),
            bits,
        };
        if !(1..=8).contains(&bits) || !alphabet.is_ascii() || alphabet.len() != 1 << bits {
            return Err(invalid);
        }
        let bytes = alphabet.as_bytes();
        let distinct = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| !bytes[..i].contains(b) && char::from(*b) != PAD_CHAR);
        if !distinct {
            return Err(invalid);
        }
        Ok(Self {
            alphabet,
            bits,
            pad_multiple: pad_multiple.max(1),
        })
    }

    /// Bits consumed per output symbol.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of symbols [`encode`](Self::encode) produces for `len` bytes.
    pub fn encoded_len(&self, len: usize) -> usize {
        (len * 8).div_ceil(self.bits as usize)
    }

    /// Encode without padding.
    pub fn encode(&self, input: &[u8]) -> String {
        let symbols = self.alphabet.as_bytes();
        let mask = (1u32 << self.bits) - 1;
        let mut out = String::with_capacity(self.encoded_len(input.len()));
        let mut acc: u32 = 0;
        let mut acc_bits: u32 = 0;
        for &byte in input {
            acc = (acc << 8) | u32::from(byte);
            acc_bits += 8;
            while acc_bits >= self.bits {
                acc_bits -= self.bits;
                out.push(char::from(symbols[((acc >> acc_bits) & mask) as usize]));
            }
            acc &= (1 << acc_bits) - 1;
        }
        if acc_bits > 0 {
            let index = (acc << (self.bits - acc_bits)) & mask;
            out.push(char::from(symbols[index as usize]));
        }
        out
    }

    /// Encode and pad the output to a multiple of the padding unit.
    pub fn encode_padded(&self, input: &[u8]) -> String {
        let mut out = self.encode(input);
        while out.len() % self.pad_multiple != 0 {
            out.push(PAD_CHAR);
        }
        out
    }

    /// Decode text produced by either encode variant.
    ///
    /// Trailing padding is stripped first. Any other character outside the
    /// alphabet yields [`DecodeError::InvalidSymbol`].
    pub fn decode(&self, input: &str) -> Result<Vec<u8>, DecodeError> {
        let trimmed = input.trim_end_matches(PAD_CHAR);
        let mut out = Vec::with_capacity(trimmed.len() * self.bits as usize / 8);
        let mut acc: u32 = 0;
        let mut acc_bits: u32 = 0;
        for (position, symbol) in trimmed.chars().enumerate() {
            let value = self
                .value_of(symbol)
                .ok_or(DecodeError::InvalidSymbol { symbol, position })?;
            acc = (acc << self.bits) | value;
            acc_bits += self.bits;
            if acc_bits >= 8 {
                acc_bits -= 8;
                out.push((acc >> acc_bits) as u8);
                acc &= (1 << acc_bits) - 1;
            }
        }
        Ok(out)
    }

    fn value_of(&self, symbol: char) -> Option<u32> {
        if !symbol.is_ascii() {
            return None;
        }
        self.alphabet
            .bytes()
            .position(|b| char::from(b) == symbol)
            .map(|i| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const BASE64_URL: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    #[rstest]
    #[case(b"", "")]
    #[case(b"f", "co")]
    #[case(b"fo", "cpng")]
    #[case(b"foo", "cpnmu")]
    #[case(b"foob", "cpnmuog")]
    #[case(b"fooba", "cpnmuoj1")]
    #[case(b"foobar", "cpnmuoj1e8")]
    fn encodes_rfc4648_base32hex_vectors_in_lowercase(
        #[case] input: &[u8],
        #[case] expected: &str,
    ) {
        assert_eq!(BASE32_HEX.encode(input), expected);
        assert_eq!(BASE32_HEX.decode(expected).unwrap(), input);
    }

    #[test]
    fn pads_to_eight_symbol_groups() {
        assert_eq!(BASE32_HEX.encode_padded(b"f"), "co======");
        assert_eq!(BASE32_HEX.encode_padded(b"fooba"), "cpnmuoj1");
        assert_eq!(BASE32_HEX.decode("co======").unwrap(), b"f");
    }

    #[test]
    fn rejects_symbols_outside_alphabet() {
        let err = BASE32_HEX.decode("cpnmw").unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidSymbol {
                symbol: 'w',
                position: 4
            }
        );
        assert!(BASE32_HEX.decode("CPNMU").is_err());
        assert!(BASE32_HEX.decode("co=o").is_err());
    }

    #[test]
    fn drops_incomplete_trailing_bits() {
        // A lone symbol carries only five bits, not enough for a byte.
        assert_eq!(BASE32_HEX.decode("c").unwrap(), Vec::<u8>::new());
    }

    #[rstest]
    #[case("0123", 2)]
    #[case("0123456", 3)]
    #[case("00", 1)]
    #[case("01", 0)]
    #[case("0=", 1)]
    fn rejects_malformed_alphabets(#[case] alphabet: &'static str, #[case] bits: u32) {
        assert!(matches!(
            BaseN::new(alphabet, bits, 1),
            Err(DecodeError::InvalidAlphabet { .. })
        ));
    }

    #[test]
    fn accepts_other_group_sizes() {
        let codec = BaseN::new(BASE64_URL, 6, 4).expect("valid base64 alphabet");
        assert_eq!(codec.encode(b"Man"), "TWFu");
        assert_eq!(codec.encode_padded(b"Ma"), "TWE=");
        assert_eq!(codec.decode("TWE=").unwrap(), b"Ma");
    }

    proptest! {
        #[test]
        fn base32hex_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(BASE32_HEX.decode(&BASE32_HEX.encode(&bytes)).unwrap(), bytes.clone());
            prop_assert_eq!(BASE32_HEX.decode(&BASE32_HEX.encode_padded(&bytes)).unwrap(), bytes);
        }

        #[test]
        fn any_group_size_round_trips(
            bits in 1u32..=6,
            bytes in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            let alphabet = &BASE64_URL[..1 << bits];
            let codec = BaseN::new(alphabet, bits, 4).unwrap();
            prop_assert_eq!(codec.encoded_len(bytes.len()), codec.encode(&bytes).len());
            prop_assert_eq!(codec.decode(&codec.encode_padded(&bytes)).unwrap(), bytes);
        }
    }
}
