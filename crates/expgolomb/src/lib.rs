//! Exponential-Golomb coding on top of the [`bytes_util`] bit reader and writer.
//!
//! H.264 uses `ue(v)` and `se(v)` codes for almost every header field, see
//! ISO/IEC 14496-10 clause 9.1.
//!
//! ```rust
//! # fn run() -> std::io::Result<()> {
//! use bytes_util::{BitReader, BitWriter};
//! use expgolomb::{BitReaderExpGolombExt, BitWriterExpGolombExt};
//!
//! let mut writer = BitWriter::<Vec<u8>>::default();
//! writer.write_exp_golomb(7)?;
//! writer.write_signed_exp_golomb(-2)?;
//!
//! let mut reader = BitReader::new_from_slice(writer.finish()?);
//! assert_eq!(reader.read_exp_golomb()?, 7);
//! assert_eq!(reader.read_signed_exp_golomb()?, -2);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::io;

use bytes_util::{BitReader, BitWriter};

/// A `ue(v)` code never has more leading zeros than this when it fits a u64.
const MAX_LEADING_ZEROS: u32 = 63;

/// Reading `ue(v)` / `se(v)` codes.
pub trait BitReaderExpGolombExt {
    /// Reads an unsigned code.
    fn read_exp_golomb(&mut self) -> io::Result<u64>;

    /// Reads a signed code (`k` maps to `(-1)^(k+1) * ceil(k / 2)`).
    fn read_signed_exp_golomb(&mut self) -> io::Result<i64> {
        let code = self.read_exp_golomb()?;
        let magnitude = code.div_ceil(2) as i64;
        Ok(if code % 2 == 0 { -magnitude } else { magnitude })
    }
}

impl<R: io::Read> BitReaderExpGolombExt for BitReader<R> {
    fn read_exp_golomb(&mut self) -> io::Result<u64> {
        let mut leading_zeros = 0u32;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > MAX_LEADING_ZEROS {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "exp-golomb code longer than 64 bits",
                ));
            }
        }

        let suffix = self.read_bits(leading_zeros as u8)?;
        Ok(((1u64 << leading_zeros) - 1) + suffix)
    }
}

/// Writing `ue(v)` / `se(v)` codes.
pub trait BitWriterExpGolombExt {
    /// Writes an unsigned code.
    fn write_exp_golomb(&mut self, value: u64) -> io::Result<()>;

    /// Writes a signed code.
    fn write_signed_exp_golomb(&mut self, value: i64) -> io::Result<()> {
        let code = if value <= 0 {
            value.unsigned_abs() * 2
        } else {
            value as u64 * 2 - 1
        };
        self.write_exp_golomb(code)
    }
}

impl<W: io::Write> BitWriterExpGolombExt for BitWriter<W> {
    fn write_exp_golomb(&mut self, value: u64) -> io::Result<()> {
        let Some(code) = value.checked_add(1) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "u64::MAX has no exp-golomb code",
            ));
        };

        let width = 64 - code.leading_zeros();
        self.write_bits(0, (width - 1) as u8)?;
        self.write_bits(code, width as u8)
    }
}

/// Bit length of the `ue(v)` code for `value`.
pub fn size_of_exp_golomb(value: u64) -> u64 {
    let width = 64 - value.saturating_add(1).leading_zeros() as u64;
    width * 2 - 1
}
