use std::{
    convert::Infallible,
    io::{self, Read, Write},
};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::picture::Error;

/// Something that accepts a stream of bits, most significant bit first.
pub trait BitSink {
    /// What can go wrong while accepting bits
    type Error;

    /// Write the `bit_len` least significant bits of `data`
    fn write_bits(&mut self, data: u32, bit_len: u8) -> Result<(), Self::Error>;

    /// Number of bits accepted so far
    fn bits_written(&self) -> u64;
}

pub struct BitWriter<'a, O: Write + WriteBytesExt> {
    output: &'a mut O,

    current_byte: u8,
    bit_offset: u8,

    bits_written: u64,
}

impl<'a, O: Write + WriteBytesExt> BitWriter<'a, O> {
    /// Create a new bit writer over some output
    pub fn new(output: &'a mut O) -> Self {
        Self {
            output,

            current_byte: 0,
            bit_offset: 0,

            bits_written: 0,
        }
    }

    /// Append a single bit, emitting the byte once 8 bits are buffered
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.current_byte = (self.current_byte << 1) | bit as u8;
        self.bit_offset += 1;
        self.bits_written += 1;

        if self.bit_offset == 8 {
            self.output.write_u8(self.current_byte)?;
            self.current_byte = 0;
            self.bit_offset = 0;
        }

        Ok(())
    }

    /// Pad the last partial byte with zeroes and emit it.
    ///
    /// Consumes the writer, so nothing can be appended after the padding.
    /// Returns the number of bits written before padding.
    pub fn flush(self) -> io::Result<u64> {
        if self.bit_offset > 0 {
            let padded = self.current_byte << (8 - self.bit_offset);
            self.output.write_u8(padded)?;
        }
        self.output.flush()?;

        Ok(self.bits_written)
    }
}

impl<O: Write + WriteBytesExt> BitSink for BitWriter<'_, O> {
    type Error = io::Error;

    fn write_bits(&mut self, data: u32, bit_len: u8) -> io::Result<()> {
        if bit_len > 32 {
            panic!("Cannot write more than 32 bits at once");
        }

        for i in (0..bit_len).rev() {
            self.write_bit((data >> i) & 1 == 1)?;
        }

        Ok(())
    }

    fn bits_written(&self) -> u64 {
        self.bits_written
    }
}

/// A sink that only counts, for sizing a stream before writing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitCounter {
    bits: u64,
}

impl BitCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BitSink for BitCounter {
    type Error = Infallible;

    fn write_bits(&mut self, _data: u32, bit_len: u8) -> Result<(), Infallible> {
        self.bits += bit_len as u64;
        Ok(())
    }

    fn bits_written(&self) -> u64 {
        self.bits
    }
}

pub struct BitReader<'a, I: Read + ReadBytesExt> {
    input: &'a mut I,

    current_byte: u8,
    bits_left: u8,

    bytes_read: usize,
}

impl<'a, I: Read + ReadBytesExt> BitReader<'a, I> {
    /// Create a new bit reader over some input. Nothing is read until the
    /// first bit is requested.
    pub fn new(input: &'a mut I) -> Self {
        Self {
            input,

            current_byte: 0,
            bits_left: 0,

            bytes_read: 0,
        }
    }

    /// Number of whole bytes pulled from the input so far
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Read the next bit, refilling from the input when the buffered byte
    /// is used up
    pub fn read_bit(&mut self) -> Result<bool, Error> {
        if self.bits_left == 0 {
            self.current_byte = match self.input.read_u8() {
                Ok(byte) => byte,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(Error::UnexpectedEof {
                        bytes_read: self.bytes_read,
                    })
                }
                Err(e) => return Err(e.into()),
            };
            self.bytes_read += 1;
            self.bits_left = 8;
        }

        self.bits_left -= 1;
        Ok((self.current_byte >> self.bits_left) & 1 == 1)
    }

    /// Read `bit_len` bits, most significant first
    pub fn read_bits(&mut self, bit_len: u8) -> Result<u32, Error> {
        if bit_len > 32 {
            panic!("Cannot read more than 32 bits at once")
        }

        let mut result = 0u32;
        for _ in 0..bit_len {
            result = (result << 1) | self.read_bit()? as u32;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn packs_msb_first() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b11110, 5).unwrap();
        writer.write_bits(0xAB, 8).unwrap();
        assert_eq!(writer.flush().unwrap(), 16);

        assert_eq!(out, vec![0b1011_1110, 0xAB]);
    }

    #[test]
    fn flush_pads_low_bits_with_zero() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0b11, 2).unwrap();
        writer.write_bit(true).unwrap();
        assert_eq!(writer.flush().unwrap(), 3);

        assert_eq!(out, vec![0b1110_0000]);
    }

    #[test]
    fn flush_of_aligned_stream_adds_nothing() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0x5A, 8).unwrap();
        writer.flush().unwrap();

        assert_eq!(out, vec![0x5A]);
    }

    #[test]
    fn reads_back_what_was_written() {
        let mut out = Vec::new();
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(200, 8).unwrap();
        writer.write_bits(3, 2).unwrap();
        writer.write_bit(false).unwrap();
        writer.write_bits(17, 8).unwrap();
        writer.flush().unwrap();

        let mut input = Cursor::new(out);
        let mut reader = BitReader::new(&mut input);
        assert_eq!(reader.read_bits(8).unwrap(), 200);
        assert_eq!(reader.read_bits(2).unwrap(), 3);
        assert!(!reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(8).unwrap(), 17);
        assert_eq!(reader.bytes_read(), 3);
    }

    #[test]
    fn end_of_stream_is_an_error_not_a_value() {
        let mut input = Cursor::new(vec![0xFF]);
        let mut reader = BitReader::new(&mut input);
        assert_eq!(reader.read_bits(6).unwrap(), 0b111111);

        // Two bits remain, the third must fail rather than yield 0xFF
        match reader.read_bits(3) {
            Err(Error::UnexpectedEof { bytes_read }) => assert_eq!(bytes_read, 1),
            other => panic!("expected end of stream, got {other:?}"),
        }
    }

    #[test]
    fn counter_matches_writer() {
        let mut counter = BitCounter::new();
        counter.write_bits(0, 8).unwrap();
        counter.write_bits(0, 2).unwrap();
        counter.write_bits(1, 1).unwrap();

        assert_eq!(counter.bits_written(), 11);
    }
}
