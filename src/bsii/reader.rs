//! Little-endian cursor over an in-memory buffer.
//!
//! Every read is bounds-checked; failures surface as
//! [`DecodeError::Truncated`] carrying the byte offset and the type that was
//! expected there, which is the only context a corrupt save can offer.

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use super::DecodeError;

pub struct ByteReader<'a> {
    cur: io::Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { cur: io::Cursor::new(data) }
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.cur.position() as usize
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.cur.get_ref().len().saturating_sub(self.pos())
    }

    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Run one read, reporting the offset it started at on truncation.
    fn at<T>(
        &mut self,
        expected: &'static str,
        read: impl FnOnce(&mut io::Cursor<&'a [u8]>) -> io::Result<T>,
    ) -> Result<T, DecodeError> {
        let offset = self.pos();
        read(&mut self.cur).map_err(|_| DecodeError::Truncated { offset, expected })
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        self.at("u8", |c| c.read_u8())
    }

    pub fn bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        self.at("u16", |c| c.read_u16::<LittleEndian>())
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        self.at("i16", |c| c.read_i16::<LittleEndian>())
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        self.at("u32", |c| c.read_u32::<LittleEndian>())
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        self.at("i32", |c| c.read_i32::<LittleEndian>())
    }

    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        self.at("u64", |c| c.read_u64::<LittleEndian>())
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        self.at("i64", |c| c.read_i64::<LittleEndian>())
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.u32()?))
    }

    /// Length-prefixed UTF-8 string (u32 length + bytes).  Invalid UTF-8 is
    /// replaced rather than rejected: save files carry arbitrary user text.
    pub fn utf8(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        if self.remaining() < len {
            return Err(DecodeError::Truncated { offset: self.pos(), expected: "utf-8 string body" });
        }
        let mut buf = vec![0u8; len];
        self.at("utf-8 string body", |c| c.read_exact(&mut buf))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Advance the cursor by `n` bytes without decoding them.
    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated { offset: self.pos(), expected: "skipped payload" });
        }
        self.cur.set_position(self.cur.position() + n as u64);
        Ok(())
    }
}
