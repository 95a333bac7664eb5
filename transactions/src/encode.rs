//! Consensus encoding primitives: little-endian integers and compact sizes.

use crate::error::TransactionError;

/// Append a compact-size (varint) length.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

/// Append a length-prefixed byte string.
pub fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Cursor over serialized transaction bytes.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], TransactionError> {
        if self.remaining() < n {
            return Err(TransactionError::UnexpectedEof { offset: self.pos });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, TransactionError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, TransactionError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, TransactionError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, TransactionError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a compact size, rejecting encodings longer than necessary so that
    /// re-serialization reproduces the input exactly.
    pub fn read_varint(&mut self) -> Result<u64, TransactionError> {
        let start = self.pos;
        let (value, min) = match self.read_u8()? {
            0xfd => (u16::from_le_bytes(self.read_array()?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array()?) as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(TransactionError::NonCanonicalVarInt { offset: start });
        }
        Ok(value)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, TransactionError> {
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(TransactionError::UnexpectedEof { offset: self.pos });
        }
        Ok(self.take(len as usize)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        let cases = [
            (0u64, 1),
            (0xfc, 1),
            (0xfd, 3),
            (0xffff, 3),
            (0x1_0000, 5),
            (0x1_0000_0000, 9),
        ];
        for (n, len) in cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, n);
            assert_eq!(buf.len(), len, "length for {n}");
            assert_eq!(Reader::new(&buf).read_varint().unwrap(), n);
        }
    }

    #[test]
    fn non_canonical_varint_rejected() {
        let buf = [0xfd, 0x05, 0x00];
        assert_eq!(
            Reader::new(&buf).read_varint(),
            Err(TransactionError::NonCanonicalVarInt { offset: 0 })
        );
    }

    #[test]
    fn short_read_reports_offset() {
        let mut reader = Reader::new(&[1, 2]);
        reader.read_u8().unwrap();
        assert_eq!(reader.read_u32(), Err(TransactionError::UnexpectedEof { offset: 1 }));
    }
}
