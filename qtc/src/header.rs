use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use tracing::warn;

use crate::{
    picture::Error,
    quadtree::MAX_DEPTH,
};

/// Identifier on the first line of every container.
pub const MAGIC: &str = "Q1";

/// Date the library was built, written into new containers.
pub const BUILD_DATE: &str = env!("QTC_BUILD_DATE");

/// Longest header line accepted when reading.
const MAX_LINE_LEN: usize = 255;

/// A QTC container header. Three text lines followed by the tree depth as
/// a single raw byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Identifier. Set to "Q1" when writing, not checked when reading.
    pub magic: String,

    /// Build date of the encoder that wrote the file.
    pub build_date: String,

    /// Size of the node stream relative to the source samples, in percent.
    /// Informational only.
    pub compression_rate: Option<f64>,

    /// Depth of the quadtree stored after the header.
    pub depth: u8,
}

impl Header {
    pub fn new(depth: u8, compression_rate: f64) -> Self {
        Self {
            magic: MAGIC.to_string(),
            build_date: BUILD_DATE.to_string(),
            compression_rate: Some(compression_rate),
            depth,
        }
    }

    /// Write the header, returning the number of bytes written.
    pub fn write_into<T: WriteBytesExt + Write>(
        &self,
        output: &mut T,
    ) -> Result<usize, std::io::Error> {
        let text = format!(
            "{}\n# {}\n# compression rate: {:.2}%\n",
            self.magic,
            self.build_date,
            self.compression_rate.unwrap_or(0.0),
        );

        output.write_all(text.as_bytes())?;
        output.write_u8(self.depth)?;

        Ok(text.len() + 1)
    }

    /// Read a header, leaving `input` positioned on the first byte of the
    /// node stream.
    pub fn read_from<T: Read + ReadBytesExt>(input: &mut T) -> Result<Self, Error> {
        let mut lines = Vec::with_capacity(3);
        for _ in 0..3 {
            match read_line(input, lines.len() + 1)? {
                Some(line) => lines.push(line),
                None => return Err(Error::TruncatedHeader { lines: lines.len() }),
            }
        }

        let magic = lines[0].trim_end_matches('\r').to_string();
        if magic != MAGIC {
            warn!(magic = %magic, "unexpected container identifier");
        }

        let build_date = lines[1].trim_start_matches('#').trim().to_string();
        let compression_rate = lines[2]
            .rsplit(':')
            .next()
            .and_then(|r| r.trim().trim_end_matches('%').parse().ok());

        let depth = match input.read_u8() {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(Error::UnexpectedEof { bytes_read: 0 })
            }
            Err(e) => return Err(e.into()),
        };
        if depth > MAX_DEPTH {
            return Err(Error::DepthTooLarge {
                depth: depth as u32,
                max: MAX_DEPTH,
            });
        }

        Ok(Header {
            magic,
            build_date,
            compression_rate,
            depth,
        })
    }
}

/// Read bytes up to and excluding the next newline. `None` if the input
/// ends before a newline.
fn read_line<T: Read + ReadBytesExt>(input: &mut T, line: usize) -> Result<Option<String>, Error> {
    let mut bytes = Vec::new();
    loop {
        let byte = match input.read_u8() {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if byte == b'\n' {
            break;
        }

        if bytes.len() == MAX_LINE_LEN {
            return Err(Error::InvalidHeader {
                line,
                reason: format!("longer than {MAX_LINE_LEN} bytes"),
            });
        }
        bytes.push(byte);
    }

    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn writes_three_lines_and_the_depth() {
        let header = Header {
            magic: MAGIC.to_string(),
            build_date: "2024-12-01".to_string(),
            compression_rate: Some(12.3456),
            depth: 9,
        };

        let mut out = Vec::new();
        let len = header.write_into(&mut out).unwrap();

        assert_eq!(len, out.len());
        let mut expected = b"Q1\n# 2024-12-01\n# compression rate: 12.35%\n".to_vec();
        expected.push(9);
        assert_eq!(out, expected);
    }

    #[test]
    fn reads_what_it_writes() {
        let header = Header::new(5, 42.0);
        let mut out = Vec::new();
        header.write_into(&mut out).unwrap();
        out.push(0xAA);

        let mut input = Cursor::new(out);
        let read = Header::read_from(&mut input).unwrap();
        assert_eq!(read, header);

        // The node stream starts right after the depth byte
        assert_eq!(input.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn foreign_comments_are_tolerated() {
        let mut data = b"Q1\n# made elsewhere\n# nothing to see\n".to_vec();
        data.push(3);

        let header = Header::read_from(&mut Cursor::new(data)).unwrap();
        assert_eq!(header.depth, 3);
        assert_eq!(header.build_date, "made elsewhere");
        assert_eq!(header.compression_rate, None);
    }

    #[test]
    fn short_header_fails() {
        let data = b"Q1\n# 2024-12-01\n".to_vec();
        assert!(matches!(
            Header::read_from(&mut Cursor::new(data)),
            Err(Error::TruncatedHeader { lines: 2 })
        ));
    }

    #[test]
    fn missing_depth_fails() {
        let data = b"Q1\n#\n#\n".to_vec();
        assert!(matches!(
            Header::read_from(&mut Cursor::new(data)),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn absurd_depth_fails() {
        let mut data = b"Q1\n#\n#\n".to_vec();
        data.push(200);
        assert!(matches!(
            Header::read_from(&mut Cursor::new(data)),
            Err(Error::DepthTooLarge { depth: 200, .. })
        ));
    }

    #[test]
    fn binary_garbage_is_not_a_header() {
        let data = vec![0u8; 1024];
        assert!(matches!(
            Header::read_from(&mut Cursor::new(data)),
            Err(Error::InvalidHeader { line: 1, .. })
        ));
    }
}
