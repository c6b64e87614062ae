use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use byteorder::{ReadBytesExt, WriteBytesExt};
use thiserror::Error;
use tracing::info;

use crate::{
    binio::{BitReader, BitWriter},
    compression::{
        decode::read_tree,
        encode::{build_tree, count_bits, write_tree},
        filter::{check_parameters, filter},
    },
    header::Header,
    operations::{render_grid, render_samples},
    quadtree::QuadTree,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container header ends after {lines} of 3 lines")]
    TruncatedHeader { lines: usize },

    #[error("invalid container header line {line}: {reason}")]
    InvalidHeader { line: usize, reason: String },

    #[error("stream ended unexpectedly after {bytes_read} bytes")]
    UnexpectedEof { bytes_read: usize },

    #[error("interpolated mean {value} of node {index} is not a valid sample")]
    BadInterpolation { index: usize, value: i32 },

    #[error("tree depth {depth} exceeds the maximum of {max}")]
    DepthTooLarge { depth: u32, max: u8 },

    #[error("bitmap holds {actual} samples, expected {expected}")]
    BitmapSize { expected: usize, actual: usize },

    #[error("image has no pixels")]
    EmptyImage,

    #[error("invalid filter parameters alpha = {alpha}, beta = {beta}")]
    InvalidConfig { alpha: f64, beta: f64 },
}

/// Settings for encoding a picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecConfig {
    /// Strength of the lossy filter, `0.0` for lossless.
    pub alpha: f64,

    /// How `alpha` evolves from one level to the next.
    pub beta: f64,

    /// Whether the caller wants the segmentation grid rendered.
    pub segmentation_grid: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            beta: 1.0,
            segmentation_grid: false,
        }
    }
}

impl CodecConfig {
    /// A lossy configuration with the default `beta`.
    pub fn lossy(alpha: f64) -> Self {
        Self {
            alpha,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        check_parameters(self.alpha, self.beta)
    }
}

/// Numbers describing an encoded picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSummary {
    /// Depth of the stored tree.
    pub depth: u8,

    /// Bits in the node stream, before padding.
    pub bits: u64,

    /// `bits` relative to the 8 bits per source sample, in percent.
    pub compression_rate: f64,
}

/// An 8-bit grayscale picture, the unit the codec works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QtcPicture {
    width: u32,
    height: u32,
    bitmap: Vec<u8>,
}

impl QtcPicture {
    /// Wrap row-major samples.
    pub fn from_raw(width: u32, height: u32, bitmap: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage);
        }

        let expected = width as usize * height as usize;
        if bitmap.len() != expected {
            return Err(Error::BitmapSize {
                expected,
                actual: bitmap.len(),
            });
        }

        Ok(Self {
            width,
            height,
            bitmap,
        })
    }

    /// The square picture held by the leaves of a tree.
    pub fn from_tree(tree: &QuadTree) -> Self {
        let side = tree.side() as u32;
        Self {
            width: side,
            height: side,
            bitmap: render_samples(tree),
        }
    }

    /// The segmentation grid of a tree, see [`render_grid`].
    pub fn segmentation_grid(tree: &QuadTree) -> Self {
        let side = tree.side() as u32;
        Self {
            width: side,
            height: side,
            bitmap: render_grid(tree),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.bitmap
    }

    /// Sample at a position, with coordinates past the right or bottom
    /// edge clamped to it.
    pub fn sample_clamped(&self, x: usize, y: usize) -> u8 {
        let x = x.min(self.width as usize - 1);
        let y = y.min(self.height as usize - 1);
        self.bitmap[y * self.width as usize + x]
    }

    /// Build the tree for this picture and apply the lossy filter from
    /// `config`.
    pub fn quadtree(&self, config: &CodecConfig) -> Result<QuadTree, Error> {
        config.validate()?;

        let mut tree = build_tree(self)?;
        filter(&mut tree, config.alpha, config.beta)?;

        Ok(tree)
    }

    /// Encode the image into anything that implements [Write]
    pub fn encode<O: Write + WriteBytesExt>(
        &self,
        output: O,
        config: &CodecConfig,
    ) -> Result<EncodeSummary, Error> {
        let tree = self.quadtree(config)?;
        self.encode_tree(&tree, output)
    }

    /// Write an already built tree of this picture as a container.
    pub fn encode_tree<O: Write + WriteBytesExt>(
        &self,
        tree: &QuadTree,
        mut output: O,
    ) -> Result<EncodeSummary, Error> {
        let bits = count_bits(tree);
        let original_bits = self.bitmap.len() as f64 * 8.0;
        let compression_rate = bits as f64 / original_bits * 100.0;

        let header = Header::new(tree.depth(), compression_rate);
        header.write_into(&mut output)?;

        let mut writer = BitWriter::new(&mut output);
        write_tree(tree, &mut writer)?;
        writer.flush()?;

        info!(
            width = self.width,
            height = self.height,
            depth = tree.depth(),
            bits,
            rate = format_args!("{compression_rate:.2}%"),
            "encoded picture"
        );

        Ok(EncodeSummary {
            depth: tree.depth(),
            bits,
            compression_rate,
        })
    }

    /// Decode the image from anything that implements [Read]
    pub fn decode<I: Read + ReadBytesExt>(input: I) -> Result<Self, Error> {
        let tree = Self::decode_tree(input)?;
        Ok(Self::from_tree(&tree))
    }

    /// Read a container up to the reconstructed tree.
    pub fn decode_tree<I: Read + ReadBytesExt>(mut input: I) -> Result<QuadTree, Error> {
        let header = Header::read_from(&mut input)?;

        let mut reader = BitReader::new(&mut input);
        let tree = read_tree(&mut reader, header.depth)?;

        info!(depth = header.depth, side = tree.side(), "decoded picture");

        Ok(tree)
    }

    /// Encode and write the picture to a file.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
        config: &CodecConfig,
    ) -> Result<EncodeSummary, Error> {
        let mut out_file = BufWriter::new(File::create(path.as_ref())?);
        self.encode(&mut out_file, config)
    }
}

/// Open a QTC container from a path.
pub fn open<P: AsRef<Path>>(path: P) -> Result<QtcPicture, Error> {
    let input = BufReader::new(File::open(path)?);
    QtcPicture::decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inconsistent_bitmaps() {
        assert!(matches!(
            QtcPicture::from_raw(2, 2, vec![0; 3]),
            Err(Error::BitmapSize { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            QtcPicture::from_raw(0, 2, vec![]),
            Err(Error::EmptyImage)
        ));
    }

    #[test]
    fn clamps_outside_samples() {
        let picture = QtcPicture::from_raw(2, 1, vec![3, 4]).unwrap();
        assert_eq!(picture.sample_clamped(0, 0), 3);
        assert_eq!(picture.sample_clamped(5, 0), 4);
        assert_eq!(picture.sample_clamped(1, 7), 4);
    }

    #[test]
    fn validates_config() {
        assert!(CodecConfig::default().validate().is_ok());
        assert!(CodecConfig::lossy(2.5).validate().is_ok());
        assert!(CodecConfig::lossy(-1.0).validate().is_err());
        assert!(CodecConfig::lossy(f64::NAN).validate().is_err());

        let config = CodecConfig {
            beta: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reports_the_compression_rate() {
        let picture = QtcPicture::from_raw(4, 4, vec![1; 16]).unwrap();
        let mut out = Vec::new();
        let summary = picture.encode(&mut out, &CodecConfig::default()).unwrap();

        assert_eq!(summary.depth, 2);
        assert_eq!(summary.bits, 11);
        assert!((summary.compression_rate - 11.0 / 128.0 * 100.0).abs() < 1e-9);

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("# compression rate: 8.59%"));
    }
}
