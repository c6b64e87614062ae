//! QTC (**Q**uad**T**ree **C**ompressed) is a grayscale still-image format.
//! A picture is decomposed into a quadtree whose nodes carry the mean of
//! their quadrant, and the tree is written out level by level with every
//! fourth mean left out, since it can be recomputed from its parent and
//! siblings. Flat regions stop the tree early, and an optional variance
//! filter flattens low-detail regions for lossy compression.
//!
//! Decoded pictures are always square with a power-of-two side; smaller or
//! non-square sources are padded by repeating their last row and column.
//!
//! # Example
//! ## Encoding a picture
//! ```no_run
//! use qtc::{CodecConfig, QtcPicture};
//!
//! #[rustfmt::skip]
//! let bitmap = vec![
//!     10, 10, 20, 20,
//!     10, 10, 20, 20,
//!     30, 30, 40, 40,
//!     30, 30, 40, 40,
//! ];
//!
//! // Nothing is compressed at this point
//! let picture = QtcPicture::from_raw(4, 4, bitmap).expect("Bad bitmap");
//!
//! // Lossless...
//! picture.save("lossless.qtc", &CodecConfig::default()).expect("Could not save");
//!
//! // ...or lossy
//! picture.save("lossy.qtc", &CodecConfig::lossy(2.0)).expect("Could not save");
//! ```
//!
//! ## Reading a container
//! ```no_run
//! let picture = qtc::open("lossless.qtc").expect("Could not open file");
//!
//! // Decoded pictures are raw 8-bit gray samples, row by row
//! let side = picture.width() as usize;
//! let top_left = picture.as_raw()[0];
//! let bottom_right = picture.as_raw()[side * side - 1];
//! println!("{side}x{side}, corners {top_left} and {bottom_right}");
//! ```

pub mod compression;
pub mod binio;
pub mod header;
pub mod operations;
pub mod picture;
pub mod quadtree;

// ----------------------- //
// INLINED USEFUL FEATURES //
// ----------------------- //
#[doc(inline)]
pub use picture::QtcPicture;

#[doc(inline)]
pub use picture::open;

#[doc(inline)]
pub use picture::CodecConfig;

#[doc(inline)]
pub use picture::EncodeSummary;

#[doc(inline)]
pub use picture::Error;

#[doc(inline)]
pub use quadtree::QuadTree;
