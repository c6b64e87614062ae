use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ExtendedColorType, ImageReader};
use qtc::QtcPicture;
use text_io::read;
use tracing::Level;
use tracing_subscriber::EnvFilter;

pub enum Assume {
    Yes,
    No,
}

/// Install the log subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load an image of any format `image` knows as 8-bit gray.
pub fn load_gray(path: &Path) -> Result<QtcPicture> {
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Could not decode {path:?}"))?
        .into_luma8();

    let (width, height) = image.dimensions();
    Ok(QtcPicture::from_raw(width, height, image.into_raw())?)
}

/// Save an 8-bit gray picture in whatever format the extension asks
/// `image` for. `.pgm` gives a binary graymap.
pub fn save_gray(path: &Path, picture: &QtcPicture) -> Result<()> {
    image::save_buffer(
        path,
        picture.as_raw(),
        picture.width(),
        picture.height(),
        ExtendedColorType::L8,
    )
    .with_context(|| format!("Could not write {path:?}"))?;

    Ok(())
}

/// `dir/name.ext` becomes `dir/name_g.pgm`.
pub fn grid_path(path: &Path) -> PathBuf {
    let stem = path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    path.with_file_name(format!("{stem}_g.pgm"))
}

pub fn exists_decision<P: AsRef<Path>>(
    place: &str,
    action: &str,
    path: &P,
    assume: Option<Assume>,
) -> bool {
    let path = path.as_ref();

    match assume {
        Some(Assume::Yes) => return true,
        Some(Assume::No) => return false,
        None => (),
    }

    loop {
        print!("{place} file {path:?} already exists. {action}? [y/N] ");

        let opt: String = read!("{}\n");
        let opt = opt.trim().to_lowercase();

        if opt.is_empty() || opt == "n" {
            return false
        } else if opt == "y" {
            return true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_files_sit_next_to_their_source() {
        assert_eq!(grid_path(Path::new("pics/lena.pgm")), PathBuf::from("pics/lena_g.pgm"));
        assert_eq!(grid_path(Path::new("out.qtc")), PathBuf::from("out_g.pgm"));
    }

    #[test]
    fn graymaps_round_trip_through_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.pgm");

        let picture = QtcPicture::from_raw(2, 3, vec![0, 1, 127, 128, 254, 255]).unwrap();
        save_gray(&path, &picture).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(b"P5"));
        assert!(written.ends_with(&[0, 1, 127, 128, 254, 255]));

        assert_eq!(load_gray(&path).unwrap(), picture);
    }

    #[test]
    fn malformed_graymap_header_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pgm");

        // No separator between the maximum value and the samples
        std::fs::write(&path, b"P5 2 1 255X\x01\x02").unwrap();
        assert!(load_gray(&path).is_err());
    }

    #[test]
    fn non_pgm_files_round_trip_through_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");

        let picture = QtcPicture::from_raw(3, 2, vec![0, 50, 100, 150, 200, 250]).unwrap();
        save_gray(&path, &picture).unwrap();

        assert_eq!(load_gray(&path).unwrap(), picture);
    }
}
