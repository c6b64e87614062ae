mod utils;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use qtc::{CodecConfig, QtcPicture};
use tracing::info;
use utils::{Assume, exists_decision, grid_path, load_gray, save_gray, setup_logging};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Subcommands,

    /// Overwrite output files
    #[arg(short = 'n', long = "overwrite", conflicts_with = "assumeno", global = true)]
    assumeyes: bool,

    /// Do not overwrite output files
    #[arg(short = 'y', long = "preserve", conflicts_with = "assumeyes", global = true)]
    assumeno: bool,

    /// Print more about what is going on, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Encode an image to QTC format
    Encode(EncodeArgs),

    /// Decode a QTC image into another format
    Decode(DecodeArgs),
}

#[derive(Debug, Args)]
struct EncodeArgs {
    /// Input image file of any type supported by `image`
    input: PathBuf,
    /// Output path to QTC location
    output: PathBuf,

    /// Lossy filter strength, 0 keeps the image lossless.
    #[arg(default_value_t = 0.0, short, long)]
    alpha: f64,

    /// How the filter strength changes from one tree level to the next.
    #[arg(default_value_t = 1.0, short, long)]
    beta: f64,

    /// Also write the segmentation grid next to the input, as
    /// `<input>_g.pgm`
    #[arg(short, long)]
    grid: bool,
}

#[derive(Debug, Args)]
struct DecodeArgs {
    /// Input QTC image file
    input: PathBuf,

    /// Output image file
    output: PathBuf,

    /// Also write the segmentation grid next to the output, as
    /// `<output>_g.pgm`
    #[arg(short, long)]
    grid: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose);

    let assume = if args.assumeyes {
        Some(Assume::Yes)
    } else if args.assumeno {
        Some(Assume::No)
    } else {
        None
    };

    match args.command {
        Subcommands::Encode(a) => encode(a, assume),
        Subcommands::Decode(a) => decode(a, assume),
    }
}

fn encode(args: EncodeArgs, assume: Option<Assume>) -> Result<()> {
    if !args.input.try_exists()? {
        bail!("Input file {:?} does not exist", args.input);
    }

    if args.output.try_exists()?
        && !exists_decision("Output", "Overwrite", &args.output, assume)
    {
        return Ok(())
    }

    let config = CodecConfig {
        alpha: args.alpha,
        beta: args.beta,
        segmentation_grid: args.grid,
    };

    let picture = load_gray(&args.input)?;
    let tree = picture.quadtree(&config)?;

    if config.segmentation_grid {
        let path = grid_path(&args.input);
        save_gray(&path, &QtcPicture::segmentation_grid(&tree))?;
        info!(path = ?path, "wrote segmentation grid");
    }

    let file = std::fs::File::create(&args.output)?;
    let summary = picture.encode_tree(&tree, std::io::BufWriter::new(file))?;

    println!(
        "{:?}: depth {}, {} bits, compression rate {:.2}%",
        args.output, summary.depth, summary.bits, summary.compression_rate
    );

    Ok(())
}

fn decode(args: DecodeArgs, assume: Option<Assume>) -> Result<()> {
    if !args.input.try_exists()? {
        bail!("Input file {:?} does not exist", args.input);
    }

    if args.output.try_exists()?
        && !exists_decision("Output", "Overwrite", &args.output, assume)
    {
        return Ok(())
    }

    let input = std::io::BufReader::new(std::fs::File::open(&args.input)?);
    let tree = QtcPicture::decode_tree(input)?;

    if args.grid {
        let path = grid_path(&args.output);
        save_gray(&path, &QtcPicture::segmentation_grid(&tree))?;
        info!(path = ?path, "wrote segmentation grid");
    }

    let picture = QtcPicture::from_tree(&tree);
    save_gray(&args.output, &picture)?;

    println!(
        "{:?}: {}x{}",
        args.output, picture.width(), picture.height()
    );

    Ok(())
}
