use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use rom_kv_image_tool::{
    RomImage,
    DEFAULT_REGION_SIZE,
    DEFAULT_START_ADDRESS,
};

#[derive(Parser)]
#[command(name = "rom-kv-image-tool")]
#[command(about = "rom-kv flash image generator and parser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a flash image from a CSV file
    Generate {
        /// Input CSV file path
        input: PathBuf,

        /// Output binary file path
        output: PathBuf,

        /// Size of each of the two regions in bytes (must be a multiple of 4)
        #[arg(short, long, value_parser = parse_size, default_value_t = DEFAULT_REGION_SIZE)]
        region_size: usize,
    },
    /// Parse a flash image to a CSV file
    Parse {
        /// Input binary file path
        input: PathBuf,

        /// Output CSV file path
        output: PathBuf,

        /// Size of each of the two regions in bytes, half the image if omitted
        #[arg(short, long, value_parser = parse_size)]
        region_size: Option<usize>,
    },
}

fn parse_size(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<usize>().map_err(|e| e.to_string())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            region_size,
        } => {
            println!("Parsing CSV file: {}", input.display());
            let image = RomImage::from_csv_file(&input)?;
            println!("Found {} entries", image.entries.len());

            println!("Generating flash image...");
            image.generate_image_file(&output, region_size)?;

            println!("Successfully generated flash image: {}", output.display());
            println!(
                "Size: {} bytes (2 regions of {:#x} bytes, {} entries max)",
                2 * region_size,
                region_size,
                region_size / rom_kv::RECORD_SIZE - 1
            );
            println!(
                "Default location on the target: {:#08x}",
                DEFAULT_START_ADDRESS
            );

            Ok(())
        }
        Commands::Parse {
            input,
            output,
            region_size,
        } => {
            println!("Parsing binary file: {}", input.display());
            let image = RomImage::parse_image_file(&input, region_size)?;
            println!("Found {} entries", image.entries.len());

            println!("Writing CSV file...");
            image.to_csv_file(&output)?;

            println!("Successfully parsed flash image to: {}", output.display());

            Ok(())
        }
    }
}
