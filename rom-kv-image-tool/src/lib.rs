//! Generator and parser for rom-kv flash images.
//!
//! An image holds both regions of the store back to back and can be flashed
//! at the store's start address. Images are produced and read by the store
//! library itself running on an in-memory flash.

pub mod error;
pub mod image;

mod csv;

use std::fs;
use std::io::Write;
use std::path::Path;

pub use error::Error;
pub use image::{DataValue, ImageEntry, MAX_NAME_LENGTH, MAX_VALUE_SIZE};
pub use rom_kv::{DEFAULT_REGION_SIZE, DEFAULT_START_ADDRESS};

/// An ordered list of named values.
///
/// This is the in-memory representation shared by the CSV and image
/// parsers/generators.
#[derive(Debug, Clone, PartialEq)]
pub struct RomImage {
    /// The ordered list of entries in this image.
    pub entries: Vec<ImageEntry>,
}

impl RomImage {
    /// Parse CSV content from a string.
    ///
    /// The CSV has the columns `key,encoding,value`.
    pub fn from_csv(content: &str) -> Result<Self, Error> {
        csv::parser::parse_csv(content)
    }

    /// Parse a CSV file at the given `path`.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(&path)?;
        csv::parser::parse_csv(&content)
    }

    /// Serialize this image to CSV and return the content as a `String`.
    pub fn to_csv(&self) -> Result<String, Error> {
        csv::writer::write_csv_content(self)
    }

    /// Serialize this image to a CSV file at the given `path`.
    ///
    /// Entries are written in their original order. `Binary` values are
    /// written as hex.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        csv::writer::write_csv(self, path)
    }

    /// Generate a flash image in memory. The result is `2 * region_size`
    /// bytes long.
    pub fn generate_image(&self, region_size: usize) -> Result<Vec<u8>, Error> {
        image::generator::generate_image_data(self, region_size)
    }

    /// Generate a flash image and write it to `path`.
    pub fn generate_image_file<P: AsRef<Path>>(
        &self,
        path: P,
        region_size: usize,
    ) -> Result<(), Error> {
        let data = self.generate_image(region_size)?;
        std::fs::File::create(path)?.write_all(&data)?;
        Ok(())
    }

    /// Parse a flash image from an in-memory byte slice. Without a
    /// `region_size` the image is split into two equal regions.
    pub fn parse_image(data: &[u8], region_size: Option<usize>) -> Result<Self, Error> {
        image::parser::parse_image_data(data, region_size)
    }

    /// Parse a flash image file at the given `path`.
    pub fn parse_image_file<P: AsRef<Path>>(
        path: P,
        region_size: Option<usize>,
    ) -> Result<Self, Error> {
        image::parser::parse_image(path, region_size)
    }
}
