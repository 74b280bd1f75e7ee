use std::fs;
use std::path::Path;

use rom_kv::{Recovery, RomKeyValue};

use super::flash::ImageFlash;
use super::{validate_region_size, DataValue, ImageEntry};
use crate::error::Error;
use crate::RomImage;

/// Parse a flash image file at the given `path`.
pub(crate) fn parse_image<P: AsRef<Path>>(
    path: P,
    region_size: Option<usize>,
) -> Result<RomImage, Error> {
    let data = fs::read(path)?;
    parse_image_data(&data, region_size)
}

/// Parse a flash image from an in-memory byte slice.
///
/// Without an explicit `region_size` the image is split in half. The store
/// runs its startup recovery on a copy of the image, so an image taken from
/// a device in any state is listed the way the device would see it after
/// the next restart.
pub(crate) fn parse_image_data(data: &[u8], region_size: Option<usize>) -> Result<RomImage, Error> {
    let region_size = region_size.unwrap_or(data.len() / 2);
    validate_region_size(region_size)?;
    if data.len() != 2 * region_size {
        return Err(Error::InvalidImageSize(data.len(), region_size));
    }

    let flash = ImageFlash::from_bytes(data.to_vec());
    let mut kv = RomKeyValue::new(0, region_size, flash)?;

    // recovery found nothing to resume from and wiped the copy
    if kv.recovery() == Recovery::Formatted {
        return Err(Error::MissingRegionMarker);
    }

    let mut image = RomImage { entries: vec![] };
    for entry in kv.entries() {
        let entry = entry?;
        let name = std::str::from_utf8(entry.name.as_ref())
            .map_err(|e| Error::InvalidName(format!("name is not valid UTF-8: {}", e)))?;
        image.entries.push(ImageEntry::new(
            name.to_string(),
            DataValue::Binary(entry.value.to_vec()),
        ));
    }

    Ok(image)
}
