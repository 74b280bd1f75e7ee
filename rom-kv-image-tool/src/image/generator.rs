use std::collections::HashSet;

use rom_kv::{Name, RomKeyValue};

use super::flash::ImageFlash;
use super::{validate_name, validate_region_size, validate_value};
use crate::error::Error;
use crate::RomImage;

/// Generate a flash image in memory and return it as a `Vec<u8>`.
///
/// The image holds region 0 followed by region 1, each `region_size` bytes.
/// It is produced by the store itself: a blank flash is formatted and every
/// entry is set in order, so region 0 ends up active with no tombstones.
pub(crate) fn generate_image_data(image: &RomImage, region_size: usize) -> Result<Vec<u8>, Error> {
    validate_region_size(region_size)?;

    let mut seen: HashSet<&str> = HashSet::new();
    for entry in &image.entries {
        validate_name(&entry.name)?;
        validate_value(&entry.value)?;
        if !seen.insert(entry.name.as_str()) {
            return Err(Error::DuplicateName(entry.name.clone()));
        }
    }

    let flash = ImageFlash::new(2 * region_size);
    let mut kv = RomKeyValue::new(0, region_size, flash)?;

    for entry in &image.entries {
        let name = Name::try_from(entry.name.as_str())?;
        kv.set(&name, entry.value.to_bytes().as_slice())?;
    }

    Ok(kv.into_inner().into_bytes())
}
