use embedded_storage::nor_flash::NorFlash;

use crate::error::Error;
use crate::raw::STATUS_WORD_SIZE;

/// Any NOR flash can back the store as long as status words can be read and programmed one at a
/// time. `&mut F` works as well, so the flash can be borrowed for the lifetime of the store.
pub trait Platform: NorFlash {}

impl<T: NorFlash> Platform for T {}

pub trait FlashOps: Platform {
    /// Word-granular access is required because the two status words of a record are
    /// programmed independently of each other and of the record body.
    fn check_geometry() -> Result<(), Error> {
        if Self::READ_SIZE == 0
            || Self::WRITE_SIZE == 0
            || !STATUS_WORD_SIZE.is_multiple_of(Self::READ_SIZE)
            || !STATUS_WORD_SIZE.is_multiple_of(Self::WRITE_SIZE)
        {
            return Err(Error::UnsupportedFlash);
        }
        Ok(())
    }

    fn read_exact(&mut self, offset: usize, bytes: &mut [u8]) -> Result<(), Error> {
        self.read(offset as u32, bytes).map_err(|_| Error::FlashError)
    }

    fn write_exact(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Error> {
        self.write(offset as u32, bytes)
            .map_err(|_| Error::FlashError)
    }

    fn erase_range(&mut self, offset: usize, size: usize) -> Result<(), Error> {
        self.erase(offset as u32, (offset + size) as u32)
            .map_err(|_| Error::FlashError)
    }
}

impl<T: Platform> FlashOps for T {}
