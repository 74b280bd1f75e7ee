use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashErrorKind, ReadNorFlash,
};

/// Program granularity of the targets the images are written for.
pub(crate) const WORD_SIZE: usize = 4;

/// In-memory NOR flash holding both regions of an image. Writes can only
/// clear bits, like the real part.
pub(crate) struct ImageFlash {
    buf: Vec<u8>,
}

impl ImageFlash {
    /// A blank flash of `size` bytes.
    pub(crate) fn new(size: usize) -> Self {
        Self {
            buf: vec![0xFF; size],
        }
    }

    pub(crate) fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl ErrorType for ImageFlash {
    type Error = NorFlashErrorKind;
}

impl ReadNorFlash for ImageFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for ImageFlash {
    const WRITE_SIZE: usize = WORD_SIZE;

    // the image tool never erases less than a region, any word aligned region size is fine
    const ERASE_SIZE: usize = WORD_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        self.buf[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        let offset = offset as usize;
        for (cell, &val) in self.buf[offset..offset + bytes.len()].iter_mut().zip(bytes) {
            *cell &= val;
        }
        Ok(())
    }
}
