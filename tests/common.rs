#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

// Small sectors keep the regions of the tests tiny.
pub const SECTOR_SIZE: usize = 32;
pub const WORD_SIZE: usize = 4;

pub const RECORD_SIZE: usize = rom_kv::RECORD_SIZE;
pub const STATUS_SIZE: usize = 8;
pub const NAME_OFFSET: usize = STATUS_SIZE;
pub const DATA_OFFSET: usize = NAME_OFFSET + rom_kv::MAX_NAME_SIZE;

/// Region size used by most tests, room for 102 records.
pub const REGION_SIZE: usize = 4096;
/// Region with room for exactly 5 records: the region marker and 4 values.
pub const SMALL_REGION_SIZE: usize = 7 * SECTOR_SIZE;

#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    /// Writes are acknowledged but never reach the cells.
    pub drop_writes: bool,
    /// Erasing a range that starts at this address fails.
    pub fail_erase_at: Option<u32>,
    /// Writing to this address fails, all other writes go through.
    pub fail_write_at: Option<u32>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    /// Blank flash with room for two regions of `region_size`.
    pub fn new(region_size: usize) -> Self {
        Self {
            buf: vec![0xffu8; 2 * region_size],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(region_size: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; 2 * region_size],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
        self.drop_writes = false;
        self.fail_erase_at = None;
        self.fail_write_at = None;
    }

    /// The next operation and all following ones fail.
    pub fn fail_from_now(&mut self) {
        self.fail_after_operation = self.operations.len();
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn region(&self, base: usize, size: usize) -> &[u8] {
        &self.buf[base..base + size]
    }

    pub fn is_blank(&self, base: usize, size: usize) -> bool {
        self.region(base, size).iter().all(|&b| b == 0xff)
    }

    pub fn slot(&self, address: usize) -> &[u8] {
        &self.buf[address..address + RECORD_SIZE]
    }

    /// Flips bits behind the back of the store, simulating a disturbed cell.
    pub fn corrupt(&mut self, address: usize, mask: u8) {
        self.buf[address] ^= mask;
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        println!(
            "    flash: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to as usize <= self.buf.len());

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation || self.fail_erase_at == Some(from)
        {
            println!("    flash: FAULT");
            return Err(FlashError);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation || self.fail_write_at == Some(offset)
        {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        assert!(!bytes.is_empty());

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        if self.drop_writes {
            println!("    flash: write dropped");
            return Ok(());
        }

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}
