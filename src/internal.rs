use crate::error::Error;
use crate::platform::{FlashOps, Platform};
use crate::raw::{
    ERASED_WORD, RECORD_SIZE, Record, RecordStatus, STATUS_SIZE, STATUS_WORD_SIZE, STATUS_WORDS,
    status_words_from_bytes,
};
use crate::{MAX_VALUE_SIZE, Name, REGION_MARKER, Recovery, Region, RomKeyValue};
use core::iter::StepBy;
use core::ops::Range;
#[cfg(feature = "defmt")]
use defmt::{debug, error, info, trace, warn};

/// Result of scanning the last active region on startup.
#[cfg_attr(feature = "debug-logs", derive(Debug))]
enum RegionScan {
    /// No tombstone before the first unused slot, appending continues at the offset.
    AppendAt(usize),
    /// A tombstone was found, the region has to be compacted.
    Fragmented,
}

/// A live value as yielded by [`RomKeyValue::entries`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Entry {
    pub name: Name,
    /// The stored bytes. Bytes past the written length read as 0xFF.
    pub value: [u8; MAX_VALUE_SIZE],
}

/// Iterator over the live values of the active region, see [`RomKeyValue::entries`].
pub struct Entries<'a, T: Platform> {
    kv: &'a mut RomKeyValue<T>,
    offset: usize,
    done: bool,
}

impl<'a, T: Platform> Entries<'a, T> {
    pub(crate) fn new(kv: &'a mut RomKeyValue<T>) -> Self {
        Self {
            kv,
            offset: 0,
            done: false,
        }
    }
}

impl<T: Platform> Iterator for Entries<'_, T> {
    type Item = Result<Entry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.offset + RECORD_SIZE <= self.kv.region_size {
            let offset = self.offset;
            self.offset += RECORD_SIZE;

            let record = match self.kv.load_record(offset) {
                Ok(record) => record,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if record.status() == RecordStatus::Unused {
                self.done = true;
                break;
            }
            if !record.is_live() {
                continue;
            }

            let Some(name) = Name::from_raw(&record.name) else {
                continue;
            };
            if name.is_reserved() {
                continue;
            }
            return Some(Ok(Entry {
                name,
                value: record.data,
            }));
        }

        None
    }
}

impl<T> RomKeyValue<T>
where
    T: Platform,
{
    pub(crate) fn slot_count(&self) -> usize {
        self.region_size / RECORD_SIZE
    }

    /// Region relative offsets of all slots.
    pub(crate) fn slot_offsets(&self) -> StepBy<Range<usize>> {
        (0..self.slot_count() * RECORD_SIZE).step_by(RECORD_SIZE)
    }

    fn select(&mut self, region: Region) {
        self.region = region;
        self.base_address = self.region_address(region);
    }

    fn read_status(&mut self, address: usize) -> Result<RecordStatus, Error> {
        let mut buf = [0u8; STATUS_SIZE];
        self.hal.read_exact(address, &mut buf)?;
        Ok(RecordStatus::from(status_words_from_bytes(&buf)))
    }

    fn load_record_at(&mut self, address: usize) -> Result<Record, Error> {
        #[cfg(feature = "defmt")]
        trace!("load_record: @{:#08x}", address);

        let mut buf = [0u8; RECORD_SIZE];
        self.hal.read_exact(address, &mut buf)?;
        Ok(Record::from_bytes(&buf))
    }

    pub(crate) fn load_record(&mut self, offset: usize) -> Result<Record, Error> {
        self.load_record_at(self.base_address + offset)
    }

    /// Moves the slot at `address` towards `status`. A status word is only programmed while it
    /// is still erased, bits that are already cleared are never touched again.
    fn mark(&mut self, address: usize, status: RecordStatus) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("mark: @{:#08x}: {}", address, status);

        #[cfg(feature = "debug-logs")]
        println!("  internal: mark @{address:#08x}: {status}");

        let Some(target) = status.words() else {
            return Ok(());
        };

        let mut buf = [0u8; STATUS_SIZE];
        self.hal.read_exact(address, &mut buf)?;
        let current = status_words_from_bytes(&buf);

        for i in 0..STATUS_WORDS {
            if current[i] == ERASED_WORD && target[i] != ERASED_WORD {
                self.hal
                    .write_exact(address + i * STATUS_WORD_SIZE, &target[i].to_le_bytes())?;
            }
        }

        Ok(())
    }

    /// Transitions a slot of the active region to deleted and checks that it took.
    fn tombstone(&mut self, offset: usize) -> Result<(), Error> {
        #[cfg(feature = "debug-logs")]
        println!("internal: tombstone {offset:#06x}");

        let address = self.base_address + offset;
        if self.read_status(address)? == RecordStatus::Deleted {
            #[cfg(feature = "defmt")]
            warn!("tombstone: @{:#08x} already deleted", address);
            return Ok(());
        }

        self.mark(address, RecordStatus::Deleted)?;

        // without this check a flash that silently drops writes would keep the callers looping
        if self.read_status(address)? != RecordStatus::Deleted {
            #[cfg(feature = "defmt")]
            error!("tombstone: @{:#08x} status did not change", address);
            return Err(Error::WriteVerifyFailed);
        }

        Ok(())
    }

    /// Returns the offset of the first record with status Using and a matching name. The
    /// checksum is left for the caller to judge. The scan ends at the first unused slot since
    /// nothing is ever written behind it.
    fn find_in(&mut self, base_address: usize, name: &Name) -> Result<Option<usize>, Error> {
        #[cfg(feature = "defmt")]
        trace!("find: @{:#08x}: {}", base_address, name);

        for offset in self.slot_offsets() {
            let record = self.load_record_at(base_address + offset)?;
            match record.status() {
                RecordStatus::Unused => return Ok(None),
                RecordStatus::Using if name.matches(&record.name) => return Ok(Some(offset)),
                _ => continue,
            }
        }

        Ok(None)
    }

    pub(crate) fn find(&mut self, name: &Name) -> Result<Option<usize>, Error> {
        self.find_in(self.base_address, name)
    }

    /// Returns the offset of the next unused slot of the active region. Slots left behind by
    /// a failed write are skipped.
    fn claim_slot(&mut self) -> Result<usize, Error> {
        loop {
            if self.next_free + RECORD_SIZE > self.region_size {
                #[cfg(feature = "defmt")]
                error!("region {} full", self.region);
                return Err(Error::StoreFull);
            }

            let address = self.base_address + self.next_free;
            if self.read_status(address)? == RecordStatus::Unused {
                return Ok(self.next_free);
            }

            #[cfg(feature = "defmt")]
            warn!("claim_slot: @{:#08x} is not unused, skipping", address);

            self.next_free += RECORD_SIZE;
        }
    }

    /// Writes `record` into an unused slot: status first, then the body, then reads the whole
    /// slot back.
    fn write_record(&mut self, offset: usize, record: &Record) -> Result<(), Error> {
        let address = self.base_address + offset;

        #[cfg(feature = "defmt")]
        trace!("write_record: @{:#08x}", address);

        #[cfg(feature = "debug-logs")]
        println!("  internal: write_record: {record:?} @{address:#08x}");

        self.mark(address, RecordStatus::Using)?;

        let raw = record.to_bytes();
        self.hal
            .write_exact(address + STATUS_SIZE, &raw[STATUS_SIZE..])?;

        let mut read_back = [0u8; RECORD_SIZE];
        self.hal.read_exact(address, &mut read_back)?;
        if read_back != raw {
            #[cfg(feature = "defmt")]
            error!("write_record: @{:#08x} read back check failed", address);
            return Err(Error::WriteVerifyFailed);
        }

        Ok(())
    }

    pub(crate) fn store_value(&mut self, name: &Name, value: &[u8]) -> Result<(), Error> {
        if name.is_reserved() {
            return Err(Error::ReservedName);
        }
        self.append_value(name, value)
    }

    /// Like `store_value`, but also accepts the region marker.
    fn append_value(&mut self, name: &Name, value: &[u8]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("append_value: {}", name);

        #[cfg(feature = "debug-logs")]
        println!("internal: append_value {name:?}");

        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLong);
        }

        if self.next_free + RECORD_SIZE > self.region_size {
            #[cfg(feature = "defmt")]
            error!("region {} full", self.region);
            return Err(Error::StoreFull);
        }

        let record = Record::new(name, value);

        if let Some(offset) = self.find(name)? {
            let existing = self.load_record(offset)?;
            if !existing.is_valid() {
                #[cfg(feature = "defmt")]
                warn!("store_value: {} at {:#06x} has a bad checksum", name, offset);
                self.tombstone(offset)?;
            } else if existing.data == record.data {
                #[cfg(feature = "debug-logs")]
                println!("internal: store_value: entry already exists and matches");
                return Ok(());
            }
        }

        let offset = self.claim_slot()?;
        self.write_record(offset, &record)?;
        self.next_free = offset + RECORD_SIZE;

        // the new record is the last one with this name, everything found before it is stale
        while let Some(found) = self.find(name)? {
            if found == offset {
                break;
            }
            self.tombstone(found)?;
        }

        Ok(())
    }

    pub(crate) fn read_value(&mut self, name: &Name, out: &mut [u8]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("read_value: {}", name);

        if out.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLong);
        }

        let offset = self.find(name)?.ok_or(Error::KeyNotFound)?;
        let record = self.load_record(offset)?;
        if !record.is_valid() {
            #[cfg(feature = "defmt")]
            warn!("read_value: {} at {:#06x} has a bad checksum", name, offset);
            return Err(Error::ChecksumMismatch);
        }

        let data = record.data;
        out.copy_from_slice(&data[..out.len()]);
        Ok(())
    }

    pub(crate) fn delete_all(&mut self, name: &Name) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("delete_all: {}", name);

        if name.is_reserved() {
            return Err(Error::ReservedName);
        }

        while let Some(offset) = self.find(name)? {
            self.tombstone(offset)?;
        }

        Ok(())
    }

    /// A region's marker is consistent if it is live and names the region it is stored in.
    fn read_marker(&mut self, region: Region) -> Result<bool, Error> {
        let base_address = self.region_address(region);
        let Some(offset) = self.find_in(base_address, &REGION_MARKER)? else {
            return Ok(false);
        };

        let record = self.load_record_at(base_address + offset)?;
        if !record.is_valid() {
            #[cfg(feature = "defmt")]
            warn!("marker of region {} has a bad checksum", region);
            return Ok(false);
        }

        let data = record.data;
        let index = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        Ok(index == region.index())
    }

    fn write_marker(&mut self) -> Result<(), Error> {
        let index = self.region.index();
        self.append_value(&REGION_MARKER, &index.to_le_bytes())
    }

    /// True if a live record with the same name follows `offset` in the region at
    /// `base_address`.
    fn superseded(
        &mut self,
        base_address: usize,
        offset: usize,
        name: &Name,
    ) -> Result<bool, Error> {
        let end = self.slot_count() * RECORD_SIZE;
        for later in (offset + RECORD_SIZE..end).step_by(RECORD_SIZE) {
            let record = self.load_record_at(base_address + later)?;
            if record.status() == RecordStatus::Unused {
                break;
            }
            if record.is_live() && name.matches(&record.name) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn scan_region(&mut self, base_address: usize) -> Result<RegionScan, Error> {
        for offset in self.slot_offsets() {
            match self.read_status(base_address + offset)? {
                RecordStatus::Unused => return Ok(RegionScan::AppendAt(offset)),
                RecordStatus::Deleted => return Ok(RegionScan::Fragmented),
                _ => continue,
            }
        }

        Ok(RegionScan::AppendAt(self.slot_count() * RECORD_SIZE))
    }

    fn has_tombstones(&mut self, region: Region) -> Result<bool, Error> {
        let base_address = self.region_address(region);
        Ok(matches!(
            self.scan_region(base_address)?,
            RegionScan::Fragmented
        ))
    }

    pub(crate) fn recover(&mut self) -> Result<Recovery, Error> {
        #[cfg(feature = "defmt")]
        info!("init: start @{:#08x}, region size {:#x}", self.start_address, self.region_size);

        #[cfg(feature = "debug-logs")]
        println!("internal: recover");

        self.next_free = 0;

        let zero = self.read_marker(Region::Zero)?;
        let one = self.read_marker(Region::One)?;

        let last = match (zero, one) {
            (false, false) => return self.format(),
            (true, false) => Region::Zero,
            (false, true) => Region::One,
            (true, true) => {
                // Compaction writes the new marker before the old region is erased. It replays
                // every name once, so only the source of the compaction can contain tombstones.
                #[cfg(feature = "defmt")]
                warn!("init: both regions carry a marker, compaction was interrupted");

                if !self.has_tombstones(Region::Zero)? && self.has_tombstones(Region::One)? {
                    Region::One
                } else {
                    Region::Zero
                }
            }
        };

        #[cfg(feature = "defmt")]
        info!("init: last active region is {}", last);

        self.select(last);
        match self.scan_region(self.base_address)? {
            RegionScan::Fragmented => self.compact(last),
            RegionScan::AppendAt(offset) => {
                self.next_free = offset;

                if zero && one {
                    let stale = self.region_address(last.other());
                    self.hal.erase_range(stale, self.region_size)?;
                }

                #[cfg(feature = "defmt")]
                info!("init: now using region {} at {:#06x}", last, offset);

                Ok(Recovery::Resumed {
                    region: last,
                    next_free: offset,
                })
            }
        }
    }

    fn format(&mut self) -> Result<Recovery, Error> {
        #[cfg(feature = "defmt")]
        error!("init: no region marker found, erasing all data");

        let zero = self.region_address(Region::Zero);
        let one = self.region_address(Region::One);
        self.hal.erase_range(zero, self.region_size)?;
        self.hal.erase_range(one, self.region_size)?;

        self.select(Region::Zero);
        self.next_free = 0;
        self.write_marker()?;

        Ok(Recovery::Formatted)
    }

    /// Replays all live values of `source` into the other region, then erases `source`. The
    /// target's marker is written first, `source` stays intact until everything was copied.
    /// Of several live records with the same name only the last one is copied, the target
    /// never receives a tombstone.
    fn compact(&mut self, source: Region) -> Result<Recovery, Error> {
        let target = source.other();
        let source_address = self.region_address(source);
        let target_address = self.region_address(target);

        #[cfg(feature = "defmt")]
        info!("compact: region {} -> region {}", source, target);

        #[cfg(feature = "debug-logs")]
        println!("internal: compact {source} -> {target}");

        // leftovers of an interrupted compaction
        if self.read_status(target_address)? != RecordStatus::Unused {
            #[cfg(feature = "defmt")]
            warn!("compact: region {} is not blank, erasing", target);
            self.hal.erase_range(target_address, self.region_size)?;
        }

        self.select(target);
        self.next_free = 0;
        self.write_marker()?;

        let mut moved = 0u32;
        for offset in self.slot_offsets() {
            let record = self.load_record_at(source_address + offset)?;
            if record.status() == RecordStatus::Unused {
                break;
            }
            if !record.is_live() {
                continue;
            }

            let Some(name) = Name::from_raw(&record.name) else {
                #[cfg(feature = "defmt")]
                warn!("compact: record at {:#06x} has no name terminator", offset);
                continue;
            };

            // the source's own marker names the source, the target has its own
            if name.is_reserved() {
                continue;
            }

            // left behind by a set that lost power before tombstoning
            if self.superseded(source_address, offset, &name)? {
                #[cfg(feature = "defmt")]
                warn!("compact: {} at {:#06x} is stale, skipping", name, offset);
                continue;
            }

            let data = record.data;
            self.append_value(&name, &data)?;
            moved += 1;
        }

        self.hal.erase_range(source_address, self.region_size)?;

        #[cfg(feature = "defmt")]
        debug!("compact: {} values moved from region {} to region {}", moved, source, target);

        Ok(Recovery::Compacted {
            from: source,
            to: target,
            moved,
        })
    }
}
