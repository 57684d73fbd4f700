//! Byte-range access to the kernel image. The image has no filesystem around
//! it: byte `n` of the ELF file lives in logical sector `first_sector + n / 512`.

use crate::ata::{AtaPio, SECTOR_SIZE};
use crate::memory::PhysicalMemory;
use crate::port::PortIo;

const SECTOR_BYTES: u32 = SECTOR_SIZE as u32;

/// The `(address, sector)` pairs needed to bring `count` bytes of the image,
/// starting at image offset `offset`, to physical `address`.
///
/// The first destination is rounded down so that the whole sector containing
/// `offset` lands at the right place; the last sector is read in full. The
/// run may therefore write up to 511 bytes before `address` and up to 511
/// bytes past `address + count`.
#[derive(Clone, Debug)]
pub struct SectorRun {
    address: u32,
    end: u32,
    sector: u32,
}

impl SectorRun {
    pub fn new(address: u32, count: u32, offset: u32, first_sector: u32) -> Self {
        let end = address.wrapping_add(count);
        Self {
            address: address.wrapping_sub(offset % SECTOR_BYTES),
            end,
            sector: (offset / SECTOR_BYTES).wrapping_add(first_sector),
        }
    }
}

impl Iterator for SectorRun {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.address >= self.end {
            return None;
        }
        let item = (self.address, self.sector);
        self.address = self.address.wrapping_add(SECTOR_BYTES);
        self.sector = self.sector.wrapping_add(1);
        if self.address < item.0 {
            // destination wrapped the address space; nothing past here is real
            self.end = 0;
        }
        Some(item)
    }
}

pub struct ImageReader<P: PortIo> {
    disk: AtaPio<P>,
    first_sector: u32,
}

impl<P: PortIo> ImageReader<P> {
    pub fn new(disk: AtaPio<P>, first_sector: u32) -> Self {
        Self { disk, first_sector }
    }

    pub fn disk(&self) -> &AtaPio<P> {
        &self.disk
    }

    /// Read `count` bytes at image offset `offset` into `memory` at `address`.
    ///
    /// Whole sectors are copied, so bytes just below `address` and just past
    /// `address + count` are overwritten too. Callers load segments in
    /// increasing address order so that the spill only touches memory that a
    /// later segment will overwrite, or that nobody uses.
    pub fn load_range<M: PhysicalMemory + ?Sized>(
        &mut self,
        memory: &mut M,
        address: u32,
        count: u32,
        offset: u32,
    ) {
        for (dst, sector) in SectorRun::new(address, count, offset, self.first_sector) {
            self.disk.read_sector(memory.sector_mut(dst), sector);
        }
    }
}
