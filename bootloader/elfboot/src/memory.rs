use crate::ata::SECTOR_SIZE;

pub const PAGE_SIZE: usize = 4096;

/// Destination for loaded data, addressed by 32-bit physical address.
pub trait PhysicalMemory {
    /// The 512 bytes starting at `address`. Sector reads always land whole,
    /// so this is the only way data gets written.
    fn sector_mut(&mut self, address: u32) -> &mut [u8; SECTOR_SIZE];

    /// Clear `length` bytes starting at `address`
    fn zero(&mut self, address: u32, length: u32);
}

/// One page of staging space for the ELF file header and the program header
/// table. The loader reads the first page of the image here before it knows
/// where anything else goes.
///
/// As a [`PhysicalMemory`], addresses are offsets from the start of the page.
#[repr(C, align(4096))]
pub struct ScratchPage(pub [u8; PAGE_SIZE]);

impl ScratchPage {
    pub const fn new() -> Self {
        Self([0; PAGE_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for ScratchPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalMemory for ScratchPage {
    fn sector_mut(&mut self, address: u32) -> &mut [u8; SECTOR_SIZE] {
        let start = address as usize;
        match self.0.get_mut(start..).and_then(|rest| rest.split_first_chunk_mut::<SECTOR_SIZE>()) {
            Some((sector, _)) => sector,
            None => panic!("sector at {:#x} runs past the scratch page", address),
        }
    }

    fn zero(&mut self, address: u32, length: u32) {
        let start = address as usize;
        self.0[start..start + length as usize].fill(0);
    }
}
