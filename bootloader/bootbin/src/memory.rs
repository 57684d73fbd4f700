use elfboot::ata::SECTOR_SIZE;
use elfboot::memory::PhysicalMemory;

/// Physical memory as the loader sees it: paging is off and the segments are
/// flat, so every address is its own pointer.
pub struct IdentityMapped;

impl PhysicalMemory for IdentityMapped {
    fn sector_mut(&mut self, address: u32) -> &mut [u8; SECTOR_SIZE] {
        unsafe { &mut *(address as usize as *mut [u8; SECTOR_SIZE]) }
    }

    fn zero(&mut self, address: u32, length: u32) {
        unsafe {
            core::ptr::write_bytes(address as usize as *mut u8, 0, length as usize);
        }
    }
}
