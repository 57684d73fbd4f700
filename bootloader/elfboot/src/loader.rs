//! Top level of the boot sequence: stage the ELF headers, copy every program
//! segment to its physical address, clear each segment's bss tail, and jump.

use crate::ata::AtaPio;
use crate::config::LoaderConfig;
use crate::disk::ImageReader;
use crate::elf::{ElfHeader, FileHeader, ProgramHeader, ProgramHeaders};
use crate::error::LoadError;
use crate::memory::{PhysicalMemory, ScratchPage, PAGE_SIZE};
use crate::port::PortIo;

/// Hands the CPU to the loaded kernel.
pub trait Trampoline {
    /// Jump to `entry_point`. The production implementation never returns;
    /// if this does return, the loader reports it as an error.
    fn enter(&mut self, entry_point: u32);
}

pub struct Loader<P: PortIo, M: PhysicalMemory> {
    image: ImageReader<P>,
    memory: M,
}

impl<P: PortIo, M: PhysicalMemory> Loader<P, M> {
    pub fn new(ports: P, memory: M, config: &LoaderConfig) -> Self {
        let disk = AtaPio::new(ports, config.ata_base_port);
        Self {
            image: ImageReader::new(disk, config.image_start_sector),
            memory,
        }
    }

    pub fn image(&self) -> &ImageReader<P> {
        &self.image
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Load every program segment of the kernel image and return its entry
    /// point. The first page of the image is read into `scratch`; on a bad
    /// magic number nothing else is read or written.
    ///
    /// Segments are loaded in table order, which must also be increasing
    /// physical address order (see [`ImageReader::load_range`]).
    pub fn load_image(&mut self, scratch: &mut ScratchPage) -> Result<u32, LoadError> {
        self.image.load_range(scratch, 0, PAGE_SIZE as u32, 0);

        let header = ElfHeader::read_from(scratch.as_bytes()).unwrap_or_default();
        if !header.has_valid_magic() {
            return Err(LoadError::BadMagic { found: header.magic() });
        }

        let entry_point = header.entry_point;
        let segment_count = header.program_header_entry_count;
        log::debug!(
            "ELF entry {:#010x}, {} program headers",
            entry_point,
            segment_count,
        );

        for segment in ProgramHeaders::new(scratch.as_bytes(), &header)? {
            self.load_segment(&segment);
        }

        Ok(entry_point)
    }

    /// Load the kernel and enter it. Only returns if something went wrong.
    pub fn load_and_boot<T: Trampoline + ?Sized>(
        &mut self,
        scratch: &mut ScratchPage,
        trampoline: &mut T,
    ) -> LoadError {
        let entry_point = match self.load_image(scratch) {
            Ok(entry_point) => entry_point,
            Err(e) => return e,
        };

        log::info!("Enter kernel at {:#010X}", entry_point);
        trampoline.enter(entry_point);

        LoadError::EntryReturned { entry_point }
    }

    fn load_segment(&mut self, segment: &ProgramHeader) {
        let address = segment.physical_address;
        let file_size = segment.file_size;
        let offset = segment.offset;
        let fill = segment.zero_fill_size();

        log::debug!(
            "Load {:#x} bytes from {:#x} to {:#010x}, zero {:#x}",
            file_size,
            offset,
            address,
            fill,
        );

        self.image.load_range(&mut self.memory, address, file_size, offset);
        if fill > 0 {
            self.memory.zero(address.wrapping_add(file_size), fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DiskImage, ElfImage, MockDisk, MockMemory, RecordingTrampoline};

    const MEMORY_BASE: u32 = 0x100000;

    fn loader_for(kernel: &[u8]) -> Loader<MockDisk, MockMemory> {
        let disk = MockDisk::new(DiskImage::with_kernel(kernel));
        let memory = MockMemory::new(MEMORY_BASE, 0x10000);
        Loader::new(disk, memory, &LoaderConfig::DEFAULT)
    }

    #[test]
    fn zero_fills_bss_tail() {
        let text: Vec<u8> = (0..0x300u32).map(|i| (i % 251) as u8 + 1).collect();
        let kernel = ElfImage::new(0x10000c)
            .segment(MEMORY_BASE, &text, 0x800)
            .build();
        let mut loader = loader_for(&kernel);
        let mut scratch = ScratchPage::new();

        let entry = loader.load_image(&mut scratch).unwrap();

        assert_eq!(entry, 0x10000c);
        assert_eq!(loader.memory().read(MEMORY_BASE, 0x300), &text[..]);
        assert!(loader.memory().read(MEMORY_BASE + 0x300, 0x500).iter().all(|b| *b == 0));
        // nothing past the memory size is zeroed
        assert_eq!(loader.memory().read(MEMORY_BASE + 0x800, 1), &[MockMemory::POISON]);
    }

    #[test]
    fn bad_magic_stops_after_header_read() {
        let mut kernel = ElfImage::new(0x100000)
            .segment(MEMORY_BASE, &[0x90; 0x40], 0x40)
            .build();
        kernel[0] = 0x7e;
        let mut loader = loader_for(&kernel);
        let mut scratch = ScratchPage::new();
        let mut trampoline = RecordingTrampoline::default();

        let error = loader.load_and_boot(&mut scratch, &mut trampoline);

        assert_eq!(error, LoadError::BadMagic { found: 0x464c457e });
        assert!(trampoline.entries().is_empty());
        assert_eq!(loader.memory().write_count(), 0);
        // exactly the first page of the image
        assert_eq!(loader.image().disk().ports().sectors_read(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&scratch.as_bytes()[..4], &kernel[..4]);
    }

    #[test]
    fn enters_kernel_after_loading() {
        let kernel = ElfImage::new(0x100020)
            .segment(MEMORY_BASE, &[0xf4; 0x40], 0x40)
            .build();
        let mut loader = loader_for(&kernel);
        let mut scratch = ScratchPage::new();
        let mut trampoline = RecordingTrampoline::default();

        let error = loader.load_and_boot(&mut scratch, &mut trampoline);

        assert_eq!(trampoline.entries(), &[0x100020]);
        assert_eq!(error, LoadError::EntryReturned { entry_point: 0x100020 });
        assert_eq!(loader.memory().read(MEMORY_BASE, 0x40), &[0xf4; 0x40]);
    }

    #[test]
    fn loads_segments_in_table_order() {
        let text = [0x11u8; 0x1200];
        let data = [0x22u8; 0x100];
        let kernel = ElfImage::new(MEMORY_BASE)
            .segment(MEMORY_BASE, &text, 0x1200)
            .segment(MEMORY_BASE + 0x2000, &data, 0x1000)
            .build();
        let mut loader = loader_for(&kernel);
        let mut scratch = ScratchPage::new();

        loader.load_image(&mut scratch).unwrap();

        let memory = loader.memory();
        assert_eq!(memory.read(MEMORY_BASE, 0x1200), &text[..]);
        assert_eq!(memory.read(MEMORY_BASE + 0x2000, 0x100), &data[..]);
        assert!(memory.read(MEMORY_BASE + 0x2100, 0xf00).iter().all(|b| *b == 0));
    }

    #[test]
    fn program_headers_past_first_page() {
        let mut kernel = ElfImage::new(MEMORY_BASE)
            .segment(MEMORY_BASE, &[1; 0x10], 0x10)
            .build();
        // point the table at the very end of the first page
        kernel[28..32].copy_from_slice(&0xff0u32.to_le_bytes());
        let mut loader = loader_for(&kernel);
        let mut scratch = ScratchPage::new();

        assert_eq!(
            loader.load_image(&mut scratch),
            Err(LoadError::ProgramHeaderOutOfBounds { offset: 0xff0, count: 1 }),
        );
        assert_eq!(loader.memory().write_count(), 0);
    }

    #[test]
    fn empty_segment_touches_nothing() {
        let kernel = ElfImage::new(MEMORY_BASE)
            .segment_at(0, MEMORY_BASE + 0x8000, &[], 0)
            .build();
        let mut loader = loader_for(&kernel);
        let mut scratch = ScratchPage::new();

        loader.load_image(&mut scratch).unwrap();

        assert_eq!(loader.memory().write_count(), 0);
        assert_eq!(loader.image().disk().ports().sectors_read().len(), 8);
    }
}
