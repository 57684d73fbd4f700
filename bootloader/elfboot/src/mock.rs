//! Deterministic stand-ins for the hardware capabilities, used by the unit
//! tests and (through the `mock` feature) by the integration tests.

use alloc::vec;
use alloc::vec::Vec;

use crate::ata::{AtaCommand, PRIMARY_CHANNEL_BASE, SECTOR_SIZE};
use crate::elf::{ElfHeader, FileHeader, ProgramHeader, ELF_MAGIC, PROGRAM_HEADER_SIZE};
use crate::loader::Trampoline;
use crate::memory::PhysicalMemory;
use crate::port::PortIo;

const STATUS_BUSY: u8 = 0xd0;
const STATUS_READY_DATA_REQUEST: u8 = 0x58;

/// A whole disk, sector 0 included.
#[derive(Clone)]
pub struct DiskImage {
    bytes: Vec<u8>,
}

impl DiskImage {
    pub fn blank(sectors: usize) -> Self {
        Self {
            bytes: vec![0; sectors * SECTOR_SIZE],
        }
    }

    /// A disk with a filler boot sector followed by `kernel` starting at
    /// sector 1
    pub fn with_kernel(kernel: &[u8]) -> Self {
        let mut image = Self::blank(1);
        image.bytes.fill(0xb0);
        image.write(SECTOR_SIZE, kernel);
        image
    }

    pub fn sector_mut(&mut self, sector: usize) -> &mut [u8] {
        let start = sector * SECTOR_SIZE;
        self.grow_to(start + SECTOR_SIZE);
        &mut self.bytes[start..start + SECTOR_SIZE]
    }

    /// Write `data` at byte offset `offset` of the disk
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        self.grow_to(offset + data.len());
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Sectors past the end of the image read as zero
    pub fn read_sector(&self, sector: u32, dst: &mut [u8]) {
        let start = sector as usize * SECTOR_SIZE;
        dst.fill(0);
        if start < self.bytes.len() {
            let end = (start + SECTOR_SIZE).min(self.bytes.len());
            dst[..end - start].copy_from_slice(&self.bytes[start..end]);
        }
    }

    fn grow_to(&mut self, length: usize) {
        if self.bytes.len() < length {
            self.bytes.resize(length, 0);
        }
    }
}

/// Register-level model of one ATA channel with a single drive. Records
/// every register write so tests can check the exact programming sequence.
pub struct MockDisk {
    image: DiskImage,
    base_port: u16,
    registers: [u8; 8],
    register_writes: Vec<(u16, u8)>,
    busy_polls: usize,
    status_polls: usize,
    transfer: [u8; SECTOR_SIZE],
    transfer_cursor: usize,
    sectors_read: Vec<u32>,
    dword_reads: usize,
}

impl MockDisk {
    pub fn new(image: DiskImage) -> Self {
        Self::with_base(image, PRIMARY_CHANNEL_BASE)
    }

    pub fn with_base(image: DiskImage, base_port: u16) -> Self {
        Self {
            image,
            base_port,
            registers: [0; 8],
            register_writes: Vec::new(),
            busy_polls: 0,
            status_polls: 0,
            transfer: [0; SECTOR_SIZE],
            transfer_cursor: SECTOR_SIZE,
            sectors_read: Vec::new(),
            dword_reads: 0,
        }
    }

    /// Report busy for the next `polls` status reads
    pub fn stay_busy_for(&mut self, polls: usize) {
        self.busy_polls = polls;
    }

    pub fn register_writes(&self) -> &[(u16, u8)] {
        &self.register_writes
    }

    pub fn status_polls(&self) -> usize {
        self.status_polls
    }

    pub fn sectors_read(&self) -> &[u32] {
        &self.sectors_read
    }

    pub fn dword_reads(&self) -> usize {
        self.dword_reads
    }

    fn register_index(&self, port: u16) -> usize {
        match port.checked_sub(self.base_port) {
            Some(offset) if offset < 8 => offset as usize,
            _ => panic!("port {:#x} is not on this channel", port),
        }
    }

    fn start_read(&mut self) {
        let lba = (self.registers[3] as u32)
            | ((self.registers[4] as u32) << 8)
            | ((self.registers[5] as u32) << 16)
            | (((self.registers[6] & 0x0f) as u32) << 24);
        assert_eq!(self.registers[2], 1, "only single-sector reads are issued");
        assert_eq!(self.registers[6] & 0xe0, 0xe0, "LBA mode on the primary drive");
        self.image.read_sector(lba, &mut self.transfer);
        self.transfer_cursor = 0;
        self.sectors_read.push(lba);
    }
}

impl PortIo for MockDisk {
    fn read_u8(&mut self, port: u16) -> u8 {
        let index = self.register_index(port);
        if index != 7 {
            return self.registers[index];
        }
        self.status_polls += 1;
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            return STATUS_BUSY;
        }
        STATUS_READY_DATA_REQUEST
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        let index = self.register_index(port);
        self.register_writes.push((port, value));
        self.registers[index] = value;
        if index == 7 && value == AtaCommand::ReadSectors as u8 {
            self.start_read();
        }
    }

    fn read_dwords(&mut self, port: u16, buffer: &mut [u8]) {
        assert_eq!(port, self.base_port, "data is read from the data register");
        for chunk in buffer.chunks_mut(4) {
            let end = self.transfer_cursor + 4;
            assert!(end <= SECTOR_SIZE, "read past the transferred sector");
            chunk.copy_from_slice(&self.transfer[self.transfer_cursor..end]);
            self.transfer_cursor = end;
            self.dword_reads += 1;
        }
    }
}

/// A window of physical memory starting at `base`. Starts out filled with
/// [`MockMemory::POISON`] so cleared bytes are visible.
pub struct MockMemory {
    base: u32,
    bytes: Vec<u8>,
    write_count: usize,
}

impl MockMemory {
    pub const POISON: u8 = 0xcc;

    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: vec![Self::POISON; size],
            write_count: 0,
        }
    }

    pub fn read(&self, address: u32, length: usize) -> &[u8] {
        let start = self.index(address);
        &self.bytes[start..start + length]
    }

    /// Number of sector writes and zero fills performed
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    fn index(&self, address: u32) -> usize {
        match address.checked_sub(self.base) {
            Some(offset) if (offset as usize) < self.bytes.len() => offset as usize,
            _ => panic!("address {:#x} is outside mock memory", address),
        }
    }
}

impl PhysicalMemory for MockMemory {
    fn sector_mut(&mut self, address: u32) -> &mut [u8; SECTOR_SIZE] {
        self.write_count += 1;
        let start = self.index(address);
        let window = &mut self.bytes[start..start + SECTOR_SIZE];
        window.try_into().unwrap()
    }

    fn zero(&mut self, address: u32, length: u32) {
        self.write_count += 1;
        let start = self.index(address);
        self.bytes[start..start + length as usize].fill(0);
    }
}

#[derive(Default)]
pub struct RecordingTrampoline {
    entries: Vec<u32>,
}

impl RecordingTrampoline {
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }
}

impl Trampoline for RecordingTrampoline {
    fn enter(&mut self, entry_point: u32) {
        self.entries.push(entry_point);
    }
}

struct Segment {
    offset: Option<u32>,
    physical_address: u32,
    data: Vec<u8>,
    memory_size: u32,
}

/// Builds a minimal ELF32 executable: file header, program header table
/// right after it, then segment data.
pub struct ElfImage {
    entry_point: u32,
    segments: Vec<Segment>,
}

impl ElfImage {
    pub fn new(entry_point: u32) -> Self {
        Self {
            entry_point,
            segments: Vec::new(),
        }
    }

    /// Add a segment whose file offset is picked the way a linker would:
    /// past everything before it, congruent to its address modulo the page
    /// size.
    pub fn segment(mut self, physical_address: u32, data: &[u8], memory_size: u32) -> Self {
        self.segments.push(Segment {
            offset: None,
            physical_address,
            data: data.to_vec(),
            memory_size,
        });
        self
    }

    /// Add a segment at an explicit file offset
    pub fn segment_at(mut self, offset: u32, physical_address: u32, data: &[u8], memory_size: u32) -> Self {
        self.segments.push(Segment {
            offset: Some(offset),
            physical_address,
            data: data.to_vec(),
            memory_size,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let header_size = core::mem::size_of::<ElfHeader>();
        let table_end = header_size + self.segments.len() * PROGRAM_HEADER_SIZE;

        let mut file = vec![0u8; table_end];
        let mut next_free = table_end as u32;
        let mut program_headers = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let offset = segment.offset.unwrap_or_else(|| {
                let page_offset = segment.physical_address & 0xfff;
                let mut offset = (next_free & !0xfff) | page_offset;
                if offset < next_free {
                    offset += 0x1000;
                }
                offset
            });
            let end = offset as usize + segment.data.len();
            if file.len() < end {
                file.resize(end, 0);
            }
            file[offset as usize..end].copy_from_slice(&segment.data);
            next_free = next_free.max(end as u32);

            program_headers.push(ProgramHeader {
                segment_type: 1,
                offset,
                virtual_address: segment.physical_address,
                physical_address: segment.physical_address,
                file_size: segment.data.len() as u32,
                memory_size: segment.memory_size,
                flags: 0b111,
                alignment: 0x1000,
            });
        }

        let header = ElfHeader {
            magic_number: ELF_MAGIC.to_le_bytes(),
            bit_class: 1,
            endianness: 1,
            identifier_version: 1,
            object_type: 2,
            machine: 3,
            elf_version: 1,
            entry_point: self.entry_point,
            program_header_location: header_size as u32,
            header_size: header_size as u16,
            program_header_entry_size: PROGRAM_HEADER_SIZE as u16,
            program_header_entry_count: self.segments.len() as u16,
            section_header_entry_size: 40,
            ..Default::default()
        };
        file[..header_size].copy_from_slice(header.as_bytes());
        for (i, entry) in program_headers.iter().enumerate() {
            let start = header_size + i * PROGRAM_HEADER_SIZE;
            file[start..start + PROGRAM_HEADER_SIZE].copy_from_slice(entry.as_bytes());
        }
        file
    }
}
