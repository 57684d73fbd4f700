//! ELF32 headers, as they appear at the front of the kernel image

use core::mem::size_of;

use crate::error::LoadError;

/// `\x7fELF` read as a little-endian u32
pub const ELF_MAGIC: u32 = 0x464c457f;

/// Plain-old-data headers that can be lifted straight out of a byte buffer.
/// Every field is an integer, so any bit pattern is a valid value.
pub trait FileHeader: Sized + Copy {
    fn read_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < size_of::<Self>() {
            return None;
        }
        let header = unsafe { core::ptr::read_unaligned(bytes.as_ptr() as *const Self) };
        Some(header)
    }

    fn as_bytes(&self) -> &[u8] {
        let ptr = self as *const Self as *const u8;
        unsafe { core::slice::from_raw_parts(ptr, size_of::<Self>()) }
    }
}

#[derive(Clone, Copy, Default)]
#[repr(C, packed)]
pub struct ElfHeader {
    pub magic_number: [u8; 4],
    /// 1 indicates 32-bit, 2 indicates 64-bit
    pub bit_class: u8,
    /// 1 indicates little-endian, 2 indicates big-endian
    pub endianness: u8,
    pub identifier_version: u8,
    pub os_abi: u8,
    pub os_abi_version: u8,
    pub reserved_padding: [u8; 7],
    pub object_type: u16,
    pub machine: u16,
    pub elf_version: u32,
    /// Physical address the loader jumps to once all segments are in place
    pub entry_point: u32,
    /// Offset of the program header table from the start of the file
    pub program_header_location: u32,
    pub section_header_location: u32,
    pub flags: u32,
    pub header_size: u16,
    pub program_header_entry_size: u16,
    pub program_header_entry_count: u16,
    pub section_header_entry_size: u16,
    pub section_header_entry_count: u16,
    pub section_name_entry_index: u16,
}

impl FileHeader for ElfHeader {}

impl ElfHeader {
    pub fn magic(&self) -> u32 {
        u32::from_le_bytes(self.magic_number)
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic() == ELF_MAGIC
    }
}

#[derive(Clone, Copy, Default)]
#[repr(C, packed)]
pub struct ProgramHeader {
    pub segment_type: u32,
    /// Offset of the segment data in the file
    pub offset: u32,
    pub virtual_address: u32,
    /// Where the segment is placed. The loader runs without paging, so this
    /// is the address that matters.
    pub physical_address: u32,
    pub file_size: u32,
    /// In-memory size; anything past `file_size` is zero-filled
    pub memory_size: u32,
    pub flags: u32,
    pub alignment: u32,
}

impl FileHeader for ProgramHeader {}

impl ProgramHeader {
    /// Bytes past the end of the file data that must read as zero
    pub fn zero_fill_size(&self) -> u32 {
        self.memory_size.saturating_sub(self.file_size)
    }
}

pub const PROGRAM_HEADER_SIZE: usize = size_of::<ProgramHeader>();

/// Walks the program header table of an image whose first bytes are in `page`.
/// The whole table has to be inside `page`.
pub struct ProgramHeaders<'a> {
    table: &'a [u8],
}

impl<'a> ProgramHeaders<'a> {
    pub fn new(page: &'a [u8], header: &ElfHeader) -> Result<Self, LoadError> {
        let offset = header.program_header_location;
        let count = header.program_header_entry_count;
        let start = offset as usize;
        let table = start
            .checked_add(count as usize * PROGRAM_HEADER_SIZE)
            .and_then(|end| page.get(start..end));
        match table {
            Some(table) => Ok(Self { table }),
            None => Err(LoadError::ProgramHeaderOutOfBounds { offset, count }),
        }
    }
}

impl<'a> Iterator for ProgramHeaders<'a> {
    type Item = ProgramHeader;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = ProgramHeader::read_from(self.table)?;
        self.table = &self.table[PROGRAM_HEADER_SIZE..];
        Some(entry)
    }
}
