//! Flat protected-mode segment descriptors. Everything in this module is a
//! `const fn`, so descriptor tables built with it are fixed at compile time
//! and cost nothing at boot.

/// Executable segment
pub const SEGMENT_TYPE_EXECUTABLE: u8 = 0x8;
/// Writable (data segments). Same bit as [`SEGMENT_TYPE_READABLE`].
pub const SEGMENT_TYPE_WRITABLE: u8 = 0x2;
/// Readable (code segments). Same bit as [`SEGMENT_TYPE_WRITABLE`].
pub const SEGMENT_TYPE_READABLE: u8 = 0x2;

/// Present, ring 0, code/data descriptor
const ACCESS_PRESENT_RING_0_CODE_DATA: u8 = 0x90;
/// Limit counted in 4KiB pages, 32-bit default operand size
const FLAGS_GRANULARITY_4KB_SIZE_32_BIT: u8 = 0xc0;

/// Encode a descriptor for the segment `[base, base + limit]`. The limit is
/// always stored in page units, so its low 12 bits are dropped.
pub const fn encode_descriptor(seg_type: u8, base: u32, limit: u32) -> [u8; 8] {
    let limit_pages = limit >> 12;
    [
        limit_pages as u8,
        (limit_pages >> 8) as u8,
        base as u8,
        (base >> 8) as u8,
        (base >> 16) as u8,
        ACCESS_PRESENT_RING_0_CODE_DATA | seg_type,
        FLAGS_GRANULARITY_4KB_SIZE_32_BIT | ((limit >> 28) & 0xf) as u8,
        (base >> 24) as u8,
    ]
}

#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct SegmentDescriptor {
    pub limit_low: u16,
    pub base_low: u16,
    pub base_middle: u8,
    pub access: u8,
    pub flags_and_limit_high: u8,
    pub base_high: u8,
}

impl SegmentDescriptor {
    /// Entry 0 of every descriptor table
    pub const NULL: SegmentDescriptor = SegmentDescriptor::from_bytes([0; 8]);

    pub const fn flat(seg_type: u8, base: u32, limit: u32) -> Self {
        Self::from_bytes(encode_descriptor(seg_type, base, limit))
    }

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self {
            limit_low: u16::from_le_bytes([bytes[0], bytes[1]]),
            base_low: u16::from_le_bytes([bytes[2], bytes[3]]),
            base_middle: bytes[4],
            access: bytes[5],
            flags_and_limit_high: bytes[6],
            base_high: bytes[7],
        }
    }

    pub const fn to_bytes(&self) -> [u8; 8] {
        let limit_low = self.limit_low;
        let base_low = self.base_low;
        let limit = limit_low.to_le_bytes();
        let base = base_low.to_le_bytes();
        [
            limit[0],
            limit[1],
            base[0],
            base[1],
            self.base_middle,
            self.access,
            self.flags_and_limit_high,
            self.base_high,
        ]
    }
}

/// A segment selector encodes a GDT entry and a privilege level into a single
/// u16 value
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct SegmentSelector(u16);

impl SegmentSelector {
    pub const fn new(table_index: u16, privilege_level: u16) -> Self {
        Self((table_index << 3) | (privilege_level & 3))
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

pub const CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, 0);
pub const DATA_SELECTOR: SegmentSelector = SegmentSelector::new(2, 0);

/// The table the loader runs under: null, then 4GiB code and data segments
/// starting at 0.
pub const FLAT_GDT: [SegmentDescriptor; 3] = [
    SegmentDescriptor::NULL,
    // 0x08: code
    SegmentDescriptor::flat(SEGMENT_TYPE_EXECUTABLE | SEGMENT_TYPE_READABLE, 0, 0xffffffff),
    // 0x10: data
    SegmentDescriptor::flat(SEGMENT_TYPE_WRITABLE, 0, 0xffffffff),
];

/// Operand of `lgdt`
#[derive(Clone, Copy)]
#[repr(C, packed)]
pub struct GdtPointer {
    pub limit: u16,
    pub base: u32,
}

impl GdtPointer {
    pub const fn new(base: u32, entry_count: usize) -> Self {
        Self {
            limit: (entry_count * core::mem::size_of::<SegmentDescriptor>() - 1) as u16,
            base,
        }
    }

    pub fn point_to(table: &[SegmentDescriptor]) -> Self {
        Self::new(table.as_ptr() as usize as u32, table.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_code_segment() {
        let bytes = encode_descriptor(SEGMENT_TYPE_EXECUTABLE | SEGMENT_TYPE_READABLE, 0, 0xffffffff);
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 0xffff);
        assert_eq!(&bytes[2..5], &[0, 0, 0]);
        assert_eq!(bytes[5], 0x9a);
        assert_eq!(bytes[6], 0xcf);
        assert_eq!(bytes[7], 0);
    }

    #[test]
    fn flat_data_segment() {
        assert_eq!(
            encode_descriptor(SEGMENT_TYPE_WRITABLE, 0, 0xffffffff),
            [0xff, 0xff, 0, 0, 0, 0x92, 0xcf, 0],
        );
    }

    #[test]
    fn base_and_limit_split() {
        // 16MiB segment starting at 0x12345678
        let bytes = encode_descriptor(SEGMENT_TYPE_WRITABLE, 0x12345678, 0x00ffffff);
        assert_eq!(bytes, [0xff, 0x0f, 0x78, 0x56, 0x34, 0x92, 0xc0, 0x12]);
    }

    #[test]
    fn limit_is_page_granular() {
        assert_eq!(
            encode_descriptor(0, 0, 0x1fff),
            encode_descriptor(0, 0, 0x1000),
        );
    }

    #[test]
    fn struct_matches_encoding() {
        let descriptor = SegmentDescriptor::flat(SEGMENT_TYPE_EXECUTABLE, 0xabcd0000, 0xffffffff);
        let raw = unsafe { core::mem::transmute::<SegmentDescriptor, [u8; 8]>(descriptor) };
        assert_eq!(raw, encode_descriptor(SEGMENT_TYPE_EXECUTABLE, 0xabcd0000, 0xffffffff));
        assert_eq!(raw, descriptor.to_bytes());
        assert_eq!({ descriptor.access }, 0x98);
    }

    #[test]
    fn flat_table() {
        assert_eq!(core::mem::size_of::<[SegmentDescriptor; 3]>(), 24);
        assert_eq!(FLAT_GDT[0].to_bytes(), [0; 8]);
        assert_eq!(FLAT_GDT[1].to_bytes(), [0xff, 0xff, 0, 0, 0, 0x9a, 0xcf, 0]);
        assert_eq!(FLAT_GDT[2].to_bytes(), [0xff, 0xff, 0, 0, 0, 0x92, 0xcf, 0]);
        assert_eq!(CODE_SELECTOR.as_u16(), 0x08);
        assert_eq!(DATA_SELECTOR.as_u16(), 0x10);
    }

    #[test]
    fn gdt_pointer_limit() {
        let pointer = GdtPointer::new(0x7c60, FLAT_GDT.len());
        assert_eq!({ pointer.limit }, 23);
        assert_eq!({ pointer.base }, 0x7c60);
        assert_eq!(core::mem::size_of::<GdtPointer>(), 6);
    }

    static INSTALLED: [SegmentDescriptor; 3] = FLAT_GDT;

    #[test]
    fn pointer_to_installed_table() {
        let pointer = GdtPointer::point_to(&INSTALLED);
        assert_eq!({ pointer.limit }, 23);
        assert_eq!({ pointer.base }, INSTALLED.as_ptr() as usize as u32);
        // selector 0x10 reloaded into the data registers indexes the data entry
        let data = &INSTALLED[(DATA_SELECTOR.as_u16() >> 3) as usize];
        assert_eq!(data.to_bytes()[5], 0x92);
    }
}
