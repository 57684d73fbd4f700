use core::arch::asm;

use elfboot::gdt::{GdtPointer, SegmentDescriptor, DATA_SELECTOR, FLAT_GDT};

/// The first stage enters protected mode with a throwaway table of its own.
/// Stage 2 switches to this one before touching the disk, so the selectors
/// the kernel inherits (code 0x08, data 0x10) always point at these flat
/// descriptors.
pub static BOOT_GDT: [SegmentDescriptor; 3] = FLAT_GDT;

pub fn boot_gdt_pointer() -> GdtPointer {
    GdtPointer::point_to(&BOOT_GDT)
}

/// Install `BOOT_GDT` and reload the data segment registers from it. CS is
/// left alone: the code descriptor is identical to the one it already
/// caches, and it is reloaded on the next far jump.
pub fn load_boot_gdt() -> GdtPointer {
    let pointer = boot_gdt_pointer();
    unsafe {
        asm!(
            "lgdt [{pointer}]",
            "mov ds, {selector:x}",
            "mov es, {selector:x}",
            "mov fs, {selector:x}",
            "mov gs, {selector:x}",
            "mov ss, {selector:x}",
            pointer = in(reg) &pointer,
            selector = in(reg) DATA_SELECTOR.as_u16() as u32,
            options(readonly, nostack, preserves_flags),
        );
    }
    pointer
}
