use core::arch::asm;

use elfboot::port::PortIo;

/// The x86 processor family has two address spaces: memory and IO. The disk
/// controller and the serial port both live in the IO space, and are only
/// reachable with the `in` and `out` instructions.
#[derive(Copy, Clone)]
#[repr(transparent)]
pub struct Port(u16);

impl Port {
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    pub fn write_u8(&self, value: u8) {
        unsafe {
            // writing to a variable port is only possible through the DX and AL
            // registers
            asm!(
                "out dx, al",
                in("dx") self.0,
                in("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }

    pub fn read_u8(&self) -> u8 {
        let value: u8;
        unsafe {
            asm!(
                "in al, dx",
                out("al") value,
                in("dx") self.0,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }

    pub fn read_u32(&self) -> u32 {
        let value: u32;
        unsafe {
            asm!(
                "in eax, dx",
                out("eax") value,
                in("dx") self.0,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }
}

/// Direct port access for the loader core
pub struct X86Ports;

impl PortIo for X86Ports {
    fn read_u8(&mut self, port: u16) -> u8 {
        Port::new(port).read_u8()
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        Port::new(port).write_u8(value)
    }

    fn read_dwords(&mut self, port: u16, buffer: &mut [u8]) {
        let data = Port::new(port);
        for chunk in buffer.chunks_exact_mut(4) {
            chunk.copy_from_slice(&data.read_u32().to_le_bytes());
        }
    }
}
