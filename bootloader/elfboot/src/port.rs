/// Access to the x86 IO address space. The boot binary implements this with
/// `in`/`out` instructions; tests substitute a register-level model.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;

    fn write_u8(&mut self, port: u16, value: u8);

    /// Fill `buffer` from a 32-bit data port, one doubleword per read. Bytes
    /// land in little-endian order, the same as `rep insd` would leave them.
    /// `buffer.len()` is expected to be a multiple of 4.
    fn read_dwords(&mut self, port: u16, buffer: &mut [u8]);
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn read_u8(&mut self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }

    fn read_dwords(&mut self, port: u16, buffer: &mut [u8]) {
        (**self).read_dwords(port, buffer)
    }
}
