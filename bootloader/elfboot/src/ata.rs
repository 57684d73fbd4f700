//! Polled, single-sector reads from the primary ATA channel. This is the only
//! part of the loader that talks to the disk controller, and it does so in
//! the plainest way possible: wait for the drive, program one 28-bit LBA
//! read, wait again, and pull 512 bytes out of the data register.

use crate::port::PortIo;

pub const SECTOR_SIZE: usize = 512;

pub const PRIMARY_CHANNEL_BASE: u16 = 0x1f0;

/// Register offsets from the channel base port
const REG_DATA: u16 = 0;
const REG_SECTOR_COUNT: u16 = 2;
const REG_LBA_LOW: u16 = 3;
const REG_LBA_MID: u16 = 4;
const REG_LBA_HIGH: u16 = 5;
const REG_DRIVE_SELECT: u16 = 6;
/// Reads return status, writes issue a command
const REG_STATUS_COMMAND: u16 = 7;

const STATUS_BUSY: u8 = 0x80;
const STATUS_READY: u8 = 0x40;

/// LBA addressing, primary drive. Bits 24-27 of the LBA share the register.
/// Sectors past 28 bits are out of range for this transfer mode and are not
/// masked off.
const DRIVE_SELECT_LBA_PRIMARY: u8 = 0xe0;

#[repr(u8)]
pub enum AtaCommand {
    ReadSectors = 0x20,
}

pub struct AtaPio<P: PortIo> {
    ports: P,
    base_port: u16,
}

impl<P: PortIo> AtaPio<P> {
    pub fn new(ports: P, base_port: u16) -> Self {
        Self { ports, base_port }
    }

    pub fn primary(ports: P) -> Self {
        Self::new(ports, PRIMARY_CHANNEL_BASE)
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    /// Spin until the drive reports ready with busy clear. There is no
    /// timeout; a drive that never comes ready hangs the boot here.
    pub fn wait_ready(&mut self) {
        let status_port = self.base_port + REG_STATUS_COMMAND;
        while self.ports.read_u8(status_port) & (STATUS_BUSY | STATUS_READY) != STATUS_READY {
            core::hint::spin_loop();
        }
    }

    pub fn read_sector(&mut self, dst: &mut [u8; SECTOR_SIZE], sector: u32) {
        log::trace!("ATA READ: sector {:#x}", sector);

        self.wait_ready();
        self.write_register(REG_SECTOR_COUNT, 1);
        self.write_register(REG_LBA_LOW, sector as u8);
        self.write_register(REG_LBA_MID, (sector >> 8) as u8);
        self.write_register(REG_LBA_HIGH, (sector >> 16) as u8);
        self.write_register(REG_DRIVE_SELECT, (sector >> 24) as u8 | DRIVE_SELECT_LBA_PRIMARY);
        self.write_register(REG_STATUS_COMMAND, AtaCommand::ReadSectors as u8);

        self.wait_ready();
        self.ports.read_dwords(self.base_port + REG_DATA, dst);
    }

    fn write_register(&mut self, register: u16, value: u8) {
        self.ports.write_u8(self.base_port + register, value);
    }
}
