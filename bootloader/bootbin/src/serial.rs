use core::fmt::Write;
use core::sync::atomic::{AtomicU16, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::port::Port;

const STATUS_TRANSMIT_BUFFER_EMPTY: u8 = 1 << 5;

/// Transmit-only view of a 16550 UART. Nothing is ever read back during boot.
pub struct SerialPort {
    /// Writing to data sends to the transmit buffer
    data: Port,
    interrupt_enable: Port,
    fifo_control: Port,
    /// Determines the behavior and format of data on the wire
    line_control: Port,
    modem_control: Port,
    line_status: Port,
}

impl SerialPort {
    pub fn new(base_port: u16) -> Self {
        Self {
            data:               Port::new(base_port),
            interrupt_enable:   Port::new(base_port + 1),
            fifo_control:       Port::new(base_port + 2),
            line_control:       Port::new(base_port + 3),
            modem_control:      Port::new(base_port + 4),
            line_status:        Port::new(base_port + 5),
        }
    }

    pub fn init(&self) {
        // interrupts stay off for the whole boot
        self.interrupt_enable.write_u8(0);

        // Enable divisor latch access, allowing the baud rate to be changed
        self.line_control.write_u8(0x80);
        // With DLAB enabled, the data register accesses the low 8 bits of the
        // internal divisor, and the interrupt register accesses the high bits
        self.data.write_u8(0x03); // 115200 / 3 = 38,400 baud
        self.interrupt_enable.write_u8(0);

        // Set a standard 8n1 protocol: 8 bits, no parity, 1 stop bit
        self.line_control.write_u8(0x03);

        // Enable FIFO buffers: set the highest buffer size, clear the buffers,
        // and enable them.
        self.fifo_control.write_u8(0xc7);

        // DTR + RTS, no interrupt line
        self.modem_control.write_u8(0x03);
    }

    pub fn is_transmitting(&self) -> bool {
        (self.line_status.read_u8() & STATUS_TRANSMIT_BUFFER_EMPTY) == 0
    }

    pub fn send_byte(&self, byte: u8) {
        while self.is_transmitting() {}
        self.data.write_u8(byte);
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            self.send_byte(byte);
        }
        Ok(())
    }
}

/// `log` backend writing tagged, colored lines to a COM port
pub struct SerialLogger {
    port: AtomicU16,
}

impl SerialLogger {
    pub const fn new() -> Self {
        Self {
            port: AtomicU16::new(0),
        }
    }
}

fn level_color(level: Level) -> u8 {
    match level {
        Level::Error => 31,
        Level::Warn => 33,
        Level::Info => 32,
        Level::Debug => 36,
        Level::Trace => 90,
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && self.port.load(Ordering::Relaxed) != 0
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut serial = SerialPort::new(self.port.load(Ordering::Relaxed));
        let _ = write!(
            serial,
            "\x1b[{}m{:<5}\x1b[0m: {}\r\n",
            level_color(record.level()),
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger::new();

pub fn init_logger(port: u16, level: LevelFilter) {
    SerialPort::new(port).init();
    LOGGER.port.store(port, Ordering::Relaxed);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
