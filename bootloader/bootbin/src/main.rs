//! Stage 2: entered in 32-bit protected mode with flat segments. Loads the
//! ELF kernel that follows the boot sector and jumps into it.

#![no_std]
#![no_main]

mod gdt;
mod memory;
mod port;
mod serial;
mod trampoline;

use core::arch::asm;

use elfboot::config::LoaderConfig;
use elfboot::loader::Loader;
use elfboot::memory::ScratchPage;

#[no_mangle]
#[link_section = ".entry"]
pub extern "C" fn _start() -> ! {
    let config = LoaderConfig::DEFAULT
        .with_log_level(option_env!("ELFBOOT_LOG"))
        .with_image_sector(option_env!("ELFBOOT_IMAGE_SECTOR"));
    serial::init_logger(config.serial_port, config.log_level);
    log::info!("= ELFBOOT =");
    let image_sector = config.image_start_sector;
    log::info!("Kernel image at sector {:#X}", image_sector);

    let gdt_pointer = gdt::load_boot_gdt();
    let (gdt_base, gdt_limit) = (gdt_pointer.base, gdt_pointer.limit);
    log::debug!("GDT at {:#010X}, limit {:#X}", gdt_base, gdt_limit);

    // the scratch page is plain low memory, below anything the kernel loads
    let scratch = unsafe { &mut *(config.scratch_address as usize as *mut ScratchPage) };
    let mut loader = Loader::new(port::X86Ports, memory::IdentityMapped, &config);
    let error = loader.load_and_boot(scratch, &mut trampoline::KernelEntry);

    log::error!("Boot failed: {}", error);
    halt()
}

fn halt() -> ! {
    loop {
        unsafe {
            asm!("cli", "hlt", options(nomem, nostack));
        }
    }
}

#[panic_handler]
pub fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("PANIC: {}", info);
    halt()
}
