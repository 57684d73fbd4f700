use elfboot::loader::Trampoline;

/// Calls the kernel entry point as a function that never comes back
pub struct KernelEntry;

impl Trampoline for KernelEntry {
    fn enter(&mut self, entry_point: u32) {
        let entry: extern "C" fn() -> ! = unsafe {
            core::mem::transmute(entry_point as usize)
        };
        entry()
    }
}
