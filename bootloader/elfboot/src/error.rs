use core::fmt;

/// Reasons the loader hands control back to its caller instead of starting
/// the kernel. A disk that never becomes ready is not one of them: the
/// sector reader simply keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The first word of the image is not `\x7fELF`
    BadMagic { found: u32 },
    /// The program header table extends past the scratch page
    ProgramHeaderOutOfBounds { offset: u32, count: u16 },
    /// The kernel entry routine came back
    EntryReturned { entry_point: u32 },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::BadMagic { found } => {
                write!(f, "kernel image is not ELF (magic {:#010x})", found)
            }
            LoadError::ProgramHeaderOutOfBounds { offset, count } => write!(
                f,
                "{} program headers at {:#x} do not fit in the first page",
                count, offset,
            ),
            LoadError::EntryReturned { entry_point } => {
                write!(f, "kernel entry at {:#010x} returned", entry_point)
            }
        }
    }
}
