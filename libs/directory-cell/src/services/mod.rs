pub mod directory;

pub use directory::{DirectoryService, MemoryDirectory, PartyDirectory, PostgrestDirectory};
