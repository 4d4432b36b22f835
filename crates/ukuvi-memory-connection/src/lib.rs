mod memory;

pub use memory::MemoryConnection;
