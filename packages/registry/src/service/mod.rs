pub mod file;
pub mod global_file;

pub use file::FileRegistry;
pub use global_file::GlobalFiles;
