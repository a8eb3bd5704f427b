pub mod file;
pub mod global_file;
pub mod knowledge_base_file;
