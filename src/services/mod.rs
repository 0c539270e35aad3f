pub mod filesystem_service;

pub use filesystem_service::{FileEntry, FilesystemError, FilesystemService};
