pub mod archive;

pub use archive::{ArchivePackager, PackagedArchive};
