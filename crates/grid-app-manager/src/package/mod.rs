//! Versioned packages: on-disk cache, archive unpacking and resolution.

mod cache;
mod resolver;
mod unpack;

pub use cache::{PackageCache, StagingArea};
pub use resolver::{
    DownloadSlot, DownloadSlots, PackageResolver, UpdateNotice, UpdateOutcome, UpdateSchedule,
};
pub use unpack::{unpack_archive, ArchiveKind};
