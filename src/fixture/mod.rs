//! Fixture model: in-memory packages and their on-disk encodings
//!
//! Nothing in here touches the filesystem; see [`crate::database`].

pub mod desc;
mod package;
pub mod version;

pub use desc::{DescRecord, parse_desc};
pub use package::{
    ChangelogEntry, ChangelogOrder, DEFAULT_DESCRIPTION, InstallReason, PackageFixture,
};
