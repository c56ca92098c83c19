//! Where image tarballs come from.

mod docker;
mod source;
mod tar;

pub use docker::DockerSource;
pub use source::Source;
pub use tar::TarSource;
