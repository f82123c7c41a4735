//! Version reporting across the driver boundary.

/// Version tuple exchanged between library, driver and device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Version {
    /// Incompatible interface changes
    pub major: u8,
    /// Compatible additions
    pub minor: u8,
    /// Fixes
    pub patch: u8,
    /// Build number
    pub build: u8,
    /// Component name
    pub name: &'static str,
    /// Free-form description
    pub description: &'static str,
}

impl Version {
    /// Create a version tuple
    #[must_use]
    pub const fn new(
        major: u8,
        minor: u8,
        patch: u8,
        build: u8,
        name: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
            name,
            description,
        }
    }

    /// Same major and minor version
    ///
    /// A mismatch is a compatibility warning, not an error.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} {}.{}.{}.{}",
            self.name, self.major, self.minor, self.patch, self.build
        )?;
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

/// Version of this library
pub const LIBRARY_VERSION: Version = Version::new(
    0,
    1,
    0,
    0,
    "ph-dma-engine",
    "ring-based DMA transfer library",
);
