//! Raw sector-dump disk images.
//!
//! A raw image is every sector of the disk laid end to end: cylinder-major,
//! then head, then sector in ID order. There is no header, so the geometry
//! comes either from the caller or from the file size.

use thiserror::Error;

/// Physical layout of a raw image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub cylinders: u8,
    pub heads: u8,
    pub sectors_per_track: u8,
    pub sector_size: usize,
    /// ID of the first sector on each track (sectors are numbered upwards).
    pub first_sector_id: u8,
}

impl Geometry {
    /// MBC-200 quad-density 5.25" format: 80 x 2 x 16 x 256.
    pub const MBC200: Self = Self {
        cylinders: 80,
        heads: 2,
        sectors_per_track: 16,
        sector_size: 256,
        first_sector_id: 1,
    };

    /// Geometries recognised by [`Geometry::from_image_size`], in order.
    pub const KNOWN: [Self; 4] = [
        Self::MBC200,
        // 40-track double-sided
        Self {
            cylinders: 40,
            heads: 2,
            sectors_per_track: 16,
            sector_size: 256,
            first_sector_id: 1,
        },
        // 80-track single-sided
        Self {
            cylinders: 80,
            heads: 1,
            sectors_per_track: 16,
            sector_size: 256,
            first_sector_id: 1,
        },
        // 40-track single-sided
        Self {
            cylinders: 40,
            heads: 1,
            sectors_per_track: 16,
            sector_size: 256,
            first_sector_id: 1,
        },
    ];

    /// Bytes in one track of sector payloads.
    #[must_use]
    pub const fn track_size(&self) -> usize {
        self.sectors_per_track as usize * self.sector_size
    }

    /// Bytes in the whole image.
    #[must_use]
    pub const fn image_size(&self) -> usize {
        self.cylinders as usize * self.heads as usize * self.track_size()
    }

    /// ID of the last sector on a track.
    #[must_use]
    pub const fn last_sector_id(&self) -> u8 {
        self.first_sector_id
            .saturating_add(self.sectors_per_track)
            .saturating_sub(1)
    }

    /// Reject layouts the controller cannot address: no sectors, empty
    /// sectors, or sector IDs running past 255.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.image_size() == 0 {
            return Err(ImageError::EmptyGeometry);
        }
        if u16::from(self.first_sector_id) + u16::from(self.sectors_per_track) > 0x100 {
            return Err(ImageError::SectorIdOverflow {
                first: self.first_sector_id,
                count: self.sectors_per_track,
            });
        }
        Ok(())
    }

    /// Pick the known geometry whose image size matches.
    #[must_use]
    pub fn from_image_size(size: usize) -> Option<Self> {
        Self::KNOWN.into_iter().find(|g| g.image_size() == size)
    }

    /// Byte offset of a sector, or `None` if the address is off the disk.
    #[must_use]
    pub fn sector_offset(&self, cylinder: u8, head: u8, sector_id: u8) -> Option<usize> {
        if cylinder >= self.cylinders
            || head >= self.heads
            || sector_id < self.first_sector_id
            || sector_id - self.first_sector_id >= self.sectors_per_track
        {
            return None;
        }
        let track = cylinder as usize * self.heads as usize + head as usize;
        let index = (sector_id - self.first_sector_id) as usize;
        Some(track * self.track_size() + index * self.sector_size)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::MBC200
    }
}

/// Errors from building a disk image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image size {0} bytes does not match any known disk geometry")]
    UnknownSize(usize),
    #[error("image is {actual} bytes but the geometry needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("geometry has no sectors")]
    EmptyGeometry,
    #[error("{count} sectors starting at ID {first} run past sector ID 255")]
    SectorIdOverflow { first: u8, count: u8 },
}

/// A raw disk image in memory.
#[derive(Debug, Clone)]
pub struct DiskImage {
    geometry: Geometry,
    data: Vec<u8>,
    write_protected: bool,
    modified: bool,
}

impl DiskImage {
    /// Build an image from a file's bytes, detecting the geometry by size.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ImageError> {
        let geometry =
            Geometry::from_image_size(data.len()).ok_or(ImageError::UnknownSize(data.len()))?;
        Self::with_geometry(geometry, data)
    }

    /// Build an image with an explicit geometry.
    pub fn with_geometry(geometry: Geometry, data: Vec<u8>) -> Result<Self, ImageError> {
        geometry.validate()?;
        if data.len() != geometry.image_size() {
            return Err(ImageError::SizeMismatch {
                expected: geometry.image_size(),
                actual: data.len(),
            });
        }
        Ok(Self {
            geometry,
            data,
            write_protected: false,
            modified: false,
        })
    }

    /// A freshly formatted disk (every byte 0xE5).
    pub fn blank(geometry: Geometry) -> Result<Self, ImageError> {
        geometry.validate()?;
        Ok(Self {
            geometry,
            data: vec![0xE5; geometry.image_size()],
            write_protected: false,
            modified: false,
        })
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    #[must_use]
    pub fn is_write_protected(&self) -> bool {
        self.write_protected
    }

    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }

    /// True once anything has been written since the image was built.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True if the disk has the given cylinder.
    #[must_use]
    pub fn has_cylinder(&self, cylinder: u8) -> bool {
        cylinder < self.geometry.cylinders
    }

    /// Sector payload by physical cylinder, head and sector ID.
    #[must_use]
    pub fn sector(&self, cylinder: u8, head: u8, sector_id: u8) -> Option<&[u8]> {
        let offset = self.geometry.sector_offset(cylinder, head, sector_id)?;
        Some(&self.data[offset..offset + self.geometry.sector_size])
    }

    /// Mutable sector payload. Marks the image modified.
    pub fn sector_mut(&mut self, cylinder: u8, head: u8, sector_id: u8) -> Option<&mut [u8]> {
        let offset = self.geometry.sector_offset(cylinder, head, sector_id)?;
        self.modified = true;
        Some(&mut self.data[offset..offset + self.geometry.sector_size])
    }

    /// All sector payloads of one track, in ID order.
    #[must_use]
    pub fn track(&self, cylinder: u8, head: u8) -> Option<&[u8]> {
        let offset = self
            .geometry
            .sector_offset(cylinder, head, self.geometry.first_sector_id)?;
        Some(&self.data[offset..offset + self.geometry.track_size()])
    }

    /// Fill every sector of a track with `fill`. Returns false if the track
    /// is off the disk.
    pub fn format_track(&mut self, cylinder: u8, head: u8, fill: u8) -> bool {
        let Some(offset) = self
            .geometry
            .sector_offset(cylinder, head, self.geometry.first_sector_id)
        else {
            return false;
        };
        self.data[offset..offset + self.geometry.track_size()].fill(fill);
        self.modified = true;
        true
    }

    /// The raw image, for saving back to a file.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
