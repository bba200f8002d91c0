//! 5.25" floppy drive mechanism.
//!
//! Head position, side select, motor and the sensors the controller reads
//! back. The disk rotates only in the sense that READ ADDRESS and the index
//! sensor walk a sector cursor round the track.

use crate::image::DiskImage;

/// Last cylinder the head can reach (80-track drive plus overtravel).
pub const MAX_CYLINDER: u8 = 83;

pub struct FloppyDrive {
    disk: Option<DiskImage>,
    cylinder: u8,
    side: u8,
    motor_on: bool,
    /// Sector slot under the head, 0 = index hole.
    rotation: u8,
}

impl FloppyDrive {
    #[must_use]
    pub fn new() -> Self {
        Self {
            disk: None,
            cylinder: 0,
            side: 0,
            motor_on: false,
            rotation: 0,
        }
    }

    /// Insert a disk, returning any disk that was already in the drive.
    pub fn insert_disk(&mut self, image: DiskImage) -> Option<DiskImage> {
        self.rotation = 0;
        self.disk.replace(image)
    }

    pub fn eject_disk(&mut self) -> Option<DiskImage> {
        self.disk.take()
    }

    #[must_use]
    pub fn disk(&self) -> Option<&DiskImage> {
        self.disk.as_ref()
    }

    pub fn disk_mut(&mut self) -> Option<&mut DiskImage> {
        self.disk.as_mut()
    }

    #[must_use]
    pub fn has_disk(&self) -> bool {
        self.disk.is_some()
    }

    pub fn set_motor(&mut self, on: bool) {
        self.motor_on = on;
    }

    #[must_use]
    pub fn motor_on(&self) -> bool {
        self.motor_on
    }

    /// Select the head (0 or 1).
    pub fn set_side(&mut self, side: u8) {
        self.side = side & 1;
    }

    #[must_use]
    pub fn side(&self) -> u8 {
        self.side
    }

    #[must_use]
    pub fn cylinder(&self) -> u8 {
        self.cylinder
    }

    /// Move the head one cylinder towards the spindle (`inward`) or the rim.
    /// The head stops at both end stops.
    pub fn step(&mut self, inward: bool) {
        self.cylinder = if inward {
            (self.cylinder + 1).min(MAX_CYLINDER)
        } else {
            self.cylinder.saturating_sub(1)
        };
    }

    #[must_use]
    pub fn is_track0(&self) -> bool {
        self.cylinder == 0
    }

    /// Motor on and a disk in the drive.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.motor_on && self.disk.is_some()
    }

    #[must_use]
    pub fn is_write_protected(&self) -> bool {
        self.disk.as_ref().is_some_and(DiskImage::is_write_protected)
    }

    /// Index sensor: the hole is under the sensor while the disk spins.
    #[must_use]
    pub fn at_index(&self) -> bool {
        self.is_ready() && self.rotation == 0
    }

    /// ID of the next sector to pass under the head, advancing the disk.
    pub fn next_sector_id(&mut self) -> Option<u8> {
        let geometry = self.disk.as_ref()?.geometry();
        let id = geometry
            .first_sector_id
            .wrapping_add(self.rotation % geometry.sectors_per_track.max(1));
        self.rotate();
        Some(id)
    }

    /// Turn the disk by one sector slot.
    pub fn rotate(&mut self) {
        let sectors = self
            .disk
            .as_ref()
            .map_or(1, |disk| disk.geometry().sectors_per_track.max(1));
        self.rotation = (self.rotation + 1) % sectors;
    }
}

impl Default for FloppyDrive {
    fn default() -> Self {
        Self::new()
    }
}
