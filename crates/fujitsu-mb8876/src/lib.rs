//! Fujitsu MB8876 floppy disk controller.
//!
//! The MB8876 is a second source of the Western Digital FD1791: the same
//! register set and command set, with the data bus inverted. Every byte the
//! CPU reads or writes passes through a bitwise NOT, so software written
//! for it stores complemented command bytes and complements what it reads.
//!
//! # Registers
//!
//! | Offset | Read   | Write   |
//! |--------|--------|---------|
//! | 0      | status | command |
//! | 1      | track  | track   |
//! | 2      | sector | sector  |
//! | 3      | data   | data    |
//!
//! # Commands
//!
//! | Type | Commands                                          |
//! |------|---------------------------------------------------|
//! | I    | RESTORE, SEEK, STEP, STEP IN, STEP OUT            |
//! | II   | READ SECTOR, WRITE SECTOR (single or multiple)    |
//! | III  | READ ADDRESS, READ TRACK, WRITE TRACK             |
//! | IV   | FORCE INTERRUPT                                   |
//!
//! Commands complete immediately: head steps and rotation take no time,
//! and a data transfer waits on the CPU only. The chip has no side select
//! output; the machine drives the drive's side line itself, and Type II
//! commands can compare it against the ID field.

pub mod commands;
pub mod drive;
pub mod image;

use emu_core::{Observable, Value};

pub use drive::FloppyDrive;
pub use image::{DiskImage, Geometry, ImageError};

/// Status register bits. Some bits mean different things after a Type I
/// command and after a Type II/III command.
pub mod status {
    pub const BUSY: u8 = 0x01;
    /// Type I.
    pub const INDEX: u8 = 0x02;
    /// Type II/III.
    pub const DRQ: u8 = 0x02;
    /// Type I.
    pub const TRACK0: u8 = 0x04;
    /// Type II/III.
    pub const LOST_DATA: u8 = 0x04;
    pub const CRC_ERROR: u8 = 0x08;
    /// Type I.
    pub const SEEK_ERROR: u8 = 0x10;
    /// Type II/III.
    pub const RECORD_NOT_FOUND: u8 = 0x10;
    /// Type I.
    pub const HEAD_LOADED: u8 = 0x20;
    /// Type II/III.
    pub const RECORD_TYPE: u8 = 0x20;
    pub const WRITE_PROTECT: u8 = 0x40;
    pub const NOT_READY: u8 = 0x80;
}

/// Data transfer in progress between the CPU and the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    ReadSector { multiple: bool },
    WriteSector { multiple: bool },
    ReadAddress,
    ReadTrack,
    WriteTrack,
}

impl Transfer {
    fn is_read(self) -> bool {
        matches!(
            self,
            Transfer::ReadSector { .. } | Transfer::ReadAddress | Transfer::ReadTrack
        )
    }
}

/// Fujitsu MB8876 floppy disk controller with its drives.
pub struct Mb8876 {
    /// Error and record-type bits from the last command.
    status: u8,
    track: u8,
    sector: u8,
    data: u8,
    command: u8,
    /// Status register shows the Type I layout.
    type_i: bool,
    head_loaded: bool,
    /// Direction of the last step (true = inward).
    step_in: bool,
    intrq: bool,
    drq: bool,
    transfer: Option<Transfer>,
    /// Bytes being moved by the current transfer.
    buffer: Vec<u8>,
    /// Next byte to hand out, for reads.
    position: usize,
    /// Bytes expected, for writes.
    expected: usize,
    drives: Vec<FloppyDrive>,
    selected: Option<usize>,
}

impl Mb8876 {
    /// A controller with `drive_count` drives connected, none selected.
    #[must_use]
    pub fn new(drive_count: usize) -> Self {
        Self {
            status: 0,
            track: 0,
            sector: 1,
            data: 0,
            command: 0,
            type_i: true,
            head_loaded: false,
            step_in: true,
            intrq: false,
            drq: false,
            transfer: None,
            buffer: Vec::new(),
            position: 0,
            expected: 0,
            drives: (0..drive_count).map(|_| FloppyDrive::new()).collect(),
            selected: None,
        }
    }

    /// Master reset: abandon any command. Drives and disks are untouched.
    pub fn reset(&mut self) {
        self.status = 0;
        self.sector = 1;
        self.command = 0;
        self.type_i = true;
        self.head_loaded = false;
        self.intrq = false;
        self.drq = false;
        self.end_transfer();
    }

    /// CPU read. The value on the bus is the complement of the register.
    pub fn read(&mut self, offset: u8) -> u8 {
        let value = match offset & 3 {
            0 => self.read_status(),
            1 => self.track,
            2 => self.sector,
            _ => self.read_data(),
        };
        !value
    }

    /// CPU write. The register receives the complement of the bus value.
    pub fn write(&mut self, offset: u8, value: u8) {
        let value = !value;
        match offset & 3 {
            0 => self.execute(value),
            1 => self.track = value,
            2 => self.sector = value,
            _ => self.write_data(value),
        }
    }

    /// Select a drive (or none). A unit with no drive connected leaves
    /// the controller with no drive.
    pub fn select(&mut self, unit: Option<usize>) {
        self.selected = unit.filter(|&u| u < self.drives.len());
        if self.selected != unit {
            log::debug!("MB8876: no drive at unit {unit:?}");
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn drive_count(&self) -> usize {
        self.drives.len()
    }

    #[must_use]
    pub fn drive(&self, unit: usize) -> Option<&FloppyDrive> {
        self.drives.get(unit)
    }

    pub fn drive_mut(&mut self, unit: usize) -> Option<&mut FloppyDrive> {
        self.drives.get_mut(unit)
    }

    /// Status register as the CPU would see it (before inversion), without
    /// the side effects of a real read.
    #[must_use]
    pub fn status(&self) -> u8 {
        let drive = self.selected_drive();
        let mut value = self.status;
        if self.transfer.is_some() {
            value |= status::BUSY;
        }
        if !drive.is_some_and(FloppyDrive::is_ready) {
            value |= status::NOT_READY;
        }
        if self.type_i {
            if self.head_loaded {
                value |= status::HEAD_LOADED;
            }
            if let Some(drive) = drive {
                if drive.is_track0() {
                    value |= status::TRACK0;
                }
                if drive.is_write_protected() {
                    value |= status::WRITE_PROTECT;
                }
                if drive.at_index() {
                    value |= status::INDEX;
                }
            }
        } else if self.drq {
            value |= status::DRQ;
        }
        value
    }

    #[must_use]
    pub fn track_register(&self) -> u8 {
        self.track
    }

    #[must_use]
    pub fn sector_register(&self) -> u8 {
        self.sector
    }

    #[must_use]
    pub fn data_register(&self) -> u8 {
        self.data
    }

    #[must_use]
    pub fn command_register(&self) -> u8 {
        self.command
    }

    /// Interrupt request output.
    #[must_use]
    pub fn intrq(&self) -> bool {
        self.intrq
    }

    /// Data request output.
    #[must_use]
    pub fn drq(&self) -> bool {
        self.drq
    }

    #[must_use]
    pub fn transfer(&self) -> Option<Transfer> {
        self.transfer
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn selected_drive(&self) -> Option<&FloppyDrive> {
        self.drives.get(self.selected?)
    }

    fn selected_drive_mut(&mut self) -> Option<&mut FloppyDrive> {
        self.drives.get_mut(self.selected?)
    }

    fn read_status(&mut self) -> u8 {
        let value = self.status();
        self.intrq = false;
        if self.type_i
            && let Some(drive) = self.selected_drive_mut()
        {
            drive.rotate();
        }
        value
    }

    fn read_data(&mut self) -> u8 {
        if let Some(transfer) = self.transfer
            && transfer.is_read()
            && self.drq
        {
            if let Some(&byte) = self.buffer.get(self.position) {
                self.data = byte;
                self.position += 1;
            }
            if self.position >= self.buffer.len() {
                self.read_buffer_drained(transfer);
            }
        }
        self.data
    }

    fn write_data(&mut self, value: u8) {
        self.data = value;
        let Some(transfer) = self.transfer else {
            return;
        };
        if transfer.is_read() || !self.drq {
            return;
        }
        self.buffer.push(value);
        if self.buffer.len() >= self.expected {
            self.write_buffer_filled(transfer);
        }
    }

    /// Finish a command: drop the transfer and raise INTRQ.
    fn complete(&mut self) {
        self.end_transfer();
        self.intrq = true;
    }

    fn end_transfer(&mut self) {
        self.transfer = None;
        self.drq = false;
        self.buffer.clear();
        self.position = 0;
        self.expected = 0;
    }
}

impl Observable for Mb8876 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "status" => Some(self.status().into()),
            "track" => Some(self.track.into()),
            "sector" => Some(self.sector.into()),
            "data" => Some(self.data.into()),
            "command" => Some(self.command.into()),
            "drive" => Some(match self.selected {
                Some(unit) => Value::U8(unit as u8),
                None => "none".into(),
            }),
            "intrq" => Some(self.intrq.into()),
            "drq" => Some(self.drq.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "status", "track", "sector", "data", "command", "drive", "intrq", "drq",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Controller with one MBC-200 disk in drive 0, selected, motor on.
    /// Sector bytes are filled with (track index * 16 + sector index).
    fn fdc_with_disk() -> Mb8876 {
        let geometry = Geometry::MBC200;
        let mut data = vec![0; geometry.image_size()];
        for (i, chunk) in data.chunks_mut(geometry.sector_size).enumerate() {
            chunk.fill(i as u8);
        }
        let image = DiskImage::with_geometry(geometry, data).expect("size matches");

        let mut fdc = Mb8876::new(2);
        fdc.drive_mut(0).expect("drive 0").insert_disk(image);
        fdc.select(Some(0));
        fdc.drive_mut(0).expect("drive 0").set_motor(true);
        fdc
    }

    /// Issue a command through the inverted bus.
    fn command(fdc: &mut Mb8876, command: u8) {
        fdc.write(0, !command);
    }

    fn status(fdc: &mut Mb8876) -> u8 {
        !fdc.read(0)
    }

    #[test]
    fn registers_are_inverted_on_the_bus() {
        let mut fdc = Mb8876::new(1);
        fdc.write(1, 0xFA);
        assert_eq!(fdc.track_register(), 0x05);
        assert_eq!(fdc.read(1), 0xFA);
        fdc.write(2, 0x00);
        assert_eq!(fdc.sector_register(), 0xFF);
        assert_eq!(fdc.read(2), 0x00);
    }

    #[test]
    fn not_ready_without_drive() {
        let mut fdc = Mb8876::new(1);
        assert_eq!(status(&mut fdc) & status::NOT_READY, status::NOT_READY);
        fdc.select(Some(1));
        assert_eq!(fdc.selected(), None, "unit 1 is not connected");
    }

    #[test]
    fn restore_and_seek() {
        let mut fdc = fdc_with_disk();
        fdc.write(3, !40);
        command(&mut fdc, 0x14); // SEEK, verify
        assert_eq!(fdc.track_register(), 40);
        assert_eq!(fdc.drive(0).expect("drive 0").cylinder(), 40);
        assert!(fdc.intrq());
        let s = status(&mut fdc);
        assert_eq!(s & (status::SEEK_ERROR | status::BUSY | status::TRACK0), 0);
        assert!(!fdc.intrq(), "status read clears INTRQ");

        command(&mut fdc, 0x00); // RESTORE
        assert_eq!(fdc.track_register(), 0);
        assert_eq!(status(&mut fdc) & status::TRACK0, status::TRACK0);
    }

    #[test]
    fn seek_verify_fails_off_the_disk() {
        let mut fdc = fdc_with_disk();
        fdc.write(3, !82);
        command(&mut fdc, 0x14);
        assert_eq!(status(&mut fdc) & status::SEEK_ERROR, status::SEEK_ERROR);
    }

    #[test]
    fn step_commands() {
        let mut fdc = fdc_with_disk();
        command(&mut fdc, 0x50); // STEP IN, update
        command(&mut fdc, 0x50);
        assert_eq!(fdc.track_register(), 2);
        command(&mut fdc, 0x30); // STEP (same direction), update
        assert_eq!(fdc.track_register(), 3);
        command(&mut fdc, 0x60); // STEP OUT, no update
        assert_eq!(fdc.track_register(), 3);
        assert_eq!(fdc.drive(0).expect("drive 0").cylinder(), 2);
    }

    #[test]
    fn read_sector_transfers_bytes() {
        let mut fdc = fdc_with_disk();
        fdc.write(2, !3);
        command(&mut fdc, 0x80);
        assert!(fdc.drq());
        assert_eq!(status(&mut fdc) & status::BUSY, status::BUSY);
        let bytes: Vec<u8> = (0..256).map(|_| !fdc.read(3)).collect();
        assert!(bytes.iter().all(|&b| b == 2), "cylinder 0 head 0 sector 3");
        assert!(!fdc.drq());
        assert!(fdc.intrq());
        assert_eq!(status(&mut fdc), 0);
    }

    #[test]
    fn empty_read_buffer_ends_the_transfer() {
        let mut fdc = fdc_with_disk();
        fdc.transfer = Some(Transfer::ReadSector { multiple: false });
        fdc.drq = true;
        fdc.buffer.clear();
        fdc.data = 0x5A;
        assert_eq!(fdc.read(3), !0x5A, "data register unchanged");
        assert!(!fdc.drq());
        assert!(fdc.intrq());
    }

    #[test]
    fn read_sector_uses_selected_side() {
        let mut fdc = fdc_with_disk();
        fdc.drive_mut(0).expect("drive 0").set_side(1);
        fdc.write(2, !1);
        command(&mut fdc, 0x80);
        assert_eq!(!fdc.read(3), 16, "head 1 is the second track");
    }

    #[test]
    fn side_compare_mismatch_is_record_not_found() {
        let mut fdc = fdc_with_disk();
        fdc.write(2, !1);
        command(&mut fdc, 0x8A); // compare, expect side 1
        assert_eq!(
            status(&mut fdc) & status::RECORD_NOT_FOUND,
            status::RECORD_NOT_FOUND
        );
        assert!(!fdc.drq());
    }

    #[test]
    fn missing_sector_is_record_not_found() {
        let mut fdc = fdc_with_disk();
        fdc.write(2, !17);
        command(&mut fdc, 0x80);
        assert_eq!(
            status(&mut fdc) & status::RECORD_NOT_FOUND,
            status::RECORD_NOT_FOUND
        );
    }

    #[test]
    fn write_then_read_back() {
        let mut fdc = fdc_with_disk();
        fdc.write(2, !5);
        command(&mut fdc, 0xA0);
        for i in 0..=255u8 {
            fdc.write(3, !i);
        }
        assert!(fdc.intrq());
        assert!(fdc.transfer().is_none());

        command(&mut fdc, 0x80);
        let bytes: Vec<u8> = (0..256).map(|_| !fdc.read(3)).collect();
        let expected: Vec<u8> = (0..=255).collect();
        assert_eq!(bytes, expected);
        let disk = fdc.drive(0).and_then(FloppyDrive::disk).expect("disk");
        assert!(disk.is_modified());
    }

    #[test]
    fn write_protect_aborts_write() {
        let mut fdc = fdc_with_disk();
        fdc.drive_mut(0)
            .and_then(FloppyDrive::disk_mut)
            .expect("disk")
            .set_write_protected(true);
        command(&mut fdc, 0xA0);
        assert!(!fdc.drq());
        assert_eq!(status(&mut fdc) & status::WRITE_PROTECT, status::WRITE_PROTECT);
    }

    #[test]
    fn multiple_sector_read_runs_to_end_of_track() {
        let mut fdc = fdc_with_disk();
        fdc.write(2, !15);
        command(&mut fdc, 0x90);
        let bytes: Vec<u8> = (0..512).map(|_| !fdc.read(3)).collect();
        assert_eq!(bytes[0], 14);
        assert_eq!(bytes[256], 15);
        assert!(fdc.intrq());
        assert_eq!(fdc.sector_register(), 17);
        assert_eq!(
            status(&mut fdc) & status::RECORD_NOT_FOUND,
            status::RECORD_NOT_FOUND
        );
    }

    #[test]
    fn read_address_reports_id_field() {
        let mut fdc = fdc_with_disk();
        fdc.write(3, !7);
        command(&mut fdc, 0x10); // SEEK to 7
        command(&mut fdc, 0xC0);
        let id: Vec<u8> = (0..6).map(|_| !fdc.read(3)).collect();
        assert_eq!(&id[..4], &[7, 0, 1, 1]);
        assert_eq!(fdc.sector_register(), 7, "sector register gets the track");
        assert!(fdc.intrq());
    }

    #[test]
    fn read_address_walks_ids_up_to_255() {
        let geometry = Geometry {
            first_sector_id: 240,
            ..Geometry::MBC200
        };
        let mut fdc = Mb8876::new(1);
        fdc.drive_mut(0)
            .expect("drive 0")
            .insert_disk(DiskImage::blank(geometry).expect("valid geometry"));
        fdc.select(Some(0));
        fdc.drive_mut(0).expect("drive 0").set_motor(true);

        let ids: Vec<u8> = (0..17)
            .map(|_| {
                command(&mut fdc, 0xC0);
                let id: Vec<u8> = (0..6).map(|_| !fdc.read(3)).collect();
                assert!(fdc.intrq());
                id[2]
            })
            .collect();
        assert_eq!(ids[0], 240);
        assert_eq!(ids[15], 255);
        assert_eq!(ids[16], 240, "next revolution starts over");
    }

    #[test]
    fn read_track_concatenates_sectors() {
        let mut fdc = fdc_with_disk();
        command(&mut fdc, 0xE0);
        let bytes: Vec<u8> = (0..4096).map(|_| !fdc.read(3)).collect();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[4095], 15);
        assert!(fdc.intrq());
    }

    #[test]
    fn write_track_formats_with_e5() {
        let mut fdc = fdc_with_disk();
        command(&mut fdc, 0xF0);
        for _ in 0..commands::RAW_TRACK_LENGTH {
            fdc.write(3, !0x4E);
        }
        assert!(fdc.intrq());
        let disk = fdc.drive(0).and_then(FloppyDrive::disk).expect("disk");
        assert!(disk.track(0, 0).expect("track").iter().all(|&b| b == 0xE5));
        assert_eq!(disk.sector(0, 1, 1).expect("sector")[0], 16);
    }

    #[test]
    fn force_interrupt_stops_transfer() {
        let mut fdc = fdc_with_disk();
        command(&mut fdc, 0x80);
        assert!(fdc.drq());
        command(&mut fdc, 0xD8);
        assert!(!fdc.drq());
        assert!(fdc.intrq(), "immediate interrupt condition");
        assert_eq!(status(&mut fdc) & status::BUSY, 0);

        command(&mut fdc, 0xD0);
        assert!(!fdc.intrq());
    }

    #[test]
    fn type_ii_needs_ready_drive() {
        let mut fdc = fdc_with_disk();
        fdc.drive_mut(0).expect("drive 0").set_motor(false);
        command(&mut fdc, 0x80);
        assert!(!fdc.drq());
        assert!(fdc.intrq());
        assert_eq!(status(&mut fdc) & status::NOT_READY, status::NOT_READY);
    }

    #[test]
    fn observable_paths() {
        let mut fdc = fdc_with_disk();
        fdc.write(1, !9);
        assert_eq!(fdc.query("track"), Some(Value::U8(9)));
        assert_eq!(fdc.query("drive"), Some(Value::U8(0)));
        fdc.select(None);
        assert_eq!(fdc.query("drive"), Some(Value::String("none".into())));
    }
}
