//! MB8876 command decoding and execution.
//!
//! Command bytes (after bus inversion), FD1791 encoding:
//!
//! | Bits      | Command         | Flags                                   |
//! |-----------|-----------------|-----------------------------------------|
//! | 0000hVrr  | RESTORE         | h head load, V verify, rr step rate     |
//! | 0001hVrr  | SEEK            | target in the data register             |
//! | 001uhVrr  | STEP            | u update track register                 |
//! | 010uhVrr  | STEP IN         |                                         |
//! | 011uhVrr  | STEP OUT        |                                         |
//! | 100mSEC0  | READ SECTOR     | m multiple, S side, E delay, C compare  |
//! | 101mSECa  | WRITE SECTOR    | a deleted data mark                     |
//! | 11000E00  | READ ADDRESS    |                                         |
//! | 11100E00  | READ TRACK      |                                         |
//! | 11110E00  | WRITE TRACK     |                                         |
//! | 1101iiii  | FORCE INTERRUPT | i3 immediate interrupt                  |

use crate::drive::FloppyDrive;
use crate::{Mb8876, Transfer, status};

/// Raw bytes in one double-density 5.25" track (250 kbit/s at 300 rpm).
pub const RAW_TRACK_LENGTH: usize = 6250;

/// WRITE TRACK fills every sector with this byte.
pub const FORMAT_FILL: u8 = 0xE5;

/// Type I flags.
const FLAG_UPDATE: u8 = 0x10;
const FLAG_HEAD_LOAD: u8 = 0x08;
const FLAG_VERIFY: u8 = 0x04;

/// Type II flags.
const FLAG_MULTIPLE: u8 = 0x10;
const FLAG_SIDE: u8 = 0x08;
const FLAG_COMPARE: u8 = 0x02;

/// Type IV immediate interrupt condition.
const FLAG_IMMEDIATE: u8 = 0x08;

/// Steps RESTORE issues before giving up on track 0.
const RESTORE_STEPS: u32 = 255;

impl Mb8876 {
    pub(crate) fn execute(&mut self, command: u8) {
        if command & 0xF0 == 0xD0 {
            self.command = command;
            self.force_interrupt(command);
            return;
        }
        if self.transfer.is_some() {
            log::debug!("MB8876: command {command:#04X} ignored while busy");
            return;
        }

        self.command = command;
        self.intrq = false;
        self.drq = false;
        log::debug!(
            "MB8876: command {command:#04X} track={} sector={} data={}",
            self.track,
            self.sector,
            self.data
        );

        match command >> 4 {
            0x0..=0x7 => self.type_i(command),
            0x8 | 0x9 => self.read_sector(command),
            0xA | 0xB => self.write_sector(command),
            0xC => self.read_address(),
            0xE => self.read_track(),
            0xF => self.write_track(),
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Type I
    // -----------------------------------------------------------------------

    fn type_i(&mut self, command: u8) {
        self.type_i = true;
        self.status = 0;
        self.head_loaded = command & FLAG_HEAD_LOAD != 0;
        let update = command & FLAG_UPDATE != 0;

        match command >> 4 {
            0x0 => self.restore(),
            0x1 => self.seek(self.data),
            0x2 | 0x3 => {
                self.step_pulse(self.step_in, update);
            }
            0x4 | 0x5 => {
                self.step_pulse(true, update);
            }
            _ => {
                self.step_pulse(false, update);
            }
        }

        if command & FLAG_VERIFY != 0 {
            self.verify_track();
        }
        self.intrq = true;
    }

    fn restore(&mut self) {
        for _ in 0..RESTORE_STEPS {
            if self.selected_drive().is_some_and(FloppyDrive::is_track0) {
                self.track = 0;
                return;
            }
            match self.selected_drive_mut() {
                Some(drive) => drive.step(false),
                None => break,
            }
        }
        self.status |= status::SEEK_ERROR;
    }

    fn seek(&mut self, target: u8) {
        while self.track != target {
            self.step_pulse(target > self.track, true);
        }
    }

    /// One step pulse. Stepping out with the head already on track 0 zeroes
    /// the track register instead.
    fn step_pulse(&mut self, inward: bool, update: bool) {
        self.step_in = inward;
        if !inward && self.selected_drive().is_some_and(FloppyDrive::is_track0) {
            self.track = 0;
            return;
        }
        if update {
            self.track = if inward {
                self.track.wrapping_add(1)
            } else {
                self.track.wrapping_sub(1)
            };
        }
        if let Some(drive) = self.selected_drive_mut() {
            drive.step(inward);
        }
    }

    /// Check an ID field under the head carries the track register's value.
    fn verify_track(&mut self) {
        self.head_loaded = true;
        let found = self.selected_drive().is_some_and(|drive| {
            drive.is_ready()
                && drive.cylinder() == self.track
                && drive
                    .disk()
                    .is_some_and(|disk| disk.has_cylinder(drive.cylinder()))
        });
        if !found {
            self.status |= status::SEEK_ERROR;
        }
    }

    // -----------------------------------------------------------------------
    // Type II
    // -----------------------------------------------------------------------

    fn read_sector(&mut self, command: u8) {
        if !self.begin_type_ii_iii() {
            return;
        }
        let multiple = command & FLAG_MULTIPLE != 0;
        if !self.load_sector(command) {
            self.status |= status::RECORD_NOT_FOUND;
            self.complete();
            return;
        }
        self.transfer = Some(Transfer::ReadSector { multiple });
        self.drq = true;
    }

    fn write_sector(&mut self, command: u8) {
        if !self.begin_type_ii_iii() || !self.check_write_protect() {
            return;
        }
        let Some(size) = self.locate_sector(command).map(|(_, _, size)| size) else {
            self.status |= status::RECORD_NOT_FOUND;
            self.complete();
            return;
        };
        self.buffer.clear();
        self.expected = size;
        self.transfer = Some(Transfer::WriteSector {
            multiple: command & FLAG_MULTIPLE != 0,
        });
        self.drq = true;
    }

    /// Find the sector the sector register names on the track under the
    /// head. Returns (cylinder, head, sector size).
    fn locate_sector(&self, command: u8) -> Option<(u8, u8, usize)> {
        let drive = self.selected_drive()?;
        let disk = drive.disk()?;
        let (cylinder, head) = (drive.cylinder(), drive.side());
        if self.track != cylinder {
            return None;
        }
        if command & FLAG_COMPARE != 0 && u8::from(command & FLAG_SIDE != 0) != head {
            return None;
        }
        let sector = disk.sector(cylinder, head, self.sector)?;
        Some((cylinder, head, sector.len()))
    }

    /// Fill the transfer buffer with the addressed sector.
    fn load_sector(&mut self, command: u8) -> bool {
        let Some((cylinder, head, _)) = self.locate_sector(command) else {
            return false;
        };
        let sector = self
            .selected_drive()
            .and_then(FloppyDrive::disk)
            .and_then(|disk| disk.sector(cylinder, head, self.sector))
            .map(<[u8]>::to_vec);
        match sector {
            Some(bytes) => {
                self.buffer = bytes;
                self.position = 0;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Type III
    // -----------------------------------------------------------------------

    fn read_address(&mut self) {
        if !self.begin_type_ii_iii() {
            return;
        }
        let Some(drive) = self.selected_drive_mut() else {
            return;
        };
        let (cylinder, head) = (drive.cylinder(), drive.side());
        let size = drive
            .disk()
            .map_or(256, |disk| disk.geometry().sector_size);
        let on_disk = drive.disk().is_some_and(|disk| disk.has_cylinder(cylinder));
        let id = drive.next_sector_id();
        let Some(id) = id.filter(|_| on_disk) else {
            self.status |= status::RECORD_NOT_FOUND;
            self.complete();
            return;
        };

        let size_code = (size / 128).trailing_zeros() as u8;
        let crc = id_crc(&[cylinder, head, id, size_code]);
        self.buffer = vec![cylinder, head, id, size_code, (crc >> 8) as u8, crc as u8];
        self.position = 0;
        self.sector = cylinder;
        self.transfer = Some(Transfer::ReadAddress);
        self.drq = true;
    }

    fn read_track(&mut self) {
        if !self.begin_type_ii_iii() {
            return;
        }
        let track = self.selected_drive().and_then(|drive| {
            drive
                .disk()
                .and_then(|disk| disk.track(drive.cylinder(), drive.side()))
                .map(<[u8]>::to_vec)
        });
        match track {
            Some(bytes) if !bytes.is_empty() => {
                self.buffer = bytes;
                self.position = 0;
                self.transfer = Some(Transfer::ReadTrack);
                self.drq = true;
            }
            _ => self.complete(),
        }
    }

    fn write_track(&mut self) {
        if !self.begin_type_ii_iii() || !self.check_write_protect() {
            return;
        }
        self.buffer.clear();
        self.expected = RAW_TRACK_LENGTH;
        self.transfer = Some(Transfer::WriteTrack);
        self.drq = true;
    }

    // -----------------------------------------------------------------------
    // Type IV
    // -----------------------------------------------------------------------

    fn force_interrupt(&mut self, command: u8) {
        if self.transfer.is_none() {
            self.type_i = true;
            self.status = 0;
        } else {
            log::debug!("MB8876: {:?} interrupted", self.transfer);
        }
        self.end_transfer();
        // Not-ready and index conditions (i0-i2) need timing; only i3 acts
        self.intrq = command & FLAG_IMMEDIATE != 0;
    }

    // -----------------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------------

    /// Common Type II/III start: switch the status layout and check the
    /// drive is ready. Completes the command and returns false if not.
    fn begin_type_ii_iii(&mut self) -> bool {
        self.type_i = false;
        self.status = 0;
        self.head_loaded = true;
        if self.selected_drive().is_some_and(FloppyDrive::is_ready) {
            true
        } else {
            self.complete();
            false
        }
    }

    fn check_write_protect(&mut self) -> bool {
        if self.selected_drive().is_some_and(FloppyDrive::is_write_protected) {
            self.status |= status::WRITE_PROTECT;
            self.complete();
            false
        } else {
            true
        }
    }

    /// The CPU has read the last byte of the buffer.
    pub(crate) fn read_buffer_drained(&mut self, transfer: Transfer) {
        if transfer == (Transfer::ReadSector { multiple: true }) {
            self.sector = self.sector.wrapping_add(1);
            if self.load_sector(self.command) {
                return;
            }
            self.status |= status::RECORD_NOT_FOUND;
        }
        self.complete();
    }

    /// The CPU has written the last byte the transfer expects.
    pub(crate) fn write_buffer_filled(&mut self, transfer: Transfer) {
        match transfer {
            Transfer::WriteSector { multiple } => {
                self.store_sector();
                if multiple {
                    self.sector = self.sector.wrapping_add(1);
                    if let Some((_, _, size)) = self.locate_sector(self.command) {
                        self.buffer.clear();
                        self.expected = size;
                        return;
                    }
                    self.status |= status::RECORD_NOT_FOUND;
                }
            }
            Transfer::WriteTrack => {
                let formatted = self.selected_drive_mut().is_some_and(|drive| {
                    let (cylinder, head) = (drive.cylinder(), drive.side());
                    drive
                        .disk_mut()
                        .is_some_and(|disk| disk.format_track(cylinder, head, FORMAT_FILL))
                });
                if !formatted {
                    log::debug!("MB8876: WRITE TRACK off the disk");
                }
            }
            _ => {}
        }
        self.complete();
    }

    fn store_sector(&mut self) {
        let Some(drive) = self.selected.and_then(|unit| self.drives.get_mut(unit)) else {
            return;
        };
        let (cylinder, head) = (drive.cylinder(), drive.side());
        if let Some(target) = drive
            .disk_mut()
            .and_then(|disk| disk.sector_mut(cylinder, head, self.sector))
        {
            target.copy_from_slice(&self.buffer);
        }
    }
}

/// CRC-CCITT of an ID field, including the three A1 sync marks and the
/// FE address mark that precede it.
fn id_crc(id: &[u8; 4]) -> u16 {
    [0xA1, 0xA1, 0xA1, 0xFE]
        .iter()
        .chain(id)
        .fold(0xFFFF, |crc, &byte| crc16_update(crc, byte))
}

fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ (u16::from(byte) << 8);
    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ 0x1021
        } else {
            crc << 1
        };
    }
    crc
}
