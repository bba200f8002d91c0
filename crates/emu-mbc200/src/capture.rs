//! Headless capture: PNG screenshots and WAV audio dumps.

#![allow(clippy::cast_possible_truncation)]

use std::error::Error;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use emu_core::Cpu;

use crate::Mbc200;

/// Save the current framebuffer as a PNG file.
pub fn save_screenshot<C: Cpu>(machine: &Mbc200<C>, path: &Path) -> Result<(), Box<dyn Error>> {
    let width = machine.framebuffer_width();
    let height = machine.framebuffer_height();

    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    // ARGB32 -> RGBA
    let rgba: Vec<u8> = machine
        .framebuffer()
        .iter()
        .flat_map(|&pixel| {
            [
                (pixel >> 16) as u8,
                (pixel >> 8) as u8,
                pixel as u8,
                0xFF,
            ]
        })
        .collect();

    writer.write_image_data(&rgba)?;
    Ok(())
}

/// Save audio samples as a mono 16-bit WAV file.
///
/// Samples are f32 in -1.0..=1.0; anything outside is clamped.
pub fn save_audio(samples: &[f32], sample_rate: u32, path: &Path) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_round_trip_through_hound() {
        let dir = std::env::temp_dir().join(format!("mbc200-capture-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("click.wav");

        save_audio(&[0.0, 0.5, -2.0], 48_000, &path).expect("write wav");
        let mut reader = hound::WavReader::open(&path).expect("read wav");
        assert_eq!(reader.spec().sample_rate, 48_000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.expect("sample")).collect();
        assert_eq!(samples, vec![0, 16383, -32767]);

        fs::remove_dir_all(&dir).ok();
    }
}
