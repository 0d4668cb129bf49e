//! Raw program image loader.
//!
//! An image is raw little-endian 16-bit words: byte `2i` is the low
//! byte of word `i`, byte `2i+1` the high byte. Short images populate
//! the low words and leave the rest zero (NOP); images longer than
//! flash are truncated; a trailing odd byte is dropped.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use atmel_avr::Avr8;

/// Failure to bring an image into program memory.
#[derive(Debug)]
pub enum ImageError {
    /// The file could not be opened or read.
    Unreadable(io::Error),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(e) => write!(f, "unable to open input file: {e}"),
        }
    }
}

impl std::error::Error for ImageError {}

/// Load raw image bytes into program memory, starting at word 0.
pub fn load_words(cpu: &mut Avr8, bytes: &[u8]) {
    let flash_words = usize::from(cpu.layout().flash_words);
    for (i, pair) in bytes.chunks_exact(2).take(flash_words).enumerate() {
        cpu.write_prog_word(i as u16, u16::from_le_bytes([pair[0], pair[1]]));
    }
}

/// Read an image file for [`load_words`].
pub fn read_image(path: &Path) -> Result<Vec<u8>, ImageError> {
    fs::read(path).map_err(ImageError::Unreadable)
}
