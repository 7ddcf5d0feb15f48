//! OCR engine boundary.
//!
//! Recognition is delegated to an external Tesseract binary: the preprocessed
//! image is written to a temporary PNG and the recognized text is read back
//! from stdout. Timer crops run with a digit whitelist.

use anyhow::{anyhow, Result};
use image::GrayImage;
use std::process::Command;
use tempfile::NamedTempFile;

/// Black-box text recognition over a cleaned binary image.
pub trait TextRecognizer: Send + Sync {
    /// Recognizes text in the image. `digits_only` restricts the character
    /// set to digits and spaces (used for the countdown field).
    fn recognize(&self, img: &GrayImage, digits_only: bool) -> Result<String>;
}

/// Runs a Tesseract executable as a subprocess.
pub struct TesseractRecognizer {
    command: String,
    tessdata_dir: Option<String>,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>, tessdata_dir: Option<String>) -> Self {
        Self {
            command: command.into(),
            tessdata_dir,
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, img: &GrayImage, digits_only: bool) -> Result<String> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())?;

        let mut command = Command::new(&self.command);
        command
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg("6"); // Assume single uniform block of text

        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        if digits_only {
            command.arg("-c").arg("tessedit_char_whitelist= 0123456789");
        }

        let output = command.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Canned-response recognizer for pipeline tests.
    pub struct FakeRecognizer {
        pub text: String,
        pub digits: String,
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize(&self, _img: &GrayImage, digits_only: bool) -> Result<String> {
            if digits_only {
                Ok(self.digits.clone())
            } else {
                Ok(self.text.clone())
            }
        }
    }
}
