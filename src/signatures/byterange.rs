//! ByteRange calculation for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset where the signature value begins
//! - `offset2` = byte offset where the signature value ends
//! - `length2` = remaining bytes to end of file
//!
//! The signature value is a hex-encoded string within `<` and `>` delimiters.
//! Since the file length is only known once the revision is assembled, the
//! array is first written as a fixed-width placeholder and patched in place.

use crate::error::{Error, Result};

/// Fixed-width `/ByteRange` value written before offsets are known.
pub const BYTE_RANGE_PLACEHOLDER: &str = "[0 0000000000 0000000000 0000000000]";

/// Smallest `/Contents` reservation in bytes of DER.
pub const MIN_SIGNATURE_SIZE: usize = 8192;

/// Calculator for PDF signature byte ranges.
#[derive(Debug)]
pub struct ByteRangeCalculator {
    /// Size of the placeholder for the signature value (hex digits + 2 for angle brackets)
    placeholder_size: usize,
}

impl ByteRangeCalculator {
    /// Create a new ByteRange calculator with the specified signature size.
    ///
    /// The placeholder size will be calculated as: (signature_size * 2) + 2
    /// because the signature is hex-encoded and enclosed in angle brackets.
    pub fn new(estimated_signature_size: usize) -> Self {
        let placeholder_size = estimated_signature_size * 2 + 2;
        Self { placeholder_size }
    }

    /// Create a ByteRange calculator with a specific placeholder size.
    pub fn with_placeholder_size(placeholder_size: usize) -> Self {
        Self { placeholder_size }
    }

    /// Get the placeholder size (for the /Contents value).
    pub fn placeholder_size(&self) -> usize {
        self.placeholder_size
    }

    /// Generate a placeholder string for the signature contents.
    pub fn generate_placeholder(&self) -> String {
        format!("<{}>", "0".repeat(self.placeholder_size.saturating_sub(2)))
    }

    /// Calculate the ByteRange array given the position of the /Contents value.
    ///
    /// `contents_offset` is the offset of the opening `<`.
    pub fn calculate_byte_range(&self, file_size: usize, contents_offset: usize) -> [i64; 4] {
        let before_sig = contents_offset as i64;
        let after_sig_start = (contents_offset + self.placeholder_size) as i64;
        let after_sig_len = file_size as i64 - after_sig_start;

        [0, before_sig, after_sig_start, after_sig_len]
    }

    /// Format a ByteRange array as a PDF array string.
    pub fn format_byte_range(byte_range: &[i64; 4]) -> String {
        format!("[{} {} {} {}]", byte_range[0], byte_range[1], byte_range[2], byte_range[3])
    }

    /// Overwrite the placeholder at `offset` with the final array.
    ///
    /// The array is padded with spaces so no byte after it moves.
    pub fn patch_byte_range(
        pdf_data: &mut [u8],
        offset: usize,
        byte_range: &[i64; 4],
    ) -> Result<()> {
        let width = BYTE_RANGE_PLACEHOLDER.len();
        let end = offset + width;
        if end > pdf_data.len() || !pdf_data[offset..end].starts_with(b"[0 ") {
            return Err(Error::InvalidPdf("ByteRange placeholder not found".to_string()));
        }
        let mut value = Self::format_byte_range(byte_range);
        if value.len() > width {
            return Err(Error::InvalidPdf(format!(
                "ByteRange {} does not fit its placeholder",
                value
            )));
        }
        // keep the closing bracket last so the array stays well formed
        value.pop();
        while value.len() < width - 1 {
            value.push(' ');
        }
        value.push(']');
        pdf_data[offset..end].copy_from_slice(value.as_bytes());
        Ok(())
    }

    /// Extract the bytes to be signed from a PDF file.
    ///
    /// This returns the concatenation of the two ranges specified by ByteRange.
    pub fn extract_signed_bytes(pdf_data: &[u8], byte_range: &[i64; 4]) -> Result<Vec<u8>> {
        if byte_range.iter().any(|v| *v < 0) {
            return Err(Error::InvalidPdf(format!(
                "ByteRange has negative entries: {:?}",
                byte_range
            )));
        }
        let offset1 = byte_range[0] as usize;
        let length1 = byte_range[1] as usize;
        let offset2 = byte_range[2] as usize;
        let length2 = byte_range[3] as usize;

        if offset1 + length1 > pdf_data.len() {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range exceeds file size: {} + {} > {}",
                offset1,
                length1,
                pdf_data.len()
            )));
        }
        if offset2 + length2 > pdf_data.len() {
            return Err(Error::InvalidPdf(format!(
                "ByteRange second range exceeds file size: {} + {} > {}",
                offset2,
                length2,
                pdf_data.len()
            )));
        }

        let mut signed_bytes = Vec::with_capacity(length1 + length2);
        signed_bytes.extend_from_slice(&pdf_data[offset1..offset1 + length1]);
        signed_bytes.extend_from_slice(&pdf_data[offset2..offset2 + length2]);

        Ok(signed_bytes)
    }

    /// Check that a ByteRange is well formed for a file of `file_size` bytes.
    ///
    /// A ByteRange must start at 0, leave exactly one gap, and end inside the
    /// file. Signatures from earlier revisions end before the file does.
    pub fn validate_byte_range(byte_range: &[i64; 4], file_size: usize) -> Result<()> {
        let offset1 = byte_range[0];
        let length1 = byte_range[1];
        let offset2 = byte_range[2];
        let length2 = byte_range[3];

        if offset1 != 0 {
            return Err(Error::InvalidPdf(format!("ByteRange must start at 0, got {}", offset1)));
        }

        if length1 < 0 || length2 < 0 {
            return Err(Error::InvalidPdf("ByteRange lengths must not be negative".to_string()));
        }

        let actual_end = offset2 + length2;
        if actual_end > file_size as i64 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange ends at {}, past the file size {}",
                actual_end, file_size
            )));
        }

        if length1 > offset2 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }

        Ok(())
    }

    /// Find the `[` of the `/ByteRange` array at or after `start`.
    pub fn find_byte_range_offset(pdf_data: &[u8], start: usize) -> Option<usize> {
        find_value_after(pdf_data, start, b"/ByteRange", b'[')
    }

    /// Find the `<` of the `/Contents` value at or after `start`.
    pub fn find_contents_offset(pdf_data: &[u8], start: usize) -> Option<usize> {
        find_value_after(pdf_data, start, b"/Contents", b'<')
    }

    /// Replace the placeholder in the PDF with the actual signature.
    ///
    /// Fails with [`Error::CryptoBindFailure`] when the signature does not fit.
    pub fn insert_signature(
        &self,
        pdf_data: &mut [u8],
        contents_offset: usize,
        signature_hex: &str,
    ) -> Result<()> {
        let sig_len = signature_hex.len() + 2;
        if sig_len > self.placeholder_size {
            return Err(Error::CryptoBindFailure(format!(
                "signature ({} bytes) exceeds placeholder size ({} bytes)",
                sig_len, self.placeholder_size
            )));
        }

        let mut sig_value = String::with_capacity(self.placeholder_size);
        sig_value.push('<');
        sig_value.push_str(signature_hex);
        let padding_needed = (self.placeholder_size - 2) - signature_hex.len();
        sig_value.extend(std::iter::repeat('0').take(padding_needed));
        sig_value.push('>');

        if contents_offset + self.placeholder_size > pdf_data.len() {
            return Err(Error::InvalidPdf(
                "Signature insertion would exceed file bounds".to_string(),
            ));
        }

        pdf_data[contents_offset..contents_offset + self.placeholder_size]
            .copy_from_slice(sig_value.as_bytes());

        Ok(())
    }
}

impl Default for ByteRangeCalculator {
    fn default() -> Self {
        Self::new(MIN_SIGNATURE_SIZE)
    }
}

fn find_value_after(pdf_data: &[u8], start: usize, key: &[u8], opener: u8) -> Option<usize> {
    let window = pdf_data.get(start..)?;
    let key_pos = window.windows(key.len()).position(|w| w == key)?;
    let after_key = key_pos + key.len();
    window[after_key..]
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .map(|skip| after_key + skip)
        .filter(|pos| window[*pos] == opener)
        .map(|pos| start + pos)
}
