//! Annotation and form flags written by the signer.

use bitflags::bitflags;

bitflags! {
    /// Annotation flags (`/F`).
    ///
    /// Per PDF spec Table 165 (Annotation flags).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AnnotationFlags: u32 {
        /// Bit 1: Do not render unknown annotation types
        const INVISIBLE = 1 << 0;
        /// Bit 2: Do not display or print
        const HIDDEN = 1 << 1;
        /// Bit 3: Print the annotation with the page
        const PRINT = 1 << 2;
        /// Bit 7: Do not allow interaction
        const READ_ONLY = 1 << 6;
        /// Bit 8: Do not allow deletion or property changes
        const LOCKED = 1 << 7;
    }
}

impl AnnotationFlags {
    /// Flags for a visible signature widget.
    pub const VISIBLE_SIGNATURE: Self = Self::PRINT;

    /// Flags for the zero-size seal widget.
    pub const SEAL: Self = Self::PRINT.union(Self::LOCKED);
}

bitflags! {
    /// Document-level signature flags (`/AcroForm /SigFlags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SigFlags: u32 {
        /// Bit 1: The document contains at least one signature field
        const SIGNATURES_EXIST = 1 << 0;
        /// Bit 2: Only incremental saves keep signatures valid
        const APPEND_ONLY = 1 << 1;
    }
}
