//! Signature protocol pages.
//!
//! A summary appended after the user's pages: document facts, the
//! certificate used and one line per mark. Long batches continue on further
//! pages, each with the same footer. The pages are added in their own
//! revision before the first signature, so every signature covers them.

use crate::certificate::CertificateMetadata;
use crate::engine::AppliedMark;
use crate::geometry::Rect;
use crate::placement::MarkKind;
use crate::text::transliterate;
use crate::text::winansi::encode;
use crate::writer::{ContentStreamBuilder, StampFont, StandardFont};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, BTreeSet};

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.0;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;

const TITLE_SIZE: f32 = 18.0;
const HEADER_SIZE: f32 = 12.0;
const TEXT_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 8.0;
const LINE_STEP: f32 = 14.0;
const HEADER_STEP: f32 = 18.0;

/// Baseline of the first line on every page.
const TOP: f32 = PAGE_HEIGHT - MARGIN;
/// Footer rule height.
pub const FOOTER_RULE_Y: f32 = MARGIN + 50.0;
const FOOTER_TEXT_Y: f32 = MARGIN + 35.0;
/// Lowest baseline body text may use.
pub const BODY_FLOOR: f32 = FOOTER_RULE_Y + 20.0;
const BODY_INDENT: f32 = MARGIN + 10.0;
const BODY_WIDTH: f32 = PAGE_WIDTH - MARGIN - BODY_INDENT;

const VERIFICATION_HELP: [&str; 8] = [
    "The digital signature can be verified in Adobe Acrobat Reader",
    "or any other PDF viewer that supports digital signatures.",
    "",
    "The signature contains:",
    "- Timestamp of signing moment",
    "- Signer identity from certificate",
    "- Cryptographic hash of the document",
    "- Certificate chain for verification",
];

/// Content and resources of a generated page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// Page size
    pub media_box: Rect,
    /// Uncompressed content stream
    pub content: Vec<u8>,
    /// Font resources by resource name
    pub fonts: BTreeMap<String, StampFont>,
}

/// Builds the protocol pages.
#[derive(Debug, Clone)]
pub struct ProtocolPageBuilder {
    attribution: String,
}

/// Writes lines top-down, starting a new page above the footer.
struct Cursor {
    builder: ContentStreamBuilder,
    pages: Vec<Vec<u8>>,
    y: f32,
    footer: String,
}

impl Cursor {
    fn new(footer: String) -> Self {
        Self {
            builder: ContentStreamBuilder::new(),
            pages: Vec::new(),
            y: TOP,
            footer,
        }
    }

    fn line(&mut self, text: &str, x: f32, size: f32) {
        let encoded = encode(&transliterate(text));
        self.builder
            .begin_text()
            .set_font("F1", size)
            .text(&encoded, x, self.y)
            .end_text();
    }

    fn skip(&mut self, amount: f32) {
        self.y -= amount;
    }

    /// Close the current page and continue on a fresh one.
    fn next_page(&mut self) {
        self.finish_page();
        let continued = format!("Digital Signature Protocol - page {}", self.pages.len() + 1);
        self.line(&continued, MARGIN, HEADER_SIZE);
        self.skip(30.0);
    }

    fn finish_page(&mut self) {
        self.rule(FOOTER_RULE_Y, 0.5);
        self.builder.save_state().fill_gray(0.4);
        self.y = FOOTER_TEXT_Y;
        let footer = self.footer.clone();
        self.line(&footer, MARGIN, FOOTER_SIZE);
        self.builder.restore_state();

        let page = std::mem::take(&mut self.builder);
        self.pages.push(page.build());
        self.y = TOP;
    }

    fn header(&mut self, text: &str) {
        // keep a header together with its first body line
        if self.y - HEADER_STEP < BODY_FLOOR {
            self.next_page();
        }
        self.line(text, MARGIN, HEADER_SIZE);
        self.skip(HEADER_STEP);
    }

    fn body(&mut self, text: &str) {
        if self.y < BODY_FLOOR {
            self.next_page();
        }
        if !text.is_empty() {
            self.line(text, BODY_INDENT, TEXT_SIZE);
        }
        self.skip(LINE_STEP);
    }

    fn rule(&mut self, y: f32, width: f32) {
        self.builder
            .save_state()
            .set_line_width(width)
            .line(MARGIN, y, PAGE_WIDTH - MARGIN, y)
            .restore_state();
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.finish_page();
        self.pages
    }
}

impl ProtocolPageBuilder {
    /// Create a builder with the footer attribution text.
    pub fn new(attribution: impl Into<String>) -> Self {
        Self {
            attribution: attribution.into(),
        }
    }

    /// Lay out the protocol; the result holds at least one page.
    pub fn build(
        &self,
        metadata: &CertificateMetadata,
        marks: &[AppliedMark],
        original_page_count: usize,
        signing_time: DateTime<FixedOffset>,
    ) -> Vec<PageContent> {
        let mut cursor = Cursor::new(format!("Created by eSignature | {}", self.attribution));

        cursor.line("Digital Signature Protocol", MARGIN, TITLE_SIZE);
        cursor.skip(40.0);
        cursor.rule(cursor.y, 1.0);
        cursor.skip(25.0);

        cursor.header("Document Information:");
        cursor.body(&format!("Number of pages: {}", original_page_count));
        cursor.body(&format!(
            "Signing date: {}",
            signing_time.format("%Y-%m-%d %H:%M:%S")
        ));
        cursor.skip(15.0);

        cursor.header("Certificate Used:");
        let unknown = || "-".to_string();
        cursor.body(&format!(
            "Owner: {}",
            metadata.subject_cn.clone().unwrap_or_else(unknown)
        ));
        if let Some(org) = &metadata.subject_org {
            cursor.body(&format!("Organization: {}", org));
        }
        cursor.body(&format!(
            "Issuer: {}",
            metadata.issuer_cn.clone().unwrap_or_else(unknown)
        ));
        if let Some(org) = &metadata.issuer_org {
            cursor.body(&format!("Issuer Org: {}", org));
        }
        cursor.body(&format!("Valid from: {}", metadata.valid_from_display()));
        cursor.body(&format!("Valid until: {}", metadata.valid_until_display()));
        cursor.body(&format!("Serial number: {}", metadata.serial_hex));
        cursor.skip(15.0);

        cursor.header("Applied Signatures:");
        for (i, mark) in marks.iter().enumerate() {
            let kind = match mark.kind {
                MarkKind::Signature { .. } => "Digital signature",
                MarkKind::Initials { .. } => "Initials",
            };
            cursor.body(&format!(
                "{}. {} - page {} - {}",
                i + 1,
                kind,
                mark.page + 1,
                mark.timestamp.format("%Y-%m-%d %H:%M:%S")
            ));
        }
        let initial_pages: BTreeSet<usize> = marks
            .iter()
            .filter(|m| m.kind.is_initials())
            .map(|m| m.page + 1)
            .collect();
        if !initial_pages.is_empty() {
            for line in wrap_list("Initials - pages: ", &page_ranges(&initial_pages)) {
                cursor.body(&line);
            }
        }
        cursor.skip(20.0);

        cursor.header("Signature Verification:");
        for line in VERIFICATION_HELP {
            cursor.body(line);
        }

        let mut fonts = BTreeMap::new();
        fonts.insert("F1".to_string(), StampFont::Standard(StandardFont::Helvetica));
        cursor
            .finish()
            .into_iter()
            .map(|content| PageContent {
                media_box: Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT),
                content,
                fonts: fonts.clone(),
            })
            .collect()
    }
}

/// Collapse consecutive page numbers: `1, 2, 3, 5` gives `1-3, 5`.
fn page_ranges(pages: &BTreeSet<usize>) -> Vec<String> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for &page in pages {
        match ranges.last_mut() {
            Some((_, end)) if *end + 1 == page => *end = page,
            _ => ranges.push((page, page)),
        }
    }
    ranges
        .into_iter()
        .map(|(start, end)| match end - start {
            0 => start.to_string(),
            1 => format!("{}, {}", start, end),
            _ => format!("{}-{}", start, end),
        })
        .collect()
}

/// Join `items` after `prefix`, breaking lines that would leave the body width.
fn wrap_list(prefix: &str, items: &[String]) -> Vec<String> {
    let font = StampFont::Standard(StandardFont::Helvetica);
    let fits = |text: &str| font.text_width(&encode(text), TEXT_SIZE) <= BODY_WIDTH;

    let mut lines = Vec::new();
    let mut current = prefix.to_string();
    let mut empty = true;
    for item in items {
        let candidate = if empty {
            format!("{}{}", current, item)
        } else {
            format!("{}, {}", current, item)
        };
        // the trailing comma of a broken line must fit too
        if empty || fits(&format!("{},", candidate)) {
            current = candidate;
        } else {
            lines.push(format!("{},", current));
            current = format!("  {}", item);
        }
        empty = false;
    }
    lines.push(current);
    lines
}
