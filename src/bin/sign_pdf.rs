//! Sign a PDF
//!
//! Applies the marks listed in a JSON request file to a PDF with a PKCS#12
//! certificate. The certificate password is read from `PDF_SIGN_PASSWORD`.
//!
//! Usage:
//!   sign_pdf <input.pdf> <cert.p12> <requests.json> <output.pdf> [options]
//!
//! Options:
//!   --lock            Seal the document after the last mark
//!   --protocol        Append a protocol page listing the marks
//!   --font <path>     TrueType font for the signer name
//!   --reason <text>   Signature reason
//!   --config <path>   Engine configuration (JSON)
//!   --verbose, -v     Print every applied mark
//!
//! Request file example:
//!   [
//!     {"kind": {"type": "signature"}, "page": 0, "position": {"x": 0.6, "y": 0.1}},
//!     {"kind": {"type": "initials", "corner": "bottom_right"}, "page": 1, "position": {"x": 0, "y": 0}}
//!   ]

use pdf_countersign::{
    EngineConfig, LockStatus, PlacementRequest, SignatureEngine, SigningOptions,
};
use std::fs;
use std::path::PathBuf;
use std::process;
use zeroize::Zeroizing;

const PASSWORD_VAR: &str = "PDF_SIGN_PASSWORD";

struct SignArgs {
    input: PathBuf,
    certificate: PathBuf,
    requests: PathBuf,
    output: PathBuf,
    options: SigningOptions,
    font: Option<PathBuf>,
    reason: Option<String>,
    config: Option<PathBuf>,
    verbose: bool,
}

impl SignArgs {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let mut positional = Vec::new();
        let mut options = SigningOptions::new();
        let mut font = None;
        let mut reason = None;
        let mut config = None;
        let mut verbose = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--lock" => {
                    options = options.with_lock(true);
                },
                "--protocol" => {
                    options = options.with_protocol_page(true);
                },
                "--font" => {
                    i += 1;
                    font = Some(PathBuf::from(value(&args, i, "--font")?));
                },
                "--reason" => {
                    i += 1;
                    reason = Some(value(&args, i, "--reason")?.to_string());
                },
                "--config" => {
                    i += 1;
                    config = Some(PathBuf::from(value(&args, i, "--config")?));
                },
                "--verbose" | "-v" => {
                    verbose = true;
                },
                other if other.starts_with("--") => {
                    return Err(format!("unknown option {}", other));
                },
                other => positional.push(PathBuf::from(other)),
            }
            i += 1;
        }

        let [input, certificate, requests, output]: [PathBuf; 4] = positional
            .try_into()
            .map_err(|_| "expected <input> <cert.p12> <requests.json> <output>".to_string())?;
        Ok(Self {
            input,
            certificate,
            requests,
            output,
            options,
            font,
            reason,
            config,
            verbose,
        })
    }
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} needs a value", flag))
}

fn run(args: &SignArgs) -> pdf_countersign::Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(font) = &args.font {
        config = config.with_script_font(font);
    }
    if let Some(reason) = &args.reason {
        config = config.with_reason(reason);
    }

    let pdf = fs::read(&args.input)?;
    let p12 = Zeroizing::new(fs::read(&args.certificate)?);
    let requests: Vec<PlacementRequest> = serde_json::from_str(&fs::read_to_string(&args.requests)?)?;
    let password = Zeroizing::new(std::env::var(PASSWORD_VAR).unwrap_or_default());

    let engine = SignatureEngine::new(config);
    let signed = engine.sign(&pdf, &p12, &password, &requests, &args.options)?;
    fs::write(&args.output, &signed.bytes)?;

    if args.verbose {
        for mark in &signed.marks {
            println!(
                "  {} {} on page {} at ({:.1}, {:.1})",
                mark.field_name,
                mark.kind.label(),
                mark.page + 1,
                mark.rect.x,
                mark.rect.y
            );
        }
        for page in &signed.protocol_pages {
            println!("  protocol page {}", page + 1);
        }
    }
    match &signed.lock {
        LockStatus::Failed(reason) => eprintln!("Warning: document was not locked: {}", reason),
        LockStatus::Locked => println!("Document locked"),
        LockStatus::NotRequested => {},
    }
    println!(
        "Applied {} marks, wrote {} ({} bytes)",
        signed.marks.len(),
        args.output.display(),
        signed.bytes.len()
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let args = match SignArgs::from_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!(
                "Usage: sign_pdf <input.pdf> <cert.p12> <requests.json> <output.pdf> \
                 [--lock] [--protocol] [--font <path>] [--reason <text>] [--config <path>] [--verbose]"
            );
            process::exit(2);
        },
    };

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
