//! Verify PDF Signatures
//!
//! Prints one line per signature field and whether the document is locked.
//! Exits with status 1 when any signature fails to verify.
//!
//! Usage:
//!   verify_signatures <file.pdf> [--verbose]

use pdf_countersign::SignatureVerifier;
use std::fs;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().skip(1).any(|a| a == "--verbose" || a == "-v");
    let Some(path) = args.iter().skip(1).find(|a| !a.starts_with('-')) else {
        eprintln!("Usage: verify_signatures <file.pdf> [--verbose]");
        process::exit(2);
    };

    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            process::exit(1);
        },
    };

    let verifier = SignatureVerifier::new();
    let (results, locked) = match verifier
        .verify_document(&data)
        .and_then(|results| Ok((results, verifier.is_locked(&data)?)))
    {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        },
    };

    if results.is_empty() {
        println!("{}: no signatures", path);
    }
    for result in &results {
        let byte_range = result
            .byte_range()
            .map(|br| format!("[{} {} {} {}]", br[0], br[1], br[2], br[3]))
            .unwrap_or_else(|| "[?]".to_string());
        println!(
            "{:<8} {:<20} signer={} range={} whole_document={}",
            result.status,
            result.field_name,
            result.signer_cn.as_deref().unwrap_or("?"),
            byte_range,
            result.covers_whole_document
        );
        if verbose {
            if let Some(time) = &result.signature_info.signing_time {
                println!("         signed={}", time);
            }
            if let Some(digest) = &result.digest_hex {
                println!("         sha256={}", digest);
            }
            for message in &result.messages {
                println!("         {}", message);
            }
        }
    }
    println!("locked: {}", if locked { "yes" } else { "no" });

    if results.iter().any(|r| !r.status.is_valid()) {
        process::exit(1);
    }
}
