//! `pantry validate`: local UPC-A validation, no network.

use pantry_core::upc::{complete_check_digit, validate_upc_a};

pub fn run(code: &str) {
    let validation = validate_upc_a(code);
    if validation.valid {
        println!(
            "valid UPC-A: {}",
            validation.normalized.as_deref().unwrap_or(code)
        );
        return;
    }

    match validation.reason {
        Some(reason) => println!("invalid UPC-A: {reason}"),
        None => println!("invalid UPC-A"),
    }
    if let Ok(completed) = complete_check_digit(code) {
        println!("nearest completion: {completed}");
    }
}
