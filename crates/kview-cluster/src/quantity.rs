//! Kubernetes resource quantity parsing.
//!
//! Quantities arrive as strings such as `"2"`, `"500m"`, `"250000000n"`
//! (metrics-server reports nanocores) or `"16Gi"`. Values are returned
//! as `f64` in base units.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Parse a quantity string into base units.
///
/// Supports decimal SI suffixes (`n u m k M G T P E`), binary suffixes
/// (`Ki Mi Gi Ti Pi Ei`) and decimal exponents (`1e3`, `5E-2`).
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(raw.len());
    let (number, suffix) = raw.split_at(split);
    let value: f64 = number.parse().ok()?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        exp if exp.starts_with(['e', 'E']) => 10f64.powi(exp[1..].parse::<i32>().ok()?),
        _ => return None,
    };

    let parsed = value * multiplier;
    parsed.is_finite().then_some(parsed)
}

/// CPU quantity in millicores.
pub fn cpu_millis(quantity: &Quantity) -> Option<f64> {
    parse_quantity(&quantity.0).map(|cores| cores * 1000.0)
}

/// Memory quantity in bytes.
pub fn bytes(quantity: &Quantity) -> Option<f64> {
    parse_quantity(&quantity.0)
}
