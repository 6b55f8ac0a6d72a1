//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `climb_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("climb_core ping={}", climb_core::ping());
    println!("climb_core version={}", climb_core::core_version());
}
