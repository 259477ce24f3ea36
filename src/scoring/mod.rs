//! Score fusion
//!
//! Combines per-layer scores into one bounded final score using a
//! 2-additive Choquet-style capacity per role.
//!
//! # Fusion Formula
//!
//! ```text
//! final = Σ aₗ · xₗ  +  Σ aₗₖ · min(xₗ, xₖ)
//!         linear        pairwise interactions
//!
//! with Σ aₗ + Σ aₗₖ = 1  (checked at load time)
//! ```
//!
//! The `min` term rewards layers that are strong together: a high @u score
//! adds nothing through the (@u, @chain) synergy when @chain is weak.
//!
//! # Example (TRANSFORM)
//!
//! ```text
//! weights: @b 0.45, @chain 0.35, @m 0.10, (@b, @chain) 0.10
//! scores:  @b 1.0,  @chain 0.2,  @m 1.0
//!
//! final = 0.45 + 0.07 + 0.10 + 0.10 · 0.2 = 0.64
//! ```
//!
//! # Quality bands
//!
//! - **excellent**: ≥ 0.85
//! - **good**: ≥ 0.70
//! - **acceptable**: ≥ 0.55
//! - **insufficient**: below 0.55

mod choquet;

pub use choquet::{clamp_final, ChoquetAggregator};
