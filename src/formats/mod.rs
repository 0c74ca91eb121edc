//! Readers for the client's asset files
//!
//! `dat` enumerates things and the sprite ids they reference, `spr` resolves
//! and decodes those ids from the sprite atlas.

pub mod dat;
pub mod spr;
