#![cfg_attr(not(feature = "std"), no_std)]

pub mod ecosystem;
pub mod pairs;

pub use ecosystem::*;
pub use pairs::*;
