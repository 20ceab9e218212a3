#![warn(warnings)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(non_upper_case_globals)]
#![allow(clippy::needless_return)]
#![allow(clippy::items_after_statements)]
#![allow(unused_variables, unused_imports, dead_code)]

pub mod misc;
mod engine;
mod ui;
pub mod solvers;

pub use engine::*;

pub use ui::*;
