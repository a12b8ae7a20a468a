pub mod codec;
pub mod ela;
pub mod regions;
