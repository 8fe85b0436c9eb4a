pub mod arrow;
