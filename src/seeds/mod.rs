pub mod workshops_seed;
