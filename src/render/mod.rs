pub mod gpu_types;
