pub mod bind_resources;
pub mod bitonic_sort;
pub mod compute_shader;
pub mod dispatch_grid;
pub mod double_buffer;
pub mod gpu_buffer;
pub mod lane_executor;
