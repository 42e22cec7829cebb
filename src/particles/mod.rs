pub mod particle;
pub mod particle_integration;
pub mod particle_push_constants;
pub mod particle_scene;
pub mod simulation_step;
