use particle_engine::run;

fn main() -> anyhow::Result<()> {
    run()
}
