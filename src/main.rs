use lifegrid::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::default();
    log::info!(
        "starting {}x{} grid, rule {}, boundary {}, seed {}",
        config.grid.width,
        config.grid.height,
        config.grid.rule,
        config.grid.boundary.as_str(),
        config.grid.pattern.as_str()
    );

    lifegrid::run(config)?;
    Ok(())
}
