use env_logger::Env;

use puffscene::config::settings::Settings;
use puffscene::config::vulkan;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let path = Settings::path_from_args(std::env::args());
    let settings = Settings::load(&path)?;
    log::info!("starting {} ({}x{})", settings.window.title, settings.window.width, settings.window.height);
    vulkan::run(settings)
}
