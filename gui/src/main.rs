use clap::Parser;
use color_eyre::Result;
use picture_poet::{Gui, cli::Cli, load_config};

pub fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let cli = Cli::parse();
    let cfg = load_config()?;
    iced::application(move || Gui::new(cfg.clone(), cli.clone()), Gui::update, Gui::view)
        .title(Gui::title)
        .theme(Gui::theme)
        .subscription(Gui::subscription)
        .run()?;
    Ok(())
}
