mod app;
mod console;
pub(crate) mod logging;
mod menu;
mod settings;

use engine_logging::engine_info;

use crate::cli::{Cli, Command};
use app::App;
use console::Console;
use settings::MirrorSettings;

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(cli.log.into(), cli.verbose);

    let mut settings = MirrorSettings::load(cli.config.as_deref());
    settings.apply_overrides(&cli);
    engine_info!(
        "Data directory {:?}, listing {}",
        settings.data_dir,
        settings.listing_url
    );

    let mut app = App::new(&settings)?;
    let mut console = Console::stdio();
    match cli.command {
        None => {
            app.harvest_if_empty(&mut console)?;
            menu::run_menu(&mut app, &mut console)?;
        }
        Some(Command::Search { query }) => app.search(&mut console, query.trim())?,
        Some(Command::Refresh { yes }) => app.refresh(&mut console, yes)?,
        Some(Command::Clean { yes }) => app.clean(&mut console, yes)?,
        Some(Command::Retry) => app.retry(&mut console)?,
        Some(Command::Quickcheck { yes }) => app.quickcheck(&mut console, yes)?,
        Some(Command::Updates) => app.updates(&mut console)?,
        Some(Command::Download { query, output }) => app.download(&mut console, query, output)?,
    }
    Ok(())
}
