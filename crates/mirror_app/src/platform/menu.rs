use std::io::{self, BufRead, Write};

use super::app::App;
use super::console::Console;

const MENU: &str = "\n==== Catalog Mirror ====
1. Search games in local database
2. Refresh database (harvest again, in parallel)
3. Clean database (delete all files)
4. Retry failed harvests sequentially
5. Quickcheck database for issues
6. Exit
7. Check for new catalog entries
8. Download game files";

/// Runs menu choices until Exit or end of input.
pub(crate) fn run_menu<R: BufRead, W: Write>(
    app: &mut App,
    console: &mut Console<R, W>,
) -> io::Result<()> {
    loop {
        writeln!(console.out, "{MENU}")?;
        let Some(choice) = console.ask("Choose an option (1-8): ")? else {
            return Ok(());
        };
        match choice.as_str() {
            "1" => {
                let query = console.ask("\nEnter search term: ")?.unwrap_or_default();
                app.search(console, &query)?;
            }
            "2" => app.refresh(console, false)?,
            "3" => app.clean(console, false)?,
            "4" => app.retry(console)?,
            "5" => app.quickcheck(console, false)?,
            "6" => {
                writeln!(console.out, "[INFO] Exiting...")?;
                return Ok(());
            }
            "7" => app.updates(console)?,
            "8" => app.download(console, None, None)?,
            _ => writeln!(console.out, "[ERROR] Invalid option. Please choose 1-8.")?,
        }
    }
}
