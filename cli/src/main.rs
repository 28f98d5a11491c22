mod commands;
mod terminal;

use addrbatch_core::input;
use commands::{CommandLine, provision};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);
    print::header("address provisioning");

    if commands.dry_run {
        let records = input::collect(commands.csv_file.as_deref(), commands.count);
        provision::dry_run(&records);
        return Ok(());
    }

    let cfg = commands.manager_config()?;
    let records = input::collect(commands.csv_file.as_deref(), commands.count);

    provision::provision(&cfg, &records).await
}
