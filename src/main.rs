use anyhow::Result;

use omnicomm_lls::{boot, cli};

#[tokio::main]
async fn main() -> Result<()> {
    boot::init_logger();
    let matches = cli::parse_args();

    if cli::actions::run_one_shot_actions(&matches)? {
        return Ok(());
    }

    cli::actions::run_poller(&matches).await?;

    // The runtime would otherwise wait on the blocked stdin reader
    std::process::exit(0);
}
