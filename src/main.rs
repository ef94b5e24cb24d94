mod cli;
mod config;
mod error;
mod exchange;
mod logging;
mod materialize;
mod runner;
mod structure;
mod templates;

fn main() -> anyhow::Result<()> {
    let app = cli::parse();
    logging::init(app.verbose);
    runner::run(app)
}
