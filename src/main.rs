use anyhow::Context;
use bangsh::{repl, ShellConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = ShellConfig::from_env().context("failed to read shell configuration")?;
    log::debug!("starting with {:?}", config);
    let code = repl::start_repl(config)?;
    std::process::exit(code);
}
