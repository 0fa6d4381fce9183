use clap::Parser;
use rstkill::{app, cmd::Cmd};

#[tokio::main]
async fn main() {
    let cmd = Cmd::parse();
    let env = env_logger::Env::default().default_filter_or(cmd.verbose.as_str());
    env_logger::Builder::from_env(env).init();

    if let Err(e) = app::run(cmd).await {
        // written past the logger so RUST_LOG=off cannot hide it
        eprintln!("{}", app::fatal_line(&e));
        std::process::exit(1);
    }
}
