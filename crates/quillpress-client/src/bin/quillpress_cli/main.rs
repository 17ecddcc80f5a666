//! quillpress-cli: command-line client for the quillpress blog API.

mod args;
mod ctx;
mod handlers;
mod print;

use clap::Parser;

use args::{Cli, Commands};
use ctx::{CliError, build_ctx};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let Cli {
        site,
        token_file,
        token_env,
        command,
    } = Cli::parse();
    let ctx = || build_ctx(site.as_deref(), token_file.as_ref(), token_env.as_deref());

    match command {
        Commands::Feed(cmd) => handlers::feed(&ctx()?, cmd.action).await,
        Commands::Posts(cmd) => handlers::posts(&ctx()?, cmd.action).await,
        Commands::Categories(cmd) => handlers::categories(&ctx()?, cmd.action).await,
        Commands::Upload { file } => handlers::upload(&ctx()?, file).await,
        Commands::SignIn(args) => handlers::sign_in(args).await,
    }
}
