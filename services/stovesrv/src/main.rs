//! Stove Service (StoveSrv)
//!
//! Polls a Duepi EVO pellet stove and serves its state over HTTP.

use anyhow::Result;
use clap::Parser;

use stovesrv::bootstrap::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    stovesrv::service::execute(args).await?;
    Ok(())
}
