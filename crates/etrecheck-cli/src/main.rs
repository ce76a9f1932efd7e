//! etrecheck - launchd file checker
//!
//! Scans launchd descriptors, verifies what they run and scores how safe
//! they look.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    etrecheck_cli::run().await
}
