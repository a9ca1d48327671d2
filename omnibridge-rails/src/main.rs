//! omnibridge-rails
//!
//! HTTP service for Omni Bridge lookups and transfer observation.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    omnibridge_rails::main_entry::run_server().await
}
