use super::{block_on, exit_with};
use crate::error::Result;
use crate::models::Universe;
use crate::server::{self, AppState};
use crate::services::{Storage, YahooClient};
use crate::utils::{get_data_dir, get_universe_file, get_yahoo_base_url};

pub fn run(port: u16) {
    println!("🚀 Starting niftydash server on port {}", port);

    if let Err(e) = block_on(start(port)) {
        exit_with(e);
    }
}

async fn start(port: u16) -> Result<()> {
    let storage = Storage::from_env().await;
    println!("📁 Data directory: {}", get_data_dir().display());
    println!("💾 Storage backend: {}", storage.backend());

    let universe = Universe::load_or_default(get_universe_file());
    println!(
        "📈 Universe: {} symbols in {} groups",
        universe.symbol_count(),
        universe.groups.len()
    );

    let client = YahooClient::new(get_yahoo_base_url())?;
    let state = AppState::new(storage, universe, client)?;

    println!("🌐 Dashboard at http://localhost:{}/", port);
    server::serve(state, port).await
}
