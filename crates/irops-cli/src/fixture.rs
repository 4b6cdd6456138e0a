use irops_core::{Disruption, Flight, IropsResult};
use irops_store::Store;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Seed data: flights and the disruptions that reference them.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(default)]
    pub disruptions: Vec<Disruption>,
}

impl Fixture {
    pub async fn read(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read fixture '{}': {e}", path.display())
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Flights first, so disruptions never reference missing rows.
    pub async fn load_into(&self, store: &dyn Store) -> IropsResult<()> {
        for flight in &self.flights {
            store.put_flight(flight).await?;
        }
        for disruption in &self.disruptions {
            store.put_disruption(disruption).await?;
        }
        info!(
            flights = self.flights.len(),
            disruptions = self.disruptions.len(),
            "Fixture loaded"
        );
        Ok(())
    }
}
