//! Simulated Feed
//!
//! Paper-mode quote source. Spot follows a small random walk while the basis
//! mean-reverts toward its starting level with occasional dislocations, which
//! is the pattern the strategy trades.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use crate::adapters::market_data::snapshot_buffer::SnapshotBuffer;
use crate::domain::instrument::InstrumentSpec;
use crate::domain::market::MarketSnapshot;
use crate::domain::session::MarketSession;

/// Max relative spot move per tick
const SPOT_STEP: f64 = 0.0005;
/// Basis noise per tick, in basis-percentage points
const BASIS_NOISE: f64 = 0.01;
/// Fraction of the gap to the mean closed each tick
const BASIS_REVERSION: f64 = 0.08;
/// Chance per tick of a basis dislocation
const SHOCK_PROBABILITY: f64 = 0.01;
const SHOCK_SIZE: f64 = 0.12;

/// Starting quote for one simulated instrument
#[derive(Debug, Clone)]
pub struct SimulatedInstrument {
    pub spec: InstrumentSpec,
    pub spot_price: f64,
    pub basis_pct: f64,
}

#[derive(Debug, Clone)]
struct QuoteState {
    spec: InstrumentSpec,
    spot_price: f64,
    basis_pct: f64,
    mean_basis_pct: f64,
}

pub struct SimulatedFeed {
    quotes: Vec<QuoteState>,
    buffer: SnapshotBuffer,
    session: MarketSession,
    interval: Duration,
    rng: StdRng,
}

impl SimulatedFeed {
    pub fn new(
        instruments: Vec<SimulatedInstrument>,
        buffer: SnapshotBuffer,
        session: MarketSession,
        interval: Duration,
    ) -> Self {
        let quotes = instruments
            .into_iter()
            .map(|i| QuoteState {
                spec: i.spec,
                spot_price: i.spot_price,
                basis_pct: i.basis_pct,
                mean_basis_pct: i.basis_pct,
            })
            .collect();

        Self {
            quotes,
            buffer,
            session,
            interval,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic paths for tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Advance every instrument one tick and publish the quotes
    pub fn step(&mut self, now: DateTime<Utc>) -> usize {
        let today = self.session.local_date(now);
        let mut published = 0;

        for quote in &mut self.quotes {
            let spot_move = self.rng.gen_range(-SPOT_STEP..=SPOT_STEP);
            quote.spot_price = (quote.spot_price * (1.0 + spot_move)).max(0.01);

            let noise = self.rng.gen_range(-BASIS_NOISE..=BASIS_NOISE);
            quote.basis_pct += BASIS_REVERSION * (quote.mean_basis_pct - quote.basis_pct) + noise;
            if self.rng.gen_bool(SHOCK_PROBABILITY) {
                let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                quote.basis_pct += sign * SHOCK_SIZE;
            }

            let futures_price = quote.spot_price * (1.0 + quote.basis_pct / 100.0);
            let spot_volume: u64 = self.rng.gen_range(5_000..50_000);
            let futures_volume = (spot_volume as f64 * self.rng.gen_range(0.3..1.2)) as u64;

            match MarketSnapshot::new(
                quote.spec.symbol.clone(),
                quote.spot_price,
                futures_price,
                spot_volume,
                futures_volume,
                quote.spec.days_to_expiry(today),
                now,
            ) {
                Ok(snapshot) => {
                    self.buffer.publish(snapshot);
                    published += 1;
                }
                Err(e) => tracing::warn!("Simulated tick dropped: {}", e),
            }
        }

        published
    }

    /// Run the feed on the tokio runtime until the task is aborted
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            tracing::info!(
                "Simulated feed started: {} instruments every {:?}",
                self.quotes.len(),
                self.interval
            );
            loop {
                ticker.tick().await;
                self.step(Utc::now());
            }
        })
    }
}
