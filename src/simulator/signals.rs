use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::network::SignalSite;
use crate::models::signal::{SignalState, DEFAULT_CYCLE_TIME};
use crate::store::TrafficStore;

/// Green three times out of seven, Red three, Yellow once.
pub const STATE_POOL: [SignalState; 7] = [
    SignalState::Green,
    SignalState::Green,
    SignalState::Green,
    SignalState::Yellow,
    SignalState::Red,
    SignalState::Red,
    SignalState::Red,
];

/// Registers every site once; existing signals are left as they are.
pub async fn init_signals<S: TrafficStore>(store: &S, sites: &[SignalSite]) -> Result<usize> {
    for site in sites {
        store
            .ensure_signal(site.name, site.position, DEFAULT_CYCLE_TIME)
            .await?;
    }
    let total = store.signals().await?.len();
    info!("Signals: {} initialized", total);
    Ok(total)
}

/// Gives every stored signal a fresh random state.
pub async fn cycle_signals<S: TrafficStore, R: Rng>(store: &S, rng: &mut R) -> Result<()> {
    let signals = store.signals().await?;
    let picks: Vec<SignalState> = signals
        .iter()
        .map(|_| *STATE_POOL.choose(rng).unwrap_or(&SignalState::Green))
        .collect();

    for (signal, state) in signals.iter().zip(picks) {
        store.set_signal_state(signal.id, state).await?;
        debug!("Signal {} -> {}", signal.name, state);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::network::SIGNAL_SITES;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    async fn init_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(init_signals(&store, &SIGNAL_SITES).await.unwrap(), 10);
        assert_eq!(init_signals(&store, &SIGNAL_SITES).await.unwrap(), 10);

        let signals = store.signals().await.unwrap();
        assert!(signals.iter().all(|s| s.state == SignalState::Green && s.cycle_time == 60));
    }

    #[tokio::test]
    async fn cycling_eventually_changes_states() {
        let store = MemoryStore::new();
        init_signals(&store, &SIGNAL_SITES).await.unwrap();
        let mut rng = StdRng::seed_from_u64(8);

        cycle_signals(&store, &mut rng).await.unwrap();

        let signals = store.signals().await.unwrap();
        assert!(signals.iter().any(|s| s.state != SignalState::Green));
    }
}
