use std::sync::Arc;
use std::thread;

use messaging_lifecycle::messaging::{
    global, global_or_init, install_global, LocalPushProvider, MemoryTokenStore,
    MessagingOptions, TokenRegistrationManager,
};

fn build(delay_secs: u64) -> TokenRegistrationManager {
    let manager = TokenRegistrationManager::new(
        Arc::new(LocalPushProvider::new()),
        Arc::new(MemoryTokenStore::new()),
    );
    manager.initialize(MessagingOptions::new().with_retry_delay_secs(delay_secs));
    manager
}

#[test]
fn first_install_wins_across_threads() {
    assert!(global().is_none());

    let delays: Vec<u64> = (0..4u64)
        .map(|i| {
            thread::spawn(move || {
                install_global(build(10 + i))
                    .retry_delay()
                    .as_secs()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let winner = delays[0];
    assert!(delays.iter().all(|delay| *delay == winner));
    assert_eq!(
        global_or_init(|| build(99)).retry_delay().as_secs(),
        winner
    );
    assert_eq!(global().map(|m| m.retry_delay().as_secs()), Some(winner));
}
