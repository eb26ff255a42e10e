//! Walks a manager through a foreground/background cycle using the local provider.
//!
//! Set `PUSH_TOKEN_CACHE_DIR` to choose where the token cache lives and
//! `PUSH_LOG_LEVEL=verbose` to see every lifecycle decision.

use std::sync::Arc;
use std::time::Duration;

use messaging_lifecycle::messaging::{
    FileTokenStore, FnListener, LocalPushProvider, MessagePayload, MessagingOptions,
    TokenRegistrationManager,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(LocalPushProvider::new());
    let store = Arc::new(FileTokenStore::from_env("demo-app")?);

    let manager = TokenRegistrationManager::new(provider.clone(), store.clone());
    manager.initialize(MessagingOptions::from_env());

    manager.add_listener(
        FnListener::new()
            .with_token(|token| {
                println!("Token available: {token}");
                Ok(())
            })
            .with_message(|payload| {
                println!("Message received: {:?}", payload.data);
                Ok(())
            })
            .into_arc(),
    );

    // Two screens become visible; only the first one triggers registration.
    manager.on_foreground_enter();
    manager.on_foreground_enter();
    manager.subscribe_to_topics(["news", "/topics/weather"]);
    tokio::time::sleep(Duration::from_millis(100)).await;

    manager.dispatch_message(&MessagePayload::from_data([("greeting", "hello")]));
    println!("Subscribed topics: {:?}", provider.topics());

    manager.on_foreground_exit();
    manager.on_foreground_exit();

    println!("Cached token on disk: {}", store.path().display());
    Ok(())
}
