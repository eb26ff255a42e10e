//! Optional process-wide manager instance.
//!
//! Hosts that cannot thread a [`TokenRegistrationManager`] through their
//! composition root can install one here once and look it up from anywhere.
//! The first install wins; later installs get the existing instance back.

use once_cell::sync::OnceCell;

use crate::messaging::manager::TokenRegistrationManager;

static GLOBAL: OnceCell<TokenRegistrationManager> = OnceCell::new();

pub fn install_global(manager: TokenRegistrationManager) -> TokenRegistrationManager {
    GLOBAL.get_or_init(|| manager).clone()
}

/// Returns the installed manager, building it with `init` on first use.
pub fn global_or_init<F>(init: F) -> TokenRegistrationManager
where
    F: FnOnce() -> TokenRegistrationManager,
{
    GLOBAL.get_or_init(init).clone()
}

pub fn global() -> Option<TokenRegistrationManager> {
    GLOBAL.get().cloned()
}
