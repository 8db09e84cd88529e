//! Ambient per-thread state consulted by applications while publishing.
//!
//! Two values live here: the security principal a request runs as and the
//! active component site. Applications may change either while handling a
//! request; [`StateGuard`] puts back whatever was active before the call,
//! including when the call returns an error or panics.
//!
//! The state is per thread. Nothing here coordinates access from several
//! threads driving the same application.

use std::cell::Cell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site(pub String);

thread_local! {
    static PRINCIPAL: Cell<Option<Principal>> = const { Cell::new(None) };
    static SITE: Cell<Option<Site>> = const { Cell::new(None) };
}

fn peek<T: Clone>(cell: &Cell<Option<T>>) -> Option<T> {
    let value = cell.take();
    cell.set(value.clone());
    value
}

pub fn current_principal() -> Option<Principal> {
    PRINCIPAL.with(peek)
}

/// Installs `principal`, returning the previous one.
pub fn set_principal(principal: Option<Principal>) -> Option<Principal> {
    PRINCIPAL.with(|cell| cell.replace(principal))
}

pub fn current_site() -> Option<Site> {
    SITE.with(peek)
}

/// Installs `site`, returning the previous one.
pub fn set_site(site: Option<Site>) -> Option<Site> {
    SITE.with(|cell| cell.replace(site))
}

/// Snapshot of the ambient state, restored when dropped.
#[must_use = "state is restored when the guard is dropped"]
#[derive(Debug)]
pub struct StateGuard {
    principal: Option<Principal>,
    site: Option<Site>,
}

impl StateGuard {
    pub fn save() -> Self {
        Self {
            principal: current_principal(),
            site: current_site(),
        }
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        // try_with: restoring must not panic, even during thread teardown
        let principal = self.principal.take();
        let _ = PRINCIPAL.try_with(|cell| cell.set(principal));
        let site = self.site.take();
        let _ = SITE.try_with(|cell| cell.set(site));
    }
}

/// Runs `f` with the ambient state saved beforehand and restored afterwards.
pub fn save_state<T>(f: impl FnOnce() -> T) -> T {
    let _guard = StateGuard::save();
    f()
}
