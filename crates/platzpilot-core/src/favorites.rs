//! Persisted favorites registry.
//!
//! Holds the user's favorited libraries as an ordered sequence that acts as
//! a set under the `(long_name, geo_coordinates)` identity. The full list is
//! written to durable storage on every effective mutation; there is no
//! incremental diffing. Load and save failures degrade silently - favorites
//! are a convenience, never worth failing an operation over.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::models::Library;
use crate::storage::KeyValueStore;
use crate::subscribers::{ListenerId, Subscribers};

/// Durable storage key for the favorites list
const FAVORITES_KEY: &str = "PlatzPilot_Favorites";

struct FavoritesState {
    favorites: Vec<Library>,
    initialized: bool,
}

pub struct FavoritesService {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<FavoritesState>,
    subscribers: Subscribers<[Library]>,
}

impl FavoritesService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FavoritesState {
                favorites: Vec::new(),
                initialized: false,
            }),
            subscribers: Subscribers::new(),
        }
    }

    /// Load the persisted list. Idempotent; every accessor calls this, so
    /// explicit initialization is optional.
    pub fn initialize(&self) {
        let mut state = self.state.lock().unwrap();
        self.ensure_initialized(&mut state);
    }

    fn ensure_initialized(&self, state: &mut FavoritesState) {
        if state.initialized {
            return;
        }
        state.initialized = true;

        match self.store.get(FAVORITES_KEY) {
            Ok(Some(stored)) => match serde_json::from_str::<Vec<Library>>(&stored) {
                Ok(favorites) => {
                    debug!(count = favorites.len(), "Loaded favorites");
                    state.favorites = favorites;
                }
                Err(e) => warn!(error = %e, "Stored favorites unreadable, starting empty"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load favorites, starting empty"),
        }
    }

    /// Register a listener called with the full list after every change.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[Library]) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// A copy of the current favorites, in the order they were added.
    pub fn favorites(&self) -> Vec<Library> {
        let mut state = self.state.lock().unwrap();
        self.ensure_initialized(&mut state);
        state.favorites.clone()
    }

    pub fn count(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        self.ensure_initialized(&mut state);
        state.favorites.len()
    }

    pub fn is_favorite(&self, library: &Library) -> bool {
        let mut state = self.state.lock().unwrap();
        self.ensure_initialized(&mut state);
        state.favorites.iter().any(|f| f.same_location(library))
    }

    /// Add to favorites. A no-op (no write, no notification) if a record
    /// with the same identity is already present.
    pub fn add(&self, library: &Library) {
        let changed = {
            let mut state = self.state.lock().unwrap();
            self.ensure_initialized(&mut state);
            if state.favorites.iter().any(|f| f.same_location(library)) {
                None
            } else {
                state.favorites.push(library.clone());
                self.persist(&state.favorites);
                Some(state.favorites.clone())
            }
        };
        if let Some(favorites) = changed {
            self.subscribers.notify(&favorites);
        }
    }

    /// Remove from favorites. A no-op if not present.
    pub fn remove(&self, library: &Library) {
        let changed = {
            let mut state = self.state.lock().unwrap();
            self.ensure_initialized(&mut state);
            let before = state.favorites.len();
            state.favorites.retain(|f| !f.same_location(library));
            if state.favorites.len() == before {
                None
            } else {
                self.persist(&state.favorites);
                Some(state.favorites.clone())
            }
        };
        if let Some(favorites) = changed {
            self.subscribers.notify(&favorites);
        }
    }

    /// Flip the favorite state, returning the new state.
    pub fn toggle(&self, library: &Library) -> bool {
        if self.is_favorite(library) {
            self.remove(library);
            false
        } else {
            self.add(library);
            true
        }
    }

    /// Empty the list, persist, and notify.
    pub fn clear_all(&self) {
        let favorites = {
            let mut state = self.state.lock().unwrap();
            self.ensure_initialized(&mut state);
            state.favorites.clear();
            self.persist(&state.favorites);
            state.favorites.clone()
        };
        self.subscribers.notify(&favorites);
    }

    fn persist(&self, favorites: &[Library]) {
        let serialized = match serde_json::to_string(favorites) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to serialize favorites");
                return;
            }
        };
        if let Err(e) = self.store.set(FAVORITES_KEY, &serialized) {
            warn!(error = %e, "Failed to persist favorites");
        }
    }
}
