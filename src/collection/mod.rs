//! Client side of the tracker: local persistence, the two collection
//! stores and the facade choosing between them.

mod backend_client;
mod facade;
mod guest_store;
mod local_storage;
mod remote_store;
mod session;
mod store;

pub use backend_client::BackendClient;
pub use facade::Collection;
pub use guest_store::{is_guest_id, GuestStore, GUEST_DATA_KEY, GUEST_ID_PREFIX};
pub use local_storage::{FileLocalStorage, LocalStorage, MemoryLocalStorage};
pub use remote_store::RemoteStore;
pub use session::{AuthSession, SessionController, SessionMode, AUTH_SESSION_KEY, GUEST_MODE_KEY};
pub use store::{CollectionStore, StoreBackend, StoreCapabilities};
