//! Read-only lookups against third-party catalogs, used to pre-fill new entries.

mod catalog;
mod comicvine;
mod igdb;
mod provider;
mod tmdb;
mod token_cache;

pub use catalog::{MetadataCatalog, ProviderStatus, DEFAULT_LOOKUP_LIMIT};
pub use comicvine::{clean_html, ComicVineClient, COMICVINE_API_URL};
pub use igdb::{IgdbClient, IGDB_API_URL, TWITCH_TOKEN_URL};
pub use provider::{LookupCandidate, MetadataProvider};
pub use tmdb::{TmdbClient, TMDB_API_URL, TMDB_IMAGE_URL};
pub use token_cache::{TokenCache, TOKEN_REFRESH_MARGIN};
