use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::schema::VERSIONED_SCHEMAS;
use super::MediaStore;
use crate::account::auth::CredentialHasher;
use crate::account::{
    Account, AccountAuthTokenStore, AccountCredentialsStore, AccountStore, AuthToken,
    AuthTokenValue, HashedPassword, PasswordCredentials,
};
use crate::error::{TrackerError, TrackerResult};
use crate::media::{
    resolve_season_progress, validate_draft, validate_update, CollectionFilter, EpisodeProgress,
    ExternalRef, MediaDraft, MediaEntry, MediaStatus, MediaUpdate, OwnerRef, Season,
    SeasonUpdate,
};
use crate::sqlite_persistence::open_versioned;

const ENTRY_COLUMNS: &str = "id, owner_id, kind, status, rating, title, poster_url, \
    backdrop_url, overview, notes, review, release_date, original_language, vote_average, \
    genres, provider, provider_id, created, updated";

const SEASON_COLUMNS: &str = "s.id, s.media_id, s.season_number, s.episodes_watched, \
    s.total_episodes, s.is_completed, s.rating, s.created, s.updated";

/// SQLite store backing the hosted backend: accounts, sessions and every
/// account's media collection live in the same database file.
#[derive(Clone)]
pub struct SqliteBackendStore {
    conn: Arc<Mutex<Connection>>,
}

fn system_time_from_column(value: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn datetime_from_millis(value: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value).unwrap_or_default()
}

fn parse_text_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|err: anyhow::Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into()))
}

fn entry_from_row(row: &Row) -> rusqlite::Result<MediaEntry> {
    let genres_json: String = row.get(14)?;
    let genres = serde_json::from_str(&genres_json)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, err.into()))?;
    let provider: Option<String> = row.get(15)?;
    let provider_id: Option<String> = row.get(16)?;
    let external_ref = match (provider, provider_id) {
        (Some(source), Some(id)) => Some(ExternalRef {
            source: source.parse().map_err(|err: anyhow::Error| {
                rusqlite::Error::FromSqlConversionFailure(15, Type::Text, err.into())
            })?,
            id,
        }),
        _ => None,
    };
    Ok(MediaEntry {
        id: row.get(0)?,
        owner_id: OwnerRef::Account(row.get(1)?),
        kind: parse_text_column(row, 2)?,
        status: parse_text_column(row, 3)?,
        rating: row.get(4)?,
        title: row.get(5)?,
        poster_url: row.get(6)?,
        backdrop_url: row.get(7)?,
        overview: row.get(8)?,
        notes: row.get(9)?,
        review: row.get(10)?,
        release_date: row.get(11)?,
        original_language: row.get(12)?,
        vote_average: row.get::<_, Option<f64>>(13)?.map(|v| v as f32),
        genres,
        external_ref,
        created_at: datetime_from_millis(row.get(17)?),
        updated_at: datetime_from_millis(row.get(18)?),
        seasons: vec![],
    })
}

fn season_from_row(row: &Row) -> rusqlite::Result<Season> {
    Ok(Season {
        id: row.get(0)?,
        media_id: row.get(1)?,
        season_number: row.get(2)?,
        episodes_watched: row.get(3)?,
        total_episodes: row.get(4)?,
        is_completed: row.get(5)?,
        rating: row.get(6)?,
        created_at: datetime_from_millis(row.get(7)?),
        updated_at: datetime_from_millis(row.get(8)?),
    })
}

/// Extra `WHERE` conditions and their arguments for a filter.
/// Argument numbering starts at 2, `?1` is always the owner.
fn filter_clause(filter: &CollectionFilter) -> (&'static str, Vec<Value>) {
    match filter {
        CollectionFilter::All => ("", vec![]),
        CollectionFilter::ByKind(kind) => {
            (" AND kind = ?2", vec![Value::Text(kind.as_str().to_string())])
        }
        CollectionFilter::CompletedWithReview => (
            " AND status = ?2 AND review IS NOT NULL \
             AND trim(review, ' ' || char(9) || char(10) || char(11) || char(12) || char(13)) != ''",
            vec![Value::Text(MediaStatus::Completed.as_str().to_string())],
        ),
        CollectionFilter::PendingByKind(kind) => (
            " AND kind = ?2 AND status = ?3",
            vec![
                Value::Text(kind.as_str().to_string()),
                Value::Text(MediaStatus::Plan.as_str().to_string()),
            ],
        ),
    }
}

fn load_entry(conn: &Connection, owner_id: i64, entry_id: &str) -> TrackerResult<MediaEntry> {
    let mut entry = conn
        .query_row(
            &format!(
                "SELECT {} FROM media_entry WHERE id = ?1 AND owner_id = ?2",
                ENTRY_COLUMNS
            ),
            params![entry_id, owner_id],
            entry_from_row,
        )
        .optional()
        .context("Failed to read media entry")?
        .ok_or_else(|| TrackerError::not_found(format!("entry {}", entry_id)))?;

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM season s WHERE s.media_id = ?1 ORDER BY s.season_number",
            SEASON_COLUMNS
        ))
        .context("Failed to prepare season query")?;
    entry.seasons = stmt
        .query_map(params![entry_id], season_from_row)
        .context("Failed to read seasons")?
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read seasons")?;
    Ok(entry)
}

fn load_owned_season(conn: &Connection, owner_id: i64, season_id: &str) -> TrackerResult<Season> {
    conn.query_row(
        &format!(
            "SELECT {} FROM season s JOIN media_entry m ON m.id = s.media_id \
             WHERE s.id = ?1 AND m.owner_id = ?2",
            SEASON_COLUMNS
        ),
        params![season_id, owner_id],
        season_from_row,
    )
    .optional()
    .context("Failed to read season")?
    .ok_or_else(|| TrackerError::not_found(format!("season {}", season_id)))
}

fn write_season_progress(
    conn: &Connection,
    season: &mut Season,
    progress: EpisodeProgress,
    now: DateTime<Utc>,
) -> TrackerResult<()> {
    season.episodes_watched = progress.watched();
    season.total_episodes = progress.total();
    season.is_completed = progress.is_completed();
    season.updated_at = now;
    conn.execute(
        "UPDATE season SET episodes_watched = ?1, total_episodes = ?2, is_completed = ?3, \
         rating = ?4, updated = ?5 WHERE id = ?6",
        params![
            season.episodes_watched,
            season.total_episodes,
            season.is_completed,
            season.rating,
            now.timestamp_millis(),
            season.id
        ],
    )
    .context("Failed to update season")?;
    Ok(())
}

impl SqliteBackendStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        let conn = open_versioned(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteBackendStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl AccountAuthTokenStore for SqliteBackendStore {
    fn get_auth_token(&self, value: &AuthTokenValue) -> anyhow::Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT account_id, value, created, last_used FROM auth_session WHERE value = ?1",
            params![value.0],
            |row| {
                Ok(AuthToken {
                    account_id: row.get(0)?,
                    value: AuthTokenValue(row.get(1)?),
                    created: system_time_from_column(row.get(2)?),
                    last_used: row.get::<_, Option<i64>>(3)?.map(system_time_from_column),
                })
            },
        )
        .optional()
        .context("Failed to read auth session")
    }

    fn add_auth_token(&self, token: &AuthToken) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_session (account_id, value) VALUES (?1, ?2)",
            params![token.account_id, token.value.0],
        )
        .context("Failed to store auth session")?;
        Ok(())
    }

    fn delete_auth_token(&self, value: &AuthTokenValue) -> anyhow::Result<Option<AuthToken>> {
        let Some(token) = self.get_auth_token(value)? else {
            return Ok(None);
        };
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM auth_session WHERE value = ?1", params![value.0])
            .context("Failed to delete auth session")?;
        Ok(Some(token))
    }

    fn touch_auth_token(&self, value: &AuthTokenValue) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_session SET last_used = cast(strftime('%s','now') as int) WHERE value = ?1",
            params![value.0],
        )?;
        Ok(())
    }
}

impl AccountCredentialsStore for SqliteBackendStore {
    fn get_password_credentials(
        &self,
        account_id: i64,
    ) -> anyhow::Result<Option<PasswordCredentials>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT account_id, salt, hash, hasher, created, last_used FROM account_password WHERE account_id = ?1",
            params![account_id],
            |row| {
                let hasher: CredentialHasher = parse_text_column(row, 3)?;
                Ok(PasswordCredentials {
                    account_id: row.get(0)?,
                    password: HashedPassword {
                        salt: row.get(1)?,
                        hash: row.get(2)?,
                        hasher,
                    },
                    created: system_time_from_column(row.get(4)?),
                    last_used: row.get::<_, Option<i64>>(5)?.map(system_time_from_column),
                })
            },
        )
        .optional()
        .context("Failed to read password credentials")
    }

    fn touch_password_credentials(&self, account_id: i64) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE account_password SET last_used = cast(strftime('%s','now') as int) WHERE account_id = ?1",
            params![account_id],
        )?;
        Ok(())
    }
}

impl AccountStore for SqliteBackendStore {
    fn create_account(
        &self,
        email: &str,
        username: Option<&str>,
        password: &HashedPassword,
    ) -> anyhow::Result<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO account (email, username) VALUES (?1, ?2)",
            params![email, username],
        )
        .with_context(|| format!("Failed to create account {}", email))?;
        let account_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO account_password (account_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
            params![
                account_id,
                password.salt,
                password.hash,
                password.hasher.to_string()
            ],
        )
        .context("Failed to store password credentials")?;
        tx.commit()?;
        Ok(account_id)
    }

    fn get_account(&self, account_id: i64) -> anyhow::Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, email, username FROM account WHERE id = ?1",
            params![account_id],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    username: row.get(2)?,
                })
            },
        )
        .optional()
        .context("Failed to read account")
    }

    fn find_account_id(&self, email: &str) -> anyhow::Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id FROM account WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up account")
    }
}

impl MediaStore for SqliteBackendStore {
    fn list_entries(
        &self,
        owner_id: i64,
        filter: &CollectionFilter,
    ) -> TrackerResult<Vec<MediaEntry>> {
        let conn = self.conn.lock().unwrap();
        let (clause, filter_args) = filter_clause(filter);
        let mut args = vec![Value::Integer(owner_id)];
        args.extend(filter_args);

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM media_entry WHERE owner_id = ?1{} ORDER BY created DESC, rowid DESC",
                ENTRY_COLUMNS, clause
            ))
            .context("Failed to prepare entry query")?;
        let mut entries = stmt
            .query_map(params_from_iter(args.iter()), entry_from_row)
            .context("Failed to list entries")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list entries")?;
        // SQLite's trim knows fewer whitespace characters than Rust's.
        entries.retain(|entry| filter.matches(entry));

        let mut season_stmt = conn
            .prepare(&format!(
                "SELECT {} FROM season s JOIN media_entry m ON m.id = s.media_id \
                 WHERE m.owner_id = ?1 ORDER BY s.season_number",
                SEASON_COLUMNS
            ))
            .context("Failed to prepare season query")?;
        let mut seasons_by_entry: HashMap<String, Vec<Season>> = HashMap::new();
        for season in season_stmt
            .query_map(params![owner_id], season_from_row)
            .context("Failed to list seasons")?
        {
            let season = season.context("Failed to read season")?;
            seasons_by_entry
                .entry(season.media_id.clone())
                .or_default()
                .push(season);
        }
        for entry in entries.iter_mut() {
            entry.seasons = seasons_by_entry.remove(&entry.id).unwrap_or_default();
        }
        Ok(entries)
    }

    fn get_entry(&self, owner_id: i64, entry_id: &str) -> TrackerResult<MediaEntry> {
        let conn = self.conn.lock().unwrap();
        load_entry(&conn, owner_id, entry_id)
    }

    fn create_entry(&self, owner_id: i64, draft: &MediaDraft) -> TrackerResult<MediaEntry> {
        validate_draft(draft)?;
        let now = Utc::now();
        let mut entry = MediaEntry::from_draft(
            Uuid::new_v4().to_string(),
            OwnerRef::Account(owner_id),
            draft,
            now,
        );
        let genres = serde_json::to_string(&entry.genres).context("Failed to encode genres")?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("Failed to open transaction")?;
        tx.execute(
            &format!(
                "INSERT INTO media_entry ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                ENTRY_COLUMNS
            ),
            params![
                entry.id,
                owner_id,
                entry.kind.as_str(),
                entry.status.as_str(),
                entry.rating,
                entry.title,
                entry.poster_url,
                entry.backdrop_url,
                entry.overview,
                entry.notes,
                entry.review,
                entry.release_date,
                entry.original_language,
                entry.vote_average.map(|v| v as f64),
                genres,
                entry.external_ref.as_ref().map(|r| r.source.as_str()),
                entry.external_ref.as_ref().map(|r| r.id.as_str()),
                now.timestamp_millis(),
                now.timestamp_millis(),
            ],
        )
        .context("Failed to insert media entry")?;

        let mut season_drafts = draft.seasons.clone();
        season_drafts.sort_by_key(|s| s.season_number);
        for season_draft in season_drafts {
            let progress =
                EpisodeProgress::new(season_draft.episodes_watched, season_draft.total_episodes)?;
            let season = Season {
                id: Uuid::new_v4().to_string(),
                media_id: entry.id.clone(),
                season_number: season_draft.season_number,
                episodes_watched: progress.watched(),
                total_episodes: progress.total(),
                is_completed: progress.is_completed(),
                rating: None,
                created_at: now,
                updated_at: now,
            };
            tx.execute(
                "INSERT INTO season (id, media_id, season_number, episodes_watched, total_episodes, is_completed, rating, created, updated) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    season.id,
                    season.media_id,
                    season.season_number,
                    season.episodes_watched,
                    season.total_episodes,
                    season.is_completed,
                    season.rating,
                    now.timestamp_millis(),
                    now.timestamp_millis(),
                ],
            )
            .with_context(|| format!("Failed to insert season {}", season.season_number))?;
            entry.seasons.push(season);
        }
        tx.commit().context("Failed to commit media entry")?;
        debug!(
            "Created {} entry {} with {} seasons for account {}",
            entry.kind,
            entry.id,
            entry.seasons.len(),
            owner_id
        );
        Ok(entry)
    }

    fn update_entry(
        &self,
        owner_id: i64,
        entry_id: &str,
        update: &MediaUpdate,
    ) -> TrackerResult<MediaEntry> {
        validate_update(update)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("Failed to open transaction")?;
        let mut entry = load_entry(&tx, owner_id, entry_id)?;
        entry.apply_update(update, Utc::now());
        tx.execute(
            "UPDATE media_entry SET title = ?1, status = ?2, rating = ?3, poster_url = ?4, \
             review = ?5, notes = ?6, updated = ?7 WHERE id = ?8 AND owner_id = ?9",
            params![
                entry.title,
                entry.status.as_str(),
                entry.rating,
                entry.poster_url,
                entry.review,
                entry.notes,
                entry.updated_at.timestamp_millis(),
                entry.id,
                owner_id
            ],
        )
        .context("Failed to update media entry")?;
        tx.commit().context("Failed to commit media entry update")?;
        Ok(entry)
    }

    fn delete_entry(&self, owner_id: i64, entry_id: &str) -> TrackerResult<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM media_entry WHERE id = ?1 AND owner_id = ?2",
                params![entry_id, owner_id],
            )
            .context("Failed to delete media entry")?;
        if deleted == 0 {
            return Err(TrackerError::not_found(format!("entry {}", entry_id)));
        }
        Ok(())
    }

    fn adjust_season_episodes(
        &self,
        owner_id: i64,
        season_id: &str,
        delta: i32,
    ) -> TrackerResult<Season> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("Failed to open transaction")?;
        let mut season = load_owned_season(&tx, owner_id, season_id)?;
        let current = EpisodeProgress::new(season.episodes_watched, season.total_episodes)?;
        let progress = current.adjust(delta);
        if progress == current {
            return Ok(season);
        }
        write_season_progress(&tx, &mut season, progress, Utc::now())?;
        tx.commit().context("Failed to commit season progress")?;
        Ok(season)
    }

    fn update_season(
        &self,
        owner_id: i64,
        season_id: &str,
        update: &SeasonUpdate,
    ) -> TrackerResult<Season> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("Failed to open transaction")?;
        let mut season = load_owned_season(&tx, owner_id, season_id)?;
        let current = EpisodeProgress::new(season.episodes_watched, season.total_episodes)?;
        let progress = resolve_season_progress(current, update)?;
        let rating = update.rating.unwrap_or(season.rating);
        if progress == current && rating == season.rating {
            return Ok(season);
        }
        season.rating = rating;
        write_season_progress(&tx, &mut season, progress, Utc::now())?;
        tx.commit().context("Failed to commit season update")?;
        Ok(season)
    }
}
