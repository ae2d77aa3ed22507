use rusqlite::Connection;

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const ACCOUNT_FK: ForeignKey = ForeignKey {
    foreign_table: "account",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const MEDIA_ENTRY_FK: ForeignKey = ForeignKey {
    foreign_table: "media_entry",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// V 0
pub const ACCOUNT_TABLE_V_0: Table = Table {
    name: "account",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("username", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const ACCOUNT_PASSWORD_TABLE_V_0: Table = Table {
    name: "account_password",
    columns: &[
        sqlite_column!(
            "account_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const AUTH_SESSION_TABLE_V_0: Table = Table {
    name: "auth_session",
    columns: &[
        sqlite_column!(
            "account_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_auth_session_value", "value")],
    unique_constraints: &[],
};

pub const MEDIA_ENTRY_TABLE_V_0: Table = Table {
    name: "media_entry",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "owner_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("poster_url", &SqlType::Text),
        sqlite_column!("backdrop_url", &SqlType::Text),
        sqlite_column!("overview", &SqlType::Text),
        sqlite_column!("review", &SqlType::Text),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("original_language", &SqlType::Text),
        sqlite_column!("vote_average", &SqlType::Real),
        sqlite_column!("genres", &SqlType::Text, non_null = true, default_value = Some("'[]'")),
        sqlite_column!("provider", &SqlType::Text),
        sqlite_column!("provider_id", &SqlType::Text),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_media_entry_owner_id", "owner_id")],
    unique_constraints: &[],
};

pub const SEASON_TABLE_V_0: Table = Table {
    name: "season",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "media_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&MEDIA_ENTRY_FK)
        ),
        sqlite_column!("season_number", &SqlType::Integer, non_null = true),
        sqlite_column!("episodes_watched", &SqlType::Integer, non_null = true),
        sqlite_column!("total_episodes", &SqlType::Integer, non_null = true),
        sqlite_column!("is_completed", &SqlType::Integer, non_null = true),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_season_media_id", "media_id")],
    unique_constraints: &[&["media_id", "season_number"]],
};

/// V 1
pub const MEDIA_ENTRY_TABLE_V_1: Table = Table {
    name: "media_entry",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "owner_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ACCOUNT_FK)
        ),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("rating", &SqlType::Integer),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("poster_url", &SqlType::Text),
        sqlite_column!("backdrop_url", &SqlType::Text),
        sqlite_column!("overview", &SqlType::Text),
        sqlite_column!("review", &SqlType::Text),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("original_language", &SqlType::Text),
        sqlite_column!("vote_average", &SqlType::Real),
        sqlite_column!("genres", &SqlType::Text, non_null = true, default_value = Some("'[]'")),
        sqlite_column!("provider", &SqlType::Text),
        sqlite_column!("provider_id", &SqlType::Text),
        sqlite_column!("created", &SqlType::Integer, non_null = true),
        sqlite_column!("updated", &SqlType::Integer, non_null = true),
        sqlite_column!("notes", &SqlType::Text),
    ],
    indices: &[("idx_media_entry_owner_id", "owner_id")],
    unique_constraints: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ACCOUNT_TABLE_V_0,
            ACCOUNT_PASSWORD_TABLE_V_0,
            AUTH_SESSION_TABLE_V_0,
            MEDIA_ENTRY_TABLE_V_0,
            SEASON_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ACCOUNT_TABLE_V_0,
            ACCOUNT_PASSWORD_TABLE_V_0,
            AUTH_SESSION_TABLE_V_0,
            MEDIA_ENTRY_TABLE_V_1,
            SEASON_TABLE_V_0,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute("ALTER TABLE media_entry ADD COLUMN notes TEXT", [])?;
            Ok(())
        }),
    },
];
