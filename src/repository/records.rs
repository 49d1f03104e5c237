//! Diesel record types for database tables.
//!
//! These mirror the table layout exactly; conversion to the domain models in
//! `crate::models` happens in the repository modules.

use diesel::prelude::*;

use crate::schema;

/// Novel record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::novels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NovelRecord {
    pub id: String,
    pub source_url: String,
    pub title: String,
    pub author: Option<String>,
    pub cover_url: Option<String>,
    pub synopsis: Option<String>,
    pub output_path: String,
    pub chapter_count: i32,
    pub orphan: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New novel for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::novels)]
pub struct NewNovel<'a> {
    pub id: &'a str,
    pub source_url: &'a str,
    pub title: &'a str,
    pub author: Option<&'a str>,
    pub cover_url: Option<&'a str>,
    pub synopsis: Option<&'a str>,
    pub output_path: &'a str,
    pub chapter_count: i32,
    pub orphan: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Artifact record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::artifacts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArtifactRecord {
    pub id: i32,
    pub novel_id: String,
    pub format: String,
    pub output_file: String,
    pub file_size: i32,
    pub is_available: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// New artifact for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::artifacts)]
pub struct NewArtifact<'a> {
    pub novel_id: &'a str,
    pub format: &'a str,
    pub output_file: &'a str,
    pub file_size: i32,
    pub is_available: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}
