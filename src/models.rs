use chrono::{DateTime, FixedOffset};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: DateTime<FixedOffset>,
    pub genre: String,
    /// Only populated when an author is staged together with its books.
    pub books: Vec<Book>,
}

impl Author {
    pub const fn new(
        id: Uuid,
        first_name: String,
        last_name: String,
        date_of_birth: DateTime<FixedOffset>,
        genre: String,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            date_of_birth,
            genre,
            books: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub page_count: i32,
    pub author_id: Uuid,
}

impl Book {
    pub const fn new(
        id: Uuid,
        title: String,
        description: Option<String>,
        page_count: i32,
        author_id: Uuid,
    ) -> Self {
        Self {
            id,
            title,
            description,
            page_count,
            author_id,
        }
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct RepositoryError(#[from] pub anyhow::Error);
