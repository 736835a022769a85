use crate::models::{Author, Book, RepositoryError};
use crate::store::{Change, LibraryRepository, LibraryStore, stage_author, stage_book};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{FromRow, Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use uuid::Uuid;

static MIGRATOR: Migrator = sqlx::migrate!();

/// Stays well under SQLite's bound parameter limit.
const MAX_IDS_PER_QUERY: usize = 500;

pub async fn establish_pool(path: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePool::connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct SqliteLibrary {
    pool: SqlitePool,
}

impl SqliteLibrary {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LibraryStore for SqliteLibrary {
    type Repository = SqliteLibraryRepository;

    fn repository(&self) -> Self::Repository {
        SqliteLibraryRepository {
            pool: self.pool.clone(),
            pending: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct SqliteLibraryRepository {
    pool: SqlitePool,
    pending: Vec<Change>,
}

fn decode_uuid(raw: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(raw).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let first_name = row.try_get("first_name")?;
        let last_name = row.try_get("last_name")?;
        let date_of_birth: String = row.try_get("date_of_birth")?;
        let genre = row.try_get("genre")?;

        let id = decode_uuid(&id)?;
        let date_of_birth = DateTime::parse_from_rfc3339(&date_of_birth)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        Ok(Self::new(id, first_name, last_name, date_of_birth, genre))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let title = row.try_get("title")?;
        let description = row.try_get("description")?;
        let page_count = row.try_get("page_count")?;
        let author_id: String = row.try_get("author_id")?;

        Ok(Self::new(
            decode_uuid(&id)?,
            title,
            description,
            page_count,
            decode_uuid(&author_id)?,
        ))
    }
}

impl SqliteLibraryRepository {
    async fn commit(&self, changes: Vec<Change>) -> anyhow::Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        for change in changes {
            apply_change(&mut tx, change).await?;
        }

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(())
    }
}

async fn apply_change(tx: &mut Transaction<'_, Sqlite>, change: Change) -> anyhow::Result<()> {
    match change {
        Change::InsertAuthor(author) => {
            sqlx::query(
                "INSERT INTO author (id, first_name, last_name, date_of_birth, genre) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(author.id.to_string())
            .bind(&author.first_name)
            .bind(&author.last_name)
            .bind(author.date_of_birth.to_rfc3339())
            .bind(&author.genre)
            .execute(&mut **tx)
            .await
            .with_context(|| format!(r#"Failed to insert author with id "{}""#, author.id))?;
        }
        Change::InsertBook(book) => {
            sqlx::query(
                "INSERT INTO book (id, title, description, page_count, author_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(book.id.to_string())
            .bind(&book.title)
            .bind(&book.description)
            .bind(book.page_count)
            .bind(book.author_id.to_string())
            .execute(&mut **tx)
            .await
            .with_context(|| format!(r#"Failed to insert book with id "{}""#, book.id))?;
        }
        Change::UpdateBook(book) => {
            let result = sqlx::query(
                "UPDATE book SET title = ?, description = ?, page_count = ? WHERE id = ? AND author_id = ?",
            )
            .bind(&book.title)
            .bind(&book.description)
            .bind(book.page_count)
            .bind(book.id.to_string())
            .bind(book.author_id.to_string())
            .execute(&mut **tx)
            .await
            .with_context(|| format!(r#"Failed to update book with id "{}""#, book.id))?;

            if result.rows_affected() == 0 {
                return Err(anyhow!(r#"Book with id "{}" no longer exists"#, book.id));
            }
        }
        Change::DeleteBook(id) => {
            sqlx::query("DELETE FROM book WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut **tx)
                .await
                .with_context(|| format!(r#"Failed to delete book with id "{id}""#))?;
        }
    }

    Ok(())
}

#[async_trait]
impl LibraryRepository for SqliteLibraryRepository {
    async fn author_exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM author WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to look up author with id "{id}""#))
            })?;

        Ok(count > 0)
    }

    async fn get_authors(&self, ids: &[Uuid]) -> Result<Vec<Author>, RepositoryError> {
        let mut authors: Vec<Author> = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id, first_name, last_name, date_of_birth, genre FROM author \
                 WHERE id IN ({placeholders})"
            );
            let mut query = sqlx::query_as::<_, Author>(&sql);

            for id in chunk {
                query = query.bind(id.to_string());
            }

            let found = query
                .fetch_all(&self.pool)
                .await
                .map_err(|err| anyhow!(err).context("Failed to retrieve authors"))?;
            authors.extend(found);
        }

        authors.sort_by(|a, b| {
            (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
        });

        Ok(authors)
    }

    fn add_author(&mut self, author: Author) -> Author {
        stage_author(author, &mut self.pending)
    }

    async fn get_books_for_author(&self, author_id: Uuid) -> Result<Vec<Book>, RepositoryError> {
        let books = sqlx::query_as(
            "SELECT id, title, description, page_count, author_id FROM book \
             WHERE author_id = ? ORDER BY title",
        )
        .bind(author_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            anyhow!(err).context(format!(
                r#"Failed to retrieve books for author with id "{author_id}""#
            ))
        })?;

        Ok(books)
    }

    async fn get_book_for_author(
        &self,
        author_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as(
            "SELECT id, title, description, page_count, author_id FROM book \
             WHERE author_id = ? AND id = ?",
        )
        .bind(author_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            anyhow!(err).context(format!(
                r#"Failed to retrieve book with id "{id}" for author with id "{author_id}""#
            ))
        })?;

        Ok(book)
    }

    fn add_book_for_author(&mut self, author_id: Uuid, book: Book) -> Book {
        stage_book(author_id, book, &mut self.pending)
    }

    fn update_book_for_author(&mut self, book: Book) {
        self.pending.push(Change::UpdateBook(book));
    }

    fn delete_book(&mut self, book: Book) {
        self.pending.push(Change::DeleteBook(book.id));
    }

    async fn save(&mut self) -> bool {
        let changes = std::mem::take(&mut self.pending);
        match self.commit(changes).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to save library changes");
                false
            }
        }
    }
}
