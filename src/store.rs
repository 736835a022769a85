use crate::models::{Author, Book, RepositoryError};
use async_trait::async_trait;
use uuid::Uuid;

/// Hands out a fresh repository, and with it a fresh unit of work, per request.
pub trait LibraryStore: Send + Sync + 'static {
    type Repository: LibraryRepository;

    fn repository(&self) -> Self::Repository;
}

/// Entity-level access to authors and their books.
///
/// Mutations are only staged; nothing reaches the backing store until
/// [`LibraryRepository::save`] commits them together.
#[async_trait]
pub trait LibraryRepository: Send + Sync + 'static {
    async fn author_exists(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Returns the authors that exist among `ids`, which may be fewer than requested.
    async fn get_authors(&self, ids: &[Uuid]) -> Result<Vec<Author>, RepositoryError>;

    /// Assigns fresh ids to the author and its books and stages them for insertion.
    fn add_author(&mut self, author: Author) -> Author;

    async fn get_books_for_author(&self, author_id: Uuid) -> Result<Vec<Book>, RepositoryError>;

    async fn get_book_for_author(
        &self,
        author_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Book>, RepositoryError>;

    /// Stages a book under `author_id`. A nil id is replaced by a generated one.
    fn add_book_for_author(&mut self, author_id: Uuid, book: Book) -> Book;

    fn update_book_for_author(&mut self, book: Book);

    fn delete_book(&mut self, book: Book);

    /// Commits every staged change atomically. `false` means nothing was persisted.
    async fn save(&mut self) -> bool;
}

/// A staged mutation awaiting [`LibraryRepository::save`].
#[derive(Debug, Clone)]
pub enum Change {
    InsertAuthor(Author),
    InsertBook(Book),
    UpdateBook(Book),
    DeleteBook(Uuid),
}

pub(crate) fn stage_author(author: Author, pending: &mut Vec<Change>) -> Author {
    let mut author = author;
    author.id = Uuid::new_v4();
    for book in &mut author.books {
        book.id = Uuid::new_v4();
        book.author_id = author.id;
    }

    pending.push(Change::InsertAuthor(author.clone()));
    pending.extend(author.books.iter().cloned().map(Change::InsertBook));
    author
}

pub(crate) fn stage_book(author_id: Uuid, book: Book, pending: &mut Vec<Change>) -> Book {
    let mut book = book;
    if book.id.is_nil() {
        book.id = Uuid::new_v4();
    }
    book.author_id = author_id;

    pending.push(Change::InsertBook(book.clone()));
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn author_with_books(titles: &[&str]) -> Author {
        let date_of_birth = DateTime::parse_from_rfc3339("1960-04-02T00:00:00+00:00").unwrap();
        let mut author = Author::new(
            Uuid::nil(),
            "Ursula".to_string(),
            "Le Guin".to_string(),
            date_of_birth,
            "Fantasy".to_string(),
        );
        author.books = titles
            .iter()
            .map(|title| Book::new(Uuid::nil(), (*title).to_string(), None, 0, Uuid::nil()))
            .collect();
        author
    }

    #[test]
    fn staging_an_author_assigns_ids_to_author_and_books() {
        let mut pending = Vec::new();
        let author = stage_author(author_with_books(&["A Wizard of Earthsea", "Tehanu"]), &mut pending);

        assert!(!author.id.is_nil());
        assert!(author.books.iter().all(|book| !book.id.is_nil()));
        assert!(author.books.iter().all(|book| book.author_id == author.id));
        assert_eq!(pending.len(), 3);
        assert!(matches!(pending[0], Change::InsertAuthor(_)));
    }

    #[test]
    fn staging_a_book_keeps_a_client_supplied_id() {
        let mut pending = Vec::new();
        let id = Uuid::new_v4();
        let author_id = Uuid::new_v4();
        let book = Book::new(id, "Tehanu".to_string(), None, 0, Uuid::nil());

        let staged = stage_book(author_id, book, &mut pending);

        assert_eq!(staged.id, id);
        assert_eq!(staged.author_id, author_id);
    }

    #[test]
    fn staging_a_book_generates_missing_id() {
        let mut pending = Vec::new();
        let book = Book::new(Uuid::nil(), "Tehanu".to_string(), None, 0, Uuid::nil());

        let staged = stage_book(Uuid::new_v4(), book, &mut pending);

        assert!(!staged.id.is_nil());
    }
}
