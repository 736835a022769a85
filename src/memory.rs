use crate::models::{Author, Book, RepositoryError};
use crate::store::{Change, LibraryRepository, LibraryStore, stage_author, stage_book};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    authors: BTreeMap<Uuid, Author>,
    books: BTreeMap<Uuid, Book>,
}

impl Tables {
    fn apply(&mut self, change: Change) -> anyhow::Result<()> {
        match change {
            Change::InsertAuthor(mut author) => {
                if self.authors.contains_key(&author.id) {
                    return Err(anyhow!(r#"Author with id "{}" already exists"#, author.id));
                }
                author.books.clear();
                self.authors.insert(author.id, author);
            }
            Change::InsertBook(book) => {
                if !self.authors.contains_key(&book.author_id) {
                    return Err(anyhow!(
                        r#"Author with id "{}" does not exist"#,
                        book.author_id
                    ));
                }
                if self.books.contains_key(&book.id) {
                    return Err(anyhow!(r#"Book with id "{}" already exists"#, book.id));
                }
                self.books.insert(book.id, book);
            }
            Change::UpdateBook(book) => match self.books.get_mut(&book.id) {
                Some(existing) if existing.author_id == book.author_id => *existing = book,
                _ => return Err(anyhow!(r#"Book with id "{}" no longer exists"#, book.id)),
            },
            Change::DeleteBook(id) => {
                self.books.remove(&id);
            }
        }

        Ok(())
    }
}

/// Library kept in process memory. Commits can be made to fail on demand.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    tables: Arc<Mutex<Tables>>,
    fail_saves: Arc<AtomicBool>,
}

impl InMemoryLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save` report failure without persisting anything.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl LibraryStore for InMemoryLibrary {
    type Repository = InMemoryLibraryRepository;

    fn repository(&self) -> Self::Repository {
        InMemoryLibraryRepository {
            library: self.clone(),
            pending: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct InMemoryLibraryRepository {
    library: InMemoryLibrary,
    pending: Vec<Change>,
}

impl InMemoryLibraryRepository {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.library
            .tables
            .lock()
            .map_err(|_| RepositoryError(anyhow!("In-memory library lock is poisoned")))
    }
}

#[async_trait]
impl LibraryRepository for InMemoryLibraryRepository {
    async fn author_exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.tables()?.authors.contains_key(&id))
    }

    async fn get_authors(&self, ids: &[Uuid]) -> Result<Vec<Author>, RepositoryError> {
        let tables = self.tables()?;
        let mut authors: Vec<Author> = tables
            .authors
            .values()
            .filter(|author| ids.contains(&author.id))
            .cloned()
            .collect();
        authors.sort_by(|a, b| {
            (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
        });
        Ok(authors)
    }

    fn add_author(&mut self, author: Author) -> Author {
        stage_author(author, &mut self.pending)
    }

    async fn get_books_for_author(&self, author_id: Uuid) -> Result<Vec<Book>, RepositoryError> {
        let tables = self.tables()?;
        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|book| book.author_id == author_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn get_book_for_author(
        &self,
        author_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Book>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .books
            .get(&id)
            .filter(|book| book.author_id == author_id)
            .cloned())
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
        if self.library.fail_saves.load(Ordering::SeqCst) {
            tracing::error!("In-memory library is configured to fail saves");
            return false;
        }

        let Ok(mut tables) = self.library.tables.lock() else {
            tracing::error!("In-memory library lock is poisoned");
            return false;
        };

        // Apply to a copy so a failing change leaves the committed state untouched.
        let mut staged = tables.clone();
        for change in changes {
            if let Err(err) = staged.apply(change) {
                tracing::error!(error = ?err, "Failed to save library changes");
                return false;
            }
        }

        *tables = staged;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn author() -> Author {
        let date_of_birth = DateTime::parse_from_rfc3339("1929-10-21T00:00:00+00:00").unwrap();
        Author::new(
            Uuid::nil(),
            "Ursula".to_string(),
            "Le Guin".to_string(),
            date_of_birth,
            "Fantasy".to_string(),
        )
    }

    fn book(title: &str) -> Book {
        Book::new(Uuid::nil(), title.to_string(), None, 0, Uuid::nil())
    }

    #[tokio::test]
    async fn staged_changes_are_invisible_until_saved() {
        let library = InMemoryLibrary::new();
        let mut repo = library.repository();
        let le_guin = repo.add_author(author());

        assert!(!repo.author_exists(le_guin.id).await.unwrap());
        assert!(repo.save().await);
        assert!(library.repository().author_exists(le_guin.id).await.unwrap());
    }

    #[tokio::test]
    async fn failing_saves_discard_pending_changes() {
        let library = InMemoryLibrary::new();
        library.fail_saves(true);
        let mut repo = library.repository();
        let le_guin = repo.add_author(author());

        assert!(!repo.save().await);
        library.fail_saves(false);
        assert!(repo.save().await);
        assert!(!repo.author_exists(le_guin.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_book_id_rejects_the_whole_unit_of_work() {
        let library = InMemoryLibrary::new();
        let mut repo = library.repository();
        let le_guin = repo.add_author(author());
        let tehanu = repo.add_book_for_author(le_guin.id, book("Tehanu"));
        assert!(repo.save().await);

        let lathe = repo.add_book_for_author(le_guin.id, book("The Lathe of Heaven"));
        let mut duplicate = book("Tehanu again");
        duplicate.id = tehanu.id;
        repo.add_book_for_author(le_guin.id, duplicate);

        assert!(!repo.save().await);
        assert!(repo.get_book_for_author(le_guin.id, lathe.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn books_are_listed_by_title() {
        let library = InMemoryLibrary::new();
        let mut repo = library.repository();
        let le_guin = repo.add_author(author());
        repo.add_book_for_author(le_guin.id, book("Tehanu"));
        repo.add_book_for_author(le_guin.id, book("Always Coming Home"));
        assert!(repo.save().await);

        let titles: Vec<_> = repo
            .get_books_for_author(le_guin.id)
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, ["Always Coming Home", "Tehanu"]);
    }
}
