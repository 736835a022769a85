//! Transfer objects exchanged over HTTP and their conversions to and from
//! the persistence entities.

use crate::models::{Author, Book};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDto {
    pub href: String,
    pub rel: String,
    pub method: String,
}

impl LinkDto {
    pub fn new(href: String, rel: &str, method: &str) -> Self {
        Self {
            href,
            rel: rel.to_string(),
            method: method.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkedCollectionResourceWrapperDto<T: Serialize> {
    pub value: Vec<T>,
    pub links: Vec<LinkDto>,
}

impl<T: Serialize> LinkedCollectionResourceWrapperDto<T> {
    pub const fn new(value: Vec<T>) -> Self {
        Self {
            value,
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub genre: String,
}

impl AuthorDto {
    pub fn from_author(author: Author, today: NaiveDate) -> Self {
        Self {
            id: author.id,
            name: format!("{} {}", author.first_name, author.last_name),
            age: current_age(author.date_of_birth, today),
            genre: author.genre,
        }
    }
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self::from_author(author, Utc::now().date_naive())
    }
}

/// Whole years between the date of birth (in its own offset) and `today`.
pub fn current_age(date_of_birth: DateTime<FixedOffset>, today: NaiveDate) -> i32 {
    let born = date_of_birth.date_naive();
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthorForCreationDto {
    #[serde(alias = "FirstName")]
    #[validate(length(max = 50, message = "The first name shouldn't have more than 50 characters."))]
    pub first_name: String,
    #[serde(alias = "LastName")]
    #[validate(length(max = 50, message = "The last name shouldn't have more than 50 characters."))]
    pub last_name: String,
    #[serde(alias = "DateOfBirth")]
    pub date_of_birth: DateTime<FixedOffset>,
    #[serde(alias = "Genre")]
    #[validate(length(max = 50, message = "The genre shouldn't have more than 50 characters."))]
    pub genre: String,
    #[serde(default, alias = "Books")]
    #[validate(nested)]
    pub books: Vec<BookForCreationDto>,
}

impl From<AuthorForCreationDto> for Author {
    fn from(dto: AuthorForCreationDto) -> Self {
        let mut author = Self::new(
            Uuid::nil(),
            dto.first_name,
            dto.last_name,
            dto.date_of_birth,
            dto.genre,
        );
        author.books = dto.books.into_iter().map(Book::from).collect();
        author
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub page_count: i32,
    pub author_id: Uuid,
    pub links: Vec<LinkDto>,
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            description: book.description,
            page_count: book.page_count,
            author_id: book.author_id,
            links: Vec::new(),
        }
    }
}

/// A present value still counts as missing when it holds only whitespace.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookForCreationDto {
    #[serde(alias = "Title")]
    #[validate(
        required(message = "You should fill out a title."),
        custom(function = "not_blank", message = "You should fill out a title."),
        length(max = 100, message = "The title shouldn't have more than 100 characters.")
    )]
    pub title: Option<String>,
    #[serde(alias = "Description")]
    #[validate(length(
        max = 500,
        message = "The description shouldn't have more than 500 characters."
    ))]
    pub description: Option<String>,
    #[serde(default, alias = "PageCount")]
    #[validate(range(min = 0, message = "The page count can't be negative."))]
    pub page_count: i32,
}

impl From<BookForCreationDto> for Book {
    fn from(dto: BookForCreationDto) -> Self {
        Self::new(
            Uuid::nil(),
            dto.title.unwrap_or_default(),
            dto.description,
            dto.page_count,
            Uuid::nil(),
        )
    }
}

/// Full replacement of a book, also the target shape of patch documents.
/// Every field is serialized, absent ones as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookForUpdateDto {
    #[serde(alias = "Title")]
    #[validate(
        required(message = "You should fill out a title."),
        custom(function = "not_blank", message = "You should fill out a title."),
        length(max = 100, message = "The title shouldn't have more than 100 characters.")
    )]
    pub title: Option<String>,
    #[serde(alias = "Description")]
    #[validate(
        required(message = "You should fill out a description."),
        custom(function = "not_blank", message = "You should fill out a description."),
        length(max = 500, message = "The description shouldn't have more than 500 characters.")
    )]
    pub description: Option<String>,
    #[serde(default, alias = "PageCount")]
    #[validate(range(min = 0, message = "The page count can't be negative."))]
    pub page_count: i32,
}

impl BookForUpdateDto {
    /// Copies the updatable fields onto an existing entity, leaving its identity alone.
    pub fn apply_to(self, book: &mut Book) {
        book.title = self.title.unwrap_or_default();
        book.description = self.description;
        book.page_count = self.page_count;
    }
}

impl From<&Book> for BookForUpdateDto {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            description: book.description.clone(),
            page_count: book.page_count,
        }
    }
}

impl From<BookForUpdateDto> for Book {
    fn from(dto: BookForUpdateDto) -> Self {
        let mut book = Self::new(Uuid::nil(), String::new(), None, 0, Uuid::nil());
        dto.apply_to(&mut book);
        book
    }
}
