use crate::dto::{BookDto, BookForCreationDto, BookForUpdateDto, LinkedCollectionResourceWrapperDto};
use crate::http::AppState;
use crate::http::handler::{ApiError, ApiSuccess, ensure_saved, ensure_valid, required_body};
use crate::http::links::{add_collection_links, add_standard_links};
use crate::http::model_state::ModelState;
use crate::http::patch::PatchDocument;
use crate::models::Book;
use crate::store::{LibraryRepository, LibraryStore};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

const BOOK_FOR_CREATION: &str = "BookForCreationDto";
const BOOK_FOR_UPDATE: &str = "BookForUpdateDto";
const DESCRIPTION_EQUALS_TITLE: &str =
    "The provided description should be different from the title.";

/// Records an error under `key` when the description repeats the title.
/// Two missing values count as equal.
fn check_description_differs(
    title: Option<&str>,
    description: Option<&str>,
    key: &str,
    model_state: &mut ModelState,
) {
    if description == title {
        model_state.add_error(key, DESCRIPTION_EQUALS_TITLE);
    }
}

fn validate_update(book: &BookForUpdateDto, model_state: &mut ModelState) {
    check_description_differs(
        book.title.as_deref(),
        book.description.as_deref(),
        BOOK_FOR_UPDATE,
        model_state,
    );
    model_state.validate("", book);
}

async fn ensure_author_exists<R: LibraryRepository>(
    repo: &R,
    author_id: Uuid,
) -> Result<(), ApiError> {
    if repo.author_exists(author_id).await? {
        Ok(())
    } else {
        Err(ApiError::author_not_found(author_id))
    }
}

pub async fn get_books_for_author<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path(author_id): Path<Uuid>,
) -> Result<ApiSuccess<LinkedCollectionResourceWrapperDto<BookDto>>, ApiError> {
    let repo = state.library.repository();
    ensure_author_exists(&repo, author_id).await?;

    let books = repo
        .get_books_for_author(author_id)
        .await?
        .into_iter()
        .map(|book| add_standard_links(BookDto::from(book), &state.links))
        .collect();
    let wrapper = add_collection_links(
        LinkedCollectionResourceWrapperDto::new(books),
        author_id,
        &state.links,
    );

    Ok(ApiSuccess::new(StatusCode::OK, wrapper))
}

pub async fn get_book_for_author<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path((author_id, id)): Path<(Uuid, Uuid)>,
) -> Result<ApiSuccess<BookDto>, ApiError> {
    let repo = state.library.repository();
    ensure_author_exists(&repo, author_id).await?;

    let book = repo
        .get_book_for_author(author_id, id)
        .await?
        .ok_or_else(|| ApiError::book_not_found(author_id, id))?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        add_standard_links(BookDto::from(book), &state.links),
    ))
}

pub async fn create_book_for_author<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path(author_id): Path<Uuid>,
    payload: Result<Json<Option<BookForCreationDto>>, JsonRejection>,
) -> Result<ApiSuccess<BookDto>, ApiError> {
    let book = required_body(payload)?;

    let mut model_state = ModelState::default();
    check_description_differs(
        book.title.as_deref(),
        book.description.as_deref(),
        BOOK_FOR_CREATION,
        &mut model_state,
    );
    model_state.validate("", &book);
    ensure_valid(model_state)?;

    let mut repo = state.library.repository();
    ensure_author_exists(&repo, author_id).await?;

    let book = repo.add_book_for_author(author_id, Book::from(book));
    ensure_saved(repo.save().await, || {
        format!("Creating a book for author {author_id} failed on save.")
    })?;

    let location = state.links.book_for_author(author_id, book.id);
    let book = add_standard_links(BookDto::from(book), &state.links);
    Ok(ApiSuccess::created(location, book))
}

pub async fn delete_book_for_author<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path((author_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let mut repo = state.library.repository();
    ensure_author_exists(&repo, author_id).await?;

    let book = repo
        .get_book_for_author(author_id, id)
        .await?
        .ok_or_else(|| ApiError::book_not_found(author_id, id))?;

    repo.delete_book(book);
    ensure_saved(repo.save().await, || {
        format!("Deleting book {id} for author {author_id} failed on save.")
    })?;

    tracing::info!(book_id = %id, author_id = %author_id, "Book {id} for author {author_id} was deleted.");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_book_for_author<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path((author_id, id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<Option<BookForUpdateDto>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let update = required_body(payload)?;

    let mut model_state = ModelState::default();
    validate_update(&update, &mut model_state);
    ensure_valid(model_state)?;

    let mut repo = state.library.repository();
    ensure_author_exists(&repo, author_id).await?;

    let existing = repo.get_book_for_author(author_id, id).await?;
    let Some(mut book) = existing else {
        return upsert_book(&state, repo, author_id, id, update).await;
    };

    update.apply_to(&mut book);
    repo.update_book_for_author(book);
    ensure_saved(repo.save().await, || {
        format!("Updating book {id} for author {author_id} failed on save.")
    })?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn partially_update_book_for_author<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path((author_id, id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<Option<PatchDocument>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let patch_doc = required_body(payload)?;

    let mut repo = state.library.repository();
    ensure_author_exists(&repo, author_id).await?;

    let mut model_state = ModelState::default();
    let existing = repo.get_book_for_author(author_id, id).await?;
    let Some(mut book) = existing else {
        // An empty document leaves title and description both unset, which
        // the description rule rejects.
        let update =
            patch_doc.apply_to(BookForUpdateDto::default(), &mut model_state, BOOK_FOR_UPDATE);
        validate_update(&update, &mut model_state);
        ensure_valid(model_state)?;

        return upsert_book(&state, repo, author_id, id, update).await;
    };

    let update = patch_doc.apply_to(
        BookForUpdateDto::from(&book),
        &mut model_state,
        BOOK_FOR_UPDATE,
    );
    validate_update(&update, &mut model_state);
    ensure_valid(model_state)?;

    update.apply_to(&mut book);
    repo.update_book_for_author(book);
    ensure_saved(repo.save().await, || {
        format!("Patching book {id} for author {author_id} failed on save.")
    })?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Creates the book under the id the client addressed it by.
async fn upsert_book<LS: LibraryStore>(
    state: &AppState<LS>,
    mut repo: LS::Repository,
    author_id: Uuid,
    id: Uuid,
    update: BookForUpdateDto,
) -> Result<Response, ApiError> {
    let mut book = Book::from(update);
    book.id = id;

    let book = repo.add_book_for_author(author_id, book);
    ensure_saved(repo.save().await, || {
        format!("Upserting book {id} for author {author_id} failed on save.")
    })?;

    let location = state.links.book_for_author(author_id, book.id);
    Ok(ApiSuccess::created(location, BookDto::from(book)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_title_and_description_are_rejected() {
        let mut model_state = ModelState::default();
        check_description_differs(Some("X"), Some("X"), BOOK_FOR_CREATION, &mut model_state);

        assert_eq!(model_state.errors(BOOK_FOR_CREATION), [DESCRIPTION_EQUALS_TITLE]);
    }

    #[test]
    fn two_missing_values_count_as_equal() {
        let mut model_state = ModelState::default();
        check_description_differs(None, None, BOOK_FOR_UPDATE, &mut model_state);

        assert!(!model_state.is_valid());
    }

    #[test]
    fn update_validation_combines_both_rule_sets() {
        let mut model_state = ModelState::default();
        let update = BookForUpdateDto {
            title: Some("X".to_string()),
            description: None,
            page_count: 0,
        };

        validate_update(&update, &mut model_state);

        assert!(model_state.errors(BOOK_FOR_UPDATE).is_empty());
        assert_eq!(
            model_state.errors("description"),
            ["You should fill out a description."]
        );
    }

    #[test]
    fn distinct_title_and_description_pass() {
        let mut model_state = ModelState::default();
        let update = BookForUpdateDto {
            title: Some("X".to_string()),
            description: Some("Y".to_string()),
            page_count: 10,
        };

        validate_update(&update, &mut model_state);

        assert!(model_state.is_valid());
    }
}
