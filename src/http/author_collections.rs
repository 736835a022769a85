use crate::dto::{AuthorDto, AuthorForCreationDto};
use crate::http::AppState;
use crate::http::handler::{ApiError, ApiSuccess, ensure_saved, ensure_valid, required_body};
use crate::http::model_state::ModelState;
use crate::models::Author;
use crate::store::{LibraryRepository, LibraryStore};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

pub async fn create_author_collection<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    payload: Result<Json<Option<Vec<AuthorForCreationDto>>>, JsonRejection>,
) -> Result<ApiSuccess<Vec<AuthorDto>>, ApiError> {
    let author_collection = required_body(payload)?;
    if author_collection.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one author is required".to_string(),
        ));
    }

    let mut model_state = ModelState::default();
    for (index, author) in author_collection.iter().enumerate() {
        model_state.validate(&format!("[{index}]"), author);
    }
    ensure_valid(model_state)?;

    let mut repo = state.library.repository();
    let authors: Vec<Author> = author_collection
        .into_iter()
        .map(|author| repo.add_author(Author::from(author)))
        .collect();

    ensure_saved(repo.save().await, || {
        "Creating an author collection failed on save.".to_string()
    })?;

    let authors: Vec<AuthorDto> = authors.into_iter().map(AuthorDto::from).collect();
    let ids: Vec<Uuid> = authors.iter().map(|author| author.id).collect();
    tracing::debug!(count = ids.len(), "Created author collection");

    Ok(ApiSuccess::created(state.links.author_collection(&ids), authors))
}

pub async fn get_author_collection<LS: LibraryStore>(
    State(state): State<AppState<LS>>,
    Path(ids): Path<String>,
) -> Result<ApiSuccess<Vec<AuthorDto>>, ApiError> {
    let ids = parse_ids(&ids).ok_or_else(|| {
        ApiError::BadRequest(format!("\"{ids}\" is not a comma-separated list of ids"))
    })?;

    let repo = state.library.repository();
    let authors = repo.get_authors(&ids).await?;

    // All or nothing: one unknown id fails the whole lookup.
    if authors.len() != ids.len() {
        return Err(ApiError::NotFound(
            "one or more authors do not exist".to_string(),
        ));
    }

    let authors = authors.into_iter().map(AuthorDto::from).collect();
    Ok(ApiSuccess::new(StatusCode::OK, authors))
}

/// Parses `id1,id2,...`, ignoring blanks. `None` when nothing is left or any id is malformed.
fn parse_ids(raw: &str) -> Option<Vec<Uuid>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(Uuid::parse_str)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    if ids.is_empty() { None } else { Some(ids) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(parse_ids(&format!("{a}, {b}")), Some(vec![a, b]));
        assert_eq!(parse_ids(&format!("{a},,")), Some(vec![a]));
    }

    #[test]
    fn keeps_duplicates() {
        let a = Uuid::new_v4();

        assert_eq!(parse_ids(&format!("{a},{a}")), Some(vec![a, a]));
    }

    #[test]
    fn rejects_blank_or_malformed_lists() {
        assert_eq!(parse_ids(" , "), None);
        assert_eq!(parse_ids("not-an-id"), None);
        assert_eq!(parse_ids(&format!("{},nope", Uuid::new_v4())), None);
    }
}
