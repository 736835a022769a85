use serde::Serialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Field-keyed validation errors collected while handling a request.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelState(BTreeMap<String, Vec<String>>);

impl ModelState {
    pub fn add_error(&mut self, key: &str, message: impl Into<String>) {
        self.0.entry(key.to_string()).or_default().push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn errors(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Runs the derived validation rules of `target`, recording failures under `prefix`.
    pub fn validate<T: Validate>(&mut self, prefix: &str, target: &T) {
        if let Err(errors) = target.validate() {
            self.collect(prefix, &errors);
        }
    }

    fn collect(&mut self, prefix: &str, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let key = join_key(prefix, &camel_case(&field.to_string()));
            match kind {
                ValidationErrorsKind::Field(failures) => {
                    for failure in failures {
                        let message = failure
                            .message
                            .as_ref()
                            .map_or_else(|| failure.code.to_string(), ToString::to_string);
                        self.add_error(&key, message);
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(&key, nested),
                ValidationErrorsKind::List(items) => {
                    for (index, nested) in items {
                        self.collect(&format!("{key}[{index}]"), nested);
                    }
                }
            }
        }
    }
}

fn join_key(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{AuthorForCreationDto, BookForCreationDto, BookForUpdateDto};

    #[test]
    fn starts_valid() {
        assert!(ModelState::default().is_valid());
    }

    #[test]
    fn errors_accumulate_per_key() {
        let mut state = ModelState::default();
        state.add_error("BookForUpdateDto", "first");
        state.add_error("BookForUpdateDto", "second");

        assert!(!state.is_valid());
        assert_eq!(state.errors("BookForUpdateDto"), ["first", "second"]);
        assert!(state.errors("title").is_empty());
    }

    #[test]
    fn field_keys_use_json_names() {
        let mut state = ModelState::default();
        let book = BookForUpdateDto {
            title: Some("Dune".to_string()),
            description: Some("Spice".to_string()),
            page_count: -1,
        };

        state.validate("", &book);

        assert_eq!(state.errors("pageCount"), ["The page count can't be negative."]);
    }

    #[test]
    fn nested_errors_are_indexed() {
        let mut state = ModelState::default();
        let author: AuthorForCreationDto = serde_json::from_value(serde_json::json!({
            "firstName": "Frank",
            "lastName": "Herbert",
            "dateOfBirth": "1920-10-08T00:00:00+00:00",
            "genre": "Science fiction",
            "books": [{ "title": "Dune" }, { "description": "No title" }]
        }))
        .unwrap();

        state.validate("[0]", &author);

        assert_eq!(
            state.errors("[0].books[1].title"),
            ["You should fill out a title."]
        );
        assert!(state.errors("[0].books[0].title").is_empty());
    }

    #[test]
    fn camel_case_converts_field_names() {
        assert_eq!(camel_case("title"), "title");
        assert_eq!(camel_case("page_count"), "pageCount");
        assert_eq!(camel_case("date_of_birth"), "dateOfBirth");
        assert_eq!(camel_case("a_b_c"), "aBC");
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut state = ModelState::default();
        state.validate("", &BookForCreationDto::default());

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "title": ["You should fill out a title."] })
        );
    }
}
